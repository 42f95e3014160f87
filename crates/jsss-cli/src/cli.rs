use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use jsss_core::{DatasetKind, DatasetRequest, Resample, Subtype};

pub const JSSS_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nCommands:\n{subcommands}\n\nGlobal options:\n{options}\n";

pub const JSSS_BEFORE_HELP: &str = concat!(
    "jsss ",
    env!("CARGO_PKG_VERSION"),
    " – JSSS corpus and derived dataset cache\n\n",
    "  corpus fetch         Make the raw corpus tree available under the data root.\n",
    "  corpus identities    List utterance identities for a subtype selection.\n",
    "  dataset key          Print the cache key and paths for a parameter set.\n",
    "  dataset build        Reuse or generate a waveform/spectrogram dataset.\n",
    "  dataset show         Load one item and describe its tensors.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "jsss",
    author,
    version,
    disable_help_subcommand = true,
    before_help = JSSS_BEFORE_HELP,
    help_template = JSSS_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct JsssCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(long, value_name = "PATH", help = "Read settings from this TOML file", global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Root for corpuses/ and datasets/", global = true)]
    pub data_root: Option<PathBuf>,
    #[arg(
        long,
        help = "Allow fetching the corpus from its origin (sets JSSS_DOWNLOAD=1)",
        global = true
    )]
    pub download: bool,
    #[arg(long, value_name = "N", help = "Preprocessing worker threads", global = true)]
    pub workers: Option<usize>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(subcommand, about = "Acquire and inspect the raw JSSS corpus.")]
    Corpus(CorpusCommand),
    #[command(subcommand, about = "Build and inspect derived datasets.")]
    Dataset(DatasetCommand),
}

#[derive(Subcommand, Debug)]
pub enum CorpusCommand {
    #[command(about = "Make the corpus contents available, extracting or fetching its archive.")]
    Fetch,
    #[command(
        about = "List utterance identities (all subtypes unless --subtype is given).",
        override_usage = "jsss corpus identities [--subtype S ...] [--limit N]"
    )]
    Identities(IdentitiesArgs),
}

#[derive(Args, Debug)]
pub struct IdentitiesArgs {
    #[arg(long = "subtype", value_name = "S", value_parser = parse_subtype)]
    pub subtypes: Vec<Subtype>,
    #[arg(long, default_value_t = 10, help = "How many labels to print")]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    #[command(about = "Print the cache key for a parameter set without building anything.")]
    Key(DatasetArgs),
    #[command(about = "Reuse a cached copy or generate the dataset from the corpus.")]
    Build(DatasetArgs),
    #[command(about = "Load one item and describe its label and tensors.")]
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[arg(value_name = "KIND", value_parser = parse_kind, help = "wave or spec")]
    pub kind: DatasetKind,
    #[arg(
        long = "subtype",
        value_name = "S",
        value_parser = parse_subtype,
        help = "Subtype to include (repeatable; default short-form/basic5000)"
    )]
    pub subtypes: Vec<Subtype>,
    #[arg(
        long,
        value_name = "HZ|none",
        value_parser = parse_resample,
        help = "Target sample rate (default 16000 for wave, native for spec)"
    )]
    pub resample: Option<Resample>,
    #[arg(long, value_name = "N", help = "FFT size for spectrograms (default 254)")]
    pub n_fft: Option<usize>,
}

impl DatasetArgs {
    pub fn request(&self) -> DatasetRequest {
        DatasetRequest {
            kind: self.kind,
            subtypes: self.subtypes.clone(),
            resample: self.resample.unwrap_or_default(),
            n_fft: self.n_fft,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
    #[arg(long, default_value_t = 0)]
    pub index: usize,
    #[arg(long, help = "Spectrogram datasets: also load the waveform")]
    pub eval: bool,
}

fn parse_subtype(raw: &str) -> Result<Subtype, String> {
    raw.parse::<Subtype>().map_err(|_| {
        let known: Vec<&str> = Subtype::all().map(Subtype::as_str).collect();
        format!("unknown subtype '{raw}' (expected one of: {})", known.join(", "))
    })
}

fn parse_kind(raw: &str) -> Result<DatasetKind, String> {
    raw.parse::<DatasetKind>().map_err(|err| err.to_string())
}

fn parse_resample(raw: &str) -> Result<Resample, String> {
    raw.parse::<Resample>().map_err(|err| format!("{err:#}"))
}
