use atty::Stream;
use clap::Parser;
use color_eyre::Result;
use jsss_core::{
    CommandContext, CommandInfo, CommandStatus, ConfigOverrides, CorpusFetchRequest,
    DatasetShowRequest, ExecutionOutcome, GlobalOptions, IdentitiesRequest,
};
use serde_json::Value;

mod cli;
mod style;

use cli::{CommandGroupCli, CorpusCommand, DatasetCommand, JsssCli};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = JsssCli::parse();
    init_tracing(cli.trace, cli.quiet, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
    };
    let overrides = ConfigOverrides {
        config_file: cli.config.clone(),
        data_root: cli.data_root.clone(),
        download: cli.download.then_some(true),
        workers: cli.workers,
    };

    let info = command_info(&cli.command);
    let outcome = CommandContext::new(&global, &overrides)
        .and_then(|ctx| dispatch(&ctx, &cli.command))
        .unwrap_or_else(|err| {
            tracing::debug!("{err:?}");
            ExecutionOutcome::from_error(&err)
        });
    let code = emit_output(&cli, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, quiet: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("jsss={level},jsss_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn command_info(command: &CommandGroupCli) -> CommandInfo {
    match command {
        CommandGroupCli::Corpus(CorpusCommand::Fetch) => CommandInfo::new("corpus", "fetch"),
        CommandGroupCli::Corpus(CorpusCommand::Identities(_)) => {
            CommandInfo::new("corpus", "identities")
        }
        CommandGroupCli::Dataset(DatasetCommand::Key(_)) => CommandInfo::new("dataset", "key"),
        CommandGroupCli::Dataset(DatasetCommand::Build(_)) => CommandInfo::new("dataset", "build"),
        CommandGroupCli::Dataset(DatasetCommand::Show(_)) => CommandInfo::new("dataset", "show"),
    }
}

fn dispatch(ctx: &CommandContext, command: &CommandGroupCli) -> anyhow::Result<ExecutionOutcome> {
    match command {
        CommandGroupCli::Corpus(CorpusCommand::Fetch) => {
            jsss_core::corpus_fetch(ctx, &CorpusFetchRequest)
        }
        CommandGroupCli::Corpus(CorpusCommand::Identities(args)) => jsss_core::corpus_identities(
            ctx,
            &IdentitiesRequest {
                subtypes: args.subtypes.clone(),
                limit: args.limit,
            },
        ),
        CommandGroupCli::Dataset(DatasetCommand::Key(args)) => {
            jsss_core::dataset_key(ctx, &args.request())
        }
        CommandGroupCli::Dataset(DatasetCommand::Build(args)) => {
            jsss_core::dataset_build(ctx, &args.request())
        }
        CommandGroupCli::Dataset(DatasetCommand::Show(args)) => jsss_core::dataset_show(
            ctx,
            &DatasetShowRequest {
                dataset: args.dataset.request(),
                index: args.index,
                eval: args.eval,
            },
        ),
    }
}

fn emit_output(cli: &JsssCli, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = jsss_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if code != 0 {
        let message = jsss_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(outcome.status, &message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
    } else if !cli.quiet {
        let mut lines = outcome.message.lines();
        let first = lines.next().unwrap_or_default();
        let message = jsss_core::format_status_message(info, first);
        println!("{}", style.status(outcome.status, &message));
        for line in lines {
            println!("  {}", style.dimmed(line));
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}
