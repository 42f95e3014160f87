use std::collections::BTreeSet;

use anyhow::Result;
use jsss_domain::Subtype;
use serde_json::json;

use crate::core::config::context::CommandContext;
use crate::core::corpus::JsssCorpus;
use crate::core::outcome::ExecutionOutcome;

#[derive(Clone, Debug, Default)]
pub struct CorpusFetchRequest;

#[derive(Clone, Debug)]
pub struct IdentitiesRequest {
    /// Empty selects every subtype.
    pub subtypes: Vec<Subtype>,
    pub limit: usize,
}

/// Makes the raw corpus tree available under the data root.
///
/// # Errors
/// Returns an error if no source holds the corpus or extraction fails.
pub fn corpus_fetch(ctx: &CommandContext, _request: &CorpusFetchRequest) -> Result<ExecutionOutcome> {
    let corpus = JsssCorpus::new(ctx.config(), ctx.shared_effects().clone())?;
    let acquisition = corpus.get_contents()?;
    Ok(ExecutionOutcome::success(
        format!("corpus ready at {} ({})", corpus.contents_dir().display(), acquisition.as_str()),
        json!({
            "acquisition": acquisition,
            "contents": corpus.contents_dir().display().to_string(),
            "archive": corpus.archive_path().display().to_string(),
        }),
    ))
}

/// Lists utterance identities for a subtype selection without touching disk.
///
/// # Errors
/// Returns an error if the configured pad overrides are invalid.
pub fn corpus_identities(ctx: &CommandContext, request: &IdentitiesRequest) -> Result<ExecutionOutcome> {
    let table = ctx.config().subtype_table()?;
    let subtypes: BTreeSet<Subtype> = if request.subtypes.is_empty() {
        Subtype::all().collect()
    } else {
        request.subtypes.iter().copied().collect()
    };
    let identities = table.list_identities(&subtypes);
    let per_subtype: serde_json::Map<String, serde_json::Value> = subtypes
        .iter()
        .map(|subtype| {
            let count = table.count(&BTreeSet::from([*subtype]));
            (subtype.as_str().to_string(), json!(count))
        })
        .collect();
    let sample: Vec<String> = identities
        .iter()
        .take(request.limit)
        .map(|id| id.label())
        .collect();
    let mut message = format!("{} identities", identities.len());
    for label in &sample {
        message.push('\n');
        message.push_str(label);
    }
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "count": identities.len(),
            "subtypes": per_subtype,
            "sample": sample,
        }),
    ))
}
