use anyhow::Result;
use jsss_domain::DatasetKind;
use serde_json::{json, Value};

use super::DatasetRequest;
use crate::core::config::context::CommandContext;
use crate::core::dataset::{
    DatasetLocation, DatasetView, Materialized, SpecDataset, SpecMode, WaveDataset,
};
use crate::core::outcome::ExecutionOutcome;
use crate::core::preprocess::tensor::Tensor;

#[derive(Clone, Debug)]
pub struct DatasetShowRequest {
    pub dataset: DatasetRequest,
    pub index: usize,
    /// Spectrogram datasets only: also load the waveform.
    pub eval: bool,
}

/// Prints the cache key and paths for a parameter set.
///
/// # Errors
/// Returns an error if the parameters or the dataset address are invalid.
pub fn dataset_key(ctx: &CommandContext, request: &DatasetRequest) -> Result<ExecutionOutcome> {
    let params = request.params()?;
    let table = ctx.config().subtype_table()?;
    let location = DatasetLocation::for_params(ctx.config(), &table, &params)?;
    Ok(ExecutionOutcome::success(
        location.key.to_string(),
        json!({
            "key": location.key,
            "params": params,
            "contents": location.contents().display().to_string(),
            "archive": location.site.archive.display().to_string(),
            "address": location.site.address().to_string(),
        }),
    ))
}

/// Reuses or generates the dataset for a parameter set.
///
/// # Errors
/// Returns an error if neither a cached copy nor the corpus is available,
/// or if preprocessing fails.
pub fn dataset_build(ctx: &CommandContext, request: &DatasetRequest) -> Result<ExecutionOutcome> {
    let (materialized, len) = match request.kind {
        DatasetKind::Waveform => {
            let dataset =
                WaveDataset::new(ctx.config(), ctx.shared_effects(), request.wave_options())?;
            let len = dataset.len();
            (dataset.materialized().clone(), len)
        }
        DatasetKind::Spectrogram => {
            let dataset = SpecDataset::new(
                ctx.config(),
                ctx.shared_effects(),
                request.spec_options(SpecMode::Train)?,
            )?;
            let len = dataset.len();
            (dataset.materialized().clone(), len)
        }
    };
    Ok(ExecutionOutcome::success(
        format!(
            "{} {} ready with {len} items",
            request.kind.dir_name(),
            materialized.location.key
        ),
        summary(&materialized, len),
    ))
}

/// Loads one datum and reports its label and tensor shapes.
///
/// # Errors
/// Returns an error if the dataset cannot be materialized or the index is
/// out of range.
pub fn dataset_show(ctx: &CommandContext, request: &DatasetShowRequest) -> Result<ExecutionOutcome> {
    let dataset = &request.dataset;
    let (label, tensors) = match dataset.kind {
        DatasetKind::Waveform => {
            let view = WaveDataset::new(ctx.config(), ctx.shared_effects(), dataset.wave_options())?;
            let datum = view.get(request.index)?;
            (datum.label, json!({ "waveform": describe(&datum.waveform) }))
        }
        DatasetKind::Spectrogram => {
            let mode = if request.eval { SpecMode::Eval } else { SpecMode::Train };
            let view =
                SpecDataset::new(ctx.config(), ctx.shared_effects(), dataset.spec_options(mode)?)?;
            let datum = view.get(request.index)?;
            let mut tensors = json!({ "spectrogram": describe(datum.spectrogram()) });
            if let (Some(waveform), Value::Object(map)) = (datum.waveform(), &mut tensors) {
                map.insert("waveform".into(), describe(waveform));
            }
            (datum.label().to_string(), tensors)
        }
    };
    Ok(ExecutionOutcome::success(
        format!("#{} {label}", request.index),
        json!({
            "index": request.index,
            "label": label,
            "tensors": tensors,
        }),
    ))
}

fn summary(materialized: &Materialized, len: usize) -> Value {
    json!({
        "key": materialized.location.key,
        "items": len,
        "provenance": materialized.provenance,
        "contents": materialized.location.contents().display().to_string(),
        "archive": materialized.location.site.archive.display().to_string(),
    })
}

fn describe(tensor: &Tensor) -> Value {
    let data = tensor.data();
    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    json!({
        "shape": tensor.shape(),
        "min": if data.is_empty() { Value::Null } else { json!(min) },
        "max": if data.is_empty() { Value::Null } else { json!(max) },
    })
}
