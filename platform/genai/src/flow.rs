use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{GenAiError, GenAiResult, GenerateRequest, ModelClient, Part};

/// Checks a parsed reply beyond what its type already guarantees.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// A typed prompt: input in, validated JSON out.
pub trait Flow {
    const NAME: &'static str;
    const TEMPERATURE: f32 = 0.2;

    type Input: Sync;
    type Output: DeserializeOwned + Validate;

    fn system() -> &'static str;

    fn prompt(input: &Self::Input) -> GenAiResult<Vec<Part>>;
}

/// Runs `F` against `client`. The model reply is unfenced, parsed and
/// validated; any failure is returned as an error rather than partial output.
pub async fn run_flow<F: Flow>(client: &dyn ModelClient, input: &F::Input) -> GenAiResult<F::Output> {
    let parts = F::prompt(input)?;
    let started = Instant::now();
    let result = client
        .generate(GenerateRequest {
            flow: F::NAME,
            system: F::system().to_string(),
            parts,
            temperature: F::TEMPERATURE,
        })
        .await
        .and_then(|reply| parse_reply::<F::Output>(&reply));

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => debug!(flow = F::NAME, model = client.model_name(), elapsed_ms, "flow completed"),
        Err(err) => warn!(flow = F::NAME, model = client.model_name(), elapsed_ms, error = %err, "flow failed"),
    }
    result
}

fn parse_reply<T: DeserializeOwned + Validate>(reply: &str) -> GenAiResult<T> {
    let value: T = serde_json::from_str(strip_json_fences(reply))?;
    value.validate().map_err(GenAiError::Schema)?;
    Ok(value)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_unit_interval(field: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{field} must be between 0 and 1"));
    }
    Ok(())
}

pub(crate) fn require_percentage(field: &str, value: i64) -> Result<(), String> {
    if !(0..=100).contains(&value) {
        return Err(format!("{field} must be between 0 and 100"));
    }
    Ok(())
}
