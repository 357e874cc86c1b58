use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::{AdapterKind, FallbackPolicy};
use crate::config::{AdapterConfig, SamplingOptions};
use crate::model::{Batch, UnitPosition};

mod fallback;
mod ollama;
#[cfg(test)]
mod tests;

pub use fallback::FallbackGenerator;
pub use ollama::OllamaAdapter;

/// Result of one transformation attempt. A failure is an expected outcome the
/// caller decides how to handle, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Success(String),
    Failure(String),
}

pub trait TransformAdapter: Send {
    fn name(&self) -> &str;

    fn transform(&self, batch: &Batch) -> TransformOutcome;
}

/// How a response was obtained, kept with every batch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRecord {
    pub adapter: String,
    pub failure: Option<String>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone)]
pub struct AdapterResponse {
    pub text: String,
    pub record: AdapterRecord,
}

pub fn build_adapter(config: &AdapterConfig) -> Result<Box<dyn TransformAdapter>> {
    match config.kind {
        AdapterKind::Ollama => Ok(Box::new(OllamaAdapter::new(config)?)),
        AdapterKind::Fallback => Ok(Box::new(FallbackGenerator)),
    }
}

/// Asks `adapter` for a response and applies `policy` when it fails.
///
/// With [`FallbackPolicy::Substitute`] the fallback table stands in for the
/// failed response; with [`FallbackPolicy::Record`] the response is empty and
/// verification rejects the batch.
pub fn obtain_response(
    adapter: &dyn TransformAdapter,
    policy: FallbackPolicy,
    batch: &Batch,
) -> AdapterResponse {
    match adapter.transform(batch) {
        TransformOutcome::Success(text) => AdapterResponse {
            text,
            record: AdapterRecord {
                adapter: adapter.name().to_string(),
                failure: None,
                fallback_used: false,
            },
        },
        TransformOutcome::Failure(reason) => {
            warn!(
                batch_id = %batch.batch_id,
                adapter = adapter.name(),
                policy = policy.as_str(),
                reason = %reason,
                "transformation failed"
            );
            let text = match policy {
                FallbackPolicy::Substitute => FallbackGenerator.render(batch),
                FallbackPolicy::Record => String::new(),
            };
            AdapterResponse {
                text,
                record: AdapterRecord {
                    adapter: adapter.name().to_string(),
                    failure: Some(reason),
                    fallback_used: policy == FallbackPolicy::Substitute,
                },
            }
        }
    }
}
