use std::path::{Path, PathBuf};

use crate::cli::{AdapterArgs, AdapterKind, FallbackPolicy, RunArgs};

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:72b";
const ENDPOINT_ENV: &str = "ZEROLOSS_OLLAMA_ENDPOINT";
const MODEL_ENV: &str = "ZEROLOSS_MODEL";

/// Where every stage reads and writes its artifacts, relative to one workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub workspace: PathBuf,
    pub units_path: PathBuf,
    pub batches_dir: PathBuf,
    pub batch_manifest_path: PathBuf,
    pub results_dir: PathBuf,
    pub mapping_path: PathBuf,
    pub gap_report_path: PathBuf,
    pub manifest_dir: PathBuf,
    pub run_state_path: PathBuf,
    pub cancel_request_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(workspace: &Path) -> Self {
        let batches_dir = workspace.join("batches");
        let manifest_dir = workspace.join("manifests");
        Self {
            workspace: workspace.to_path_buf(),
            units_path: workspace.join("units.json"),
            batch_manifest_path: batches_dir.join("manifest.json"),
            batches_dir,
            results_dir: workspace.join("results"),
            mapping_path: workspace.join("mapping.json"),
            gap_report_path: workspace.join("gap_report.json"),
            run_state_path: manifest_dir.join("run_state.json"),
            cancel_request_path: manifest_dir.join("cancel.request"),
            manifest_dir,
        }
    }

    pub fn batch_path(&self, batch_id: &str) -> PathBuf {
        self.batches_dir.join(format!("{batch_id}.json"))
    }

    pub fn result_path(&self, batch_id: &str) -> PathBuf {
        self.results_dir.join(format!("{batch_id}.json"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub kind: AdapterKind,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub sampling: SamplingOptions,
    pub fallback_policy: FallbackPolicy,
}

impl AdapterConfig {
    pub fn from_args(args: &AdapterArgs) -> Self {
        Self {
            kind: args.adapter,
            endpoint: resolve_setting(args.endpoint.as_deref(), ENDPOINT_ENV, DEFAULT_OLLAMA_ENDPOINT),
            model: resolve_setting(args.model.as_deref(), MODEL_ENV, DEFAULT_MODEL),
            timeout_secs: args.timeout_secs,
            sampling: SamplingOptions::default(),
            fallback_policy: args.fallback_policy,
        }
    }

    pub fn fallback_only() -> Self {
        Self {
            kind: AdapterKind::Fallback,
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 0,
            sampling: SamplingOptions::default(),
            fallback_policy: FallbackPolicy::Substitute,
        }
    }
}

/// Flag wins over environment, environment wins over the built-in default.
fn resolve_setting(flag: Option<&str>, env_key: &str, default: &str) -> String {
    if let Some(value) = flag.map(str::trim).filter(|value| !value.is_empty()) {
        return value.to_string();
    }
    std::env::var(env_key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: ArtifactPaths,
    pub source: PathBuf,
    pub batch_size: usize,
    pub force_resegment: bool,
    pub adapter: AdapterConfig,
}

impl PipelineConfig {
    pub fn from_run_args(args: &RunArgs) -> Self {
        Self {
            paths: ArtifactPaths::new(&args.workspace),
            source: args.source.clone(),
            batch_size: args.batch_size,
            force_resegment: args.force_resegment,
            adapter: AdapterConfig::from_args(&args.adapter),
        }
    }
}
