use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub const DEFAULT_WORKSPACE: &str = ".cache/zeroloss";
pub const DEFAULT_BATCH_SIZE: usize = 15;

#[derive(Parser, Debug)]
#[command(
    name = "zeroloss",
    version,
    about = "Zero-loss narrative segmentation, annotation verification and gap audit"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a source text into uniquely addressable units.
    Segment(SegmentArgs),
    /// Partition the unit set into instruction batches.
    Batch(BatchArgs),
    /// Send batches through the annotation adapter and verify each response.
    Process(ProcessArgs),
    /// Verify a saved response for one batch.
    Verify(VerifyArgs),
    /// Merge accepted batch results into the master record.
    Merge(MergeArgs),
    /// Diff the master record against the unit set.
    Audit(AuditArgs),
    /// Run every stage in order under a supervised worker.
    Run(RunArgs),
    /// Ask a running pipeline to stop at its next checkpoint.
    Cancel(CancelArgs),
    /// Summarize the persisted run state and artifacts.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub source: PathBuf,

    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Print the instruction payload of one batch after batching.
    #[arg(long)]
    pub show: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum AdapterKind {
    Ollama,
    Fallback,
}

impl AdapterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FallbackPolicy {
    /// Replace a failed response with the deterministic fallback table.
    Substitute,
    /// Keep the failure and verify an empty response.
    Record,
}

impl FallbackPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substitute => "substitute",
            Self::Record => "record",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AdapterArgs {
    #[arg(long, value_enum, default_value_t = AdapterKind::Ollama)]
    pub adapter: AdapterKind,

    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::Substitute)]
    pub fallback_policy: FallbackPolicy,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[command(flatten)]
    pub adapter: AdapterArgs,

    #[arg(long = "only")]
    pub only: Vec<String>,

    #[arg(long, default_value_t = false)]
    pub skip_accepted: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub batch: String,

    #[arg(long)]
    pub response: PathBuf,

    /// Write the result document into the results directory.
    #[arg(long, default_value_t = false)]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,

    #[arg(long)]
    pub source: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, default_value_t = false)]
    pub force_resegment: bool,

    #[command(flatten)]
    pub adapter: AdapterArgs,

    #[arg(long, default_value_t = 250)]
    pub poll_interval_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CancelArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,
}
