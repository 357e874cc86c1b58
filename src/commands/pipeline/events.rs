use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc_string(),
            level,
            message: message.into(),
        }
    }
}

/// Messages the worker appends and the supervisor drains.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Log(LogLine),
    Snapshot(RunState),
}
