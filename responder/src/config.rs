//! Runtime configuration loaded from environment variables.

use crate::errors::ResponderError;
use crate::threshold::ThresholdTable;
use std::str::FromStr;

/// How many chunks each document may contribute relative to the requested
/// item count. `Total` removes the per-document limit entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeedOrAccuracy {
    Speed,
    #[default]
    Balanced,
    Accuracy,
    Total,
}

impl SpeedOrAccuracy {
    /// Multiplier applied to `number_of_items * workers_per_request`;
    /// `None` means unlimited.
    pub fn coefficient(self) -> Option<f32> {
        match self {
            Self::Speed => Some(0.25),
            Self::Balanced => Some(1.0),
            Self::Accuracy => Some(4.0),
            Self::Total => None,
        }
    }
}

impl FromStr for SpeedOrAccuracy {
    type Err = ResponderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "speed" => Ok(Self::Speed),
            "balanced" => Ok(Self::Balanced),
            "accuracy" => Ok(Self::Accuracy),
            "total" => Ok(Self::Total),
            other => Err(ResponderError::InvalidConfig(format!(
                "unknown speed/accuracy mode: {other}"
            ))),
        }
    }
}

/// Executor selection and sizing. Validated on construction so a bad
/// deployment fails at startup, not mid-request.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Fan-out width per request; also the cluster dispatch bound.
    pub workers_per_request: usize,
    /// Dispatch batches to a remote worker pool instead of running inline.
    pub distributed: bool,
    /// `host:port` of the remote scheduler; used only in distributed mode.
    pub scheduler_addr: String,
    /// Per-dispatch HTTP timeout in seconds.
    pub dispatch_timeout_secs: u64,
}

impl ExecutorConfig {
    pub fn new(
        workers_per_request: usize,
        distributed: bool,
        scheduler_addr: String,
        dispatch_timeout_secs: u64,
    ) -> Result<Self, ResponderError> {
        if workers_per_request == 0 {
            return Err(ResponderError::InvalidConfig(
                "workers_per_request must be at least 1".to_string(),
            ));
        }
        if distributed && scheduler_addr.trim().is_empty() {
            return Err(ResponderError::InvalidConfig(
                "distributed mode requires a scheduler address".to_string(),
            ));
        }
        Ok(Self {
            workers_per_request,
            distributed,
            scheduler_addr,
            dispatch_timeout_secs,
        })
    }
}

/// Config bag for the responder. All fields have defaults via `from_env`.
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    pub executor: ExecutorConfig,
    /// Default per-request mode; a request may override it.
    pub speed_or_accuracy: SpeedOrAccuracy,
    pub saved_reply_thresholds: ThresholdTable,
    pub document_thresholds: ThresholdTable,
}

impl ResponderConfig {
    /// Build from `RESPONDER_*` environment variables with defaults.
    pub fn from_env() -> Result<Self, ResponderError> {
        let executor = ExecutorConfig::new(
            parse("RESPONDER_WORKERS_PER_REQUEST", 8usize),
            env("RESPONDER_DISTRIBUTED", "false") == "true",
            env("RESPONDER_SCHEDULER_ADDR", "127.0.0.1:8786"),
            parse("RESPONDER_DISPATCH_TIMEOUT_SECS", 60u64),
        )?;
        let speed_or_accuracy = env("RESPONDER_SPEED_OR_ACCURACY", "balanced").parse()?;
        Ok(Self {
            executor,
            speed_or_accuracy,
            saved_reply_thresholds: ThresholdTable::saved_reply_defaults(),
            document_thresholds: ThresholdTable::document_defaults(),
        })
    }

    /// Defaults without touching the environment; handy for tests and
    /// embedded callers.
    pub fn with_executor(executor: ExecutorConfig) -> Self {
        Self {
            executor,
            speed_or_accuracy: SpeedOrAccuracy::default(),
            saved_reply_thresholds: ThresholdTable::saved_reply_defaults(),
            document_thresholds: ThresholdTable::document_defaults(),
        }
    }

    /// Per-document chunk budget for a request, `None` when unlimited.
    pub fn chunk_limit_per_doc(
        &self,
        number_of_items: usize,
        mode: Option<SpeedOrAccuracy>,
    ) -> Option<usize> {
        let mode = mode.unwrap_or(self.speed_or_accuracy);
        mode.coefficient().map(|coef| {
            let raw = number_of_items as f32 * self.executor.workers_per_request as f32 * coef;
            (raw.ceil() as usize).max(1)
        })
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(dflt)
}
