use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures that stop the harness from producing a verdict for a fixture.
///
/// Case-level problems (mismatches, malformed tails, a dead analyzer during replay)
/// are not errors; they are recorded as failed cases, see [`crate::types::Outcome`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("could not start analyzer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("analyzer did not report Ready within {} s for {}", .timeout.as_secs_f32(), .source_file.display())]
    PreparationTimeout {
        source_file: PathBuf,
        timeout: Duration,
    },

    #[error("analyzer closed its output before reporting Ready for {}", .source_file.display())]
    PreparationCrash { source_file: PathBuf },

    #[error("could not read fixture {}: {reason}", .path.display())]
    FixtureRead { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether the analyzer itself failed during startup.
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            HarnessError::PreparationTimeout { .. } | HarnessError::PreparationCrash { .. }
        )
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
