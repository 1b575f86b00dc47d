// src/error.rs

//! Error types for the SFML kitchen
//!
//! Every failure is terminal for the run. Errors fall into three kinds
//! that callers can tell apart with [`Error::kind`]:
//! - **Precondition**: a dependency or an expected source layout element is
//!   missing, or the build directory cannot be used
//! - **Stage**: a build sub-process exited non-zero (or could not run at all)
//! - **Verification**: the smoke test failed to compile, link or run

use crate::recipe::kitchen::pipeline::Stage;
use crate::recipe::kitchen::verify::VerifyStep;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the kitchen
#[derive(Error, Debug)]
pub enum Error {
    /// One or more declared dependencies could not be satisfied
    #[error("Unresolved dependencies: {}", .0.join(", "))]
    UnresolvedDependencies(Vec<String>),

    /// The extracted source tree does not look the way the recipe expects
    #[error("Unexpected source layout at {}: {}", .path.display(), .reason)]
    SourceLayout { path: PathBuf, reason: String },

    /// The requested build directory cannot be used for a fresh build
    #[error("Unusable build directory {}: {}", .path.display(), .reason)]
    BuildDirectory { path: PathBuf, reason: String },

    /// A build stage sub-process failed
    #[error("{stage} stage failed ({status})\n{output}")]
    StageFailed {
        stage: Stage,
        status: ExitCode,
        output: String,
    },

    /// The smoke test failed
    #[error("Verification failed at {step} ({status})\n{output}")]
    VerificationFailed {
        step: VerifyStep,
        status: ExitCode,
        output: String,
    },

    /// A sub-process could not be started
    #[error("Failed to run '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// A sub-process exceeded its time budget and was killed
    #[error("'{program}' timed out after {seconds} seconds\n{output}")]
    Timeout {
        program: String,
        seconds: u64,
        /// Tail of what the process printed before it was killed
        output: String,
    },

    /// A pipeline stage was requested out of order
    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Stage,
    Verification,
    Internal,
}

impl Error {
    /// Which part of the taxonomy this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedDependencies(_)
            | Self::SourceLayout { .. }
            | Self::BuildDirectory { .. } => ErrorKind::Precondition,
            Self::StageFailed { .. } => ErrorKind::Stage,
            Self::VerificationFailed { .. } => ErrorKind::Verification,
            _ => ErrorKind::Internal,
        }
    }

    /// The pipeline stage this error was detected in, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            Self::VerificationFailed { .. } => Some(Stage::Verify),
            _ => None,
        }
    }
}

/// Exit status of a finished (or killed) sub-process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Process exited with this code
    Code(i32),
    /// Process was terminated by a signal or never produced a status
    Unknown,
}

impl ExitCode {
    pub fn from_code(code: Option<i32>) -> Self {
        code.map_or(Self::Unknown, Self::Code)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Unknown => write!(f, "no exit code"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::UnresolvedDependencies(vec!["flac".to_string()]).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::SourceLayout {
                path: PathBuf::from("extlibs"),
                reason: "missing".to_string(),
            }
            .kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::BuildDirectory {
                path: PathBuf::from("build"),
                reason: "not empty".to_string(),
            }
            .kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::StageFailed {
                stage: Stage::Docs,
                status: ExitCode::Code(2),
                output: String::new(),
            }
            .kind(),
            ErrorKind::Stage
        );
        assert_eq!(Error::ParseError("x".to_string()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_stage() {
        let err = Error::StageFailed {
            stage: Stage::Install,
            status: ExitCode::Code(1),
            output: String::new(),
        };
        assert_eq!(err.stage(), Some(Stage::Install));

        let err = Error::VerificationFailed {
            step: VerifyStep::Run,
            status: ExitCode::Code(3),
            output: String::new(),
        };
        assert_eq!(err.stage(), Some(Stage::Verify));
        assert_eq!(Error::NotFound("x".to_string()).stage(), None);
    }

    #[test]
    fn test_stage_failure_message_names_stage() {
        let err = Error::StageFailed {
            stage: Stage::Configure,
            status: ExitCode::Code(2),
            output: "CMake Error: boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configure"));
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("CMake Error: boom"));
    }

    #[test]
    fn test_unresolved_message_lists_names() {
        let err = Error::UnresolvedDependencies(vec!["flac".to_string(), "mesa".to_string()]);
        assert_eq!(err.to_string(), "Unresolved dependencies: flac, mesa");
    }
}
