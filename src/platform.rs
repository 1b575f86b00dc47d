// src/platform.rs

//! Target platform identity
//!
//! The platform is resolved once at the start of a run and then passed
//! around by value. Only one question is ever asked of it by the recipe:
//! "is this the Linux family?"

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platforms the recipe distinguishes between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    /// Any other host (BSDs, Windows, ...)
    Other,
}

impl Platform {
    /// Detect the platform we are running on
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }

    pub fn is_linux(&self) -> bool {
        matches!(self, Self::Linux)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Other => "other",
        }
    }

    /// Environment variable the dynamic loader searches for shared libraries
    pub fn library_path_var(&self) -> &'static str {
        match self {
            Self::MacOs => "DYLD_LIBRARY_PATH",
            Self::Linux | Self::Other => "LD_LIBRARY_PATH",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" | "osx" => Ok(Self::MacOs),
            "other" => Ok(Self::Other),
            _ => Err(Error::ParseError(format!("Unknown platform: {}", s))),
        }
    }
}
