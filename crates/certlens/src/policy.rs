//! What a listing does when one domain fails to hydrate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handling of per-domain errors during a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainErrorPolicy {
    /// Log the error and leave the domain out.
    #[default]
    LogAndSkip,
    /// Log the error and keep the domain with `valid = false`.
    CollectAsInvalid,
    /// Fail the whole listing on the first error.
    Abort,
}

impl DomainErrorPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LogAndSkip => "log-and-skip",
            Self::CollectAsInvalid => "collect-as-invalid",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for DomainErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log-and-skip" | "skip" => Ok(Self::LogAndSkip),
            "collect-as-invalid" | "collect" => Ok(Self::CollectAsInvalid),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown domain error policy '{other}' (expected log-and-skip, collect-as-invalid or abort)"
            )),
        }
    }
}
