use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do with entries already present in the target directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwriteBehavior {
    /// Always replace existing entries.
    Always,
    /// Replace files whose size or modification time differ.
    /// Content of files matching both is trusted and not rewritten.
    #[default]
    IfChanged,
    /// Replace entries only if the snapshot has a strictly newer modification time.
    IfNewer,
    /// Never touch existing entries.
    Never,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid overwrite behavior {0:?}, expected one of always, if-changed, if-newer, never")]
pub struct InvalidOverwriteBehavior(String);

impl FromStr for OverwriteBehavior {
    type Err = InvalidOverwriteBehavior;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "if-changed" => Ok(Self::IfChanged),
            "if-newer" => Ok(Self::IfNewer),
            "never" => Ok(Self::Never),
            other => Err(InvalidOverwriteBehavior(other.to_string())),
        }
    }
}

impl fmt::Display for OverwriteBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::IfChanged => "if-changed",
            Self::IfNewer => "if-newer",
            Self::Never => "never",
        })
    }
}

fn default_verify_workers() -> usize {
    4
}

/// Options bound to one [crate::Restorer].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Write runs of zeros as holes.
    pub sparse: bool,
    pub overwrite: OverwriteBehavior,
    /// Number of files checked concurrently by [crate::Restorer::verify_files].
    #[serde(default = "default_verify_workers")]
    pub verify_workers: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sparse: false,
            overwrite: OverwriteBehavior::default(),
            verify_workers: default_verify_workers(),
        }
    }
}
