use crate::ValidateTreeError;

use bstr::ByteSlice;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display};

/// A wrapper type for symlink targets.
/// Internally uses a [bytes::Bytes], but disallows empty targets and those
/// containing null bytes.
#[repr(transparent)]
#[derive(Clone, PartialEq, Eq)]
pub struct SymlinkTarget {
    inner: bytes::Bytes,
}

impl AsRef<[u8]> for SymlinkTarget {
    fn as_ref(&self) -> &[u8] {
        self.inner.as_ref()
    }
}

impl From<SymlinkTarget> for bytes::Bytes {
    fn from(value: SymlinkTarget) -> Self {
        value.inner
    }
}

fn is_valid_target(target: &[u8]) -> bool {
    !target.is_empty() && !target.contains(&b'\0')
}

impl TryFrom<bytes::Bytes> for SymlinkTarget {
    type Error = ValidateTreeError;

    fn try_from(value: bytes::Bytes) -> Result<Self, Self::Error> {
        if !is_valid_target(&value) {
            return Err(ValidateTreeError::InvalidSymlinkTarget(value));
        }

        Ok(Self { inner: value })
    }
}

impl TryFrom<&str> for SymlinkTarget {
    type Error = ValidateTreeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        bytes::Bytes::copy_from_slice(value.as_bytes()).try_into()
    }
}

impl Debug for SymlinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(self.inner.as_bstr(), f)
    }
}

impl Display for SymlinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self.inner.as_bstr(), f)
    }
}

// Targets are stored as strings, lossily for non-UTF8 targets.
impl Serialize for SymlinkTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner.to_str_lossy())
    }
}

impl<'de> Deserialize<'de> for SymlinkTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        bytes::Bytes::from(s.into_bytes())
            .try_into()
            .map_err(serde::de::Error::custom)
    }
}
