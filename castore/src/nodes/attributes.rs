use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time with nanosecond precision, relative to the unix epoch.
/// `nanos` is always in `0..1_000_000_000`, also for times before the epoch.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs + (nanos / NANOS_PER_SEC) as i64,
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    pub fn now() -> Self {
        SystemTime::now().into()
    }

    /// Returns a timestamp shifted by the given amount of seconds.
    pub fn add_secs(self, secs: i64) -> Self {
        Self {
            secs: self.secs + secs,
            ..self
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(value: SystemTime) -> Self {
        match value.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                if d.subsec_nanos() == 0 {
                    Self::new(-(d.as_secs() as i64), 0)
                } else {
                    Self::new(
                        -(d.as_secs() as i64) - 1,
                        NANOS_PER_SEC - d.subsec_nanos(),
                    )
                }
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(value: Timestamp) -> Self {
        if value.secs >= 0 {
            UNIX_EPOCH + Duration::new(value.secs as u64, value.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(value.secs.unsigned_abs())
                + Duration::from_nanos(value.nanos as u64)
        }
    }
}

/// Attributes some operating systems keep outside of the permission bits.
/// They are carried through snapshots unchanged; restoring them is platform
/// specific.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAttributes {
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub encrypted: bool,
}

impl GenericAttributes {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAttribute {
    pub name: String,
    pub value: Vec<u8>,
}

/// Metadata shared by all node types.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Permission bits, including setuid/setgid/sticky.
    pub mode: u32,
    pub mtime: Timestamp,
    /// If not recorded, the modification time is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<Timestamp>,
    pub uid: u32,
    pub gid: u32,
    #[serde(default, skip_serializing_if = "GenericAttributes::is_empty")]
    pub generic: GenericAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xattrs: Vec<ExtendedAttribute>,
}

impl Attributes {
    pub fn with_mode(mode: u32) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mtime(mut self, mtime: Timestamp) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn atime(&self) -> Timestamp {
        self.atime.unwrap_or(self.mtime)
    }
}
