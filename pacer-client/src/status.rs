//! Outcome status taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a finished remote call.
///
/// Every status falls in exactly one of three groups: ok
/// ([`is_ok`](Self::is_ok)), worth retrying later
/// ([`needs_retry`](Self::needs_retry)) or permanent
/// ([`is_permanent`](Self::is_permanent)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The call did what was asked
    #[serde(rename = "SUCCESS")]
    Success,
    /// Nothing had to be done
    #[serde(rename = "NOTNEEDED")]
    NotNeeded,
    /// The target does not exist (yet)
    #[serde(rename = "NOTFOUND")]
    NotFound,
    /// Server or transport failure
    #[serde(rename = "ERROR")]
    Error,
    /// The exchange was cut short
    #[serde(rename = "ABORTED")]
    Aborted,
    /// Not permitted
    #[serde(rename = "DENIED")]
    Denied,
    /// Rejected as malformed
    #[serde(rename = "INVALID")]
    Invalid,
    /// The call could not be made at all
    #[serde(rename = "FATAL_ERROR")]
    FatalError,
}

impl Status {
    /// All statuses.
    pub const ALL: [Status; 8] = [
        Status::Success,
        Status::NotNeeded,
        Status::NotFound,
        Status::Error,
        Status::Aborted,
        Status::Denied,
        Status::Invalid,
        Status::FatalError,
    ];

    /// `SUCCESS` or `NOTNEEDED`.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Success | Self::NotNeeded)
    }

    /// `NOTFOUND`, `ERROR` or `ABORTED`.
    pub fn needs_retry(self) -> bool {
        matches!(self, Self::NotFound | Self::Error | Self::Aborted)
    }

    /// `DENIED`, `INVALID` or `FATAL_ERROR`.
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::Denied | Self::Invalid | Self::FatalError)
    }

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::NotNeeded => "NOTNEEDED",
            Self::NotFound => "NOTFOUND",
            Self::Error => "ERROR",
            Self::Aborted => "ABORTED",
            Self::Denied => "DENIED",
            Self::Invalid => "INVALID",
            Self::FatalError => "FATAL_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
