//! # Proving Backends
//!
//! A backend is one proving/verification algorithm for the compiled
//! circuit. Selection happens twice: once when the prover is created
//! (which backends to prepare) and once per call (which prepared backend
//! to use).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A supported proving backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// UltraHonk.
    Honk,
    /// UltraPlonk.
    Plonk,
}

impl BackendId {
    /// Every supported backend, in preparation order.
    pub const ALL: [BackendId; 2] = [BackendId::Honk, BackendId::Plonk];

    /// Lowercase tag, as used on the command line and in proofs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Honk => "honk",
            Self::Plonk => "plonk",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized backend tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend \"{0}\" (expected honk or plonk)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendId {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "honk" => Ok(Self::Honk),
            "plonk" => Ok(Self::Plonk),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Which backends a prover prepares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// Exactly one backend.
    Single(BackendId),
    /// Every supported backend.
    All,
}

impl BackendSelection {
    /// The backends this selection covers.
    pub fn backends(self) -> Vec<BackendId> {
        match self {
            Self::Single(id) => vec![id],
            Self::All => BackendId::ALL.to_vec(),
        }
    }

    /// Returns true if `backend` is covered.
    pub fn includes(self, backend: BackendId) -> bool {
        match self {
            Self::Single(id) => id == backend,
            Self::All => true,
        }
    }
}

impl FromStr for BackendSelection {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Single)
        }
    }
}
