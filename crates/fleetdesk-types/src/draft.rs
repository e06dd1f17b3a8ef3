//! Draft snapshot shape used for resume-later persistence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::progress::ProgressState;

/// Current schema version of serialized snapshots.
///
/// Bump when the shape of `AgreementData`, `ReservationData` or
/// `ProgressState` changes incompatibly.
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

/// Which builder produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderKind {
    Agreement,
    Reservation,
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderKind::Agreement => write!(f, "agreement"),
            BuilderKind::Reservation => write!(f, "reservation"),
        }
    }
}

impl FromStr for BuilderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreement" => Ok(BuilderKind::Agreement),
            "reservation" => Ok(BuilderKind::Reservation),
            other => Err(format!("unknown builder kind: '{other}'")),
        }
    }
}

/// Serialized `{ wizardData, progress }` snapshot.
///
/// Plain JSON: dates are RFC 3339 strings, money amounts decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot<D> {
    pub wizard_data: D,
    pub progress: ProgressState,
}
