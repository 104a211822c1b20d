//! Deterministic data model shared by the write and verification paths.
//!
//! Every row written by the harness is a pure function of its primary key,
//! so a select can be checked without remembering what was inserted.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{BenchError, Result};

/// Which statements a worker issues for every key it claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Insert every key.
    Inserts,
    /// Select and verify every key; the table must already be populated.
    Selects,
    /// Insert every key, then immediately select and verify it.
    Mixed,
}

impl Workload {
    /// Whether this workload writes rows.
    pub fn inserts(self) -> bool {
        matches!(self, Workload::Inserts | Workload::Mixed)
    }

    /// Whether this workload reads and verifies rows.
    pub fn selects(self) -> bool {
        matches!(self, Workload::Selects | Workload::Mixed)
    }

    /// Requests issued per key.
    pub fn requests_per_key(self) -> u64 {
        u64::from(self.inserts()) + u64::from(self.selects())
    }

    /// Lowercase name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Workload::Inserts => "inserts",
            Workload::Selects => "selects",
            Workload::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workload {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inserts" => Ok(Workload::Inserts),
            "selects" => Ok(Workload::Selects),
            "mixed" => Ok(Workload::Mixed),
            other => Err(BenchError::InvalidConfig(format!(
                "invalid workload type '{other}' (expected inserts, selects or mixed)"
            ))),
        }
    }
}

/// One row of `benchks.benchtab`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Primary key.
    pub pk: i64,
    /// Always `2 * pk`.
    pub v1: i64,
    /// Always `3 * pk`.
    pub v2: i64,
}

impl Record {
    /// Builds the record the harness writes for `pk`.
    pub fn for_key(pk: i64) -> Self {
        let (v1, v2) = expected_values(pk);
        Self { pk, v1, v2 }
    }
}

/// `(v1, v2)` expected for `pk`.
///
/// Wrapping arithmetic keeps the mapping total over the whole key space; the
/// store sees the same bits the verifier compares against.
pub fn expected_values(pk: i64) -> (i64, i64) {
    (pk.wrapping_mul(2), pk.wrapping_mul(3))
}

/// Checks a row read back for `pk`.
pub fn verify(pk: i64, observed: Option<(i64, i64)>) -> Result<()> {
    let expected = expected_values(pk);
    match observed {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(BenchError::DataIntegrity {
            pk,
            expected,
            actual,
        }),
        None => Err(BenchError::MissingRow { pk }),
    }
}
