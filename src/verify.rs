//! Transcript verifier
//!
//! Compares captured outputs to the expected transcript position by
//! position using exact string equality. Entries present on one side only
//! are mismatches too.

use std::fmt;

use serde::Serialize;

use crate::common::{Error, Result};

/// One position where the transcripts differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    /// None when the session produced fewer outputs than expected
    pub captured: Option<String>,
    /// None when the session produced more outputs than expected
    pub expected: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |text: &Option<String>| match text {
            Some(t) => format!("{:?}", t),
            None => "<missing>".to_string(),
        };
        write!(
            f,
            "index {}: expected {}, got {}",
            self.index,
            show(&self.expected),
            show(&self.captured)
        )
    }
}

impl From<Mismatch> for Error {
    fn from(m: Mismatch) -> Self {
        Error::Mismatch {
            index: m.index,
            captured: m.captured,
            expected: m.expected,
        }
    }
}

/// Outcome of comparing two transcripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "mismatches", rename_all = "snake_case")]
pub enum VerificationResult {
    AllMatched,
    Mismatches(Vec<Mismatch>),
}

impl VerificationResult {
    pub fn is_match(&self) -> bool {
        matches!(self, VerificationResult::AllMatched)
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        match self {
            VerificationResult::AllMatched => &[],
            VerificationResult::Mismatches(m) => m,
        }
    }
}

/// Positions where `captured` and `expected` differ, lazily
fn differences<'a, C, E>(
    captured: &'a [C],
    expected: &'a [E],
) -> impl Iterator<Item = Mismatch> + 'a
where
    C: AsRef<str>,
    E: AsRef<str>,
{
    let len = captured.len().max(expected.len());
    (0..len).filter_map(move |index| {
        let got = captured.get(index).map(AsRef::as_ref);
        let want = expected.get(index).map(AsRef::as_ref);
        (got != want).then(|| Mismatch {
            index,
            captured: got.map(str::to_string),
            expected: want.map(str::to_string),
        })
    })
}

/// Compare transcripts and report every mismatch
pub fn verify<C, E>(captured: &[C], expected: &[E]) -> VerificationResult
where
    C: AsRef<str>,
    E: AsRef<str>,
{
    let mismatches: Vec<Mismatch> = differences(captured, expected).collect();
    if mismatches.is_empty() {
        VerificationResult::AllMatched
    } else {
        VerificationResult::Mismatches(mismatches)
    }
}

/// Compare transcripts and fail on the first mismatch
pub fn verify_strict<C, E>(captured: &[C], expected: &[E]) -> Result<()>
where
    C: AsRef<str>,
    E: AsRef<str>,
{
    match differences(captured, expected).next() {
        Some(mismatch) => Err(mismatch.into()),
        None => Ok(()),
    }
}
