//! Persisted sample records and their plain-text rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::sampler::SampleRequest;

const VALUES_PER_LINE: usize = 10;

/// Everything needed to publish a sample and to let anyone recompute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Free-form description of the election; not an input to sampling.
    pub election_id: String,
    #[serde(flatten)]
    pub request: SampleRequest,
    pub old: Vec<i64>,
    pub new: Vec<i64>,
}

impl SampleRecord {
    pub fn generate(election_id: impl Into<String>, request: SampleRequest) -> AuditResult<Self> {
        let sample = request.execute()?;
        Ok(Self {
            election_id: election_id.into(),
            request,
            old: sample.old,
            new: sample.new,
        })
    }

    /// Recompute the sample from the recorded parameters and compare.
    ///
    /// The published list lengths are checked against the request first, so
    /// a record declaring an enormous `n` is rejected without sampling.
    pub fn verify(&self) -> AuditResult<()> {
        let published = self.old.len() as u128 + self.new.len() as u128;
        if self.old.len() != self.request.skip || published != self.request.n as u128 {
            return Err(AuditError::SampleMismatch(format!(
                "request declares {} entries ({} previous), published {} ({} previous)",
                self.request.n,
                self.request.skip,
                published,
                self.old.len()
            )));
        }
        let sample = self.request.execute()?;
        if sample.old != self.old {
            return Err(AuditError::SampleMismatch(first_difference(
                "previous sample",
                &sample.old,
                &self.old,
            )));
        }
        if sample.new != self.new {
            return Err(AuditError::SampleMismatch(first_difference(
                "new elements",
                &sample.new,
                &self.new,
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> AuditResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(payload: &str) -> AuditResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

fn first_difference(section: &str, expected: &[i64], published: &[i64]) -> String {
    if expected.len() != published.len() {
        return format!(
            "{section}: expected {} entries, published {}",
            expected.len(),
            published.len()
        );
    }
    expected
        .iter()
        .zip(published)
        .position(|(e, p)| e != p)
        .map(|i| {
            format!(
                "{section}: position {i} expected {}, published {}",
                expected[i], published[i]
            )
        })
        .unwrap_or_else(|| format!("{section}: lists differ"))
}

/// Values right-aligned in columns, ten per line.
pub fn format_columns(values: &[i64]) -> String {
    let mut out = String::new();
    for row in values.chunks(VALUES_PER_LINE) {
        out.push_str("    ");
        for value in row {
            let _ = write!(out, "{value:>7}, ");
        }
        out.push('\n');
    }
    out
}

pub fn render_sample_report(record: &SampleRecord) -> String {
    let request = &record.request;
    let mut out = String::new();
    out.push_str("SAMPLER output.\n\n");
    let _ = writeln!(out, "Election ID: {}", record.election_id);
    let _ = writeln!(
        out,
        "Sample range: a = {} to b = {} (inclusive)",
        request.a, request.b
    );
    if request.with_replacement {
        out.push_str("Duplicates allowed (sampling with replacement).\n");
    } else {
        out.push_str("Duplicates not allowed (sampling without replacement).\n");
    }
    let _ = writeln!(out, "Seed: {}", request.seed);

    let mut sorted_old = record.old.clone();
    sorted_old.sort_unstable();
    let mut sorted_new = record.new.clone();
    sorted_new.sort_unstable();

    if request.skip == 0 {
        let _ = writeln!(out, "Sample of size: n = {}", request.n);
        out.push_str("Sorted output list:\n");
        out.push_str(&format_columns(&sorted_new));
        out.push('\n');
    } else {
        let _ = writeln!(out, "Previous sample of size {}", request.skip);
        out.push_str(&format_columns(&sorted_old));
        out.push('\n');
        let _ = writeln!(
            out,
            "New elements in expanded sample ({} of them)",
            record.new.len()
        );
        out.push_str(&format_columns(&sorted_new));
        out.push('\n');
    }
    out.push_str("Done.\n");
    out
}
