// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and rla-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ballot-polling (BRAVO) risk level and expected sample number.
//!
//! Degenerate statistics never fail: an empty pair reports risk `1.0`, a
//! saturated vote share reports `NaN` and an exact tie needs a full hand
//! count. Only malformed inputs (negative counts, a risk limit outside
//! `(0, 1)`) are errors.

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};

/// Risk level of the reported outcome for one winner/loser pair.
///
/// `s = W / (W + L)`, `log T = w (ln s - ln 0.5) + l (ln(1 - s) - ln 0.5)`,
/// risk `= min(1, exp(-log T))`, evaluated in log space so large observation
/// counts cannot overflow.
pub fn risk_level(
    winner_votes: u64,
    loser_votes: u64,
    winner_observed: u64,
    loser_observed: u64,
) -> f64 {
    let total = winner_votes as f64 + loser_votes as f64;
    if total == 0.0 {
        return 1.0;
    }
    let share = winner_votes as f64 / total;
    if share <= 0.0 || share >= 1.0 {
        return f64::NAN;
    }

    let half = 0.5_f64.ln();
    let log_t = winner_observed as f64 * (share.ln() - half)
        + loser_observed as f64 * ((1.0 - share).ln() - half);
    (-log_t).exp().min(1.0)
}

/// [`risk_level`] for signed inputs as they arrive from tally exports.
pub fn checked_risk_level(
    winner_votes: i64,
    loser_votes: i64,
    winner_observed: i64,
    loser_observed: i64,
) -> AuditResult<f64> {
    Ok(risk_level(
        non_negative("winner votes", winner_votes)?,
        non_negative("loser votes", loser_votes)?,
        non_negative("winner observations", winner_observed)?,
        non_negative("loser observations", loser_observed)?,
    ))
}

pub(crate) fn non_negative(field: &'static str, value: i64) -> AuditResult<u64> {
    u64::try_from(value).map_err(|_| AuditError::NegativeCount { field, value })
}

pub fn validate_risk_limit(risk_limit: f64) -> AuditResult<f64> {
    if !(risk_limit > 0.0 && risk_limit < 1.0) {
        return Err(AuditError::InvalidRiskLimit(risk_limit));
    }
    Ok(risk_limit)
}

/// Estimated number of further ballot draws.
///
/// Ordered so that every finite estimate is below [`SampleSize::FullCount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleSize {
    Draws(u64),
    /// No finite number of draws suffices; the contest needs a hand count.
    FullCount,
}

impl SampleSize {
    pub fn is_full_count(&self) -> bool {
        matches!(self, Self::FullCount)
    }

    pub fn draws(&self) -> Option<u64> {
        match self {
            Self::Draws(n) => Some(*n),
            Self::FullCount => None,
        }
    }

    /// Concrete draw count for the next sampler call; a full count (or any
    /// estimate beyond the population) becomes the population size.
    pub fn capped(&self, population: u64) -> u64 {
        match self {
            Self::Draws(n) => (*n).min(population),
            Self::FullCount => population,
        }
    }
}

impl std::fmt::Display for SampleSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draws(n) => write!(f, "{n}"),
            Self::FullCount => f.write_str("full count"),
        }
    }
}

/// BRAVO expected sample number (ASN) still needed to bring `current_risk`
/// below `risk_limit` when the true margin equals the reported `margin`.
///
/// With `m = |margin|`, `z_w = ln(1 + m)`, `z_l = ln(1 - m)`:
/// `ceil((ln(current_risk / risk_limit) + z_w / 2) / ((1 + m)/2 z_w + (1 - m)/2 z_l))`.
/// A fresh audit passes `current_risk = 1.0`.
pub fn find_asn(risk_limit: f64, margin: f64, current_risk: f64) -> AuditResult<SampleSize> {
    validate_risk_limit(risk_limit)?;

    let current_risk = if current_risk.is_nan() {
        1.0
    } else {
        current_risk
    };
    if current_risk <= risk_limit {
        return Ok(SampleSize::Draws(0));
    }

    let m = margin.abs();
    if m.is_nan() || m == 0.0 {
        return Ok(SampleSize::FullCount);
    }
    let m = m.min(1.0);

    let p_w = (1.0 + m) / 2.0;
    let p_l = (1.0 - m) / 2.0;
    let z_w = (1.0 + m).ln();
    let loser_term = if p_l > 0.0 { p_l * (1.0 - m).ln() } else { 0.0 };
    let drift = p_w * z_w + loser_term;
    if !(drift > 0.0) {
        return Ok(SampleSize::FullCount);
    }

    let asn = ((current_risk / risk_limit).ln() + z_w / 2.0) / drift;
    if !asn.is_finite() || asn >= u64::MAX as f64 {
        return Ok(SampleSize::FullCount);
    }
    Ok(SampleSize::Draws(asn.ceil().max(0.0) as u64))
}
