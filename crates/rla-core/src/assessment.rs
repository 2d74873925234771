//! Per-contest risk aggregation and the batch report over many contests.
//!
//! A contest is confirmed only when every winner/loser pair and the
//! outright-majority pair are at or below the risk limit. A degenerate pair
//! makes its contest `Undetermined` without stopping the batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AuditConfig;
use crate::contest::{checked_total, Contest, ContestOutcome};
use crate::error::AuditResult;
use crate::risk::{find_asn, risk_level, SampleSize};

/// Name used for the pooled side of the outright-majority test.
pub const POOL_LABEL: &str = "(all other choices)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairKind {
    /// A reported winner against a reported loser.
    Pairwise,
    /// The top choice against every other choice pooled together.
    Majority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub kind: PairKind,
    pub winner: String,
    pub loser: String,
    pub winner_votes: u64,
    pub loser_votes: u64,
    pub winner_observed: u64,
    pub loser_observed: u64,
    /// `(winner_votes - loser_votes) / votes cast in the contest`.
    pub margin: f64,
    pub risk: f64,
    pub estimated_sample_size: SampleSize,
}

struct Side<'a> {
    name: &'a str,
    votes: u64,
    observed: u64,
}

impl RiskRecord {
    fn evaluate(
        kind: PairKind,
        winner: Side<'_>,
        loser: Side<'_>,
        voted_ballots: u64,
        risk_limit: f64,
    ) -> AuditResult<Self> {
        let risk = risk_level(winner.votes, loser.votes, winner.observed, loser.observed);
        let margin = if voted_ballots == 0 {
            f64::NAN
        } else {
            (winner.votes as f64 - loser.votes as f64) / voted_ballots as f64
        };
        Ok(Self {
            kind,
            winner: winner.name.to_string(),
            loser: loser.name.to_string(),
            winner_votes: winner.votes,
            loser_votes: loser.votes,
            winner_observed: winner.observed,
            loser_observed: loser.observed,
            margin,
            risk,
            estimated_sample_size: find_asn(risk_limit, margin, risk)?,
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.risk.is_nan()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    /// Every pair is at or below the risk limit.
    Satisfied,
    /// More ballots must be examined.
    Continue,
    /// At least one pair has an undefined risk; needs human attention.
    Undetermined,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Satisfied => "satisfied",
            Self::Continue => "continue",
            Self::Undetermined => "undetermined",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestAssessment {
    pub contest: String,
    pub choices: usize,
    pub outcome: ContestOutcome,
    pub records: Vec<RiskRecord>,
    /// Largest winner/loser risk; 0.0 when the contest has no losers.
    pub max_pairwise_risk: f64,
    pub majority_risk: f64,
    /// Weakest link over every record; NaN when any record is degenerate.
    pub overall_risk: f64,
    pub risk_limit: f64,
    pub status: AuditStatus,
    pub estimated_sample_size: SampleSize,
    /// Ballots available to draw from, see [`Contest::ballot_bound`].
    pub ballot_bound: u64,
}

impl ContestAssessment {
    pub fn is_satisfied(&self) -> bool {
        self.status == AuditStatus::Satisfied
    }

    /// The estimate as a draw count for the sampler: never more ballots
    /// than were cast, and a full count becomes every ballot.
    pub fn draws_to_request(&self) -> u64 {
        self.estimated_sample_size.capped(self.ballot_bound)
    }
}

/// Maximum that lets a NaN win, so a degenerate pair is never hidden.
fn weakest_link(risks: impl IntoIterator<Item = f64>) -> f64 {
    risks.into_iter().fold(0.0, |acc: f64, risk| {
        if acc.is_nan() || risk.is_nan() {
            f64::NAN
        } else {
            acc.max(risk)
        }
    })
}

pub fn assess_contest(contest: &Contest, config: &AuditConfig) -> AuditResult<ContestAssessment> {
    config.validate()?;
    let risk_limit = config.risk_limit;
    let outcome = contest.outcome()?;
    let voted = outcome.voted_ballots;
    let ballot_bound = contest.ballot_bound()?;

    let mut records = Vec::with_capacity(outcome.winners.len() * outcome.losers.len() + 1);
    for winner in outcome.winners.iter().filter_map(|name| contest.choice(name)) {
        for loser in outcome.losers.iter().filter_map(|name| contest.choice(name)) {
            records.push(RiskRecord::evaluate(
                PairKind::Pairwise,
                Side {
                    name: &winner.name,
                    votes: winner.votes,
                    observed: winner.observed,
                },
                Side {
                    name: &loser.name,
                    votes: loser.votes,
                    observed: loser.observed,
                },
                voted,
                risk_limit,
            )?);
        }
    }
    let max_pairwise_risk = weakest_link(records.iter().map(|r| r.risk));

    let ranked = contest.ranked();
    let top = ranked.first().copied();
    let (top_name, top_votes, top_observed) = top
        .map(|c| (c.name.as_str(), c.votes, c.observed))
        .unwrap_or(("", 0, 0));
    let pool_votes = checked_total(
        &contest.name,
        "reported votes",
        ranked.iter().skip(1).map(|c| c.votes),
    )?;
    let pool_observed = checked_total(
        &contest.name,
        "observed tallies",
        ranked.iter().skip(1).map(|c| c.observed),
    )?;
    let top_side = Side {
        name: top_name,
        votes: top_votes,
        observed: top_observed,
    };
    let pool_side = Side {
        name: POOL_LABEL,
        votes: pool_votes,
        observed: pool_observed,
    };
    // The statistic's winner must be the side with the larger reported total.
    let (majority_winner, majority_loser) = if top_votes < pool_votes {
        (pool_side, top_side)
    } else {
        (top_side, pool_side)
    };
    let majority = RiskRecord::evaluate(
        PairKind::Majority,
        majority_winner,
        majority_loser,
        voted,
        risk_limit,
    )?;
    let majority_risk = majority.risk;
    records.push(majority);

    let overall_risk = weakest_link([max_pairwise_risk, majority_risk]);
    let status = if overall_risk.is_nan() {
        AuditStatus::Undetermined
    } else if overall_risk <= risk_limit {
        AuditStatus::Satisfied
    } else {
        AuditStatus::Continue
    };

    let pairwise_size = find_asn(risk_limit, outcome.margin, max_pairwise_risk)?;
    let majority_size = find_asn(risk_limit, outcome.majority_margin.abs(), majority_risk)?;
    let estimated_sample_size = pairwise_size.max(majority_size);

    if status == AuditStatus::Undetermined {
        tracing::warn!(
            target: "rla.assessment",
            contest = %contest.name,
            "risk undefined for at least one pair; contest needs review"
        );
    } else {
        tracing::debug!(
            target: "rla.assessment",
            contest = %contest.name,
            overall_risk,
            risk_limit,
            status = %status,
            estimate = %estimated_sample_size,
            "contest assessed"
        );
    }

    Ok(ContestAssessment {
        contest: contest.name.clone(),
        choices: contest.choices.len(),
        outcome,
        records,
        max_pairwise_risk,
        majority_risk,
        overall_risk,
        risk_limit,
        status,
        estimated_sample_size,
        ballot_bound,
    })
}

/// Assessments for a whole round, one per contest, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub risk_limit: f64,
    pub contests: Vec<ContestAssessment>,
}

pub fn assess_contests(contests: &[Contest], config: &AuditConfig) -> AuditResult<AuditReport> {
    let assessments = contests
        .iter()
        .map(|contest| assess_contest(contest, config))
        .collect::<AuditResult<Vec<_>>>()?;
    Ok(AuditReport {
        risk_limit: config.risk_limit,
        contests: assessments,
    })
}

impl AuditReport {
    pub fn all_satisfied(&self) -> bool {
        self.contests.iter().all(ContestAssessment::is_satisfied)
    }

    pub fn undetermined(&self) -> impl Iterator<Item = &ContestAssessment> {
        self.contests
            .iter()
            .filter(|c| c.status == AuditStatus::Undetermined)
    }

    /// Largest estimate over contests that still need ballots.
    pub fn next_sample_size(&self) -> SampleSize {
        self.contests
            .iter()
            .filter(|c| c.status == AuditStatus::Continue)
            .map(|c| c.estimated_sample_size)
            .max()
            .unwrap_or(SampleSize::Draws(0))
    }
}

fn fmt_risk(risk: f64) -> String {
    if risk.is_nan() {
        "undetermined".to_string()
    } else {
        format!("{risk:.3}")
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "risk limit {:.3}", self.risk_limit)?;
        for contest in &self.contests {
            writeln!(
                f,
                "\nContest: {}, with {} candidates",
                contest.contest, contest.choices
            )?;
            for record in &contest.records {
                let label = match record.kind {
                    PairKind::Pairwise => "detail:",
                    PairKind::Majority => "majority:",
                };
                writeln!(
                    f,
                    "\t{label} Risk {} with counts W: {} L: {} w: {} l: {} for {} vs {}",
                    fmt_risk(record.risk),
                    record.winner_votes,
                    record.loser_votes,
                    record.winner_observed,
                    record.loser_observed,
                    record.winner,
                    record.loser
                )?;
            }
            writeln!(
                f,
                "overall\t{}\t{}\t{}\t{}\t{}",
                contest.status,
                contest.estimated_sample_size,
                fmt_risk(contest.overall_risk),
                fmt_risk(contest.majority_risk),
                contest.contest
            )?;
        }
        Ok(())
    }
}
