//! Ballot-by-ballot BRAVO with a one-way rejection latch per pair.
//!
//! The batch risk in [`crate::risk`] recomputes the statistic from cumulative
//! tallies each round. The published procedure instead walks the sample in
//! draw order and, once a pair's statistic reaches `1/alpha`, stops updating
//! it. This module implements that procedure for callers that require it.

use serde::{Deserialize, Serialize};

use crate::contest::Contest;
use crate::error::AuditResult;
use crate::risk::validate_risk_limit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTest {
    pub winner: String,
    pub loser: String,
    pub winner_votes: u64,
    pub loser_votes: u64,
    /// ln T, the accumulated log likelihood ratio.
    pub log_t: f64,
    /// Ballot count at which the null hypothesis was rejected.
    pub rejected_at: Option<u64>,
}

impl PairTest {
    fn share(&self) -> Option<f64> {
        let total = self.winner_votes as f64 + self.loser_votes as f64;
        if total == 0.0 {
            return None;
        }
        Some(self.winner_votes as f64 / total)
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected_at.is_some()
    }

    /// Same sentinels as the batch risk: 1.0 without votes, NaN for a
    /// saturated share.
    pub fn risk(&self) -> f64 {
        match self.share() {
            None => 1.0,
            Some(s) if s <= 0.0 || s >= 1.0 => f64::NAN,
            Some(_) => (-self.log_t).exp().min(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialBravo {
    contest: String,
    risk_limit: f64,
    pairs: Vec<PairTest>,
    ballots: u64,
}

impl SequentialBravo {
    pub fn new(contest: &Contest, risk_limit: f64) -> AuditResult<Self> {
        let risk_limit = validate_risk_limit(risk_limit)?;
        let outcome = contest.outcome()?;
        let mut pairs = Vec::with_capacity(outcome.winners.len() * outcome.losers.len());
        for winner in outcome.winners.iter().filter_map(|n| contest.choice(n)) {
            for loser in outcome.losers.iter().filter_map(|n| contest.choice(n)) {
                pairs.push(PairTest {
                    winner: winner.name.clone(),
                    loser: loser.name.clone(),
                    winner_votes: winner.votes,
                    loser_votes: loser.votes,
                    log_t: 0.0,
                    rejected_at: None,
                });
            }
        }
        Ok(Self {
            contest: contest.name.clone(),
            risk_limit,
            pairs,
            ballots: 0,
        })
    }

    /// Record one audited ballot, given the choices its interpretation
    /// selects in this contest. Returns whether every pair is now rejected.
    pub fn observe<S: AsRef<str>>(&mut self, ballot: &[S]) -> bool {
        self.ballots += 1;
        let threshold = (1.0 / self.risk_limit).ln();
        let half = 0.5_f64.ln();
        let marks = |name: &str| ballot.iter().any(|c| c.as_ref() == name);

        for pair in self.pairs.iter_mut().filter(|p| !p.is_rejected()) {
            let Some(share) = pair.share().filter(|s| *s > 0.0 && *s < 1.0) else {
                continue;
            };
            match (marks(&pair.winner), marks(&pair.loser)) {
                (true, false) => pair.log_t += share.ln() - half,
                (false, true) => pair.log_t += (1.0 - share).ln() - half,
                _ => continue,
            }
            if pair.log_t >= threshold {
                pair.rejected_at = Some(self.ballots);
                tracing::info!(
                    target: "rla.sequential",
                    contest = %self.contest,
                    winner = %pair.winner,
                    loser = %pair.loser,
                    ballots = self.ballots,
                    "null hypothesis rejected; pair latched"
                );
            }
        }
        self.all_rejected()
    }

    pub fn pairs(&self) -> &[PairTest] {
        &self.pairs
    }

    /// `min(1, 1/T)` per pair, in pair order.
    pub fn pair_risks(&self) -> Vec<f64> {
        self.pairs.iter().map(PairTest::risk).collect()
    }

    pub fn all_rejected(&self) -> bool {
        self.pairs.iter().all(PairTest::is_rejected)
    }

    pub fn ballots_observed(&self) -> u64 {
        self.ballots
    }

    /// Largest pair risk; NaN when any pair is degenerate.
    pub fn overall_risk(&self) -> f64 {
        self.pairs.iter().map(PairTest::risk).fold(0.0, |acc: f64, r| {
            if acc.is_nan() || r.is_nan() {
                f64::NAN
            } else {
                acc.max(r)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::Choice;
    use crate::risk::risk_level;

    fn contest() -> Contest {
        Contest::new(
            "Measure 1",
            1,
            vec![Choice::reported("Yes", 600), Choice::reported("No", 400)],
        )
        .expect("contest")
    }

    #[test]
    fn latches_at_barrier_and_stops_updating() {
        let mut bravo = SequentialBravo::new(&contest(), 0.1).expect("bravo");
        for _ in 0..12 {
            assert!(!bravo.observe(&["Yes"]));
        }
        assert!(bravo.observe(&["Yes"]));
        assert_eq!(bravo.pairs()[0].rejected_at, Some(13));

        let latched = bravo.pairs()[0].log_t;
        for _ in 0..50 {
            bravo.observe(&["No"]);
        }
        assert_eq!(bravo.pairs()[0].log_t, latched);
        assert!(bravo.overall_risk() <= 0.1);
        assert_eq!(bravo.ballots_observed(), 63);
    }

    #[test]
    fn matches_batch_formula_before_latch() {
        let mut bravo = SequentialBravo::new(&contest(), 0.01).expect("bravo");
        let stream = ["Yes", "No", "Yes", "Yes", "No", "Yes", "Yes", "No"];
        for choice in stream {
            bravo.observe(&[choice]);
        }
        let batch = risk_level(600, 400, 5, 3);
        assert!((bravo.overall_risk() - batch).abs() < 1e-12);
        assert_eq!(bravo.pair_risks(), vec![bravo.overall_risk()]);
    }

    #[test]
    fn ballots_naming_both_or_neither_do_not_count() {
        let mut bravo = SequentialBravo::new(&contest(), 0.1).expect("bravo");
        bravo.observe(&["Yes", "No"]);
        let empty: [&str; 0] = [];
        bravo.observe(&empty);
        bravo.observe(&["Write-in"]);
        assert_eq!(bravo.pairs()[0].log_t, 0.0);
        assert_eq!(bravo.overall_risk(), 1.0);
    }

    #[test]
    fn degenerate_pairs_report_sentinels() {
        let saturated = Contest::new(
            "Saturated",
            1,
            vec![Choice::reported("A", 10), Choice::reported("B", 0)],
        )
        .expect("contest");
        let mut bravo = SequentialBravo::new(&saturated, 0.1).expect("bravo");
        bravo.observe(&["A"]);
        assert!(bravo.overall_risk().is_nan());
        assert!(!bravo.all_rejected());
        assert!(SequentialBravo::new(&saturated, 0.0).is_err());
    }
}
