use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::risk::non_negative;

/// A contest choice with its reported total and the number of audited
/// ballots whose interpretation favours it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub votes: u64,
    #[serde(default)]
    pub observed: u64,
}

impl Choice {
    pub fn new(name: impl Into<String>, votes: i64, observed: i64) -> AuditResult<Self> {
        Ok(Self {
            name: name.into(),
            votes: non_negative("reported votes", votes)?,
            observed: non_negative("observed tally", observed)?,
        })
    }

    pub fn reported(name: impl Into<String>, votes: u64) -> Self {
        Self {
            name: name.into(),
            votes,
            observed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub name: String,
    pub winners_allowed: usize,
    pub choices: Vec<Choice>,
    /// Ballots cast where the contest appears, including ballots with no
    /// vote in it. Upper bound for any further draws; defaults to the vote
    /// total, and 0 is read as that default.
    #[serde(default)]
    pub reported_ballots: u64,
}

/// Reported winners and losers with their normalised margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestOutcome {
    pub winners: Vec<String>,
    pub losers: Vec<String>,
    /// Weakest winner minus strongest loser, over votes cast; 1.0 without losers.
    pub margin: f64,
    /// Top choice minus all other choices combined, over votes cast.
    pub majority_margin: f64,
    pub voted_ballots: u64,
}

impl Contest {
    pub fn new(
        name: impl Into<String>,
        winners_allowed: usize,
        choices: Vec<Choice>,
    ) -> AuditResult<Self> {
        let name = name.into();
        if choices.is_empty() {
            return Err(invalid(&name, "contest has no choices"));
        }
        if winners_allowed == 0 {
            return Err(invalid(&name, "contest must have at least one winner"));
        }
        let mut seen = HashSet::new();
        for choice in &choices {
            if !seen.insert(choice.name.as_str()) {
                return Err(invalid(
                    &name,
                    &format!("duplicate choice {:?}", choice.name),
                ));
            }
        }
        let reported_ballots =
            checked_total(&name, "reported votes", choices.iter().map(|c| c.votes))?;
        Ok(Self {
            name,
            winners_allowed,
            choices,
            reported_ballots,
        })
    }

    /// Build a contest from signed tallies as exported by the collaborators:
    /// reported votes per choice and cumulative audited tallies per choice.
    pub fn from_tallies(
        name: impl Into<String>,
        winners_allowed: usize,
        reported: &BTreeMap<String, i64>,
        observed: &BTreeMap<String, i64>,
    ) -> AuditResult<Self> {
        let name = name.into();
        let choices = reported
            .iter()
            .map(|(choice, votes)| Choice::new(choice, *votes, 0))
            .collect::<AuditResult<Vec<_>>>()?;
        let contest = Self::new(name, winners_allowed, choices)?;
        let observed = observed
            .iter()
            .map(|(choice, tally)| Ok((choice.clone(), non_negative("observed tally", *tally)?)))
            .collect::<AuditResult<Vec<_>>>()?;
        contest.with_observations(observed)
    }

    /// Set the number of ballots cast where the contest appears. It cannot
    /// be smaller than the vote total.
    pub fn with_reported_ballots(mut self, ballots: u64) -> AuditResult<Self> {
        let votes = self.vote_total()?;
        if ballots < votes {
            return Err(invalid(
                &self.name,
                &format!("{ballots} reported ballots is fewer than the {votes} votes cast"),
            ));
        }
        self.reported_ballots = ballots;
        Ok(self)
    }

    /// Ballots available to draw from: `reported_ballots`, never below the
    /// vote total.
    pub fn ballot_bound(&self) -> AuditResult<u64> {
        let votes = self.vote_total()?;
        Ok(self.reported_ballots.max(votes))
    }

    /// A copy carrying the given cumulative observed tallies. Choices not
    /// mentioned have observed nothing.
    pub fn with_observations<S: AsRef<str>>(
        &self,
        observations: impl IntoIterator<Item = (S, u64)>,
    ) -> AuditResult<Self> {
        let mut next = self.clone();
        for choice in &mut next.choices {
            choice.observed = 0;
        }
        for (choice_name, tally) in observations {
            let choice_name = choice_name.as_ref();
            let choice = next
                .choices
                .iter_mut()
                .find(|c| c.name == choice_name)
                .ok_or_else(|| AuditError::UnknownChoice {
                    contest: self.name.clone(),
                    choice: choice_name.to_string(),
                })?;
            choice.observed = tally;
        }
        Ok(next)
    }

    fn vote_total(&self) -> AuditResult<u64> {
        checked_total(
            &self.name,
            "reported votes",
            self.choices.iter().map(|c| c.votes),
        )
    }

    pub fn choice(&self, name: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.name == name)
    }

    /// Choices ordered by reported votes, highest first; ties keep input order.
    pub fn ranked(&self) -> Vec<&Choice> {
        let mut ranked: Vec<&Choice> = self.choices.iter().collect();
        ranked.sort_by(|x, y| y.votes.cmp(&x.votes));
        ranked
    }

    /// Winners, losers and margins from the reported tallies. Fails only when
    /// the vote total does not fit in a `u64`.
    pub fn outcome(&self) -> AuditResult<ContestOutcome> {
        let ranked = self.ranked();
        let split = self.winners_allowed.min(ranked.len());
        let (winners, losers) = ranked.split_at(split);

        let voted_ballots = self.vote_total()?;
        let (margin, majority_margin) = if voted_ballots == 0 {
            (f64::NAN, f64::NAN)
        } else {
            let total = voted_ballots as f64;
            let margin = match (winners.last(), losers.first()) {
                (Some(weakest), Some(strongest)) => {
                    (weakest.votes as f64 - strongest.votes as f64) / total
                }
                _ => 1.0,
            };
            let top = ranked.first().map(|c| c.votes).unwrap_or(0);
            let pool = voted_ballots - top;
            (margin, (top as f64 - pool as f64) / total)
        };

        Ok(ContestOutcome {
            winners: winners.iter().map(|c| c.name.clone()).collect(),
            losers: losers.iter().map(|c| c.name.clone()).collect(),
            margin,
            majority_margin,
            voted_ballots,
        })
    }
}

/// Sum of tallies, `InvalidContest` when it overflows a `u64`.
pub(crate) fn checked_total(
    contest: &str,
    what: &str,
    tallies: impl IntoIterator<Item = u64>,
) -> AuditResult<u64> {
    tallies
        .into_iter()
        .try_fold(0u64, |acc, tally| acc.checked_add(tally))
        .ok_or_else(|| invalid(contest, &format!("total of {what} overflows")))
}

fn invalid(contest: &str, reason: &str) -> AuditError {
    AuditError::InvalidContest {
        contest: contest.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mayor() -> Contest {
        Contest::new(
            "Mayor",
            1,
            vec![
                Choice::reported("Alice", 1410),
                Choice::reported("Bob", 1132),
            ],
        )
        .expect("contest")
    }

    #[test]
    fn two_way_outcome() {
        let outcome = mayor().outcome().expect("outcome");
        assert_eq!(outcome.winners, vec!["Alice"]);
        assert_eq!(outcome.losers, vec!["Bob"]);
        assert_eq!(outcome.voted_ballots, 2542);
        assert!((outcome.margin - 278.0 / 2542.0).abs() < 1e-15);
        assert!((outcome.majority_margin - 278.0 / 2542.0).abs() < 1e-15);
    }

    #[test]
    fn multi_winner_margin_uses_weakest_winner() {
        let contest = Contest::new(
            "Council",
            2,
            vec![
                Choice::reported("C", 200),
                Choice::reported("A", 500),
                Choice::reported("D", 100),
                Choice::reported("B", 300),
            ],
        )
        .expect("contest");
        let outcome = contest.outcome().expect("outcome");
        assert_eq!(outcome.winners, vec!["A", "B"]);
        assert_eq!(outcome.losers, vec!["C", "D"]);
        assert_eq!(outcome.voted_ballots, 1100);
        assert!((outcome.margin - 100.0 / 1100.0).abs() < 1e-15);
        assert!((outcome.majority_margin + 100.0 / 1100.0).abs() < 1e-15);
    }

    #[test]
    fn uncontested_and_empty_contests() {
        let uncontested = Contest::new("Clerk", 1, vec![Choice::reported("Only", 90)])
            .expect("contest");
        let outcome = uncontested.outcome().expect("outcome");
        assert_eq!(outcome.margin, 1.0);
        assert_eq!(outcome.majority_margin, 1.0);
        assert!(outcome.losers.is_empty());

        let silent = Contest::new(
            "Silent",
            1,
            vec![Choice::reported("X", 0), Choice::reported("Y", 0)],
        )
        .expect("contest");
        let outcome = silent.outcome().expect("outcome");
        assert!(outcome.margin.is_nan());
        assert!(outcome.majority_margin.is_nan());
    }

    #[test]
    fn rejects_malformed_contests() {
        assert!(Contest::new("Empty", 1, vec![]).is_err());
        assert!(Contest::new("NoWinners", 0, vec![Choice::reported("A", 1)]).is_err());
        assert!(Contest::new(
            "Dup",
            1,
            vec![Choice::reported("A", 1), Choice::reported("A", 2)]
        )
        .is_err());
        assert_eq!(
            Choice::new("A", -4, 0),
            Err(AuditError::NegativeCount {
                field: "reported votes",
                value: -4
            })
        );
    }

    #[test]
    fn observations_replace_previous_round() {
        let round_one = mayor()
            .with_observations([("Alice", 20), ("Bob", 11)])
            .expect("round one");
        let round_two = round_one
            .with_observations([("Alice", 170)])
            .expect("round two");
        assert_eq!(round_two.choice("Alice").map(|c| c.observed), Some(170));
        assert_eq!(round_two.choice("Bob").map(|c| c.observed), Some(0));
        assert_eq!(round_one.choice("Bob").map(|c| c.observed), Some(11));

        let err = mayor().with_observations([("Carol", 1)]).unwrap_err();
        assert!(matches!(err, AuditError::UnknownChoice { .. }));
    }

    #[test]
    fn from_signed_tallies() {
        let reported = BTreeMap::from([("Alice".to_string(), 1410), ("Bob".to_string(), 1132)]);
        let observed = BTreeMap::from([("Alice".to_string(), 170), ("Bob".to_string(), 135)]);
        let contest = Contest::from_tallies("Mayor", 1, &reported, &observed).expect("contest");
        assert_eq!(contest.choice("Bob").map(|c| c.observed), Some(135));
        assert_eq!(contest.reported_ballots, 2542);

        let negative = BTreeMap::from([("Alice".to_string(), -1)]);
        assert!(Contest::from_tallies("Mayor", 1, &reported, &negative).is_err());
    }

    #[test]
    fn vote_totals_past_u64_are_rejected() {
        let half = u64::MAX / 2 + 1;
        let err = Contest::new(
            "Huge",
            1,
            vec![Choice::reported("A", half), Choice::reported("B", half)],
        )
        .unwrap_err();
        assert!(matches!(err, AuditError::InvalidContest { .. }));
        assert!(err.to_string().contains("overflows"));

        // Deserialisation bypasses the constructor checks.
        let json = format!(
            r#"{{"name":"Huge","winners_allowed":1,"choices":[{{"name":"A","votes":{half}}},{{"name":"B","votes":{half}}}]}}"#
        );
        let loaded: Contest = serde_json::from_str(&json).expect("json");
        assert_eq!(loaded.reported_ballots, 0);
        assert!(matches!(loaded.outcome(), Err(AuditError::InvalidContest { .. })));
        assert!(loaded.ballot_bound().is_err());
    }

    #[test]
    fn reported_ballots_bound_the_population() {
        let contest = mayor();
        assert_eq!(contest.ballot_bound().expect("bound"), 2542);

        let with_undervotes = mayor().with_reported_ballots(3000).expect("ballots");
        assert_eq!(with_undervotes.reported_ballots, 3000);
        assert_eq!(with_undervotes.ballot_bound().expect("bound"), 3000);

        assert!(matches!(
            mayor().with_reported_ballots(2000),
            Err(AuditError::InvalidContest { .. })
        ));
    }
}
