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

//! Deterministic counter-mode sampler.
//!
//! Draw `c` (starting at 1) is `a + (SHA-256(seed || "," || c) mod N)`. The
//! counter advances on every evaluation, including rejected duplicates, so
//! any implementation that follows these rules reproduces the same ordered
//! sample from the same public seed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::digest::{counter_digest, PopulationRange};
use crate::error::{AuditError, AuditResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawOutcome {
    /// Accepted into the new portion of the sample.
    Accepted,
    /// Accepted, but part of the previously issued prefix being replayed.
    Replayed,
    /// Already drawn; discarded when sampling without replacement.
    DuplicateRejected,
}

/// One evaluation of the digest at `counter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub counter: u64,
    pub pick: i64,
    pub outcome: DrawOutcome,
}

/// Unbounded stream of draw events, one per counter value.
///
/// The stream never ends: once every member of the population has been
/// accepted without replacement, each further event is a rejection. Callers
/// bound it by the number of accepted draws they need.
#[derive(Debug, Clone)]
pub struct DrawStream {
    seed: String,
    range: PopulationRange,
    with_replacement: bool,
    skip: usize,
    counter: u64,
    accepted: usize,
    seen: HashSet<i64>,
}

impl DrawStream {
    pub fn new(
        seed: impl Into<String>,
        range: PopulationRange,
        with_replacement: bool,
        skip: usize,
    ) -> Self {
        Self {
            seed: seed.into(),
            range,
            with_replacement,
            skip,
            counter: 0,
            accepted: 0,
            seen: HashSet::new(),
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

impl Iterator for DrawStream {
    type Item = DrawEvent;

    fn next(&mut self) -> Option<DrawEvent> {
        self.counter = self.counter.checked_add(1)?;
        let pick = self.range.pick(&counter_digest(&self.seed, self.counter));

        let outcome = if !self.with_replacement && !self.seen.insert(pick) {
            DrawOutcome::DuplicateRejected
        } else {
            self.accepted += 1;
            if self.accepted <= self.skip {
                DrawOutcome::Replayed
            } else {
                DrawOutcome::Accepted
            }
        };

        Some(DrawEvent {
            counter: self.counter,
            pick,
            outcome,
        })
    }
}

/// An ordered sample: the replayed prefix of an earlier round (`old`) and the
/// newly generated suffix (`new`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub old: Vec<i64>,
    pub new: Vec<i64>,
    /// Highest counter value evaluated to produce the sample.
    pub counters_consumed: u64,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.old.len() + self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old.is_empty() && self.new.is_empty()
    }

    /// `old` followed by `new`, in draw order.
    pub fn combined(&self) -> Vec<i64> {
        self.old.iter().chain(self.new.iter()).copied().collect()
    }

    pub fn sorted_old(&self) -> Vec<i64> {
        sorted(&self.old)
    }

    pub fn sorted_new(&self) -> Vec<i64> {
        sorted(&self.new)
    }
}

fn sorted(values: &[i64]) -> Vec<i64> {
    let mut out = values.to_vec();
    out.sort_unstable();
    out
}

/// Most entries reserved up front; larger samples grow as they are drawn.
const MAX_RESERVE: usize = 1 << 16;

fn reserve_hint(len: usize) -> usize {
    len.min(MAX_RESERVE)
}

fn ensure_feasible(n: usize, with_replacement: bool, range: &PopulationRange) -> AuditResult<()> {
    if !with_replacement && n as u128 > range.size() {
        return Err(AuditError::InfeasibleSample {
            n,
            population: range.size(),
        });
    }
    Ok(())
}

/// Draw a sample of `n` integers from `[a, b]`, the first `skip` of which
/// replay an earlier sample of that size.
///
/// Without replacement the expected number of digest evaluations is
/// `O(n * N / (N - n + 1))`: requests close to the full population terminate
/// but grow slow as duplicates dominate.
pub fn draw(
    n: usize,
    with_replacement: bool,
    a: i64,
    b: i64,
    seed: &str,
    skip: usize,
) -> AuditResult<Sample> {
    let range = PopulationRange::new(a, b)?;
    ensure_feasible(n, with_replacement, &range)?;
    if skip > n {
        return Err(AuditError::InvalidSkip { skip, n });
    }

    let mut old = Vec::with_capacity(reserve_hint(skip));
    let mut new = Vec::with_capacity(reserve_hint(n - skip));
    let mut rejected = 0u64;
    let mut stream = DrawStream::new(seed, range, with_replacement, skip);

    while old.len() + new.len() < n {
        let Some(event) = stream.next() else {
            break;
        };
        match event.outcome {
            DrawOutcome::Replayed => old.push(event.pick),
            DrawOutcome::Accepted => new.push(event.pick),
            DrawOutcome::DuplicateRejected => rejected += 1,
        }
    }

    tracing::debug!(
        target: "rla.sampler",
        n,
        skip,
        with_replacement,
        population = %range.size(),
        counters = stream.counter(),
        rejected,
        "sample drawn"
    );

    Ok(Sample {
        old,
        new,
        counters_consumed: stream.counter(),
    })
}

/// Parameters of one sampler invocation, kept by the caller between rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRequest {
    pub seed: String,
    pub a: i64,
    pub b: i64,
    pub n: usize,
    pub with_replacement: bool,
    #[serde(default)]
    pub skip: usize,
}

impl SampleRequest {
    pub fn new(seed: impl Into<String>, a: i64, b: i64, n: usize, with_replacement: bool) -> Self {
        Self {
            seed: seed.into(),
            a,
            b,
            n,
            with_replacement,
            skip: 0,
        }
    }

    pub fn execute(&self) -> AuditResult<Sample> {
        draw(
            self.n,
            self.with_replacement,
            self.a,
            self.b,
            &self.seed,
            self.skip,
        )
    }

    /// The next round's request: the whole current sample becomes the
    /// replayed prefix and `additional` new draws follow it.
    pub fn escalated(&self, additional: usize) -> Self {
        Self {
            n: self.n.saturating_add(additional),
            skip: self.n,
            ..self.clone()
        }
    }
}

/// Incremental generator that extends one accepted sequence on demand.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    stream: DrawStream,
    range: PopulationRange,
    with_replacement: bool,
    generated: Vec<i64>,
}

impl SampleGenerator {
    pub fn new(seed: impl Into<String>, with_replacement: bool, a: i64, b: i64) -> AuditResult<Self> {
        let range = PopulationRange::new(a, b)?;
        Ok(Self {
            stream: DrawStream::new(seed, range, with_replacement, 0),
            range,
            with_replacement,
            generated: Vec::new(),
        })
    }

    /// Accepted draws with 0-based positions `from..to`, generating as many
    /// further draws as needed.
    pub fn numbers(&mut self, from: usize, to: usize) -> AuditResult<&[i64]> {
        if from > to {
            return Err(AuditError::InvalidWindow { from, to });
        }
        ensure_feasible(to, self.with_replacement, &self.range)?;
        while self.generated.len() < to {
            let Some(event) = self.stream.next() else {
                break;
            };
            if event.outcome != DrawOutcome::DuplicateRejected {
                self.generated.push(event.pick);
            }
        }
        Ok(&self.generated[from..to.min(self.generated.len())])
    }

    pub fn generated(&self) -> &[i64] {
        &self.generated
    }

    pub fn counter(&self) -> u64 {
        self.stream.counter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEED: &str = "3546311556112163624615351222";

    #[test]
    fn zero_sized_sample_consumes_nothing() {
        let sample = draw(0, false, 1, 10, SEED, 0).expect("draw");
        assert!(sample.is_empty());
        assert_eq!(sample.counters_consumed, 0);
    }

    #[test]
    fn preconditions_fail_before_any_work() {
        assert_eq!(
            draw(100, false, 1, 50, SEED, 0),
            Err(AuditError::InfeasibleSample {
                n: 100,
                population: 50
            })
        );
        assert_eq!(
            draw(1, false, 9, 3, SEED, 0),
            Err(AuditError::InvalidRange { a: 9, b: 3 })
        );
        assert_eq!(
            draw(3, false, 1, 50, SEED, 4),
            Err(AuditError::InvalidSkip { skip: 4, n: 3 })
        );
    }

    #[test]
    fn caller_sizes_do_not_drive_allocation() {
        assert_eq!(reserve_hint(usize::MAX), MAX_RESERVE);
        assert_eq!(reserve_hint(12), 12);
        assert_eq!(
            draw(usize::MAX - 1, true, 1, 10, "123", usize::MAX),
            Err(AuditError::InvalidSkip {
                skip: usize::MAX,
                n: usize::MAX - 1
            })
        );

        let n = MAX_RESERVE + 10;
        let sample = draw(n, true, 1, 10, SEED, MAX_RESERVE + 3).expect("draw");
        assert_eq!(sample.old.len(), MAX_RESERVE + 3);
        assert_eq!(sample.new.len(), 7);
        assert_eq!(sample.counters_consumed, n as u64);
    }

    #[test]
    fn with_replacement_may_exceed_population() {
        let sample = draw(4, true, 7, 7, SEED, 0).expect("draw");
        assert_eq!(sample.new, vec![7, 7, 7, 7]);
        assert_eq!(sample.counters_consumed, 4);
    }

    #[test]
    fn with_replacement_keeps_duplicates() {
        let sample = draw(32, true, 1, 876, SEED, 0).expect("draw");
        assert_eq!(sample.new[7], 611);
        assert_eq!(sample.new[31], 611);
        assert_eq!(sample.counters_consumed, 32);
    }

    #[test]
    fn exhaustive_sample_is_a_permutation() {
        let sample = draw(6, false, 1, 6, SEED, 0).expect("draw");
        assert_eq!(sample.new, vec![2, 6, 3, 4, 5, 1]);
        assert_eq!(sample.sorted_new(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(sample.counters_consumed, 16);
    }

    #[test]
    fn negative_ranges_are_supported() {
        let sample = draw(8, true, -5, 5, SEED, 0).expect("draw");
        assert_eq!(sample.new, vec![1, -4, -5, 0, -2, -4, -3, -1]);
    }

    #[test]
    fn stream_marks_rejections_and_replays() {
        let range = PopulationRange::new(1, 876).expect("range");
        let events: Vec<DrawEvent> = DrawStream::new(SEED, range, false, 30).take(33).collect();
        assert_eq!(events[0].outcome, DrawOutcome::Replayed);
        assert_eq!(events[29].outcome, DrawOutcome::Replayed);
        assert_eq!(events[30].outcome, DrawOutcome::Accepted);
        assert_eq!(events[30].pick, 461);
        assert_eq!(
            events[31],
            DrawEvent {
                counter: 32,
                pick: 611,
                outcome: DrawOutcome::DuplicateRejected
            }
        );
        assert_eq!(events[32].pick, 251);
    }

    #[test]
    fn request_escalation_replays_previous_round() {
        let first = SampleRequest::new(SEED, 1, 876, 20, false);
        let second = first.escalated(10);
        assert_eq!(second.skip, 20);
        assert_eq!(second.n, 30);

        let round_one = first.execute().expect("round one");
        let round_two = second.execute().expect("round two");
        assert_eq!(round_two.old, round_one.new);
        assert_eq!(
            round_two.new,
            vec![779, 331, 339, 487, 594, 235, 65, 527, 821, 490]
        );
    }

    #[test]
    fn generator_windows_follow_the_draw_sequence() {
        let mut generator = SampleGenerator::new(SEED, false, 1, 876).expect("generator");
        assert_eq!(generator.numbers(0, 3).expect("window"), &[740, 180, 264]);
        assert_eq!(generator.numbers(30, 32).expect("window"), &[461, 251]);
        assert_eq!(generator.counter(), 33);
        let reference = draw(32, false, 1, 876, SEED, 0).expect("draw");
        assert_eq!(generator.generated(), reference.new.as_slice());
        assert_eq!(
            generator.numbers(5, 4),
            Err(AuditError::InvalidWindow { from: 5, to: 4 })
        );
        assert!(generator.numbers(0, 877).is_err());
    }

    proptest! {
        #[test]
        fn without_replacement_is_distinct_in_range_and_exact(
            seed in "[0-9]{20,30}",
            a in -500i64..500,
            width in 0i64..200,
            fraction in 0.0f64..=1.0,
        ) {
            let population = (width + 1) as usize;
            let n = ((population as f64) * fraction).floor() as usize;
            let sample = draw(n, false, a, a + width, &seed, 0).expect("draw");
            let combined = sample.combined();
            prop_assert_eq!(combined.len(), n);
            let distinct: HashSet<i64> = combined.iter().copied().collect();
            prop_assert_eq!(distinct.len(), n);
            prop_assert!(combined.iter().all(|v| *v >= a && *v <= a + width));
        }

        #[test]
        fn expansion_law_holds(
            seed in "[0-9]{20,30}",
            n1 in 0usize..40,
            n2 in 0usize..40,
            with_replacement in any::<bool>(),
        ) {
            let first = draw(n1, with_replacement, 1, 500, &seed, 0).expect("first");
            let second = draw(n1 + n2, with_replacement, 1, 500, &seed, n1).expect("second");
            prop_assert_eq!(&second.old, &first.new);
            prop_assert_eq!(second.old.len(), n1);
            prop_assert_eq!(second.new.len(), n2);
        }
    }
}
