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
#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use rla_core::sequential::SequentialBravo;
use rla_core::{find_asn, risk_level, Choice, Contest};

#[derive(Debug, Arbitrary)]
enum Ballot {
    Winner,
    Loser,
    Both,
    Blank,
}

#[derive(Debug, Arbitrary)]
struct Input {
    winner_votes: u32,
    loser_votes: u32,
    risk_limit_raw: f64,
    margin: f64,
    ballots: Vec<Ballot>,
}

fn normalize_limit(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.1;
    }
    x.abs().fract().clamp(1e-6, 1.0 - 1e-6)
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = Input::arbitrary(&mut u) else {
        return;
    };
    let risk_limit = normalize_limit(input.risk_limit_raw);

    let asn = find_asn(risk_limit, input.margin, 1.0).expect("normalized limit is valid");
    if let Some(draws) = asn.draws() {
        assert!(draws > 0);
    }

    let Ok(contest) = Contest::new(
        "fuzz",
        1,
        vec![
            Choice::reported("W", u64::from(input.winner_votes)),
            Choice::reported("L", u64::from(input.loser_votes)),
        ],
    ) else {
        return;
    };
    let Ok(mut audit) = SequentialBravo::new(&contest, risk_limit) else {
        return;
    };

    let mut latched = false;
    for ballot in input.ballots {
        let marks: &[&str] = match ballot {
            Ballot::Winner => &["W"],
            Ballot::Loser => &["L"],
            Ballot::Both => &["W", "L"],
            Ballot::Blank => &[],
        };
        let before = audit.overall_risk();
        let done = audit.observe(marks);
        if latched {
            assert!(done);
            assert_eq!(before.to_bits(), audit.overall_risk().to_bits());
        }
        latched = done;
    }

    let risk = audit.overall_risk();
    assert!(risk.is_nan() || (0.0..=1.0).contains(&risk));
    if latched {
        assert!(risk <= risk_limit * (1.0 + 1e-9));
    }

    let batch = risk_level(
        u64::from(input.winner_votes),
        u64::from(input.loser_votes),
        audit.ballots_observed(),
        0,
    );
    assert!(batch.is_nan() || (0.0..=1.0).contains(&batch));
});
