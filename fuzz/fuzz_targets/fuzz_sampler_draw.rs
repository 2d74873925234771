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

use std::collections::HashSet;

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use rla_core::{draw, AuditError};

#[derive(Debug, Arbitrary)]
struct Input {
    seed: String,
    a: i64,
    width: u16,
    n: u8,
    skip: u8,
    with_replacement: bool,
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = Input::arbitrary(&mut u) else {
        return;
    };

    let n = usize::from(input.n % 64);
    let b = input.a.saturating_add(i64::from(input.width));
    let population = (b as i128 - input.a as i128 + 1) as u128;

    match draw(n, input.with_replacement, input.a, b, &input.seed, usize::from(input.skip)) {
        Ok(sample) => {
            assert_eq!(sample.len(), n);
            assert_eq!(sample.old.len(), usize::from(input.skip));
            assert!(sample.combined().iter().all(|v| (input.a..=b).contains(v)));
            assert!(sample.counters_consumed >= n as u64);
            if !input.with_replacement {
                let distinct: HashSet<i64> = sample.combined().into_iter().collect();
                assert_eq!(distinct.len(), n);
            }
        }
        Err(AuditError::InfeasibleSample { .. }) => {
            assert!(!input.with_replacement && n as u128 > population);
        }
        Err(AuditError::InvalidSkip { skip, n: size }) => assert!(skip > size),
        Err(other) => panic!("unexpected error: {other}"),
    }
});
