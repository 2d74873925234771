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

//! Counter-mode SHA-256 digests and the full-width reduction that maps them
//! onto an inclusive integer range.
//!
//! The reduction treats the 32 digest bytes as one big-endian unsigned
//! integer, exactly as the hex digest read as an integer, and reduces the
//! whole 256-bit value. Truncating to a machine word first yields different
//! picks and breaks independent recomputation of a published sample.

use crate::error::{AuditError, AuditResult};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator placed between the seed and the decimal counter.
pub const COUNTER_SEPARATOR: &[u8] = b",";

/// `SHA-256(seed || "," || decimal(counter))`.
pub fn counter_digest(seed: &str, counter: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(COUNTER_SEPARATOR);
    hasher.update(counter.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

pub fn digest_hex(digest: &[u8; 32]) -> String {
    hex::encode(digest)
}

/// Reduce the 256-bit big-endian integer `digest` modulo `modulus`.
///
/// A zero modulus has no residues; it maps to 0.
pub fn reduce_mod(digest: &[u8; 32], modulus: u128) -> u128 {
    if modulus == 0 {
        return 0;
    }
    let value = BigUint::from_bytes_be(digest);
    let rem = value % BigUint::from(modulus);
    // rem < modulus, so it always fits.
    rem.to_u128().unwrap_or(0)
}

/// Inclusive integer range `[a, b]` that draws are taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopulationRange {
    a: i64,
    b: i64,
}

impl PopulationRange {
    pub fn new(a: i64, b: i64) -> AuditResult<Self> {
        if a > b {
            return Err(AuditError::InvalidRange { a, b });
        }
        Ok(Self { a, b })
    }

    pub fn start(&self) -> i64 {
        self.a
    }

    pub fn end(&self) -> i64 {
        self.b
    }

    /// `N = b - a + 1`; at most 2^64, hence the wide type.
    pub fn size(&self) -> u128 {
        (i128::from(self.b) - i128::from(self.a) + 1) as u128
    }

    pub fn contains(&self, value: i64) -> bool {
        self.a <= value && value <= self.b
    }

    /// `a + (digest mod N)`.
    pub fn pick(&self, digest: &[u8; 32]) -> i64 {
        let offset = reduce_mod(digest, self.size());
        (i128::from(self.a) + offset as i128) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEED: &str = "3546311556112163624615351222";

    fn horner_mod(digest: &[u8; 32], modulus: u128) -> u128 {
        digest
            .iter()
            .fold(0u128, |acc, byte| (acc * 256 + u128::from(*byte)) % modulus)
    }

    #[test]
    fn digest_matches_reference_vector() {
        let digest = counter_digest(SEED, 1);
        assert_eq!(
            digest_hex(&digest),
            "004e68eb257edb56ee08a323f432b8a8aecb8d6d52cd109536ffadb367443213"
        );
    }

    #[test]
    fn first_reference_pick() {
        let range = PopulationRange::new(1, 876).expect("range");
        assert_eq!(range.pick(&counter_digest(SEED, 1)), 740);
        assert_eq!(range.pick(&counter_digest(SEED, 2)), 180);
    }

    #[test]
    fn reduction_uses_all_256_bits() {
        let digest = counter_digest(SEED, 1);
        let modulus = u128::from(u64::MAX) - 58;
        let mut low = [0u8; 8];
        low.copy_from_slice(&digest[24..]);
        let truncated = u128::from(u64::from_be_bytes(low)) % modulus;

        let full = reduce_mod(&digest, modulus);
        assert_eq!(full, 17_046_611_446_648_137_738);
        assert_ne!(full, truncated);
        assert_eq!(
            reduce_mod(&digest, u128::MAX - 158),
            297_075_793_780_239_326_641_500_466_554_494_837_355
        );
    }

    #[test]
    fn degenerate_moduli() {
        let digest = counter_digest(SEED, 7);
        assert_eq!(reduce_mod(&digest, 0), 0);
        assert_eq!(reduce_mod(&digest, 1), 0);
    }

    #[test]
    fn range_validation_and_size() {
        assert_eq!(
            PopulationRange::new(5, 4),
            Err(AuditError::InvalidRange { a: 5, b: 4 })
        );
        let single = PopulationRange::new(7, 7).expect("single");
        assert_eq!(single.size(), 1);
        assert_eq!(single.pick(&counter_digest(SEED, 3)), 7);

        let full = PopulationRange::new(i64::MIN, i64::MAX).expect("full");
        assert_eq!(full.size(), 1u128 << 64);
        let pick = full.pick(&counter_digest(SEED, 1));
        assert!(full.contains(pick));
    }

    proptest! {
        #[test]
        fn reduction_agrees_with_bytewise_horner(
            bytes in proptest::collection::vec(any::<u8>(), 32),
            modulus in 1u128..=(1u128 << 64),
        ) {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&bytes);
            prop_assert_eq!(reduce_mod(&digest, modulus), horner_mod(&digest, modulus));
        }

        #[test]
        fn picks_stay_in_range(a in -1_000_000i64..1_000_000, width in 0i64..10_000, counter in 1u64..10_000) {
            let range = PopulationRange::new(a, a + width).expect("range");
            let pick = range.pick(&counter_digest(SEED, counter));
            prop_assert!(range.contains(pick));
        }
    }
}
