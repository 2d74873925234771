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

//! rla-core
//!
//! The statistical engine of a ballot-polling risk-limiting audit.
//!
//! - Seeded Sampler: counter-mode SHA-256 selection of ballots from a public
//!   seed, reproducible bit-for-bit and extendable across audit rounds
//! - Risk Engine: BRAVO risk levels per winner/loser pair, the
//!   outright-majority test, weakest-link contest status and the expected
//!   number of further draws
//!
//! Both halves are pure functions of their explicit inputs. Round
//! bookkeeping (seed, previous sample sizes, cumulative tallies) belongs to
//! the caller.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod assessment;
pub mod config;
pub mod contest;
pub mod digest;
pub mod error;
pub mod risk;
pub mod sample_report;
pub mod sampler;
pub mod sequential;

pub use crate::assessment::{
    assess_contest, assess_contests, AuditReport, AuditStatus, ContestAssessment, PairKind,
    RiskRecord,
};
pub use crate::config::AuditConfig;
pub use crate::contest::{Choice, Contest, ContestOutcome};
pub use crate::error::{AuditError, AuditResult};
pub use crate::risk::{checked_risk_level, find_asn, risk_level, SampleSize};
pub use crate::sampler::{draw, Sample, SampleGenerator, SampleRequest};
pub use crate::sequential::SequentialBravo;
