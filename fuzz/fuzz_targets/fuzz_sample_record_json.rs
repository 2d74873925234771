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

use libfuzzer_sys::fuzz_target;
use rla_core::sample_report::{render_sample_report, SampleRecord};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = SampleRecord::from_json(text) else {
        return;
    };
    // Sampling work is bounded by the published lists, not the declared size.
    if record.verify().is_ok() {
        assert_eq!(record.old.len() + record.new.len(), record.request.n);
        let report = render_sample_report(&record);
        assert!(report.ends_with("Done.\n"));
        let reloaded = SampleRecord::from_json(&record.to_json().expect("serializable"))
            .expect("round trip");
        assert_eq!(reloaded, record);
    }
});
