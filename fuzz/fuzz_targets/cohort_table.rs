#![no_main]

use cohortstat::persistence::read_cohort_from_reader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either parse or fail cleanly, never panic
    if let Ok(stats) = read_cohort_from_reader(data) {
        for stat in stats {
            assert!(stat.mean.is_finite() && stat.stdev.is_finite());
        }
    }
});
