#![forbid(unsafe_code)]

//! Property tests for fault aggregation.
//!
//! 1. Group counts do not depend on insertion order.
//! 2. The example of a group is the first method recorded for it.
//! 3. Reports are always sorted by kind, count (descending), message.
//! 4. The CSV export has one row per group after the header.

use std::collections::HashMap;

use proptest::prelude::*;
use svmgold_harness::explorer::StackFrame;
use svmgold_harness::statistics::CSV_HEADER;
use svmgold_harness::{ExceptionAggregator, Fault};

// ── Strategies ────────────────────────────────────────────────────────────

fn fault() -> impl Strategy<Value = Fault> {
    (
        prop_oneof![Just("InvalidCast"), Just("NullReference"), Just("Panic")],
        prop_oneof![Just("a"), Just("b"), Just("c, with comma")],
        prop::option::of(1u32..4),
    )
        .prop_map(|(kind, message, line)| {
            let fault = Fault::new(kind, message);
            match line {
                Some(line) => fault.with_frame(StackFrame::new("Engine.Step", Some(line))),
                None => fault,
            }
        })
}

fn records() -> impl Strategy<Value = Vec<(Fault, String)>> {
    prop::collection::vec(fault(), 0..40).prop_map(|faults| {
        faults
            .into_iter()
            .enumerate()
            .map(|(i, f)| (f, format!("Demo.Tests.M{i}")))
            .collect()
    })
}

fn aggregate(records: &[(Fault, String)]) -> ExceptionAggregator {
    let mut agg = ExceptionAggregator::new();
    for (fault, method) in records {
        agg.record(fault, method);
    }
    agg
}

fn counts(agg: &ExceptionAggregator) -> HashMap<(String, String, String), usize> {
    agg.report()
        .exceptions
        .into_iter()
        .map(|e| ((e.kind, e.message, e.location), e.count))
        .collect()
}

proptest! {
    #[test]
    fn counts_ignore_insertion_order(records in records(), seed in any::<u64>()) {
        let mut shuffled = records.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = usize::try_from(state % (i as u64 + 1)).unwrap();
            shuffled.swap(i, j);
        }
        prop_assert_eq!(counts(&aggregate(&records)), counts(&aggregate(&shuffled)));
    }

    #[test]
    fn example_is_first_recorded(records in records()) {
        let report = aggregate(&records).report();
        for info in &report.exceptions {
            let first = records
                .iter()
                .find(|(f, _)| f.kind == info.kind && f.message == info.message && f.location() == info.location)
                .map(|(_, m)| m.clone())
                .unwrap();
            prop_assert_eq!(&info.example_method, &first);
        }
    }

    #[test]
    fn report_is_sorted(records in records()) {
        let report = aggregate(&records).report();
        for pair in report.exceptions.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let ordered = a.kind < b.kind
                || (a.kind == b.kind && a.count > b.count)
                || (a.kind == b.kind && a.count == b.count && a.message <= b.message);
            prop_assert!(ordered, "{a:?} before {b:?}");
        }
        let total: usize = report.exceptions.iter().map(|e| e.count).sum();
        prop_assert_eq!(total, records.len());
    }

    #[test]
    fn csv_has_one_row_per_group(records in records()) {
        let report = aggregate(&records).report();
        let csv = report.to_csv().unwrap();
        prop_assert!(csv.starts_with(CSV_HEADER));
        // Messages contain no newlines here, so rows are lines.
        prop_assert_eq!(csv.lines().count(), report.exceptions.len() + 1);
    }
}

#[test]
fn three_identical_faults_in_any_order() {
    let f = Fault::new("InvalidOperation", "stuck").with_frame(StackFrame::new("Engine.Step", Some(9)));
    let orders = [
        ["T.a", "T.b", "T.c"],
        ["T.b", "T.c", "T.a"],
        ["T.c", "T.a", "T.b"],
    ];
    for order in orders {
        let mut agg = ExceptionAggregator::new();
        for method in order {
            agg.record(&f, method);
        }
        let report = agg.report();
        assert_eq!(report.exceptions.len(), 1);
        assert_eq!(report.exceptions[0].count, 3);
        assert_eq!(report.exceptions[0].example_method, order[0]);
    }
}
