//! Property tests for the ingestion pipeline, driven through the public API.

use std::sync::Arc;

use proptest::prelude::*;
use sales_dash::domain::{IngestConfig, Metric, OwnerContext};
use sales_dash::io::ingest::{get_aggregate, ingest};
use sales_dash::store::MemoryStore;

const LABELS: [&str; 5] = ["2024-01-01", "2024-01-02", "2024-02-10", "Q1", "week 7"];

/// One generated data row; `None` means the cell is not a number.
#[derive(Debug, Clone)]
struct Row {
    label: &'static str,
    sales: Option<u32>,
    quantity: Option<u32>,
}

fn arb_row() -> impl Strategy<Value = Row> {
    (
        0..LABELS.len(),
        prop::option::weighted(0.8, 0u32..10_000),
        prop::option::weighted(0.8, 0u32..500),
    )
        .prop_map(|(i, sales, quantity)| Row {
            label: LABELS[i],
            sales,
            quantity,
        })
}

fn arb_rows(max_count: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(arb_row(), 1..=max_count)
}

fn cell(value: Option<u32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn to_csv(rows: &[Row]) -> Vec<u8> {
    let mut out = String::from("date,sales,quantity\n");
    for row in rows {
        out.push_str(&format!("{},{},{}\n", row.label, cell(row.sales), cell(row.quantity)));
    }
    out.into_bytes()
}

fn metric_value(row: &Row, metric: Metric) -> Option<u32> {
    match metric {
        Metric::Sales => row.sales,
        Metric::Quantity => row.quantity,
    }
}

/// Labels in first-seen order among rows carrying a valid value for `metric`.
fn expected_labels(rows: &[Row], metric: Metric) -> Vec<&'static str> {
    let mut labels = Vec::new();
    for row in rows {
        if metric_value(row, metric).is_some() && !labels.contains(&row.label) {
            labels.push(row.label);
        }
    }
    labels
}

fn any_valid(rows: &[Row]) -> bool {
    rows.iter().any(|r| r.sales.is_some() || r.quantity.is_some())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each bucket holds the sum of its accepted values.
    #[test]
    fn prop_bucket_equals_sum_of_accepted_values(rows in arb_rows(40)) {
        let store = MemoryStore::new();
        let outcome = ingest(&to_csv(&rows), &OwnerContext::admin("alice"), &IngestConfig::default(), &store).unwrap();
        prop_assert_eq!(outcome.accepted, any_valid(&rows));

        let Some(agg) = outcome.aggregate else {
            return Ok(());
        };
        for metric in Metric::ALL {
            for label in LABELS {
                let expected: u64 = rows
                    .iter()
                    .filter(|r| r.label == label)
                    .filter_map(|r| metric_value(r, metric))
                    .map(u64::from)
                    .sum();
                let has_any = rows.iter().any(|r| r.label == label && metric_value(r, metric).is_some());
                let actual = agg.series(metric).value_of(label);
                if has_any {
                    prop_assert_eq!(actual, Some(expected as f64));
                } else {
                    prop_assert_eq!(actual, None);
                }
            }
        }
    }

    /// Labels are unique and keep first-occurrence order.
    #[test]
    fn prop_labels_unique_and_in_first_seen_order(rows in arb_rows(40)) {
        let store = MemoryStore::new();
        let outcome = ingest(&to_csv(&rows), &OwnerContext::admin("alice"), &IngestConfig::default(), &store).unwrap();
        let Some(agg) = outcome.aggregate else {
            return Ok(());
        };
        for metric in Metric::ALL {
            let series = agg.series(metric);
            prop_assert_eq!(series.duplicate_label(), None);
            let labels: Vec<&str> = series.labels().collect();
            prop_assert_eq!(labels, expected_labels(&rows, metric));
        }
    }

    /// Row bookkeeping: every data row is counted, fully invalid rows are rejected.
    #[test]
    fn prop_row_counts_match_input(rows in arb_rows(40)) {
        let store = MemoryStore::new();
        let outcome = ingest(&to_csv(&rows), &OwnerContext::admin("alice"), &IngestConfig::default(), &store).unwrap();
        let Some(agg) = outcome.aggregate else {
            return Ok(());
        };
        let rejected = rows.iter().filter(|r| r.sales.is_none() && r.quantity.is_none()).count();
        prop_assert_eq!(agg.row_count, rows.len());
        prop_assert_eq!(agg.rejected_count, rejected);
    }

    /// Uploading the same bytes twice yields the same series.
    #[test]
    fn prop_ingest_is_idempotent(rows in arb_rows(30)) {
        let store = MemoryStore::new();
        let owner = OwnerContext::admin("alice");
        let bytes = to_csv(&rows);
        let first = ingest(&bytes, &owner, &IngestConfig::default(), &store).unwrap();
        let second = ingest(&bytes, &owner, &IngestConfig::default(), &store).unwrap();

        prop_assert_eq!(first.accepted, second.accepted);
        prop_assert_eq!(&first.errors, &second.errors);
        if let (Some(a), Some(b)) = (&first.aggregate, &second.aggregate) {
            prop_assert!(a.same_content(b));
        }
    }

    /// A file where no row is usable never replaces an existing aggregate.
    #[test]
    fn prop_all_reject_keeps_prior_aggregate(rows in arb_rows(20), bad in 1usize..10) {
        prop_assume!(any_valid(&rows));
        let store = MemoryStore::new();
        let owner = OwnerContext::admin("alice");
        let config = IngestConfig::default();

        let prior = ingest(&to_csv(&rows), &owner, &config, &store).unwrap().aggregate.unwrap();

        let junk: Vec<Row> = (0..bad)
            .map(|i| Row { label: LABELS[i % LABELS.len()], sales: None, quantity: None })
            .collect();
        let outcome = ingest(&to_csv(&junk), &owner, &config, &store).unwrap();
        prop_assert!(!outcome.accepted);
        prop_assert_eq!(outcome.errors.len(), bad * 2);

        let current = get_aggregate(&store, &owner).unwrap().unwrap();
        prop_assert!(Arc::ptr_eq(&prior, &current));
    }
}
