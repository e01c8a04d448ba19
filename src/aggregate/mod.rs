//! Folding validated records into per-metric time series.
//!
//! Each metric keeps an insertion-ordered `label -> sum` map. Output order is
//! the order labels were first seen, which keeps chart x-axes stable and
//! follows the usual chronological file layout without parsing labels.
//!
//! Sums stay finite: a record whose addition would overflow its bucket is
//! handed back to the caller instead of being folded.

use indexmap::IndexMap;

use crate::domain::{Metric, MetricRecord, SeriesPoint, TimeSeries};

/// Sales + quantity series produced by one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesPair {
    pub sales: TimeSeries,
    pub quantity: TimeSeries,
}

#[derive(Debug, Clone, Default)]
struct SeriesAccumulator {
    points: IndexMap<String, f64>,
}

impl SeriesAccumulator {
    /// Returns `false` (leaving the bucket untouched) when the sum would overflow.
    fn add(&mut self, label: &str, value: f64) -> bool {
        let current = self.points.get(label).copied().unwrap_or(0.0);
        let sum = current + value;
        if !sum.is_finite() {
            return false;
        }
        match self.points.get_mut(label) {
            Some(slot) => *slot = sum,
            None => {
                self.points.insert(label.to_string(), sum);
            }
        }
        true
    }

    fn finish(self) -> TimeSeries {
        TimeSeries::from_points(
            self.points
                .into_iter()
                .map(|(label, value)| SeriesPoint { label, value })
                .collect(),
        )
    }
}

/// Working accumulator owned by a single ingestion run.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    sales: SeriesAccumulator,
    quantity: SeriesAccumulator,
    records: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch of records (typically one row's worth).
    ///
    /// Records that would push their bucket past `f64::MAX` are returned
    /// unfolded, in input order.
    pub fn fold<I>(&mut self, records: I) -> Vec<MetricRecord>
    where
        I: IntoIterator<Item = MetricRecord>,
    {
        let mut overflowed = Vec::new();
        for record in records {
            let acc = match record.metric {
                Metric::Sales => &mut self.sales,
                Metric::Quantity => &mut self.quantity,
            };
            if acc.add(&record.label, record.value) {
                self.records += 1;
            } else {
                overflowed.push(record);
            }
        }
        overflowed
    }

    /// Number of records folded so far.
    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn finish(self) -> SeriesPair {
        SeriesPair {
            sales: self.sales.finish(),
            quantity: self.quantity.finish(),
        }
    }
}

/// One-shot fold over a complete record list. Overflowing records are dropped.
pub fn fold_all<I>(records: I) -> SeriesPair
where
    I: IntoIterator<Item = MetricRecord>,
{
    let mut agg = Aggregator::new();
    let _ = agg.fold(records);
    agg.finish()
}
