//! Reporting utilities: the dashboard view and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the ingestion code only produces structured reasons
//! - output changes are localized

use serde::Serialize;

use crate::domain::{DatasetAggregate, TimeSeries};

pub mod format;

pub use format::*;

/// What the dashboard consumes: both series, metadata stripped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub sales: TimeSeries,
    pub quantity: TimeSeries,
}

impl From<&DatasetAggregate> for DashboardView {
    fn from(aggregate: &DatasetAggregate) -> Self {
        Self {
            sales: aggregate.sales.clone(),
            quantity: aggregate.quantity.clone(),
        }
    }
}

impl DashboardView {
    /// View for an owner who never uploaded.
    pub fn empty() -> Self {
        Self {
            sales: TimeSeries::default(),
            quantity: TimeSeries::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IngestConfig, OwnerContext};
    use crate::io::ingest::ingest;
    use crate::store::MemoryStore;

    #[test]
    fn view_json_has_only_series() {
        let store = MemoryStore::new();
        let agg = ingest(
            b"date,sales,quantity\n2024-01,10,2\n",
            &OwnerContext::admin("alice"),
            &IngestConfig::default(),
            &store,
        )
        .unwrap()
        .aggregate
        .unwrap();

        let json = serde_json::to_value(DashboardView::from(agg.as_ref())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sales": [{"label": "2024-01", "value": 10.0}],
                "quantity": [{"label": "2024-01", "value": 2.0}],
            })
        );
        assert_eq!(
            serde_json::to_value(DashboardView::empty()).unwrap(),
            serde_json::json!({"sales": [], "quantity": []})
        );
    }
}
