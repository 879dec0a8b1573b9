use std::cmp::Ordering;

use crate::ir::{DataRecord, SortOrder, Validity};

use super::{EmptyReason, ValueItem};

/// Normalizer output. `Empty` means "nothing to render", not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Items { items: Vec<ValueItem>, total: f64 },
    Empty(EmptyReason),
}

impl Normalized {
    pub fn items(&self) -> &[ValueItem] {
        match self {
            Normalized::Items { items, .. } => items,
            Normalized::Empty(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Normalized::Empty(_))
    }
}

pub fn normalize_values(records: &[DataRecord], sort: SortOrder, validity: Validity) -> Normalized {
    let mut kept: Vec<(usize, &DataRecord)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| validity.accepts(record.value))
        .collect();
    let dropped = records.len() - kept.len();
    if dropped > 0 {
        tracing::debug!(dropped, ?validity, "records rejected by validity rule");
    }
    if kept.is_empty() {
        return Normalized::Empty(EmptyReason::NoValidRecords);
    }

    let total: f64 = kept.iter().map(|(_, record)| record.value).sum();
    if !(total > 0.0) || !total.is_finite() {
        return Normalized::Empty(EmptyReason::NonPositiveTotal);
    }

    // `sort_by` is stable, so ties keep input order.
    match sort {
        SortOrder::Ascending => kept.sort_by(|a, b| {
            a.1.value
                .partial_cmp(&b.1.value)
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::Descending => kept.sort_by(|a, b| {
            b.1.value
                .partial_cmp(&a.1.value)
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::None => {}
    }

    let items = kept
        .into_iter()
        .map(|(id, record)| ValueItem {
            id,
            category: record.category.clone(),
            raw_value: record.value,
            share: record.value / total,
        })
        .collect();
    Normalized::Items { items, total }
}
