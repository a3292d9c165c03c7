//! Reconciles a freshly pulled batch with the stored history.
//!
//! For every period the row with the latest capture time survives. On an exact
//! capture-time tie the first row seen wins, where the scan order is the
//! existing dataset followed by the incoming batch. Output is sorted ascending
//! by period. Inputs are never modified.

use crate::domain::{Batch, Dataset, Period, PullRecord};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub dataset: Dataset,
    /// Rows dropped because another row for the same period won.
    pub discarded: usize,
}

/// Merges `incoming` into `existing`. Total over all inputs.
///
/// The output uses the incoming batch's term list as its header.
pub fn merge(existing: Option<&Dataset>, incoming: &Batch) -> MergeOutcome {
    let existing_rows = existing.map_or(&[][..], Dataset::rows);
    let considered = existing_rows.len() + incoming.len();

    let mut kept: BTreeMap<Period, &PullRecord> = BTreeMap::new();
    for row in existing_rows.iter().chain(incoming.rows()) {
        match kept.entry(row.period) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if row.pulled_at > slot.get().pulled_at {
                    slot.insert(row);
                }
            }
        }
    }

    let rows: Vec<PullRecord> = kept.into_values().cloned().collect();
    let discarded = considered - rows.len();

    MergeOutcome {
        dataset: Dataset::new(incoming.terms().to_vec(), rows),
        discarded,
    }
}
