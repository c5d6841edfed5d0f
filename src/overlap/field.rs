//! Per-event runner slices used by the scans.

use std::collections::HashMap;

use crate::PaceTable;

/// The runners of one event, flattened into parallel arrays.
///
/// Runner ids are interned into slots so the scans can count distinct
/// runners and distinct pairs with plain integer sets.
#[derive(Debug, Clone)]
pub(crate) struct EventField<'a> {
    pub start_min: f64,
    pub paces: Vec<f64>,
    /// Id slot of each runner (index into `ids`)
    pub slots: Vec<usize>,
    /// Distinct runner ids, indexed by slot
    pub ids: Vec<&'a str>,
}

impl<'a> EventField<'a> {
    pub fn from_table(table: &'a PaceTable, event: &'a str, start_min: f64) -> Self {
        let mut field = Self {
            start_min,
            paces: Vec::new(),
            slots: Vec::new(),
            ids: Vec::new(),
        };
        let mut slot_of: HashMap<&'a str, usize> = HashMap::new();
        for runner in table.event_runners(event) {
            let id = runner.runner_id.as_str();
            let slot = *slot_of.entry(id).or_insert_with(|| {
                field.ids.push(id);
                field.ids.len() - 1
            });
            field.paces.push(runner.pace);
            field.slots.push(slot);
        }
        field
    }

    pub fn len(&self) -> usize {
        self.paces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paces.is_empty()
    }

    /// Keep only the runners whose flag is set. Id slots are preserved.
    pub fn retain(&self, keep: &[bool]) -> Self {
        let mut out = Self {
            start_min: self.start_min,
            paces: Vec::with_capacity(self.len()),
            slots: Vec::with_capacity(self.len()),
            ids: self.ids.clone(),
        };
        for (i, &kept) in keep.iter().enumerate() {
            if kept {
                out.paces.push(self.paces[i]);
                out.slots.push(self.slots[i]);
            }
        }
        out
    }

    /// Arrival times of every runner at `km`, written into `out`.
    #[inline]
    pub fn arrivals_at(&self, km: f64, out: &mut Vec<f64>) {
        out.clear();
        out.extend(self.paces.iter().map(|&p| self.start_min + p * km));
    }
}
