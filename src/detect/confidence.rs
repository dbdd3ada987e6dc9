use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::AnimalClass;

/// Learned per-class corrections never exceed this magnitude.
pub const ADJUSTMENT_LIMIT: f64 = 0.3;

/// Per-class additive offsets applied to raw model confidence before
/// thresholding.
///
/// Read on every analysis pass, written once per round by the learning
/// loop. The lock keeps each class update whole; readers racing a
/// round-end write may observe either the old or the new value, which is
/// acceptable for a heuristic.
#[derive(Clone, Default)]
pub struct ConfidenceStore {
    adjustments: Arc<RwLock<HashMap<AnimalClass, f64>>>,
}

impl ConfidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset for a class, 0.0 when nothing has been learned.
    pub fn get(&self, class: AnimalClass) -> f64 {
        self.adjustments
            .read()
            .unwrap()
            .get(&class)
            .copied()
            .unwrap_or(0.0)
    }

    /// Accumulates a correction, keeping the stored total inside
    /// [-ADJUSTMENT_LIMIT, +ADJUSTMENT_LIMIT].
    pub fn add(&self, class: AnimalClass, delta: f64) {
        let mut guard = self.adjustments.write().unwrap();
        let entry = guard.entry(class).or_insert(0.0);
        *entry = (*entry + delta).clamp(-ADJUSTMENT_LIMIT, ADJUSTMENT_LIMIT);
    }

    /// Applies the class offset to a raw confidence, clamped to [0, 1].
    pub fn apply(&self, class: AnimalClass, raw_confidence: f64) -> f64 {
        (raw_confidence + self.get(class)).clamp(0.0, 1.0)
    }

    /// Snapshot of every learned adjustment, for summaries.
    pub fn snapshot(&self) -> HashMap<AnimalClass, f64> {
        self.adjustments.read().unwrap().clone()
    }

    pub fn clear(&self) {
        self.adjustments.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetKind;

    const BOAR: AnimalClass = AnimalClass::Target(TargetKind::Boar);

    #[test]
    fn unknown_class_defaults_to_zero() {
        let store = ConfidenceStore::new();
        assert_eq!(store.get(AnimalClass::Human), 0.0);
    }

    #[test]
    fn accumulated_adjustment_stays_clamped() {
        let store = ConfidenceStore::new();
        for _ in 0..50 {
            store.add(BOAR, 0.1);
        }
        assert!((store.get(BOAR) - ADJUSTMENT_LIMIT).abs() < 1e-9);

        for _ in 0..100 {
            store.add(BOAR, -0.07);
        }
        assert!((store.get(BOAR) + ADJUSTMENT_LIMIT).abs() < 1e-9);
    }

    #[test]
    fn apply_clamps_into_unit_interval() {
        let store = ConfidenceStore::new();
        store.add(BOAR, 0.3);
        assert_eq!(store.apply(BOAR, 0.9), 1.0);

        store.add(BOAR, -0.6);
        assert_eq!(store.apply(BOAR, 0.1), 0.0);
    }

    #[test]
    fn clear_drops_all_adjustments() {
        let store = ConfidenceStore::new();
        store.add(BOAR, 0.2);
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
