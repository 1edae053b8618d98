//! Shared accumulation target for concurrent deposition.

use std::sync::atomic::{AtomicU64, Ordering};

use corona_core::InvariantViolation;

use crate::array::{FieldArray, Layout};

/// An f64 array supporting lock-free `add` from many threads.
///
/// Values are stored as `f64` bit patterns in `AtomicU64` and updated with a
/// compare-exchange loop. Addition order is not deterministic, so results
/// agree with a serial sum to rounding.
#[derive(Debug)]
pub struct AtomicFieldArray {
    layout: Layout,
    data: Vec<AtomicU64>,
}

impl AtomicFieldArray {
    /// Zeroed array with the given layout.
    pub fn new(layout: Layout) -> Self {
        let zero = 0.0f64.to_bits();
        Self {
            layout,
            data: (0..layout.num_points()).map(|_| AtomicU64::new(zero)).collect(),
        }
    }

    /// Zeroed array matching the layout of `like`.
    pub fn like(like: &FieldArray) -> Self {
        Self::new(*like.layout())
    }

    /// Index layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Atomically add `value` at a stored index. Returns `false` and does
    /// nothing when `idx` is outside storage.
    pub fn add(&self, idx: [i64; 3], value: f64) -> bool {
        match self.layout.offset(idx) {
            Some(o) => {
                self.add_at(o, value);
                true
            }
            None => false,
        }
    }

    /// Atomically add `value` at a flat offset.
    pub fn add_at(&self, offset: usize, value: f64) {
        let cell = &self.data[offset];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Current value at a stored index.
    pub fn get(&self, idx: [i64; 3]) -> f64 {
        f64::from_bits(self.data[self.layout.index(idx)].load(Ordering::Relaxed))
    }

    /// Add the accumulated values into `target`, which must share the layout.
    pub fn add_into(self, target: &mut FieldArray) -> Result<(), InvariantViolation> {
        if *target.layout() != self.layout {
            return Err(InvariantViolation::ShapeMismatch {
                expected: target.layout().n(),
                found: self.layout.n(),
            });
        }
        for (dst, src) in target.data_mut().iter_mut().zip(self.data) {
            *dst += f64::from_bits(src.into_inner());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_core::FieldKind;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_sum_exactly_for_integers() {
        let layout = Layout::new([4, 1, 4], 1, [true, false, true]);
        let acc = Arc::new(AtomicFieldArray::new(layout));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        acc.add([1, 0, 2], 1.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(acc.get([1, 0, 2]), 8000.0);
    }

    #[test]
    fn out_of_layout_add_is_rejected() {
        let acc = AtomicFieldArray::new(Layout::new([2, 2, 2], 0, [true; 3]));
        assert!(!acc.add([5, 0, 0], 1.0));
    }

    #[test]
    fn add_into_accumulates_onto_existing_values() {
        let layout = Layout::new([2, 1, 2], 1, [true, false, true]);
        let mut target = FieldArray::with_layout(FieldKind::Jx, layout);
        target.set([0, 0, 0], 1.5);
        let acc = AtomicFieldArray::like(&target);
        acc.add([0, 0, 0], 2.0);
        acc.add_into(&mut target).unwrap();
        assert_eq!(target.get([0, 0, 0]), 3.5);
    }
}
