//! Parallel accumulation drivers for deposition kernels.

use rayon::prelude::*;

use corona_core::{InvariantViolation, ParticleId};
use corona_grid::{AtomicFieldArray, FieldArray, IndexBox, Layout};

use super::{Accumulation, DepositKernel, GridSink};
use crate::tile::ParticleTile;

/// Private accumulation buffer covering one tile and its guard band.
///
/// Contributions outside the region go to an overflow list so a particle
/// that strayed further than expected still lands on the grid.
#[derive(Clone, Debug)]
pub struct ScratchTile {
    region: IndexBox,
    data: Vec<f64>,
    overflow: Vec<([i64; 3], f64)>,
}

impl ScratchTile {
    /// Zeroed buffer over `region`.
    pub fn new(region: IndexBox) -> Self {
        Self {
            region,
            data: vec![0.0; region.num_points()],
            overflow: Vec::new(),
        }
    }

    /// Covered index box.
    pub fn region(&self) -> IndexBox {
        self.region
    }

    fn offset(&self, idx: [i64; 3]) -> Option<usize> {
        if !self.region.contains(idx) {
            return None;
        }
        let ext = self.region.extent();
        let p: [usize; 3] = std::array::from_fn(|d| (idx[d] - self.region.lo[d]) as usize);
        Some(p[0] + ext[0] * (p[1] + ext[1] * p[2]))
    }

    /// Add `value` at `idx`.
    pub fn add(&mut self, idx: [i64; 3], value: f64) {
        match self.offset(idx) {
            Some(o) => self.data[o] += value,
            None => self.overflow.push((idx, value)),
        }
    }

    /// Value accumulated at `idx`, overflow included.
    pub fn get(&self, idx: [i64; 3]) -> f64 {
        let inside = self.offset(idx).map(|o| self.data[o]).unwrap_or(0.0);
        let spilled: f64 = self
            .overflow
            .iter()
            .filter(|(i, _)| *i == idx)
            .map(|(_, v)| v)
            .sum();
        inside + spilled
    }

    /// Number of contributions that fell outside the region.
    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    /// Atomically add every nonzero value into `target`.
    ///
    /// Fails on the first point `target` does not store; points merged
    /// before it stay added.
    pub fn merge_into(self, target: &AtomicFieldArray) -> Result<(), InvariantViolation> {
        let inside = self.region.iter().zip(self.data).filter(|(_, v)| *v != 0.0);
        for (idx, v) in inside.chain(self.overflow) {
            if !target.add(idx, v) {
                return Err(InvariantViolation::DepositOutsideStorage { index: idx });
            }
        }
        Ok(())
    }
}

struct ScratchSink<'a, const N: usize>(&'a mut [ScratchTile; N]);

impl<const N: usize> GridSink for ScratchSink<'_, N> {
    fn add(&mut self, component: usize, idx: [i64; 3], value: f64) {
        self.0[component].add(idx, value);
    }
}

struct AtomicSink<'a, const N: usize> {
    targets: &'a [AtomicFieldArray; N],
    dropped: Option<[i64; 3]>,
}

impl<const N: usize> GridSink for AtomicSink<'_, N> {
    fn add(&mut self, component: usize, idx: [i64; 3], value: f64) {
        if !self.targets[component].add(idx, value) && self.dropped.is_none() {
            self.dropped = Some(idx);
        }
    }
}

/// Scratch region of a tile: its cell box grown by the guard width of
/// `layout`, including the closing node.
fn scratch_region(tile_box: IndexBox, layout: &Layout) -> IndexBox {
    let ng = layout.ng();
    let mut region = tile_box.grow(ng.map(|g| g as i64));
    for d in 0..3 {
        if layout.is_active(d) {
            region.hi[d] += 1;
        }
    }
    region.intersect(&layout.allocated_box())
}

/// Run `kernel` over every valid particle of `tiles`, adding the result
/// into `targets`.
///
/// Targets keep their existing values; the deposit is added on top. Guard
/// cells of the targets receive contributions and are left stale.
pub fn accumulate<const N: usize, K: DepositKernel>(
    tiles: Vec<(&ParticleTile, IndexBox)>,
    targets: [&mut FieldArray; N],
    backend: Accumulation,
    kernel: &K,
) -> Result<(), InvariantViolation> {
    debug_assert_eq!(N, K::COMPONENTS);
    let atomics: [AtomicFieldArray; N] = std::array::from_fn(|c| AtomicFieldArray::like(&*targets[c]));
    match backend {
        Accumulation::ThreadLocal => {
            let layout = *targets[0].layout();
            let deposit_tile = |(tile, tile_box): (&ParticleTile, IndexBox)| -> Result<(), InvariantViolation> {
                let region = scratch_region(tile_box, &layout);
                let mut scratch: [ScratchTile; N] = std::array::from_fn(|_| ScratchTile::new(region));
                let mut sink = ScratchSink(&mut scratch);
                for i in 0..tile.len() {
                    if ParticleId(tile.id[i]).is_valid() {
                        kernel.deposit(tile, i, &mut sink)?;
                    }
                }
                for (c, s) in scratch.into_iter().enumerate() {
                    s.merge_into(&atomics[c])?;
                }
                Ok(())
            };
            tiles.into_par_iter().try_for_each(deposit_tile)?;
        }
        Accumulation::Atomic => {
            tiles.into_par_iter().try_for_each(|(tile, _)| {
                (0..tile.len()).into_par_iter().try_for_each(|i| {
                    if !ParticleId(tile.id[i]).is_valid() {
                        return Ok(());
                    }
                    let mut sink = AtomicSink {
                        targets: &atomics,
                        dropped: None,
                    };
                    kernel.deposit(tile, i, &mut sink)?;
                    match sink.dropped {
                        Some(index) => Err(InvariantViolation::DepositOutsideStorage { index }),
                        None => Ok(()),
                    }
                })
            })?;
        }
    }
    for (acc, target) in atomics.into_iter().zip(targets) {
        acc.add_into(target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::ParticleData;
    use corona_core::FieldKind;
    use smallvec::SmallVec;

    /// Deposits one unit far outside any small test grid.
    struct FarKernel;

    impl DepositKernel for FarKernel {
        const COMPONENTS: usize = 1;

        fn deposit<S: GridSink>(&self, _: &ParticleTile, _: usize, sink: &mut S) -> Result<(), InvariantViolation> {
            sink.add(0, [40, 0, 40], 1.0);
            Ok(())
        }
    }

    fn one_particle() -> ParticleTile {
        let mut tile = ParticleTile::default();
        tile.push(ParticleData {
            id: 0,
            cpu: 0,
            pos: [1.0, 0.0, 1.0],
            u: [0.0; 3],
            w: 1.0,
            runtime: SmallVec::new(),
        });
        tile
    }

    #[test]
    fn scratch_keeps_out_of_region_points() {
        let mut s = ScratchTile::new(IndexBox::new([0, 0, 0], [2, 1, 2]));
        s.add([1, 0, 1], 2.0);
        s.add([5, 0, 5], 3.0);
        s.add([5, 0, 5], 1.0);
        assert_eq!(s.get([1, 0, 1]), 2.0);
        assert_eq!(s.get([5, 0, 5]), 4.0);
        assert_eq!(s.overflow_len(), 2);
    }

    #[test]
    fn scratch_merges_into_atomic_target() {
        let layout = Layout::new([4, 1, 4], 2, [true, false, true]);
        let target = FieldArray::with_layout(FieldKind::Rho, layout);
        let acc = AtomicFieldArray::like(&target);
        let mut s = ScratchTile::new(IndexBox::new([-2, 0, -2], [2, 1, 2]));
        s.add([-2, 0, 1], 1.5);
        s.add([3, 0, 3], 0.5);
        s.merge_into(&acc).unwrap();
        assert_eq!(acc.get([-2, 0, 1]), 1.5);
        assert_eq!(acc.get([3, 0, 3]), 0.5);
    }

    #[test]
    fn merge_reports_points_outside_the_target() {
        let layout = Layout::new([4, 1, 4], 2, [true, false, true]);
        let target = FieldArray::with_layout(FieldKind::Rho, layout);
        let acc = AtomicFieldArray::like(&target);
        let mut s = ScratchTile::new(IndexBox::new([0, 0, 0], [2, 1, 2]));
        s.add([1, 0, 1], 1.0);
        s.add([9, 0, 9], 1.0);
        assert_eq!(
            s.merge_into(&acc),
            Err(InvariantViolation::DepositOutsideStorage { index: [9, 0, 9] })
        );
    }

    #[test]
    fn both_backends_reject_deposits_outside_storage() {
        let tile = one_particle();
        let layout = Layout::new([4, 1, 4], 2, [true, false, true]);
        for backend in [Accumulation::ThreadLocal, Accumulation::Atomic] {
            let mut target = FieldArray::with_layout(FieldKind::Rho, layout);
            let tiles = vec![(&tile, IndexBox::new([0, 0, 0], [4, 1, 4]))];
            let err = accumulate(tiles, [&mut target], backend, &FarKernel).unwrap_err();
            assert_eq!(err, InvariantViolation::DepositOutsideStorage { index: [40, 0, 40] }, "{backend:?}");
        }
    }

    #[test]
    fn region_is_clipped_to_storage() {
        let layout = Layout::new([8, 1, 8], 2, [true, false, true]);
        let r = scratch_region(IndexBox::new([0, 0, 4], [4, 1, 8]), &layout);
        assert_eq!(r.lo, [-2, 0, 2]);
        assert_eq!(r.hi, [7, 1, 11]);
    }
}
