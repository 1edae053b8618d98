//! Reassignment of particles to tiles and levels after they move.

use tracing::warn;

use corona_core::{InvariantViolation, ParticleId};
use corona_grid::{resolve_axis, AxisOutcome, BoundaryKind, Geometry};

use crate::container::ParticleContainer;
use crate::tile::{ParticleData, TileIndex};

/// Outcome of one redistribution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedistributeStats {
    /// Particles that changed tile or level.
    pub moved: usize,
    /// Particles dropped because they travelled beyond the ghost bound.
    pub lost: usize,
}

impl RedistributeStats {
    /// Sum of two passes.
    pub fn merge(self, other: Self) -> Self {
        Self {
            moved: self.moved + other.moved,
            lost: self.lost + other.lost,
        }
    }
}

/// Wrap `pos` into the periodic extent of `geom`. Non-periodic axes are
/// left alone.
fn wrap_periodic(geom: &Geometry, mut pos: [f64; 3]) -> [f64; 3] {
    let lo = geom.prob_lo();
    let hi = geom.prob_hi();
    for d in 0..3 {
        if geom.active(d) && geom.periodic()[d] {
            if let AxisOutcome::Inside(x) = resolve_axis(pos[d], lo[d], hi[d], BoundaryKind::Periodic) {
                pos[d] = x;
            }
        }
    }
    pos
}

fn inside(geom: &Geometry, pos: [f64; 3]) -> bool {
    let lo = geom.prob_lo();
    let hi = geom.prob_hi();
    (0..3).all(|d| !geom.active(d) || (pos[d] >= lo[d] && pos[d] < hi[d]))
}

impl ParticleContainer {
    /// Reassign tiles on level `lev` for particles that moved at most
    /// `ghost` cells outside their tile since the last redistribution.
    ///
    /// A particle further away than `ghost` cells is dropped: a neighbor
    /// only exchanges particles inside that band. Periodic axes wrap.
    pub fn redistribute_local(
        &mut self,
        lev: usize,
        geom: &Geometry,
        ghost: usize,
    ) -> Result<RedistributeStats, InvariantViolation> {
        let tile_size = self.tile_size();
        let mut stats = RedistributeStats::default();
        let mut pending: Vec<(TileIndex, ParticleData)> = Vec::new();
        let boxes: Vec<_> = self
            .tiles(lev)?
            .keys()
            .map(|t| (*t, self.tile_box(geom, *t)))
            .collect();
        let tiles = self.tiles_mut(lev)?;
        for (t, bx) in boxes {
            let Some(tile) = tiles.get_mut(&t) else {
                continue;
            };
            let mut i = 0;
            while i < tile.len() {
                if !ParticleId(tile.id[i]).is_valid() {
                    i += 1;
                    continue;
                }
                let pos = tile.position(i);
                let mut distance = 0i64;
                for d in 0..3 {
                    if !geom.active(d) {
                        continue;
                    }
                    let cell = geom.to_cells(d, pos[d]).floor() as i64;
                    let out = (bx.lo[d] - cell).max(cell - (bx.hi[d] - 1)).max(0);
                    distance = distance.max(out);
                }
                if distance > ghost as i64 {
                    tile.invalidate(i);
                    stats.lost += 1;
                    i += 1;
                    continue;
                }
                let wrapped = wrap_periodic(geom, pos);
                if wrapped != pos {
                    tile.set_position(i, wrapped);
                }
                let target = tile_of(geom, tile_size, wrapped);
                if target == t {
                    i += 1;
                } else {
                    pending.push((target, tile.swap_remove(i)));
                }
            }
        }
        stats.moved = pending.len();
        for tile in self.tiles_mut(lev)?.values_mut() {
            tile.remove_invalid();
        }
        for (t, p) in pending {
            self.insert(lev, t, p)?;
        }
        self.tiles_mut(lev)?.retain(|_, tile| !tile.is_empty());
        if stats.lost > 0 {
            warn!(
                species = self.species().name(),
                level = lev,
                lost = stats.lost,
                ghost,
                "particles travelled beyond the redistribution ghost bound"
            );
        }
        Ok(stats)
    }

    /// Reassign every particle to its level and tile with no distance bound.
    ///
    /// `geoms[0]` is the base level; a particle inside `geoms[1]` (when
    /// present) belongs to level 1.
    pub fn redistribute_full(&mut self, geoms: &[Geometry]) -> Result<RedistributeStats, InvariantViolation> {
        let tile_size = self.tile_size();
        let mut stats = RedistributeStats::default();
        let mut pending: Vec<(usize, TileIndex, ParticleData)> = Vec::new();
        let base = geoms.first().ok_or(InvariantViolation::LevelOutOfRange { level: 0, finest: 0 })?;
        let finest = geoms
            .len()
            .min(self.num_levels())
            .checked_sub(1)
            .ok_or(InvariantViolation::LevelOutOfRange { level: 0, finest: 0 })?;
        for lev in 0..self.num_levels() {
            let keys: Vec<TileIndex> = self.tiles(lev)?.keys().copied().collect();
            let tiles = self.tiles_mut(lev)?;
            for t in keys {
                let Some(tile) = tiles.get_mut(&t) else {
                    continue;
                };
                let mut i = 0;
                while i < tile.len() {
                    if !ParticleId(tile.id[i]).is_valid() {
                        i += 1;
                        continue;
                    }
                    let pos = wrap_periodic(base, tile.position(i));
                    tile.set_position(i, pos);
                    let target_lev = if finest >= 1 && inside(&geoms[1], pos) { 1 } else { 0 };
                    let target = tile_of(&geoms[target_lev], tile_size, pos);
                    if target_lev == lev && target == t {
                        i += 1;
                    } else {
                        pending.push((target_lev, target, tile.swap_remove(i)));
                    }
                }
            }
        }
        stats.moved = pending.len();
        for (lev, t, p) in pending {
            self.insert(lev, t, p)?;
        }
        for lev in 0..self.num_levels() {
            self.tiles_mut(lev)?.retain(|_, tile| !tile.is_empty());
        }
        Ok(stats)
    }
}

pub(crate) fn tile_of(geom: &Geometry, tile_size: [usize; 3], pos: [f64; 3]) -> TileIndex {
    std::array::from_fn(|d| {
        if geom.active(d) {
            let cell = geom.to_cells(d, pos[d]).floor() as i64;
            cell.div_euclid(tile_size[d] as i64) as i32
        } else {
            0
        }
    })
}
