//! Per-species particle storage across mesh levels.

use indexmap::IndexMap;

use corona_core::InvariantViolation;
use corona_grid::{Geometry, IndexBox};

use crate::species::Species;
use crate::tile::{ParticleData, ParticleTile, TileIndex};

/// Default tile extent in cells along each active axis.
pub const DEFAULT_TILE_SIZE: [usize; 3] = [8, 8, 8];

/// All particles of one species, organized per level into tiles.
///
/// Between redistributions every particle belongs to exactly one
/// `(level, tile)`. Tiles are the unit of parallel work and of load-balance
/// cost accounting.
#[derive(Clone, Debug)]
pub struct ParticleContainer {
    species: Species,
    attributes: Vec<String>,
    tile_size: [usize; 3],
    levels: Vec<IndexMap<TileIndex, ParticleTile>>,
    next_id: i64,
}

impl ParticleContainer {
    /// Empty container with `num_levels` levels and the default tile size.
    pub fn new(species: Species, num_levels: usize) -> Self {
        Self::with_tile_size(species, num_levels, DEFAULT_TILE_SIZE)
    }

    /// Empty container with an explicit tile size (cells per axis, at least 1).
    pub fn with_tile_size(species: Species, num_levels: usize, tile_size: [usize; 3]) -> Self {
        Self {
            species,
            attributes: Vec::new(),
            tile_size: tile_size.map(|t| t.max(1)),
            levels: (0..num_levels.max(1)).map(|_| IndexMap::new()).collect(),
            next_id: 0,
        }
    }

    /// The species stored here.
    pub fn species(&self) -> &Species {
        &self.species
    }

    /// Tile extent in cells.
    pub fn tile_size(&self) -> [usize; 3] {
        self.tile_size
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Names of runtime attributes, in storage order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Register a runtime attribute on every tile (ionization level,
    /// optical depth, ...). Existing particles get `default`.
    pub fn add_attribute(&mut self, name: &str, default: f64) {
        if self.attributes.iter().any(|a| a == name) {
            return;
        }
        self.attributes.push(name.to_string());
        for tiles in &mut self.levels {
            for tile in tiles.values_mut() {
                tile.add_attribute(name, default);
            }
        }
    }

    /// Tiles of level `lev`.
    pub fn tiles(&self, lev: usize) -> Result<&IndexMap<TileIndex, ParticleTile>, InvariantViolation> {
        let finest = self.levels.len() - 1;
        self.levels
            .get(lev)
            .ok_or(InvariantViolation::LevelOutOfRange { level: lev, finest })
    }

    /// Mutable tiles of level `lev`.
    pub fn tiles_mut(
        &mut self,
        lev: usize,
    ) -> Result<&mut IndexMap<TileIndex, ParticleTile>, InvariantViolation> {
        let finest = self.levels.len() - 1;
        self.levels
            .get_mut(lev)
            .ok_or(InvariantViolation::LevelOutOfRange { level: lev, finest })
    }

    /// Tile index of position `pos` on a level with geometry `geom`.
    pub fn tile_index(&self, geom: &Geometry, pos: [f64; 3]) -> TileIndex {
        crate::redistribute::tile_of(geom, self.tile_size, pos)
    }

    /// Cell box covered by tile `t` on a level with geometry `geom`.
    pub fn tile_box(&self, geom: &Geometry, t: TileIndex) -> IndexBox {
        let lo: [i64; 3] = std::array::from_fn(|d| {
            if geom.active(d) {
                t[d] as i64 * self.tile_size[d] as i64
            } else {
                0
            }
        });
        let hi = std::array::from_fn(|d| {
            if geom.active(d) {
                lo[d] + self.tile_size[d] as i64
            } else {
                1
            }
        });
        IndexBox::new(lo, hi)
    }

    /// Insert a particle on level `lev`, assigning a fresh id when
    /// `p.id` is negative. Returns the id used.
    pub fn add_particle(
        &mut self,
        lev: usize,
        geom: &Geometry,
        mut p: ParticleData,
    ) -> Result<i64, InvariantViolation> {
        if p.id < 0 {
            p.id = self.next_id;
        }
        self.next_id = self.next_id.max(p.id + 1);
        let id = p.id;
        let t = self.tile_index(geom, p.pos);
        self.insert(lev, t, p)?;
        Ok(id)
    }

    /// Place `p` into tile `t` of level `lev`, creating the tile if needed.
    pub(crate) fn insert(
        &mut self,
        lev: usize,
        t: TileIndex,
        p: ParticleData,
    ) -> Result<(), InvariantViolation> {
        let attributes = self.attributes.clone();
        self.tiles_mut(lev)?
            .entry(t)
            .or_insert_with(|| ParticleTile::with_attributes(&attributes))
            .push(p);
        Ok(())
    }

    /// Tiles of level `lev` paired with their cell boxes.
    pub fn tiles_with_boxes<'a>(
        &'a self,
        lev: usize,
        geom: &Geometry,
    ) -> Result<Vec<(&'a ParticleTile, IndexBox)>, InvariantViolation> {
        Ok(self
            .tiles(lev)?
            .iter()
            .filter(|(_, tile)| !tile.is_empty())
            .map(|(t, tile)| (tile, self.tile_box(geom, *t)))
            .collect())
    }

    /// Particle count on level `lev` (0 for a missing level).
    pub fn num_particles_level(&self, lev: usize) -> usize {
        self.levels
            .get(lev)
            .map(|tiles| tiles.values().map(ParticleTile::len).sum())
            .unwrap_or(0)
    }

    /// Particle count over all levels.
    pub fn num_particles(&self) -> usize {
        (0..self.levels.len()).map(|lev| self.num_particles_level(lev)).sum()
    }

    /// Per-tile particle counts of level `lev`, the heuristic cost measure.
    pub fn tile_counts(&self, lev: usize) -> Vec<(TileIndex, usize)> {
        self.levels
            .get(lev)
            .map(|tiles| tiles.iter().map(|(t, tile)| (*t, tile.len())).collect())
            .unwrap_or_default()
    }

    /// Compact away invalidated particles and empty tiles. Returns the
    /// number of particles removed.
    pub fn remove_invalid(&mut self) -> usize {
        let mut removed = 0;
        for tiles in &mut self.levels {
            for tile in tiles.values_mut() {
                removed += tile.remove_invalid();
            }
            tiles.retain(|_, tile| !tile.is_empty());
        }
        removed
    }

    /// Every valid particle with its level, in storage order.
    pub fn particles(&self) -> impl Iterator<Item = (usize, &ParticleTile, usize)> + '_ {
        self.levels.iter().enumerate().flat_map(|(lev, tiles)| {
            tiles
                .values()
                .flat_map(move |tile| (0..tile.len()).map(move |i| (lev, tile, i)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::SmallVec;

    fn geom() -> Geometry {
        Geometry::xz([32, 32], [1.0, 1.0], [0.0, 0.0], [true, true]).unwrap()
    }

    fn at(x: f64, z: f64) -> ParticleData {
        ParticleData {
            id: -1,
            cpu: 0,
            pos: [x, 0.0, z],
            u: [0.0; 3],
            w: 1.0,
            runtime: SmallVec::new(),
        }
    }

    #[test]
    fn particles_land_in_tiles_by_cell() {
        let g = geom();
        let mut c = ParticleContainer::new(Species::electron(), 1);
        c.add_particle(0, &g, at(1.0, 1.0)).unwrap();
        c.add_particle(0, &g, at(9.5, 1.0)).unwrap();
        c.add_particle(0, &g, at(-0.5, 17.0)).unwrap();
        let tiles = c.tiles(0).unwrap();
        assert!(tiles.contains_key(&[0, 0, 0]));
        assert!(tiles.contains_key(&[1, 0, 0]));
        assert!(tiles.contains_key(&[-1, 0, 2]));
        assert_eq!(c.num_particles(), 3);
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let g = geom();
        let mut c = ParticleContainer::new(Species::proton(), 1);
        let a = c.add_particle(0, &g, at(1.0, 1.0)).unwrap();
        let b = c.add_particle(0, &g, at(2.0, 1.0)).unwrap();
        assert_eq!((a, b), (0, 1));
    }

    #[test]
    fn missing_level_is_out_of_range() {
        let c = ParticleContainer::new(Species::electron(), 2);
        assert_eq!(
            c.tiles(2).unwrap_err(),
            InvariantViolation::LevelOutOfRange { level: 2, finest: 1 }
        );
    }

    #[test]
    fn tile_box_covers_tile_size_cells() {
        let g = geom();
        let c = ParticleContainer::new(Species::electron(), 1);
        let b = c.tile_box(&g, [1, 0, -1]);
        assert_eq!(b.lo, [8, 0, -8]);
        assert_eq!(b.hi, [16, 1, 0]);
    }

    #[test]
    fn attributes_reach_existing_tiles() {
        let g = geom();
        let mut c = ParticleContainer::new(Species::electron(), 1);
        c.add_particle(0, &g, at(1.0, 1.0)).unwrap();
        c.add_attribute("opticalDepthQSR", 3.0);
        let tile = &c.tiles(0).unwrap()[&[0, 0, 0]];
        assert_eq!(tile.runtime("opticalDepthQSR"), Some(&[3.0][..]));
    }
}
