//! Per-tile load-balance costs.
//!
//! Costs are what [`DomainDecomposition::repartition`] sees. In
//! [`CostMode::Heuristic`] they are particle counts taken right before the
//! repartition check. In [`CostMode::Timers`] every step adds the measured
//! push/deposit time of a level, split across its tiles by particle count,
//! and the running sum decays by a constant factor after each step.
//!
//! [`DomainDecomposition::repartition`]: crate::collaborators::DomainDecomposition::repartition

use indexmap::IndexMap;

use corona_particles::{ParticleContainer, TileIndex};

/// How tile costs are measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CostMode {
    /// Particle count per tile at the time of the check.
    #[default]
    Heuristic,
    /// Decaying running sum of measured step time.
    Timers,
}

/// Cost per tile, per level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Costs {
    levels: Vec<IndexMap<TileIndex, f64>>,
}

impl Costs {
    /// Empty costs for `num_levels` levels.
    pub fn new(num_levels: usize) -> Self {
        Self {
            levels: vec![IndexMap::new(); num_levels],
        }
    }

    /// Costs of level `lev`, empty for a missing level.
    pub fn level(&self, lev: usize) -> Option<&IndexMap<TileIndex, f64>> {
        self.levels.get(lev)
    }

    /// Number of levels tracked.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Add `value` to tile `tile` of level `lev`.
    pub fn add(&mut self, lev: usize, tile: TileIndex, value: f64) {
        if let Some(costs) = self.levels.get_mut(lev) {
            *costs.entry(tile).or_insert(0.0) += value;
        }
    }

    /// Replace every cost with the particle count of its tile, summed over
    /// species.
    pub fn record_heuristic(&mut self, species: &[ParticleContainer]) {
        self.reset();
        for container in species {
            for lev in 0..self.levels.len() {
                for (tile, n) in container.tile_counts(lev) {
                    self.add(lev, tile, n as f64);
                }
            }
        }
    }

    /// Spread `micros` of measured time on level `lev` across its tiles in
    /// proportion to their particle counts.
    pub fn record_timers(&mut self, lev: usize, species: &[ParticleContainer], micros: f64) {
        let counts: Vec<(TileIndex, usize)> =
            species.iter().flat_map(|c| c.tile_counts(lev)).collect();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return;
        }
        let per_particle = micros / total as f64;
        for (tile, n) in counts {
            self.add(lev, tile, n as f64 * per_particle);
        }
    }

    /// Multiply every cost by `factor`.
    pub fn decay(&mut self, factor: f64) {
        for costs in &mut self.levels {
            for v in costs.values_mut() {
                *v *= factor;
            }
        }
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        for costs in &mut self.levels {
            costs.clear();
        }
    }

    /// Sum over every level and tile.
    pub fn total(&self) -> f64 {
        self.levels.iter().flat_map(|c| c.values()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_grid::Geometry;
    use corona_particles::{ParticleData, Species};
    use smallvec::SmallVec;

    fn container() -> ParticleContainer {
        let g = Geometry::xz([16, 16], [1.0, 1.0], [0.0, 0.0], [true, true]).unwrap();
        let mut c = ParticleContainer::with_tile_size(Species::electron(), 1, [8, 1, 8]);
        for pos in [[1.0, 0.0, 1.0], [2.0, 0.0, 1.0], [12.0, 0.0, 1.0]] {
            let p = ParticleData {
                id: -1,
                cpu: 0,
                pos,
                u: [0.0; 3],
                w: 1.0,
                runtime: SmallVec::new(),
            };
            c.add_particle(0, &g, p).unwrap();
        }
        c
    }

    #[test]
    fn heuristic_counts_particles_per_tile() {
        let mut costs = Costs::new(1);
        costs.record_heuristic(&[container()]);
        let level = costs.level(0).unwrap();
        assert_eq!(level.len(), 2);
        assert_eq!(costs.total(), 3.0);
        assert!(level.values().any(|v| *v == 2.0));
    }

    #[test]
    fn timers_split_by_count_and_decay() {
        let mut costs = Costs::new(1);
        let species = [container()];
        costs.record_timers(0, &species, 30.0);
        assert!((costs.total() - 30.0).abs() < 1e-12);
        costs.decay(0.5);
        assert!((costs.total() - 15.0).abs() < 1e-12);
        costs.reset();
        assert_eq!(costs.total(), 0.0);
    }

    #[test]
    fn missing_level_is_ignored() {
        let mut costs = Costs::new(1);
        costs.add(3, [0, 0, 0], 1.0);
        assert_eq!(costs.total(), 0.0);
        assert!(costs.level(3).is_none());
    }
}
