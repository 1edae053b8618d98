//! Structure-of-arrays particle storage for one tile.

use indexmap::IndexMap;
use smallvec::SmallVec;

use corona_core::constants::C;
use corona_core::ParticleId;

/// Tile coordinates within a level: cell index divided by the tile size.
pub type TileIndex = [i32; 3];

/// One particle moved between tiles, with its runtime attributes in the
/// container's attribute order.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleData {
    /// Particle id.
    pub id: i64,
    /// Owning-rank tag.
    pub cpu: i32,
    /// Position, m.
    pub pos: [f64; 3],
    /// Momentum per unit mass `γv`, m/s.
    pub u: [f64; 3],
    /// Macro-particle weight (physical particles represented).
    pub w: f64,
    /// Runtime attribute values.
    pub runtime: SmallVec<[f64; 2]>,
}

/// Particles of one species in one tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleTile {
    /// Particle ids; [`ParticleId::INVALID`] marks lost particles.
    pub id: Vec<i64>,
    /// Owning-rank tag.
    pub cpu: Vec<i32>,
    /// x position, m.
    pub x: Vec<f64>,
    /// y position, m (unused in 2D).
    pub y: Vec<f64>,
    /// z position, m.
    pub z: Vec<f64>,
    /// x momentum per unit mass, m/s.
    pub ux: Vec<f64>,
    /// y momentum per unit mass, m/s.
    pub uy: Vec<f64>,
    /// z momentum per unit mass, m/s.
    pub uz: Vec<f64>,
    /// Weight.
    pub w: Vec<f64>,
    runtime: IndexMap<String, Vec<f64>>,
}

impl ParticleTile {
    /// Empty tile carrying the named runtime attributes.
    pub fn with_attributes(names: &[String]) -> Self {
        let mut tile = Self::default();
        for name in names {
            tile.runtime.insert(name.clone(), Vec::new());
        }
        tile
    }

    /// Number of particles, including any not yet compacted.
    pub fn len(&self) -> usize {
        self.id.len()
    }

    /// Whether the tile holds no particles.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Append a particle.
    pub fn push(&mut self, p: ParticleData) {
        self.id.push(p.id);
        self.cpu.push(p.cpu);
        self.x.push(p.pos[0]);
        self.y.push(p.pos[1]);
        self.z.push(p.pos[2]);
        self.ux.push(p.u[0]);
        self.uy.push(p.u[1]);
        self.uz.push(p.u[2]);
        self.w.push(p.w);
        for (n, values) in self.runtime.values_mut().enumerate() {
            values.push(p.runtime.get(n).copied().unwrap_or(0.0));
        }
    }

    /// Remove particle `i`, moving the last particle into its slot.
    pub fn swap_remove(&mut self, i: usize) -> ParticleData {
        let runtime = self
            .runtime
            .values_mut()
            .map(|values| values.swap_remove(i))
            .collect();
        ParticleData {
            id: self.id.swap_remove(i),
            cpu: self.cpu.swap_remove(i),
            pos: [self.x.swap_remove(i), self.y.swap_remove(i), self.z.swap_remove(i)],
            u: [
                self.ux.swap_remove(i),
                self.uy.swap_remove(i),
                self.uz.swap_remove(i),
            ],
            w: self.w.swap_remove(i),
            runtime,
        }
    }

    /// Drop every particle whose id is the invalid sentinel. Returns the
    /// number removed.
    pub fn remove_invalid(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.len() {
            if ParticleId(self.id[i]).is_valid() {
                i += 1;
            } else {
                self.swap_remove(i);
                removed += 1;
            }
        }
        removed
    }

    /// Mark particle `i` as lost.
    pub fn invalidate(&mut self, i: usize) {
        self.id[i] = ParticleId::INVALID.0;
    }

    /// Position of particle `i`.
    pub fn position(&self, i: usize) -> [f64; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Overwrite the position of particle `i`.
    pub fn set_position(&mut self, i: usize, pos: [f64; 3]) {
        self.x[i] = pos[0];
        self.y[i] = pos[1];
        self.z[i] = pos[2];
    }

    /// Momentum per unit mass of particle `i`.
    pub fn momentum(&self, i: usize) -> [f64; 3] {
        [self.ux[i], self.uy[i], self.uz[i]]
    }

    /// Overwrite the momentum of particle `i`.
    pub fn set_momentum(&mut self, i: usize, u: [f64; 3]) {
        self.ux[i] = u[0];
        self.uy[i] = u[1];
        self.uz[i] = u[2];
    }

    /// Lorentz factor of particle `i`.
    pub fn gamma(&self, i: usize) -> f64 {
        lorentz_factor(self.momentum(i))
    }

    /// Velocity of particle `i`, m/s.
    pub fn velocity(&self, i: usize) -> [f64; 3] {
        let u = self.momentum(i);
        let inv_gamma = 1.0 / lorentz_factor(u);
        u.map(|c| c * inv_gamma)
    }

    /// Runtime attribute values by name.
    pub fn runtime(&self, name: &str) -> Option<&[f64]> {
        self.runtime.get(name).map(|v| v.as_slice())
    }

    /// Mutable runtime attribute values by name.
    pub fn runtime_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        self.runtime.get_mut(name).map(|v| v.as_mut_slice())
    }

    /// Add a runtime attribute, filling existing particles with `default`.
    pub fn add_attribute(&mut self, name: &str, default: f64) {
        let len = self.len();
        self.runtime
            .entry(name.to_string())
            .or_insert_with(|| vec![default; len]);
    }
}

/// `γ = sqrt(1 + |u|²/c²)`.
pub fn lorentz_factor(u: [f64; 3]) -> f64 {
    (1.0 + (u[0] * u[0] + u[1] * u[1] + u[2] * u[2]) / (C * C)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn particle(id: i64, x: f64) -> ParticleData {
        ParticleData {
            id,
            cpu: 0,
            pos: [x, 0.0, 0.0],
            u: [0.0; 3],
            w: 1.0,
            runtime: smallvec![id as f64],
        }
    }

    #[test]
    fn push_and_swap_remove_keep_columns_aligned() {
        let mut t = ParticleTile::with_attributes(&["ionization_level".to_string()]);
        t.push(particle(0, 0.1));
        t.push(particle(1, 0.2));
        t.push(particle(2, 0.3));
        let removed = t.swap_remove(0);
        assert_eq!(removed.id, 0);
        assert_eq!(removed.runtime.as_slice(), &[0.0]);
        assert_eq!(t.id, vec![2, 1]);
        assert_eq!(t.x, vec![0.3, 0.2]);
        assert_eq!(t.runtime("ionization_level"), Some(&[2.0, 1.0][..]));
    }

    #[test]
    fn remove_invalid_compacts() {
        let mut t = ParticleTile::default();
        for i in 0..5 {
            t.push(particle(i, i as f64));
        }
        t.invalidate(1);
        t.invalidate(4);
        assert_eq!(t.remove_invalid(), 2);
        let mut ids = t.id.clone();
        ids.sort();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn gamma_of_particle_at_rest_is_one() {
        assert_eq!(lorentz_factor([0.0; 3]), 1.0);
        let g = lorentz_factor([C, 0.0, 0.0]);
        assert_relative_eq!(g, 2f64.sqrt(), max_relative = 1e-15);
    }
}
