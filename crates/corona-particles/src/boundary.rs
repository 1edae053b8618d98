//! Particle boundary conditions at the domain faces.

use corona_core::{InvariantViolation, ParticleId};
use corona_grid::{resolve_axis, AxisOutcome, BoundaryKind, Geometry};

use crate::container::ParticleContainer;

/// Boundary kind of each face of the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticleBoundaries {
    /// Lower faces, per axis.
    pub lo: [BoundaryKind; 3],
    /// Upper faces, per axis.
    pub hi: [BoundaryKind; 3],
}

impl ParticleBoundaries {
    /// The same kind on every face.
    pub fn uniform(kind: BoundaryKind) -> Self {
        Self {
            lo: [kind; 3],
            hi: [kind; 3],
        }
    }

    /// Periodic where the domain is periodic, `other` elsewhere.
    pub fn from_periodicity(periodic: [bool; 3], other: BoundaryKind) -> Self {
        let kinds = periodic.map(|p| if p { BoundaryKind::Periodic } else { other });
        Self { lo: kinds, hi: kinds }
    }

    /// Resolve particles on level `lev` against the faces of `domain`.
    ///
    /// Periodic faces wrap, reflecting faces mirror the position and flip
    /// the normal momentum, and absorbing faces invalidate the particle.
    /// Invalidated particles are compacted away. Returns the number lost.
    pub fn apply(
        &self,
        container: &mut ParticleContainer,
        lev: usize,
        domain: &Geometry,
    ) -> Result<usize, InvariantViolation> {
        let lo = domain.prob_lo();
        let hi = domain.prob_hi();
        let mut lost = 0;
        for tile in container.tiles_mut(lev)?.values_mut() {
            for i in 0..tile.len() {
                if !ParticleId(tile.id[i]).is_valid() {
                    continue;
                }
                let mut pos = tile.position(i);
                let mut u = tile.momentum(i);
                let mut keep = true;
                for d in 0..3 {
                    if !domain.active(d) {
                        continue;
                    }
                    let kind = if pos[d] < lo[d] { self.lo[d] } else { self.hi[d] };
                    match resolve_axis(pos[d], lo[d], hi[d], kind) {
                        AxisOutcome::Inside(x) => pos[d] = x,
                        AxisOutcome::Reflected(x) => {
                            pos[d] = x;
                            u[d] = -u[d];
                        }
                        AxisOutcome::Lost => keep = false,
                    }
                }
                if keep {
                    tile.set_position(i, pos);
                    tile.set_momentum(i, u);
                } else {
                    tile.invalidate(i);
                    lost += 1;
                }
            }
            tile.remove_invalid();
        }
        container.tiles_mut(lev)?.retain(|_, tile| !tile.is_empty());
        Ok(lost)
    }
}
