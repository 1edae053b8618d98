//! Domain edge behavior for particles and fields.

/// How a domain handles quantities that cross one of its faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Leaving through one face re-enters through the opposite face.
    #[default]
    Periodic,
    /// Particles are removed; field guards are zero-filled.
    Absorbing,
    /// Particles are mirrored back with the normal momentum reversed.
    Reflecting,
}

/// Result of resolving a coordinate against a bounded axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisOutcome {
    /// The coordinate is inside, possibly after wrapping.
    Inside(f64),
    /// The coordinate was mirrored; the normal velocity must flip.
    Reflected(f64),
    /// The coordinate left through an absorbing face.
    Lost,
}

/// Resolve a coordinate `x` against the interval `[lo, hi)`.
pub fn resolve_axis(x: f64, lo: f64, hi: f64, kind: BoundaryKind) -> AxisOutcome {
    if x >= lo && x < hi {
        return AxisOutcome::Inside(x);
    }
    let len = hi - lo;
    match kind {
        BoundaryKind::Absorbing => AxisOutcome::Lost,
        BoundaryKind::Periodic => {
            let wrapped = lo + (x - lo).rem_euclid(len);
            // rem_euclid can round up to exactly `len`.
            AxisOutcome::Inside(if wrapped >= hi { lo } else { wrapped })
        }
        BoundaryKind::Reflecting => {
            let mirrored = if x < lo { 2.0 * lo - x } else { 2.0 * hi - x };
            if mirrored >= lo && mirrored < hi {
                AxisOutcome::Reflected(mirrored)
            } else {
                AxisOutcome::Lost
            }
        }
    }
}
