//! Errors from grid construction.

use std::error::Error;
use std::fmt;

/// Errors detected while building a geometry or a refined patch.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// An active axis has zero cells.
    EmptyAxis {
        /// Axis index.
        axis: usize,
    },
    /// A cell size is zero, negative, or not finite.
    InvalidSpacing {
        /// Axis index.
        axis: usize,
        /// The rejected spacing.
        value: f64,
    },
    /// A refined patch extends beyond its parent domain.
    PatchOutsideDomain {
        /// Requested patch, in parent cells.
        patch: ([i64; 3], [i64; 3]),
        /// Parent cell count.
        domain: [usize; 3],
    },
    /// A refinement ratio other than 1 on an inactive axis, or 0 anywhere.
    InvalidRatio {
        /// The rejected ratio.
        ratio: [usize; 3],
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAxis { axis } => write!(f, "axis {axis} has zero cells"),
            Self::InvalidSpacing { axis, value } => {
                write!(f, "cell size on axis {axis} must be finite and positive, got {value}")
            }
            Self::PatchOutsideDomain { patch, domain } => write!(
                f,
                "patch {:?}..{:?} lies outside the {domain:?} parent domain",
                patch.0, patch.1
            ),
            Self::InvalidRatio { ratio } => write!(f, "invalid refinement ratio {ratio:?}"),
        }
    }
}

impl Error for GridError {}
