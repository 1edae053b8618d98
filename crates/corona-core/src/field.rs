//! Electromagnetic field kinds, Yee staggering, and the [`FieldSet`] bitset.

use std::fmt;

/// A Cartesian vector component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// x component.
    X,
    /// y component.
    Y,
    /// z component.
    Z,
}

impl Component {
    /// All three components in index order.
    pub const ALL: [Component; 3] = [Component::X, Component::Y, Component::Z];

    /// Axis index (0, 1, 2).
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Per-axis location of a grid quantity within a cell.
///
/// `nodal[d] == true` places samples on cell corners along axis `d`;
/// `false` places them at the cell center `(i + 1/2) * dx`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Staggering {
    /// Nodal flag per axis (x, y, z).
    pub nodal: [bool; 3],
}

impl Staggering {
    /// Fully nodal (rho, F).
    pub const NODAL: Self = Self {
        nodal: [true, true, true],
    };
    /// Fully cell-centered (G).
    pub const CELL: Self = Self {
        nodal: [false, false, false],
    };

    /// Offset of the sample from the node along axis `d`, in cells.
    pub fn offset(self, d: usize) -> f64 {
        if self.nodal[d] {
            0.0
        } else {
            0.5
        }
    }
}

/// A named electromagnetic grid quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    /// Electric field, x.
    Ex,
    /// Electric field, y.
    Ey,
    /// Electric field, z.
    Ez,
    /// Magnetic field, x.
    Bx,
    /// Magnetic field, y.
    By,
    /// Magnetic field, z.
    Bz,
    /// Current density, x.
    Jx,
    /// Current density, y.
    Jy,
    /// Current density, z.
    Jz,
    /// Charge density (old and new time slots share this kind).
    Rho,
    /// Electric divergence-cleaning scalar.
    F,
    /// Magnetic divergence-cleaning scalar.
    G,
}

impl FieldKind {
    /// Number of distinct kinds.
    pub const COUNT: usize = 12;

    /// All kinds in declaration order.
    pub const ALL: [FieldKind; Self::COUNT] = [
        Self::Ex,
        Self::Ey,
        Self::Ez,
        Self::Bx,
        Self::By,
        Self::Bz,
        Self::Jx,
        Self::Jy,
        Self::Jz,
        Self::Rho,
        Self::F,
        Self::G,
    ];

    /// Electric field kind for a component.
    pub fn electric(c: Component) -> Self {
        [Self::Ex, Self::Ey, Self::Ez][c.index()]
    }

    /// Magnetic field kind for a component.
    pub fn magnetic(c: Component) -> Self {
        [Self::Bx, Self::By, Self::Bz][c.index()]
    }

    /// Current density kind for a component.
    pub fn current(c: Component) -> Self {
        [Self::Jx, Self::Jy, Self::Jz][c.index()]
    }

    /// Yee-cell staggering of this quantity.
    ///
    /// E and J live on cell edges, B on cell faces, rho and F on nodes,
    /// G at cell centers.
    pub fn staggering(self) -> Staggering {
        let nodal = match self {
            Self::Ex | Self::Jx => [false, true, true],
            Self::Ey | Self::Jy => [true, false, true],
            Self::Ez | Self::Jz => [true, true, false],
            Self::Bx => [true, false, false],
            Self::By => [false, true, false],
            Self::Bz => [false, false, true],
            Self::Rho | Self::F => [true, true, true],
            Self::G => [false, false, false],
        };
        Staggering { nodal }
    }

    /// Short name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ex => "Ex",
            Self::Ey => "Ey",
            Self::Ez => "Ez",
            Self::Bx => "Bx",
            Self::By => "By",
            Self::Bz => "Bz",
            Self::Jx => "Jx",
            Self::Jy => "Jy",
            Self::Jz => "Jz",
            Self::Rho => "rho",
            Self::F => "F",
            Self::G => "G",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of field kinds implemented as a fixed-width bitset.
///
/// Used by the orchestrator to request guard-cell fills for a group of
/// fields at once (for example all of E and B before a gather).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldSet {
    bits: u16,
}

impl FieldSet {
    /// The three electric components.
    pub const ELECTRIC: Self = Self { bits: 0b111 };
    /// The three magnetic components.
    pub const MAGNETIC: Self = Self { bits: 0b111 << 3 };
    /// The three current components.
    pub const CURRENT: Self = Self { bits: 0b111 << 6 };

    /// Create an empty field set.
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Insert a kind into the set.
    pub fn insert(&mut self, kind: FieldKind) {
        self.bits |= kind.bit();
    }

    /// Returns a copy of this set with `kind` inserted.
    pub fn with(mut self, kind: FieldKind) -> Self {
        self.insert(kind);
        self
    }

    /// Check whether the set contains a kind.
    pub fn contains(&self, kind: FieldKind) -> bool {
        self.bits & kind.bit() != 0
    }

    /// Return the union of two sets.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the intersection of two sets.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Check whether `self` is a subset of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Number of kinds in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate over the kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = FieldKind> + '_ {
        FieldKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<FieldKind> for FieldSet {
    fn from_iter<I: IntoIterator<Item = FieldKind>>(iter: I) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}
