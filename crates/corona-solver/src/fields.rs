//! The per-patch field bundle shared by every solver.

use corona_core::{Component, FieldKind, InvariantViolation};
use corona_grid::{FieldArray, Geometry};

/// Which optional arrays a patch allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldOptions {
    /// Guard width of every array.
    pub ng: usize,
    /// Allocate the electric cleaning scalar F.
    pub div_e_cleaning: bool,
    /// Allocate the magnetic cleaning scalar G.
    pub div_b_cleaning: bool,
    /// Allocate time-averaged E and B.
    pub time_averaging: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            ng: 4,
            div_e_cleaning: false,
            div_b_cleaning: false,
            time_averaging: false,
        }
    }
}

/// E, B, J, rho and the optional cleaning and averaged arrays of one patch.
///
/// `rho[0]` is the old time slot and `rho[1]` the new one.
#[derive(Clone, Debug)]
pub struct EmFields {
    /// Patch geometry.
    pub geom: Geometry,
    /// Electric field.
    pub e: [FieldArray; 3],
    /// Magnetic field.
    pub b: [FieldArray; 3],
    /// Current density.
    pub j: [FieldArray; 3],
    /// Charge density, old and new.
    pub rho: [FieldArray; 2],
    /// Electric divergence-cleaning scalar.
    pub f: Option<FieldArray>,
    /// Magnetic divergence-cleaning scalar.
    pub g: Option<FieldArray>,
    /// Time-averaged E.
    pub e_avg: Option<[FieldArray; 3]>,
    /// Time-averaged B.
    pub b_avg: Option<[FieldArray; 3]>,
}

fn vector(geom: &Geometry, ng: usize, kind: fn(Component) -> FieldKind) -> [FieldArray; 3] {
    Component::ALL.map(|c| FieldArray::new(kind(c), geom, ng))
}

impl EmFields {
    /// Allocate zeroed fields on `geom`.
    pub fn new(geom: Geometry, options: &FieldOptions) -> Self {
        let ng = options.ng;
        let scalar = |kind| FieldArray::new(kind, &geom, ng);
        Self {
            e: vector(&geom, ng, FieldKind::electric),
            b: vector(&geom, ng, FieldKind::magnetic),
            j: vector(&geom, ng, FieldKind::current),
            rho: [scalar(FieldKind::Rho), scalar(FieldKind::Rho)],
            f: options.div_e_cleaning.then(|| scalar(FieldKind::F)),
            g: options.div_b_cleaning.then(|| scalar(FieldKind::G)),
            e_avg: options
                .time_averaging
                .then(|| vector(&geom, ng, FieldKind::electric)),
            b_avg: options
                .time_averaging
                .then(|| vector(&geom, ng, FieldKind::magnetic)),
            geom,
        }
    }

    /// Guard width.
    pub fn ng(&self) -> usize {
        self.e[0].layout().max_ng()
    }

    /// Mutable borrows of the three current components.
    pub fn j_mut(&mut self) -> [&mut FieldArray; 3] {
        let [x, y, z] = &mut self.j;
        [x, y, z]
    }

    /// The array holding `kind`. Rho resolves to the new slot.
    pub fn field(&self, kind: FieldKind) -> Option<&FieldArray> {
        match kind {
            FieldKind::Ex | FieldKind::Ey | FieldKind::Ez => Some(&self.e[kind as usize]),
            FieldKind::Bx | FieldKind::By | FieldKind::Bz => Some(&self.b[kind as usize - 3]),
            FieldKind::Jx | FieldKind::Jy | FieldKind::Jz => Some(&self.j[kind as usize - 6]),
            FieldKind::Rho => Some(&self.rho[1]),
            FieldKind::F => self.f.as_ref(),
            FieldKind::G => self.g.as_ref(),
        }
    }

    /// Mutable access to the array holding `kind`. Rho resolves to the new slot.
    pub fn field_mut(&mut self, kind: FieldKind) -> Option<&mut FieldArray> {
        match kind {
            FieldKind::Ex | FieldKind::Ey | FieldKind::Ez => Some(&mut self.e[kind as usize]),
            FieldKind::Bx | FieldKind::By | FieldKind::Bz => Some(&mut self.b[kind as usize - 3]),
            FieldKind::Jx | FieldKind::Jy | FieldKind::Jz => Some(&mut self.j[kind as usize - 6]),
            FieldKind::Rho => Some(&mut self.rho[1]),
            FieldKind::F => self.f.as_mut(),
            FieldKind::G => self.g.as_mut(),
        }
    }

    /// Zero the current density.
    pub fn zero_current(&mut self) {
        for a in &mut self.j {
            a.fill(0.0);
        }
    }

    /// Zero one charge slot (0 = old, 1 = new).
    pub fn zero_rho(&mut self, slot: usize) {
        self.rho[slot].fill(0.0);
    }

    /// Copy the new charge slot into the old one.
    pub fn rho_new_to_old(&mut self) -> Result<(), InvariantViolation> {
        let [old, new] = &mut self.rho;
        old.copy_from(new)
    }

    /// Zero E, B, and the cleaning scalars.
    pub fn zero_em(&mut self) {
        for a in self.e.iter_mut().chain(self.b.iter_mut()) {
            a.fill(0.0);
        }
        for a in self.f.iter_mut().chain(self.g.iter_mut()) {
            a.fill(0.0);
        }
    }

    /// Every allocated array, for whole-patch operations.
    pub fn arrays_mut(&mut self) -> impl Iterator<Item = &mut FieldArray> {
        self.e
            .iter_mut()
            .chain(self.b.iter_mut())
            .chain(self.j.iter_mut())
            .chain(self.rho.iter_mut())
            .chain(self.f.iter_mut())
            .chain(self.g.iter_mut())
            .chain(self.e_avg.iter_mut().flatten())
            .chain(self.b_avg.iter_mut().flatten())
    }

    /// Shift every array `cells` toward lower indices along `axis`,
    /// zero-filling the vacated points, and advance the origin to match.
    pub fn shift_down(&mut self, axis: usize, cells: usize) {
        if cells == 0 {
            return;
        }
        for a in self.arrays_mut() {
            a.shift_down(axis, cells);
        }
        let dx = self.geom.dx()[axis];
        self.geom.shift_origin(axis, cells as f64 * dx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_grid::Dim;

    fn geom() -> Geometry {
        Geometry::new(Dim::Three, [4, 4, 4], [1.0; 3], [0.0; 3], [true; 3]).unwrap()
    }

    #[test]
    fn optional_arrays_follow_options() {
        let plain = EmFields::new(geom(), &FieldOptions::default());
        assert!(plain.f.is_none() && plain.g.is_none() && plain.e_avg.is_none());
        let opts = FieldOptions {
            div_e_cleaning: true,
            time_averaging: true,
            ..FieldOptions::default()
        };
        let full = EmFields::new(geom(), &opts);
        assert!(full.f.is_some() && full.g.is_none());
        assert!(full.b_avg.is_some());
        let mut full = full;
        assert_eq!(full.arrays_mut().count(), 18);
    }

    #[test]
    fn kind_lookup_returns_matching_array() {
        let f = EmFields::new(geom(), &FieldOptions::default());
        for kind in FieldKind::ALL {
            if let Some(a) = f.field(kind) {
                assert_eq!(a.kind(), kind);
            }
        }
        assert!(f.field(FieldKind::G).is_none());
    }

    #[test]
    fn shift_moves_data_and_origin() {
        let mut f = EmFields::new(geom(), &FieldOptions::default());
        f.e[1].set([0, 0, 3], 2.0);
        f.shift_down(2, 1);
        assert_eq!(f.e[1].get([0, 0, 2]), 2.0);
        assert_eq!(f.geom.prob_lo()[2], 1.0);
    }
}
