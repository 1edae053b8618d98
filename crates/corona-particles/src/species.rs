//! Particle species.

use corona_core::constants::{M_E, M_P, Q_E};

/// Name, charge and mass shared by every particle of a population.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    name: String,
    charge: f64,
    mass: f64,
}

impl Species {
    /// A species with charge `charge` (C) and mass `mass` (kg).
    pub fn new(name: impl Into<String>, charge: f64, mass: f64) -> Self {
        Self {
            name: name.into(),
            charge,
            mass,
        }
    }

    /// Electrons.
    pub fn electron() -> Self {
        Self::new("electrons", -Q_E, M_E)
    }

    /// Positrons.
    pub fn positron() -> Self {
        Self::new("positrons", Q_E, M_E)
    }

    /// Protons.
    pub fn proton() -> Self {
        Self::new("protons", Q_E, M_P)
    }

    /// Species name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Charge per physical particle, C.
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Mass per physical particle, kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }
}
