//! Macro-particles for the Corona PIC framework.
//!
//! Particles of one [`Species`] live in a [`ParticleContainer`], organized
//! per mesh level into [`ParticleTile`]s keyed by tile index. The
//! [`push`] module advances momenta and positions from gathered fields;
//! the [`deposit`] module maps particles back onto the grid as current and
//! charge density.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod container;
pub mod deposit;
pub mod gather;
pub mod push;
pub mod redistribute;
pub mod shape;
pub mod species;
pub mod tile;

pub use boundary::ParticleBoundaries;
pub use container::ParticleContainer;
pub use deposit::{
    Accumulation, ChargeDeposition, ChargeSlot, CurrentAlgorithm, CurrentDeposition,
};
pub use gather::FieldRefs;
pub use push::{PushParams, PusherKind};
pub use redistribute::RedistributeStats;
pub use shape::ShapeOrder;
pub use species::Species;
pub use tile::{ParticleData, ParticleTile, TileIndex};
