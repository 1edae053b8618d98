//! Core types for the Corona particle-in-cell framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the physical constants, particle identifiers, electromagnetic field
//! kinds with their Yee staggering, and the error types used throughout
//! the Corona workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod error;
pub mod field;
pub mod id;

pub use error::{ConfigIncompatibility, InvariantViolation, StepError};
pub use field::{Component, FieldKind, FieldSet, Staggering};
pub use id::{ParticleId, StepId};
