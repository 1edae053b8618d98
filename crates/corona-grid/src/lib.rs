//! Structured-grid storage for the Corona PIC framework.
//!
//! A level's patch is described by a [`Geometry`]. Each field component
//! lives in a [`FieldArray`] with Yee staggering, guard cells, and an
//! explicit record of how wide the currently valid guard data is.
//! [`AtomicFieldArray`] shares the same [`Layout`] and is the target of
//! concurrent deposition. The [`halo`] and [`transfer`] modules provide the
//! guard-cell and fine/coarse operations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod atomic;
pub mod edge;
pub mod error;
pub mod geometry;
pub mod halo;
pub mod transfer;

pub use array::{FieldArray, Layout};
pub use atomic::AtomicFieldArray;
pub use edge::{resolve_axis, AxisOutcome, BoundaryKind};
pub use error::GridError;
pub use geometry::{Dim, Geometry, IndexBox};
