//! # Far-field electrostatics kernels
//!
//! Two independent numerical kernels for the long-range part of periodic
//! point-charge electrostatics:
//!
//! * A particle-to-multipole deposit for a Fast Multipole Method: particles
//!   are binned into the cells of a Cartesian grid and their complex
//!   spherical-harmonic multipole moments accumulated into per-cell buffers,
//!   in parallel and without locks or atomics on the buffers themselves.
//!   See [`MultipoleDeposit`].
//! * A reciprocal-space Ewald summation kernel that evaluates the far-field
//!   potential energy of a single particle against a precomputed lattice of
//!   reciprocal wavevectors. See [`reciprocal`].
//!
//! The surrounding machinery of a complete solver (multipole translations,
//! local evaluation, the real-space Ewald term, and construction of the
//! structure-factor tables consumed here) is left to the caller.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod deposit;
pub mod expansion;
pub mod grid;
pub mod helpers;
pub mod partition;
pub mod reciprocal;
pub mod types;

// Public API
#[doc(inline)]
pub use deposit::MultipoleDeposit;
#[doc(inline)]
pub use grid::CellGrid;
#[doc(inline)]
pub use partition::CellPartition;
#[doc(inline)]
pub use reciprocal::types::{ReciprocalVectors, StructureFactors};
#[doc(inline)]
pub use types::{FarFieldError, RealScalar};
