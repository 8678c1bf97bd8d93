//! Shared types: scalar bound, error taxonomy, and a thread-safe pointer wrapper.
use std::fmt;

use num::{traits::NumAssign, Float};

/// Real scalar type accepted by the kernels in this crate.
///
/// Blanket-implemented for any float with assignment operators that can be
/// shared across worker threads, in particular `f32` and `f64`.
pub trait RealScalar:
    Float + NumAssign + Default + Send + Sync + fmt::Debug + 'static
{
}

impl<T> RealScalar for T where
    T: Float + NumAssign + Default + Send + Sync + fmt::Debug + 'static
{
}

/// Failure modes of the multipole deposit call.
///
/// All variants are fatal for the call that produced them; the caller must
/// treat partially mutated moment buffers as invalid. Only
/// [`FarFieldError::OutOfDomain`] is reachable from well-formed geometry
/// inputs — it is expected at domain-decomposition boundaries. The remaining
/// variants report internal accounting violations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FarFieldError {
    /// A particle position fell outside the local cell window.
    OutOfDomain {
        /// Index of the offending particle.
        particle: usize,
    },

    /// The per-worker assignment counts do not sum to the particle count.
    CountMismatch {
        /// Number of particles passed in.
        expected: usize,
        /// Number of particles the binning pass assigned.
        assigned: usize,
    },

    /// A worker received a particle whose recomputed cell hashes to a
    /// different owner.
    OwnershipViolation {
        /// Index of the offending particle.
        particle: usize,
        /// Worker the particle was assigned to.
        assigned: usize,
        /// Worker the recomputed cell hashes to.
        owner: usize,
    },

    /// The deposit pass visited a different number of particles than it was
    /// given.
    ProcessedCountMismatch {
        /// Number of particles passed in.
        expected: usize,
        /// Number of particles the deposit pass visited.
        processed: usize,
    },
}

impl fmt::Display for FarFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarFieldError::OutOfDomain { particle } => {
                write!(f, "particle {} lies outside the local cell window", particle)
            }
            FarFieldError::CountMismatch { expected, assigned } => {
                write!(
                    f,
                    "binning assigned {} of {} particles to workers",
                    assigned, expected
                )
            }
            FarFieldError::OwnershipViolation {
                particle,
                assigned,
                owner,
            } => {
                write!(
                    f,
                    "particle {} assigned to worker {} but its cell hashes to worker {}",
                    particle, assigned, owner
                )
            }
            FarFieldError::ProcessedCountMismatch {
                expected,
                processed,
            } => {
                write!(
                    f,
                    "deposit visited {} of {} particles",
                    processed, expected
                )
            }
        }
    }
}

impl std::error::Error for FarFieldError {}

/// Represents a threadsafe mutable raw pointer to `T`.
///
/// Wraps a raw mutable pointer (`*mut T`) so it can be sent across worker
/// threads when the caller guarantees that writes through it are disjoint.
///
/// # Safety
///
/// The user must ensure that the pointed-to data adheres to Rust's safety
/// rules regarding mutability, lifetimes, and thread safety.
#[derive(Clone, Debug, Copy)]
pub struct SendPtrMut<T> {
    /// Holds the raw mutable pointer to an instance of `T`.
    pub raw: *mut T,
}

unsafe impl<T> Sync for SendPtrMut<T> {}
unsafe impl<T> Send for SendPtrMut<T> {}

impl<T> Default for SendPtrMut<T> {
    fn default() -> Self {
        SendPtrMut {
            raw: std::ptr::null_mut(),
        }
    }
}
