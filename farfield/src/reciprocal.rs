//! Reciprocal-space (Fourier) Ewald far-field energy evaluation.
//!
//! The caller precomputes, once per configuration of charges, a set of
//! structure factors and screening coefficients over a truncated reciprocal
//! lattice. The evaluator here sums, for one particle at a time, the
//! weighted lattice contributions against those tables: pure-axis vectors,
//! the three coordinate planes, and the general three-dimensional lattice
//! pruned by a spherical cutoff. Inversion symmetry lets four sign
//! quadrants stand in for all eight lattice octants.
pub mod energy;
pub mod types;
