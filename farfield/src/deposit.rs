//! Parallel particle-to-multipole deposit.
//!
//! Each particle contributes the regular solid harmonics of its displacement
//! from its cell centre, weighted by its charge, to the owning cell's moment
//! buffer. The deposit runs one worker per partition bin; the cell-hashed
//! partition guarantees disjoint buffer writes, so the accumulation pass
//! needs no synchronization at all.
use num::Complex;
use rayon::prelude::*;

use crate::{
    expansion::{
        azimuthal_phases, legendre_index, legendre_table, n_terms, term_index, FactorialTable,
    },
    grid::CellGrid,
    partition::CellPartition,
    types::{FarFieldError, RealScalar, SendPtrMut},
};

/// Per-worker scratch for the deposit loop, allocated once per bin.
struct DepositScratch<T> {
    phases: Vec<Complex<T>>,
    legendre: Vec<T>,
}

impl<T> DepositScratch<T>
where
    T: RealScalar,
{
    fn new(nlevel: usize) -> Self {
        Self {
            phases: vec![Complex::new(T::zero(), T::zero()); 2 * nlevel + 1],
            legendre: vec![T::zero(); nlevel * nlevel],
        }
    }
}

/// Particle-to-multipole deposit operator for a fixed grid, expansion order
/// and worker count.
#[derive(Clone, Debug)]
pub struct MultipoleDeposit<T> {
    grid: CellGrid<T>,
    nlevel: usize,
    n_workers: usize,
    factorials: FactorialTable<T>,
}

impl<T> MultipoleDeposit<T>
where
    T: RealScalar,
{
    /// Create a deposit operator.
    ///
    /// # Arguments
    /// * `grid` - Cell grid geometry.
    /// * `nlevel` - Expansion truncation; degrees `0 .. nlevel` are kept.
    /// * `n_workers` - Number of owner bins the particles are partitioned
    ///   into; also the parallel width of the accumulation pass.
    pub fn new(grid: CellGrid<T>, nlevel: usize, n_workers: usize) -> Self {
        assert!(nlevel > 0);
        assert!(n_workers > 0);

        let factorials = FactorialTable::new(2 * nlevel);
        Self {
            grid,
            nlevel,
            n_workers,
            factorials,
        }
    }

    /// Number of reals in the moment buffer of a single cell.
    pub fn cell_len(&self) -> usize {
        2 * n_terms(self.nlevel)
    }

    /// Required length of the full moment buffer: one cell block per local
    /// cell, each holding the real parts of all `(l, m)` terms followed by
    /// the imaginary parts.
    pub fn multipole_len(&self) -> usize {
        self.grid.n_local_cells() * self.cell_len()
    }

    /// Grid the operator deposits into.
    pub fn grid(&self) -> &CellGrid<T> {
        &self.grid
    }

    /// Deposit the multipole contributions of all particles.
    ///
    /// `multipoles` is accumulated into additively; the caller zeroes it (or
    /// keeps prior content to accumulate across calls). On error the caller
    /// must discard the buffer — a failing call may have partially mutated
    /// it.
    ///
    /// The accumulated term for degree `l` and order `m` is
    /// `sqrt((l-|m|)!/(l+|m|)!) * q * r^l * P_l^{|m|}(cos theta) * exp(-i m phi)`,
    /// with the conjugate azimuthal phase. Downstream translation consumers
    /// rely on this sign convention; do not alter it without confirming
    /// theirs.
    ///
    /// # Arguments
    /// * `positions` - Interleaved coordinates `[x0, y0, z0, x1, ...]`.
    /// * `charges` - Charge per particle.
    /// * `cells` - Output global cell id per particle, length `n`.
    /// * `multipoles` - In/out moment buffer of [`Self::multipole_len`]
    ///   reals.
    ///
    /// # Errors
    /// Any variant of [`FarFieldError`]; all are fatal for the call.
    pub fn deposit(
        &self,
        positions: &[T],
        charges: &[T],
        cells: &mut [i64],
        multipoles: &mut [T],
    ) -> Result<(), FarFieldError> {
        let n_particles = charges.len();
        assert_eq!(positions.len(), 3 * n_particles);
        assert_eq!(cells.len(), n_particles);
        assert_eq!(multipoles.len(), self.multipole_len());

        let partition = CellPartition::assign(&self.grid, positions, self.n_workers, cells)?;

        let base = SendPtrMut {
            raw: multipoles.as_mut_ptr(),
        };

        let processed = partition
            .bins()
            .par_iter()
            .enumerate()
            .map(|(worker, bin)| self.deposit_bin(worker, bin, positions, charges, base))
            .sum::<Result<usize, FarFieldError>>()?;

        if processed != n_particles {
            return Err(FarFieldError::ProcessedCountMismatch {
                expected: n_particles,
                processed,
            });
        }

        Ok(())
    }

    /// Deposit all particles of one owner bin.
    ///
    /// The cell and spherical displacement are recomputed here rather than
    /// carried over from the binning pass: the recomputation is cheap next
    /// to the moment work and keeps this stage self-contained. A recomputed
    /// owner that disagrees with the bin is an internal consistency bug.
    fn deposit_bin(
        &self,
        worker: usize,
        bin: &[usize],
        positions: &[T],
        charges: &[T],
        base: SendPtrMut<T>,
    ) -> Result<usize, FarFieldError> {
        let nlevel = self.nlevel;
        let cell_len = self.cell_len();
        let mut scratch = DepositScratch::new(nlevel);

        for &particle in bin {
            let position = &positions[particle * 3..particle * 3 + 3];
            let (cell, offset) = self
                .grid
                .spherical_bin(position)
                .ok_or(FarFieldError::OutOfDomain { particle })?;

            let owner = cell % self.n_workers;
            if owner != worker {
                return Err(FarFieldError::OwnershipViolation {
                    particle,
                    assigned: worker,
                    owner,
                });
            }

            azimuthal_phases(offset.cos_phi, offset.sin_phi, nlevel, &mut scratch.phases);
            legendre_table(offset.cos_theta, nlevel, &mut scratch.legendre);

            // Safety: the partition assigns every particle of this cell to
            // this worker, so no other worker writes this cell block, and
            // blocks of distinct cells are disjoint ranges of `multipoles`.
            let moments =
                unsafe { std::slice::from_raw_parts_mut(base.raw.add(cell * cell_len), cell_len) };
            let (moments_re, moments_im) = moments.split_at_mut(cell_len / 2);

            let mut radius_pow_l = T::one();
            for l in 0..nlevel {
                if l > 0 {
                    radius_pow_l = radius_pow_l * offset.radius;
                }

                for m in -(l as i64)..=(l as i64) {
                    let abs_m = m.unsigned_abs() as usize;
                    let coeff = (self.factorials.factorial(l - abs_m)
                        / self.factorials.factorial(l + abs_m))
                    .sqrt()
                        * charges[particle]
                        * radius_pow_l;

                    let p_lm = scratch.legendre[legendre_index(nlevel, l, abs_m)];
                    // exp(-i m phi): the table is read at -m.
                    let phase = scratch.phases[(nlevel as i64 - m) as usize];

                    let term = term_index(l, m);
                    moments_re[term] += coeff * p_lm * phase.re;
                    moments_im[term] += coeff * p_lm * phase.im;
                }
            }
        }

        Ok(bin.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helpers::{charges_fixture, points_fixture};
    use approx::assert_relative_eq;

    fn single_cell_operator(nlevel: usize) -> MultipoleDeposit<f64> {
        // One cell spanning [-1, 1]^3, centred on the origin.
        let grid = CellGrid::new([2.0, 2.0, 2.0], [1, 1, 1]);
        MultipoleDeposit::new(grid, nlevel, 1)
    }

    #[test]
    fn test_particle_at_cell_centre() {
        let nlevel = 5;
        let operator = single_cell_operator(nlevel);

        let positions = vec![0.0, 0.0, 0.0];
        let charges = vec![2.0];
        let mut cells = vec![0i64; 1];
        let mut multipoles = vec![0.0; operator.multipole_len()];

        operator
            .deposit(&positions, &charges, &mut cells, &mut multipoles)
            .unwrap();

        let (re, im) = multipoles.split_at(n_terms(nlevel));
        assert_relative_eq!(re[term_index(0, 0)], 2.0);
        assert_eq!(im[term_index(0, 0)], 0.0);

        // r^l vanishes for every degree above zero.
        for l in 1..nlevel {
            for m in -(l as i64)..=(l as i64) {
                assert_eq!(re[term_index(l, m)], 0.0);
                assert_eq!(im[term_index(l, m)], 0.0);
            }
        }
    }

    #[test]
    fn test_degree_one_closed_forms() {
        let nlevel = 3;
        let operator = single_cell_operator(nlevel);

        let (q, dx, dy, dz) = (1.5, 0.3, -0.2, 0.4);
        let positions = vec![dx, dy, dz];
        let charges = vec![q];
        let mut cells = vec![0i64; 1];
        let mut multipoles = vec![0.0; operator.multipole_len()];

        operator
            .deposit(&positions, &charges, &mut cells, &mut multipoles)
            .unwrap();

        let (re, im) = multipoles.split_at(n_terms(nlevel));
        let sqrt2 = 2.0f64.sqrt();

        // R_1^0 = q z.
        assert_relative_eq!(re[term_index(1, 0)], q * dz, epsilon = 1e-14);
        assert_relative_eq!(im[term_index(1, 0)], 0.0, epsilon = 1e-14);

        // R_1^1 = -q (x - i y) / sqrt(2).
        assert_relative_eq!(re[term_index(1, 1)], -q * dx / sqrt2, epsilon = 1e-14);
        assert_relative_eq!(im[term_index(1, 1)], q * dy / sqrt2, epsilon = 1e-14);

        // R_1^{-1} = -q (x + i y) / sqrt(2).
        assert_relative_eq!(re[term_index(1, -1)], -q * dx / sqrt2, epsilon = 1e-14);
        assert_relative_eq!(im[term_index(1, -1)], -q * dy / sqrt2, epsilon = 1e-14);
    }

    #[test]
    fn test_charge_conservation() {
        let n_particles = 500;
        let extent = [5.0, 5.0, 5.0];
        let grid = CellGrid::new(extent, [4, 4, 4]);
        let nlevel = 4;
        let operator = MultipoleDeposit::new(grid, nlevel, 3);

        let positions = points_fixture::<f64>(n_particles, extent, Some(13));
        let charges = charges_fixture::<f64>(n_particles, Some(13));
        let mut cells = vec![0i64; n_particles];
        let mut multipoles = vec![0.0; operator.multipole_len()];

        operator
            .deposit(&positions, &charges, &mut cells, &mut multipoles)
            .unwrap();

        let cell_len = operator.cell_len();
        let mut monopole = 0.0;
        for cell in multipoles.chunks_exact(cell_len) {
            let (re, im) = cell.split_at(cell_len / 2);
            monopole += re[term_index(0, 0)];
            // The degree-0 imaginary part is exactly zero.
            assert_eq!(im[term_index(0, 0)], 0.0);
        }

        let total_charge = charges.iter().sum::<f64>();
        assert_relative_eq!(monopole, total_charge, max_relative = 1e-12, epsilon = 1e-10);
    }

    #[test]
    fn test_accumulation_is_additive() {
        let nlevel = 3;
        let operator = single_cell_operator(nlevel);

        let positions = vec![0.2, 0.1, -0.3];
        let charges = vec![1.0];
        let mut cells = vec![0i64; 1];

        let mut once = vec![0.0; operator.multipole_len()];
        operator
            .deposit(&positions, &charges, &mut cells, &mut once)
            .unwrap();

        // A second call on the same buffer doubles every term.
        let mut twice = once.clone();
        operator
            .deposit(&positions, &charges, &mut cells, &mut twice)
            .unwrap();

        for (&two, &one) in twice.iter().zip(once.iter()) {
            assert_relative_eq!(two, 2.0 * one, max_relative = 1e-14, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_out_of_domain_leaves_moments_untouched() {
        let nlevel = 3;
        let grid = CellGrid::new([2.0, 2.0, 2.0], [2, 2, 2]);
        let operator = MultipoleDeposit::new(grid, nlevel, 2);

        // Second particle sits one cell width beyond the domain.
        let positions = vec![0.1, 0.1, 0.1, 0.1, 0.1, 2.0];
        let charges = vec![1.0, 1.0];
        let mut cells = vec![0i64; 2];
        let mut multipoles = vec![0.0; operator.multipole_len()];

        let result = operator.deposit(&positions, &charges, &mut cells, &mut multipoles);
        assert_eq!(result.unwrap_err(), FarFieldError::OutOfDomain { particle: 1 });
        assert!(multipoles.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn test_parallel_deposit_matches_serial() {
        let n_particles = 300;
        let extent = [6.0, 6.0, 6.0];
        let nlevel = 5;

        let positions = points_fixture::<f64>(n_particles, extent, Some(7));
        let charges = charges_fixture::<f64>(n_particles, Some(7));

        let mut reference = Vec::new();
        for (run, n_workers) in [1, 4].into_iter().enumerate() {
            let grid = CellGrid::new(extent, [4, 4, 4]);
            let operator = MultipoleDeposit::new(grid, nlevel, n_workers);
            let mut cells = vec![0i64; n_particles];
            let mut multipoles = vec![0.0; operator.multipole_len()];
            operator
                .deposit(&positions, &charges, &mut cells, &mut multipoles)
                .unwrap();

            if run == 0 {
                reference = multipoles;
            } else {
                for (&parallel, &serial) in multipoles.iter().zip(reference.iter()) {
                    // Summation order differs between schedules; only the
                    // set of contributions per cell is identical.
                    assert_relative_eq!(parallel, serial, max_relative = 1e-12, epsilon = 1e-12);
                }
            }
        }
    }
}
