//! Conflict-free partition of particles over deposit workers.
//!
//! Particles are assigned to workers by hashing their local cell index, so
//! that every particle of a given cell lands in the same worker's list. The
//! subsequent deposit pass can then mutate per-cell moment buffers without
//! locks or atomics: no two workers ever write the same cell.
use std::sync::Mutex;

use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    grid::CellGrid,
    types::{FarFieldError, RealScalar},
};

/// Particle indices partitioned by owning worker.
///
/// The owner of a particle is `local_cell % n_workers`, a static property of
/// the target cell. The partition is scratch data for a single deposit call.
#[derive(Debug)]
pub struct CellPartition {
    bins: Vec<Vec<usize>>,
}

impl CellPartition {
    /// Assign every particle to its cell and owning worker.
    ///
    /// This is the parallel scan of the deposit pipeline. Each particle is
    /// binned into the grid, its global cell id recorded in `cells`, and its
    /// index appended to the owner's list behind a short per-owner mutex —
    /// the only synchronized operation on the path. A final serial pass
    /// verifies that the per-worker counts sum to the particle count.
    ///
    /// # Arguments
    /// * `grid` - Cell grid geometry.
    /// * `positions` - Interleaved coordinates `[x0, y0, z0, x1, ...]`.
    /// * `n_workers` - Number of owner bins to partition into.
    /// * `cells` - Output global cell id per particle, length `n`.
    ///
    /// # Errors
    /// [`FarFieldError::OutOfDomain`] when a particle leaves the local
    /// window, [`FarFieldError::CountMismatch`] when the accounting check
    /// fails.
    pub fn assign<T>(
        grid: &CellGrid<T>,
        positions: &[T],
        n_workers: usize,
        cells: &mut [i64],
    ) -> Result<Self, FarFieldError>
    where
        T: RealScalar,
    {
        assert!(n_workers > 0);
        assert_eq!(positions.len() % 3, 0);
        let n_particles = positions.len() / 3;
        assert_eq!(cells.len(), n_particles);

        let bins: Vec<Mutex<Vec<usize>>> =
            (0..n_workers).map(|_| Mutex::new(Vec::new())).collect();

        positions
            .par_chunks_exact(3)
            .zip(cells.par_iter_mut())
            .enumerate()
            .try_for_each(|(particle, (position, cell))| {
                let binned = grid
                    .bin(position)
                    .ok_or(FarFieldError::OutOfDomain { particle })?;
                *cell = binned.global as i64;

                let owner = binned.local % n_workers;
                bins[owner].lock().unwrap().push(particle);
                Ok(())
            })?;

        let bins = bins
            .into_iter()
            .map(|bin| bin.into_inner().unwrap())
            .collect_vec();

        // Accounting check before the moment buffers are touched.
        let assigned = bins.iter().map(Vec::len).sum::<usize>();
        if assigned != n_particles {
            return Err(FarFieldError::CountMismatch {
                expected: n_particles,
                assigned,
            });
        }

        Ok(Self { bins })
    }

    /// Number of owner bins.
    pub fn n_workers(&self) -> usize {
        self.bins.len()
    }

    /// Particle index lists, one per owner.
    pub fn bins(&self) -> &[Vec<usize>] {
        &self.bins
    }

    /// Total number of assigned particles.
    pub fn n_assigned(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::helpers::points_fixture;

    #[test]
    fn test_partition_completeness() {
        let n_particles = 5000;
        let extent = [6.0, 6.0, 6.0];
        let grid = CellGrid::new(extent, [8, 8, 8]);
        let positions = points_fixture::<f64>(n_particles, extent, None);
        let mut cells = vec![0i64; n_particles];

        for n_workers in [1, 3, 8] {
            let partition =
                CellPartition::assign(&grid, &positions, n_workers, &mut cells).unwrap();

            assert_eq!(partition.n_workers(), n_workers);
            assert_eq!(partition.n_assigned(), n_particles);

            // Every particle index appears in exactly one bin.
            let mut seen = vec![0usize; n_particles];
            for bin in partition.bins() {
                for &particle in bin {
                    seen[particle] += 1;
                }
            }
            assert!(seen.iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn test_cell_ownership_is_consistent() {
        let n_particles = 2000;
        let extent = [4.0, 4.0, 4.0];
        let grid = CellGrid::new(extent, [4, 4, 4]);
        let positions = points_fixture::<f64>(n_particles, extent, Some(1));
        let mut cells = vec![0i64; n_particles];

        let n_workers = 5;
        let partition = CellPartition::assign(&grid, &positions, n_workers, &mut cells).unwrap();

        // All particles of a given cell hash to the same bin, so a cell id
        // never appears in two bins.
        let mut cell_owner = std::collections::HashMap::new();
        for (owner, bin) in partition.bins().iter().enumerate() {
            for &particle in bin {
                let previous = cell_owner.insert(cells[particle], owner);
                if let Some(previous) = previous {
                    assert_eq!(previous, owner);
                }
            }
        }
    }

    #[test]
    fn test_out_of_domain_is_fatal() {
        let grid = CellGrid::new([4.0, 4.0, 4.0], [4, 4, 4]);
        let positions = vec![0.5, 0.5, 0.5, 0.5, 2.5, 0.5];
        let mut cells = vec![0i64; 2];

        let result = CellPartition::assign(&grid, &positions, 2, &mut cells);
        assert_eq!(result.unwrap_err(), FarFieldError::OutOfDomain { particle: 1 });
    }
}
