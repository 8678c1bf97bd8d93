//! Cartesian cell grid geometry and particle binning.
//!
//! A [`CellGrid`] describes a global grid of equally sized cells spanning a
//! centred rectangular domain, together with a local window into that grid.
//! Particles are binned by linear truncation of their recentred coordinates;
//! a particle whose cell falls outside the local window is out of domain for
//! the owning rank and rejected.
use crate::types::RealScalar;

/// Cell indices produced by binning a single particle position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinnedCell {
    /// Row-major cell index within the local window.
    pub local: usize,
    /// Row-major cell index within the global grid.
    pub global: usize,
}

/// Spherical coordinates of the displacement from a particle to the centre
/// of its cell.
///
/// The azimuthal angle is carried as its cosine/sine pair so that downstream
/// recurrences need no further trigonometric calls.
#[derive(Clone, Copy, Debug)]
pub struct SphericalOffset<T> {
    /// Distance from the cell centre.
    pub radius: T,
    /// Cosine of the polar angle.
    pub cos_theta: T,
    /// Cosine of the azimuthal angle.
    pub cos_phi: T,
    /// Sine of the azimuthal angle.
    pub sin_phi: T,
}

/// A global Cartesian cell grid over a centred domain, restricted to a local
/// window of cells.
///
/// The domain spans `[-extent/2, extent/2]` along each axis. All triples are
/// in `x, y, z` order; linearized indices are row-major with `x` fastest.
#[derive(Clone, Debug)]
pub struct CellGrid<T> {
    /// Domain edge lengths.
    extent: [T; 3],
    /// Global cell counts per axis.
    side_counts: [usize; 3],
    /// First global cell coordinate of the local window.
    local_offset: [usize; 3],
    /// Cell counts of the local window.
    local_dims: [usize; 3],
}

impl<T> CellGrid<T>
where
    T: RealScalar,
{
    /// A grid whose local window covers the whole domain.
    ///
    /// # Arguments
    /// * `extent` - Domain edge lengths per axis.
    /// * `side_counts` - Number of cells per axis.
    pub fn new(extent: [T; 3], side_counts: [usize; 3]) -> Self {
        Self::with_local_window(extent, side_counts, [0; 3], side_counts)
    }

    /// A grid restricted to a local window, as produced by a domain
    /// decomposition.
    ///
    /// # Arguments
    /// * `extent` - Domain edge lengths per axis.
    /// * `side_counts` - Number of cells per axis of the global grid.
    /// * `local_offset` - Global cell coordinate of the window origin.
    /// * `local_dims` - Number of cells per axis of the window.
    pub fn with_local_window(
        extent: [T; 3],
        side_counts: [usize; 3],
        local_offset: [usize; 3],
        local_dims: [usize; 3],
    ) -> Self {
        for axis in 0..3 {
            assert!(extent[axis] > T::zero());
            assert!(side_counts[axis] > 0);
            assert!(local_dims[axis] > 0);
            assert!(local_offset[axis] + local_dims[axis] <= side_counts[axis]);
        }

        Self {
            extent,
            side_counts,
            local_offset,
            local_dims,
        }
    }

    /// Cells per axis of the local window.
    pub fn local_dims(&self) -> [usize; 3] {
        self.local_dims
    }

    /// Number of cells in the local window.
    pub fn n_local_cells(&self) -> usize {
        self.local_dims.iter().product()
    }

    /// Cells per axis of the global grid.
    pub fn side_counts(&self) -> [usize; 3] {
        self.side_counts
    }

    fn inverse_cell_len(&self, axis: usize) -> T {
        T::from(self.side_counts[axis]).unwrap() / self.extent[axis]
    }

    fn half_cell_len(&self, axis: usize) -> T {
        let half = T::from(0.5).unwrap();
        half * self.extent[axis] / T::from(self.side_counts[axis]).unwrap()
    }

    /// Global and local integer cell coordinates of a position, or `None`
    /// when the position leaves the local window.
    fn bin_coords(&self, position: &[T]) -> Option<([usize; 3], [usize; 3])> {
        let half = T::from(0.5).unwrap();

        let mut global = [0usize; 3];
        let mut local = [0usize; 3];
        for axis in 0..3 {
            let shifted = position[axis] + half * self.extent[axis];
            let scaled = shifted * self.inverse_cell_len(axis);
            if scaled < T::zero() {
                return None;
            }
            let coord = scaled.to_usize()?;
            if coord < self.local_offset[axis] {
                return None;
            }
            let local_coord = coord - self.local_offset[axis];
            if local_coord >= self.local_dims[axis] {
                return None;
            }
            global[axis] = coord;
            local[axis] = local_coord;
        }

        Some((global, local))
    }

    /// Bin a position into its owning cell.
    ///
    /// Returns `None` when the position falls outside the local window.
    ///
    /// # Arguments
    /// * `position` - Coordinate triple `[x, y, z]`.
    pub fn bin(&self, position: &[T]) -> Option<BinnedCell> {
        let (global, local) = self.bin_coords(position)?;
        Some(BinnedCell {
            local: self.linear_local(local),
            global: self.linear_global(global),
        })
    }

    /// Bin a position and additionally convert its displacement from the
    /// cell centre into spherical coordinates.
    ///
    /// One `atan2` plus one `cos`/`sin` pair is spent per angle; no further
    /// trigonometric calls are required by the moment recurrences.
    ///
    /// # Arguments
    /// * `position` - Coordinate triple `[x, y, z]`.
    pub fn spherical_bin(&self, position: &[T]) -> Option<(usize, SphericalOffset<T>)> {
        let (global, local) = self.bin_coords(position)?;
        let centre = self.cell_centre(global);

        let dx = position[0] - centre[0];
        let dy = position[1] - centre[1];
        let dz = position[2] - centre[2];

        let dx2 = dx * dx;
        let dx2_p_dy2 = dx2 + dy * dy;
        let radius = (dx2_p_dy2 + dz * dz).sqrt();

        let theta = dx2_p_dy2.sqrt().atan2(dz);
        let phi = dy.atan2(dx);

        Some((
            self.linear_local(local),
            SphericalOffset {
                radius,
                cos_theta: theta.cos(),
                cos_phi: phi.cos(),
                sin_phi: phi.sin(),
            },
        ))
    }

    /// Geometric centre of a cell given its global integer coordinates.
    pub fn cell_centre(&self, global: [usize; 3]) -> [T; 3] {
        let half = T::from(0.5).unwrap();
        let mut centre = [T::zero(); 3];
        for axis in 0..3 {
            centre[axis] = T::from(2 * global[axis] + 1).unwrap() * self.half_cell_len(axis)
                - half * self.extent[axis];
        }
        centre
    }

    fn linear_local(&self, local: [usize; 3]) -> usize {
        local[0] + self.local_dims[0] * (local[1] + self.local_dims[1] * local[2])
    }

    fn linear_global(&self, global: [usize; 3]) -> usize {
        global[0] + self.side_counts[0] * (global[1] + self.side_counts[1] * global[2])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bin_whole_domain() {
        let grid = CellGrid::new([4.0, 4.0, 4.0], [4, 4, 4]);

        // The domain spans [-2, 2] along each axis, cells have unit side.
        let cell = grid.bin(&[-1.9, -1.9, -1.9]).unwrap();
        assert_eq!(cell.local, 0);
        assert_eq!(cell.global, 0);

        let cell = grid.bin(&[1.9, 1.9, 1.9]).unwrap();
        assert_eq!(cell.local, 63);

        // x is the fastest axis of the linearization.
        let cell = grid.bin(&[-0.5, -1.9, -1.9]).unwrap();
        assert_eq!(cell.local, 1);
        let cell = grid.bin(&[-1.9, -0.5, -1.9]).unwrap();
        assert_eq!(cell.local, 4);
        let cell = grid.bin(&[-1.9, -1.9, -0.5]).unwrap();
        assert_eq!(cell.local, 16);
    }

    #[test]
    fn test_bin_rejects_out_of_domain() {
        let grid = CellGrid::new([4.0, 4.0, 4.0], [4, 4, 4]);

        assert!(grid.bin(&[-2.1, 0.0, 0.0]).is_none());
        assert!(grid.bin(&[0.0, 2.0, 0.0]).is_none());
        assert!(grid.bin(&[0.0, 0.0, 5.0]).is_none());
    }

    #[test]
    fn test_local_window() {
        let grid =
            CellGrid::with_local_window([4.0, 4.0, 4.0], [4, 4, 4], [1, 1, 1], [2, 2, 2]);

        // Global cell (1, 1, 1) is the window origin.
        let cell = grid.bin(&[-0.5, -0.5, -0.5]).unwrap();
        assert_eq!(cell.local, 0);
        assert_eq!(cell.global, 1 + 4 * (1 + 4));

        // Global cell (0, 0, 0) lies one cell outside the window.
        assert!(grid.bin(&[-1.5, -1.5, -1.5]).is_none());
        // As does global cell (3, 3, 3) on the far side.
        assert!(grid.bin(&[1.5, 1.5, 1.5]).is_none());
    }

    #[test]
    fn test_cell_centre() {
        let grid = CellGrid::new([4.0, 4.0, 4.0], [4, 4, 4]);

        let centre = grid.cell_centre([0, 0, 0]);
        assert_relative_eq!(centre[0], -1.5);
        assert_relative_eq!(centre[1], -1.5);
        assert_relative_eq!(centre[2], -1.5);

        let centre = grid.cell_centre([3, 2, 1]);
        assert_relative_eq!(centre[0], 1.5);
        assert_relative_eq!(centre[1], 0.5);
        assert_relative_eq!(centre[2], -0.5);
    }

    #[test]
    fn test_spherical_offset_at_centre() {
        let grid = CellGrid::new([2.0, 2.0, 2.0], [1, 1, 1]);

        let (cell, offset) = grid.spherical_bin(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(cell, 0);
        assert_relative_eq!(offset.radius, 0.0);
    }

    #[test]
    fn test_spherical_offset_along_z() {
        let grid = CellGrid::new([2.0, 2.0, 2.0], [1, 1, 1]);

        // Displacement purely along +z: polar angle 0.
        let (_, offset) = grid.spherical_bin(&[0.0, 0.0, 0.25]).unwrap();
        assert_relative_eq!(offset.radius, 0.25);
        assert_relative_eq!(offset.cos_theta, 1.0);

        // Displacement purely along +x: polar angle pi/2, azimuth 0.
        let (_, offset) = grid.spherical_bin(&[0.25, 0.0, 0.0]).unwrap();
        assert_relative_eq!(offset.radius, 0.25);
        assert_relative_eq!(offset.cos_theta, 0.0, epsilon = 1e-15);
        assert_relative_eq!(offset.cos_phi, 1.0);
        assert_relative_eq!(offset.sin_phi, 0.0);
    }
}
