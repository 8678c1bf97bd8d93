//! Reciprocal lattice description and structure-factor storage.
use num_complex::Complex;

use crate::types::RealScalar;

/// Sign pairs applied to the two free indices of a plane or general lattice
/// term, in storage order.
///
/// One complex product per lattice point is reconstructed into all four sign
/// variants through this table, instead of enumerating the four quadrants
/// explicitly.
pub const QUADRANT_SIGNS: [[i8; 2]; 4] = [[1, 1], [1, -1], [-1, 1], [-1, -1]];

/// Lattice direction halves of the pure-axis region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatticeDirection {
    /// Positive multiples of the x wave number.
    XPos,
    /// Negative multiples of the x wave number.
    XNeg,
    /// Positive multiples of the y wave number.
    YPos,
    /// Negative multiples of the y wave number.
    YNeg,
    /// Positive multiples of the z wave number.
    ZPos,
    /// Negative multiples of the z wave number.
    ZNeg,
}

impl LatticeDirection {
    fn slot(self) -> usize {
        match self {
            LatticeDirection::XPos => 0,
            LatticeDirection::XNeg => 1,
            LatticeDirection::YPos => 2,
            LatticeDirection::YNeg => 3,
            LatticeDirection::ZPos => 4,
            LatticeDirection::ZNeg => 5,
        }
    }

    fn axis(self) -> usize {
        self.slot() / 2
    }
}

/// The three coordinate planes of the plane region. The first named axis
/// carries the first sign of a [`QUADRANT_SIGNS`] entry, the second the
/// second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatePlane {
    /// Vectors `(k, l, 0)`, signs applied to `k` and `l`.
    XY,
    /// Vectors `(0, l, m)`, signs applied to `l` and `m`.
    YZ,
    /// Vectors `(k, 0, m)`, signs applied to `m` and `k`.
    ZX,
}

impl CoordinatePlane {
    /// Axis indices `(first, second)` of the plane's free indices.
    pub fn axes(self) -> (usize, usize) {
        match self {
            CoordinatePlane::XY => (0, 1),
            CoordinatePlane::YZ => (1, 2),
            CoordinatePlane::ZX => (2, 0),
        }
    }

    fn slot(self) -> usize {
        match self {
            CoordinatePlane::XY => 0,
            CoordinatePlane::YZ => 1,
            CoordinatePlane::ZX => 2,
        }
    }
}

/// Geometry of the truncated reciprocal lattice and the run-time unit scale.
///
/// Wave numbers are per-axis and independent, so non-cubic (orthorhombic)
/// domains are supported; the cutoff on the squared vector magnitude is a
/// single isotropic value regardless.
#[derive(Clone, Debug)]
pub struct ReciprocalVectors<T> {
    wave_numbers: [T; 3],
    max_index: [usize; 3],
    cutoff_sq: T,
    energy_unit: T,
}

impl<T> ReciprocalVectors<T>
where
    T: RealScalar,
{
    /// Describe a truncated reciprocal lattice.
    ///
    /// # Arguments
    /// * `wave_numbers` - Fundamental wave number per axis, `2 pi / L_axis`.
    /// * `max_index` - Largest lattice index kept per axis.
    /// * `cutoff_sq` - Squared magnitude cutoff pruning the general sum.
    /// * `energy_unit` - Unit scale applied to every returned energy; a
    ///   run-time value so one build serves any unit system.
    pub fn new(wave_numbers: [T; 3], max_index: [usize; 3], cutoff_sq: T, energy_unit: T) -> Self {
        assert!(max_index.iter().all(|&n| n > 0));
        assert!(cutoff_sq > T::zero());

        Self {
            wave_numbers,
            max_index,
            cutoff_sq,
            energy_unit,
        }
    }

    /// Fundamental wave number per axis.
    pub fn wave_numbers(&self) -> [T; 3] {
        self.wave_numbers
    }

    /// Largest lattice index kept per axis.
    pub fn max_index(&self) -> [usize; 3] {
        self.max_index
    }

    /// Squared magnitude cutoff of the general lattice sum.
    pub fn cutoff_sq(&self) -> T {
        self.cutoff_sq
    }

    /// Unit scale applied to returned energies.
    pub fn energy_unit(&self) -> T {
        self.energy_unit
    }
}

/// Precomputed per-vector structure factors and screening coefficients.
///
/// Four storage regions, all externally populated by the (out-of-scope)
/// table builder:
///
/// * **Axis** — for each of the six lattice direction halves, the complex
///   structure factor of the `n`-th multiple, `1 <= n <= max_index`.
/// * **Plane** — for each coordinate plane, sign quadrant and index pair
///   `(i, j)`, the structure factor of the signed vector with the plane's
///   third index zero.
/// * **General** — for each sign quadrant and all-positive index triple
///   `(k, l, m)`, a folded structure factor: the entry for sign pair
///   `(s1, s2)` is expected to cover both the `(s1 k, s2 l, m)` octant and,
///   via conjugation, the `(-s1 k, -s2 l, -m)` octant, which is what lets
///   the evaluator visit four quadrants instead of eight octants.
/// * **Coefficients** — the real scalar weight (Gaussian screening times
///   volume normalisation) shared by all sign variants of a `(k, l, m)`
///   vector type, indexed with the true (zero-allowed) indices.
#[derive(Clone, Debug)]
pub struct StructureFactors<T> {
    axis: [Vec<Complex<T>>; 6],
    planes: [Vec<Complex<T>>; 3],
    general: Vec<Complex<T>>,
    coefficients: Vec<T>,
    max_index: [usize; 3],
}

impl<T> StructureFactors<T>
where
    T: RealScalar,
{
    /// Zero-filled tables for a lattice truncated at `max_index` per axis.
    pub fn new(max_index: [usize; 3]) -> Self {
        let [nk, nl, nm] = max_index;
        assert!(nk > 0 && nl > 0 && nm > 0);

        let zero = Complex::new(T::zero(), T::zero());
        let plane_len = |a: usize, b: usize| 4 * a * b;

        Self {
            axis: [
                vec![zero; nk],
                vec![zero; nk],
                vec![zero; nl],
                vec![zero; nl],
                vec![zero; nm],
                vec![zero; nm],
            ],
            planes: [
                vec![zero; plane_len(nk, nl)],
                vec![zero; plane_len(nl, nm)],
                vec![zero; plane_len(nm, nk)],
            ],
            general: vec![zero; 4 * nk * nl * nm],
            coefficients: vec![T::zero(); (nk + 1) * (nl + 1) * (nm + 1)],
            max_index,
        }
    }

    /// Truncation the tables were sized for.
    pub fn max_index(&self) -> [usize; 3] {
        self.max_index
    }

    /// Structure factor of the `n`-th multiple along a direction half,
    /// `1 <= n <= max_index`.
    pub fn axis(&self, direction: LatticeDirection, n: usize) -> Complex<T> {
        self.axis[direction.slot()][n - 1]
    }

    /// Mutable access to an axis entry, for table builders.
    pub fn axis_mut(&mut self, direction: LatticeDirection, n: usize) -> &mut Complex<T> {
        debug_assert!(n >= 1 && n <= self.max_index[direction.axis()]);
        &mut self.axis[direction.slot()][n - 1]
    }

    fn plane_index(&self, plane: CoordinatePlane, quadrant: usize, i: usize, j: usize) -> usize {
        let (first, second) = plane.axes();
        debug_assert!(quadrant < 4);
        debug_assert!(i >= 1 && i <= self.max_index[first]);
        debug_assert!(j >= 1 && j <= self.max_index[second]);
        ((j - 1) * self.max_index[first] + (i - 1)) * 4 + quadrant
    }

    /// Structure factor of a plane vector; `i` indexes the plane's first
    /// axis, `j` its second, both 1-based, with [`QUADRANT_SIGNS`] applied
    /// in that order.
    pub fn plane(&self, plane: CoordinatePlane, quadrant: usize, i: usize, j: usize) -> Complex<T> {
        self.planes[plane.slot()][self.plane_index(plane, quadrant, i, j)]
    }

    /// Mutable access to a plane entry, for table builders.
    pub fn plane_mut(
        &mut self,
        plane: CoordinatePlane,
        quadrant: usize,
        i: usize,
        j: usize,
    ) -> &mut Complex<T> {
        let index = self.plane_index(plane, quadrant, i, j);
        &mut self.planes[plane.slot()][index]
    }

    fn general_index(&self, quadrant: usize, k: usize, l: usize, m: usize) -> usize {
        let [nk, nl, _] = self.max_index;
        debug_assert!(quadrant < 4);
        debug_assert!(k >= 1 && l >= 1 && m >= 1);
        (((m - 1) * nl + (l - 1)) * nk + (k - 1)) * 4 + quadrant
    }

    /// Folded structure factor of a general lattice vector, indices
    /// 1-based; the quadrant signs apply to `k` and `l`.
    pub fn general(&self, quadrant: usize, k: usize, l: usize, m: usize) -> Complex<T> {
        self.general[self.general_index(quadrant, k, l, m)]
    }

    /// Mutable access to a general-region entry, for table builders.
    pub fn general_mut(&mut self, quadrant: usize, k: usize, l: usize, m: usize) -> &mut Complex<T> {
        let index = self.general_index(quadrant, k, l, m);
        &mut self.general[index]
    }

    fn coefficient_index(&self, k: usize, l: usize, m: usize) -> usize {
        let [nk, nl, _] = self.max_index;
        debug_assert!(k <= nk && l <= nl && m <= self.max_index[2]);
        (m * (nl + 1) + l) * (nk + 1) + k
    }

    /// Screening coefficient of the `(k, l, m)` vector type, true
    /// (zero-allowed) indices.
    pub fn coefficient(&self, k: usize, l: usize, m: usize) -> T {
        self.coefficients[self.coefficient_index(k, l, m)]
    }

    /// Mutable access to a coefficient, for table builders.
    pub fn coefficient_mut(&mut self, k: usize, l: usize, m: usize) -> &mut T {
        let index = self.coefficient_index(k, l, m);
        &mut self.coefficients[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_region_sizes() {
        let tables = StructureFactors::<f64>::new([3, 4, 5]);
        assert_eq!(tables.axis[0].len(), 3);
        assert_eq!(tables.axis[3].len(), 4);
        assert_eq!(tables.axis[5].len(), 5);
        assert_eq!(tables.planes[0].len(), 4 * 3 * 4);
        assert_eq!(tables.planes[1].len(), 4 * 4 * 5);
        assert_eq!(tables.planes[2].len(), 4 * 5 * 3);
        assert_eq!(tables.general.len(), 4 * 3 * 4 * 5);
        assert_eq!(tables.coefficients.len(), 4 * 5 * 6);
    }

    #[test]
    fn test_accessors_round_trip() {
        let mut tables = StructureFactors::<f64>::new([2, 2, 2]);

        *tables.axis_mut(LatticeDirection::YNeg, 2) = Complex::new(1.0, -2.0);
        assert_eq!(tables.axis(LatticeDirection::YNeg, 2), Complex::new(1.0, -2.0));

        *tables.plane_mut(CoordinatePlane::ZX, 3, 1, 2) = Complex::new(0.5, 0.25);
        assert_eq!(
            tables.plane(CoordinatePlane::ZX, 3, 1, 2),
            Complex::new(0.5, 0.25)
        );

        *tables.general_mut(1, 2, 1, 2) = Complex::new(-1.0, 4.0);
        assert_eq!(tables.general(1, 2, 1, 2), Complex::new(-1.0, 4.0));

        *tables.coefficient_mut(0, 2, 1) = 7.0;
        assert_eq!(tables.coefficient(0, 2, 1), 7.0);
    }
}
