//! Far-field energy evaluation against the reciprocal lattice.
use num_complex::Complex;

use crate::{
    reciprocal::types::{
        CoordinatePlane, LatticeDirection, ReciprocalVectors, StructureFactors, QUADRANT_SIGNS,
    },
    types::RealScalar,
};

/// Per-axis complex phase power tables, reusable across particles.
///
/// Heap-allocated once and sized by the lattice truncation; entry `n - 1` of
/// axis `a` holds `exp(i n g_a x_a)` after [`ReciprocalVectors::particle_energy`]
/// has filled it for a particle.
#[derive(Clone, Debug)]
pub struct ReciprocalScratch<T> {
    axis_phases: [Vec<Complex<T>>; 3],
}

impl<T> ReciprocalScratch<T>
where
    T: RealScalar,
{
    /// Scratch sized for a lattice description.
    pub fn new(vectors: &ReciprocalVectors<T>) -> Self {
        let [nk, nl, nm] = vectors.max_index();
        let zero = Complex::new(T::zero(), T::zero());
        Self {
            axis_phases: [vec![zero; nk], vec![zero; nl], vec![zero; nm]],
        }
    }
}

impl<T> ReciprocalVectors<T>
where
    T: RealScalar,
{
    /// Far-field potential energy contribution of one particle.
    ///
    /// A pure function of its inputs: no shared mutable state, safe to call
    /// independently per particle. Whether the caller divides a
    /// particle-summed total by two to correct double counting is a
    /// convention of the surrounding solver, not of this kernel.
    ///
    /// # Arguments
    /// * `tables` - Structure factors and coefficients for this lattice.
    /// * `position` - Particle coordinate triple `[x, y, z]`.
    /// * `scratch` - Reusable phase tables from [`ReciprocalScratch::new`].
    pub fn particle_energy(
        &self,
        tables: &StructureFactors<T>,
        position: [T; 3],
        scratch: &mut ReciprocalScratch<T>,
    ) -> T {
        assert_eq!(tables.max_index(), self.max_index());

        let wave_numbers = self.wave_numbers();
        let max_index = self.max_index();

        // Base phase per axis from one sin/cos pair, higher multiples by
        // repeated complex multiplication.
        for axis in 0..3 {
            let angle = position[axis] * wave_numbers[axis];
            let base = Complex::new(angle.cos(), angle.sin());
            let powers = &mut scratch.axis_phases[axis];
            powers[0] = base;
            for n in 1..powers.len() {
                powers[n] = powers[n - 1] * base;
            }
        }

        let mut energy = T::zero();
        energy += self.axis_terms(tables, scratch);
        energy += self.plane_terms(tables, scratch);
        energy += self.general_terms(tables, scratch, max_index);

        self.energy_unit() * energy
    }

    /// Batched evaluation with a lane-wise enable mask.
    ///
    /// Lanes with the mask unset are skipped and their output slot left
    /// untouched. Evaluation is serial; parallelising across particles is
    /// the caller's choice.
    ///
    /// # Arguments
    /// * `tables` - Structure factors and coefficients for this lattice.
    /// * `positions` - Interleaved coordinates `[x0, y0, z0, x1, ...]`.
    /// * `enabled` - Per-particle gate.
    /// * `energies` - Output energy per enabled particle.
    pub fn particle_energies(
        &self,
        tables: &StructureFactors<T>,
        positions: &[T],
        enabled: &[bool],
        energies: &mut [T],
    ) {
        let n_particles = enabled.len();
        assert_eq!(positions.len(), 3 * n_particles);
        assert_eq!(energies.len(), n_particles);

        let mut scratch = ReciprocalScratch::new(self);
        for (particle, energy) in energies.iter_mut().enumerate() {
            if !enabled[particle] {
                continue;
            }
            let position = [
                positions[particle * 3],
                positions[particle * 3 + 1],
                positions[particle * 3 + 2],
            ];
            *energy = self.particle_energy(tables, position, &mut scratch);
        }
    }

    /// Vectors with two of the three indices zero: both direction halves of
    /// each axis are recorded separately in the tables.
    fn axis_terms(&self, tables: &StructureFactors<T>, scratch: &ReciprocalScratch<T>) -> T {
        const DIRECTIONS: [(LatticeDirection, LatticeDirection); 3] = [
            (LatticeDirection::XPos, LatticeDirection::XNeg),
            (LatticeDirection::YPos, LatticeDirection::YNeg),
            (LatticeDirection::ZPos, LatticeDirection::ZNeg),
        ];

        let mut energy = T::zero();
        for (axis, (positive, negative)) in DIRECTIONS.into_iter().enumerate() {
            for n in 1..=self.max_index()[axis] {
                let mut triple = [0usize; 3];
                triple[axis] = n;
                let coeff = tables.coefficient(triple[0], triple[1], triple[2]);

                let phase = scratch.axis_phases[axis][n - 1];
                let forward = tables.axis(positive, n);
                let backward = tables.axis(negative, n);

                energy += coeff
                    * ((forward.re + backward.re) * phase.re
                        + (backward.im - forward.im) * phase.im);
            }
        }
        energy
    }

    /// Vectors with exactly one index zero: the two axis phases combine into
    /// one complex product, and the sign table reconstructs all four
    /// quadrant variants from it.
    fn plane_terms(&self, tables: &StructureFactors<T>, scratch: &ReciprocalScratch<T>) -> T {
        const PLANES: [CoordinatePlane; 3] =
            [CoordinatePlane::XY, CoordinatePlane::YZ, CoordinatePlane::ZX];

        let mut energy = T::zero();
        for plane in PLANES {
            let (first, second) = plane.axes();

            for j in 1..=self.max_index()[second] {
                let pb = scratch.axis_phases[second][j - 1];
                for i in 1..=self.max_index()[first] {
                    let pa = scratch.axis_phases[first][i - 1];

                    let mut triple = [0usize; 3];
                    triple[first] = i;
                    triple[second] = j;
                    let coeff = tables.coefficient(triple[0], triple[1], triple[2]);

                    for (quadrant, signs) in QUADRANT_SIGNS.iter().enumerate() {
                        let s1 = T::from(signs[0]).unwrap();
                        let s2 = T::from(signs[1]).unwrap();

                        let re = pa.re * pb.re - s1 * pa.im * s2 * pb.im;
                        let im = pa.re * s2 * pb.im + s1 * pa.im * pb.re;

                        let factor = tables.plane(plane, quadrant, i, j);
                        energy += coeff * (factor.re * re - factor.im * im);
                    }
                }
            }
        }
        energy
    }

    /// Vectors with all three indices nonzero. The squared magnitude grows
    /// monotonically with the innermost index, so the inner loop stops at
    /// the first vector past the cutoff with no shell list precomputed.
    fn general_terms(
        &self,
        tables: &StructureFactors<T>,
        scratch: &ReciprocalScratch<T>,
        max_index: [usize; 3],
    ) -> T {
        let [nk, nl, nm] = max_index;
        let [gx, gy, gz] = self.wave_numbers();
        let cutoff_sq = self.cutoff_sq();

        let mut energy = T::zero();
        for m in 1..=nm {
            let pz = scratch.axis_phases[2][m - 1];
            let kz = T::from(m).unwrap() * gz;
            let len_z = kz * kz;

            for l in 1..=nl {
                let py = scratch.axis_phases[1][l - 1];
                let ky = T::from(l).unwrap() * gy;
                let len_zy = len_z + ky * ky;

                for k in 1..=nk {
                    let kx = T::from(k).unwrap() * gx;
                    if len_zy + kx * kx >= cutoff_sq {
                        break;
                    }

                    let px = scratch.axis_phases[0][k - 1];
                    let coeff = tables.coefficient(k, l, m);
                    let xpap = px.re * py.re;

                    for (quadrant, signs) in QUADRANT_SIGNS.iter().enumerate() {
                        let s1 = T::from(signs[0]).unwrap();
                        let s2 = T::from(signs[1]).unwrap();

                        let ycp = px.im * s1;
                        let bcp = py.im * s2;

                        let xa_m_yb = xpap - ycp * bcp;
                        let xb_p_ya = px.re * bcp + ycp * py.re;

                        let re = pz.re * xa_m_yb - pz.im * xb_p_ya;
                        let im = xa_m_yb * pz.im + xb_p_ya * pz.re;

                        let factor = tables.general(quadrant, k, l, m);
                        energy += coeff * (re * factor.re - im * factor.im);
                    }
                }
            }
        }
        energy
    }
}
