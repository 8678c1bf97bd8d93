//! Multipole expansion layout and special-function tables.
//!
//! The moment buffer of a cell holds `2 * nlevel^2` reals: the real parts of
//! all `(l, m)` terms in lexicographic order followed by the imaginary
//! parts. The tables here feed the deposit loop: factorials for the
//! normalisation coefficients, an azimuthal complex-exponential table built
//! by an angle-addition recurrence, and the associated Legendre values built
//! by the standard stable recursion.
use num::Complex;

use crate::types::RealScalar;

/// Number of `(l, m)` terms in an expansion truncated at degree `nlevel`.
pub fn n_terms(nlevel: usize) -> usize {
    nlevel * nlevel
}

/// Lexicographic index of the `(l, m)` term, `l * (l + 1) + m`.
///
/// This layout is shared with the (external) translation stages and must not
/// change.
pub fn term_index(l: usize, m: i64) -> usize {
    debug_assert!(m.unsigned_abs() as usize <= l);
    ((l * (l + 1)) as i64 + m) as usize
}

/// Row-major index into an associated Legendre table of truncation `nlevel`.
pub fn legendre_index(nlevel: usize, l: usize, m: usize) -> usize {
    debug_assert!(m <= l && l < nlevel);
    l * nlevel + m
}

/// Factorials and double factorials precomputed up to a fixed degree.
///
/// Built once per deposit operator and shared read-only across workers.
#[derive(Clone, Debug)]
pub struct FactorialTable<T> {
    factorial: Vec<T>,
    double_factorial: Vec<T>,
}

impl<T> FactorialTable<T>
where
    T: RealScalar,
{
    /// Tables covering `0! .. (len - 1)!`, where `len = max(max_degree, 4)`.
    pub fn new(max_degree: usize) -> Self {
        let len = max_degree.max(4);
        let mut factorial = vec![T::one(); len];
        let mut double_factorial = vec![T::one(); len];
        factorial[2] = T::from(2.0).unwrap();
        double_factorial[2] = T::from(2.0).unwrap();

        for n in 3..len {
            let n_t = T::from(n).unwrap();
            factorial[n] = n_t * factorial[n - 1];
            double_factorial[n] = n_t * double_factorial[n - 2];
        }

        Self {
            factorial,
            double_factorial,
        }
    }

    /// `n!`
    pub fn factorial(&self, n: usize) -> T {
        self.factorial[n]
    }

    /// `n!!`
    pub fn double_factorial(&self, n: usize) -> T {
        self.double_factorial[n]
    }
}

/// Fill `phases` with `exp(i m phi)` for `m = -nlevel ..= nlevel`, stored at
/// offset `m + nlevel`.
///
/// Seeded at `m = 0` and extended one order per step by multiplying with
/// `cos(phi) + i sin(phi)` (positive orders) or its conjugate (negative
/// orders): two trigonometric evaluations in total, the rest complex
/// multiplies.
///
/// # Arguments
/// * `cos_phi` - Cosine of the azimuthal angle.
/// * `sin_phi` - Sine of the azimuthal angle.
/// * `nlevel` - Expansion truncation; `phases` has length `2 * nlevel + 1`.
/// * `phases` - Output table.
pub fn azimuthal_phases<T>(cos_phi: T, sin_phi: T, nlevel: usize, phases: &mut [Complex<T>])
where
    T: RealScalar,
{
    debug_assert_eq!(phases.len(), 2 * nlevel + 1);

    let step = Complex::new(cos_phi, sin_phi);
    let step_conj = Complex::new(cos_phi, -sin_phi);

    phases[nlevel] = Complex::new(T::one(), T::zero());
    for m in 1..=nlevel {
        phases[nlevel + m] = phases[nlevel + m - 1] * step;
        phases[nlevel - m] = phases[nlevel - m + 1] * step_conj;
    }
}

/// Fill `table` with the associated Legendre values `P_l^m(cos_theta)` for
/// `0 <= m <= l < nlevel`, indexed by [`legendre_index`].
///
/// Uses the stable recursion: diagonal seed `P_0^0 = 1`, diagonal step
/// `P_{l+1}^{l+1} = -(2l+1) sqrt(1 - c^2) P_l^l`, sub-diagonal step
/// `P_{l+1}^l = (2l+1) c P_l^l`, and the general three-term step for
/// `m < l`. Negative orders are read through `|m|` by the caller, never
/// computed.
pub fn legendre_table<T>(cos_theta: T, nlevel: usize, table: &mut [T])
where
    T: RealScalar,
{
    debug_assert!(nlevel > 0);
    debug_assert_eq!(table.len(), nlevel * nlevel);

    let sin_theta = (T::one() - cos_theta * cos_theta).sqrt();

    table[legendre_index(nlevel, 0, 0)] = T::one();
    for l in 0..nlevel.saturating_sub(1) {
        let two_l_plus_1 = T::from(2 * l + 1).unwrap();
        let p_ll = table[legendre_index(nlevel, l, l)];

        table[legendre_index(nlevel, l + 1, l + 1)] = -two_l_plus_1 * sin_theta * p_ll;
        table[legendre_index(nlevel, l + 1, l)] = two_l_plus_1 * cos_theta * p_ll;

        for m in 0..l {
            table[legendre_index(nlevel, l + 1, m)] = (two_l_plus_1
                * cos_theta
                * table[legendre_index(nlevel, l, m)]
                - T::from(l + m).unwrap() * table[legendre_index(nlevel, l - 1, m)])
                / T::from(l - m + 1).unwrap();
        }
    }
}
