//! Particle fixtures used in testing and benchmarking the kernels.
use rand::prelude::*;

use crate::types::RealScalar;

/// Interleaved particle positions uniformly sampled inside a centred domain.
///
/// # Arguments
/// * `n_points` - The number of points to sample.
/// * `extent` - Domain edge lengths; samples lie in `[-extent/2, extent/2)`
///   per axis.
/// * `seed` - Random seed, defaults to 0.
pub fn points_fixture<T>(n_points: usize, extent: [T; 3], seed: Option<u64>) -> Vec<T>
where
    T: RealScalar + rand::distributions::uniform::SampleUniform,
{
    let seed = seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let half = T::from(0.5).unwrap();

    let between: Vec<_> = (0..3)
        .map(|axis| rand::distributions::Uniform::from(-half * extent[axis]..half * extent[axis]))
        .collect();

    let mut points = Vec::with_capacity(3 * n_points);
    for _ in 0..n_points {
        for axis_distribution in between.iter() {
            points.push(axis_distribution.sample(&mut rng));
        }
    }
    points
}

/// Charges uniformly sampled in `[-1, 1)`.
///
/// # Arguments
/// * `n_points` - The number of charges to sample.
/// * `seed` - Random seed, defaults to 0.
pub fn charges_fixture<T>(n_points: usize, seed: Option<u64>) -> Vec<T>
where
    T: RealScalar + rand::distributions::uniform::SampleUniform,
{
    let seed = seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let between = rand::distributions::Uniform::from(-T::one()..T::one());

    (0..n_points).map(|_| between.sample(&mut rng)).collect()
}
