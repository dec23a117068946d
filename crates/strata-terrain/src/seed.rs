//! Deterministic seeded generation utilities.
//!
//! Provides integer hashing of `(seed, coordinates)` for cell jitter and
//! archetype selection, per-droplet RNG derivation for erosion, and
//! deterministic math functions via `libm`.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const PRIME_X: u64 = 0xC2B2_AE3D_27D4_EB4F;
const PRIME_Y: u64 = 0x1656_67B1_9E37_79F9;
const PRIME_Z: u64 = 0x27D4_EB2F_1656_67C5;

/// SplitMix64 finalizer.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Hash a seed and a 2D integer coordinate into a well-distributed u64.
///
/// Stable across Rust releases, unlike `DefaultHasher`.
#[inline]
pub fn hash2(seed: u64, x: i32, y: i32) -> u64 {
    let mut h = mix64(seed.wrapping_add(GOLDEN_GAMMA));
    h = mix64(h ^ (x as i64 as u64).wrapping_mul(PRIME_X));
    mix64(h ^ (y as i64 as u64).wrapping_mul(PRIME_Y))
}

/// Hash a seed and a 3D integer coordinate.
#[inline]
pub fn hash3(seed: u64, x: i32, y: i32, z: u32) -> u64 {
    mix64(hash2(seed, x, y) ^ (z as u64).wrapping_mul(PRIME_Z))
}

/// Derive an independent stream seed for one subsystem.
#[inline]
pub fn derive_seed(world_seed: u64, stream: u64) -> u64 {
    mix64(world_seed ^ mix64(stream.wrapping_add(GOLDEN_GAMMA)))
}

/// Seed for a `noise` crate generator, which takes 32 bits.
#[inline]
pub fn noise_seed(world_seed: u64, stream: u64) -> u32 {
    (derive_seed(world_seed, stream) >> 32) as u32
}

/// Map a hash to a float in `[0, 1)` using its top 53 bits.
#[inline]
pub fn unit_f64(hash: u64) -> f64 {
    (hash >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
}

/// Map a hash to a float in `[-1, 1)`.
#[inline]
pub fn signed_unit_f64(hash: u64) -> f64 {
    unit_f64(hash) * 2.0 - 1.0
}

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

const DROPLET_SALT: u64 = 0xA076_1D64_78BD_642F;

/// Derive a deterministic RNG for one erosion droplet.
///
/// Depends only on `(world_seed, erosion window, iteration)`, so any thread
/// simulating that droplet sees the same sequence.
pub fn droplet_rng(world_seed: u64, window_x: i32, window_z: i32, iteration: u32) -> ChaCha8Rng {
    let window_seed = hash2(world_seed ^ DROPLET_SALT, window_x, window_z);
    let droplet_seed = hash3(window_seed, 0, 0, iteration);
    ChaCha8Rng::seed_from_u64(droplet_seed)
}

// ---------------------------------------------------------------------------
// Deterministic math (libm)
// ---------------------------------------------------------------------------

/// Deterministic sine using libm (not platform libc).
#[inline]
pub fn det_sin(x: f64) -> f64 {
    libm::sin(x)
}

/// Deterministic cosine using libm.
#[inline]
pub fn det_cos(x: f64) -> f64 {
    libm::cos(x)
}

/// Deterministic sqrt using libm.
#[inline]
pub fn det_sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}

/// Deterministic power using libm.
#[inline]
pub fn det_pow(x: f64, y: f64) -> f64 {
    libm::pow(x, y)
}

/// Cubic smoothstep of a value already in `[0, 1]`.
#[inline]
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_hash2_deterministic() {
        assert_eq!(hash2(999, 42, -13), hash2(999, 42, -13));
    }

    #[test]
    fn test_hash2_sensitive_to_each_input() {
        let base = hash2(42, 0, 0);
        assert_ne!(base, hash2(43, 0, 0));
        assert_ne!(base, hash2(42, 1, 0));
        assert_ne!(base, hash2(42, 0, 1));
        assert_ne!(hash2(42, 1, 2), hash2(42, 2, 1), "axes must not commute");
    }

    #[test]
    fn test_unit_f64_range() {
        for i in 0..10_000 {
            let u = unit_f64(hash2(7, i, -i));
            assert!((0.0..1.0).contains(&u), "unit value {u} out of range");
        }
        assert_eq!(unit_f64(0), 0.0);
        assert!(unit_f64(u64::MAX) < 1.0);
    }

    #[test]
    fn test_unit_f64_roughly_uniform() {
        let mut buckets = [0_u32; 10];
        for i in 0..20_000 {
            let u = unit_f64(hash2(1234, i, i / 7));
            buckets[(u * 10.0) as usize] += 1;
        }
        for (i, &count) in buckets.iter().enumerate() {
            assert!(
                (1_600..2_400).contains(&count),
                "bucket {i} has {count} entries, expected about 2000"
            );
        }
    }

    #[test]
    fn test_droplet_rng_deterministic() {
        let mut rng_a = droplet_rng(42, 10, -20, 5);
        let mut rng_b = droplet_rng(42, 10, -20, 5);
        for _ in 0..1000 {
            assert_eq!(rng_a.next_u64(), rng_b.next_u64());
        }
    }

    #[test]
    fn test_droplet_rng_differs_per_iteration() {
        let a = droplet_rng(42, 3, 3, 0).next_u64();
        let b = droplet_rng(42, 3, 3, 1).next_u64();
        let c = droplet_rng(42, 3, 4, 0).next_u64();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deterministic_math_functions() {
        let x = 1.234_567_890_123_4;
        assert_eq!(det_sin(x), det_sin(x));
        assert_eq!(det_cos(x), det_cos(x));
        assert_eq!(det_sqrt(x), det_sqrt(x));
        assert_eq!(det_pow(x, 1.5), det_pow(x, 1.5));
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(2.0), 1.0);
    }
}
