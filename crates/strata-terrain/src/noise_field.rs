//! Multi-octave fractal noise over simplex noise.
//!
//! [`FractalNoise`] composites octaves of [`Simplex`] noise either as plain
//! fractal Brownian motion or as ridged noise. [`HeightNoise`] applies a
//! [`HeightRecipe`] on top to produce heights in blocks.

use noise::{NoiseFn, Simplex};
use strata_config::HeightRecipe;

use crate::seed::det_pow;

/// Octave-composited simplex noise, normalised by its theoretical maximum.
#[derive(Clone, Debug)]
pub struct FractalNoise {
    noise: Simplex,
    frequency: f64,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
    max_amplitude: f64,
}

impl FractalNoise {
    /// Create a fractal noise field.
    pub fn new(seed: u32, frequency: f64, octaves: u32, lacunarity: f64, persistence: f64) -> Self {
        let mut max_amplitude = 0.0;
        let mut amp = 1.0;
        for _ in 0..octaves {
            max_amplitude += amp;
            amp *= persistence;
        }
        Self {
            noise: Simplex::new(seed),
            frequency,
            octaves,
            lacunarity,
            persistence,
            max_amplitude,
        }
    }

    /// Plain fBm in approximately `[-1, 1]`.
    pub fn fbm(&self, x: f64, z: f64) -> f64 {
        if self.max_amplitude <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut frequency = self.frequency;
        let mut amplitude = 1.0;
        for _ in 0..self.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.persistence;
        }
        total / self.max_amplitude
    }

    /// Ridged fBm in `[0, 1]`: sharp crests where the underlying noise crosses zero.
    pub fn ridged(&self, x: f64, z: f64) -> f64 {
        if self.max_amplitude <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut frequency = self.frequency;
        let mut amplitude = 1.0;
        for _ in 0..self.octaves {
            let n = self.noise.get([x * frequency, z * frequency]);
            total += (1.0 - n.abs()).clamp(0.0, 1.0) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.persistence;
        }
        total / self.max_amplitude
    }

    /// Geometric sum of octave amplitudes before normalisation.
    pub fn max_amplitude(&self) -> f64 {
        self.max_amplitude
    }
}

/// A [`HeightRecipe`] bound to a seeded noise field.
#[derive(Clone, Debug)]
pub struct HeightNoise {
    fractal: FractalNoise,
    base: f64,
    amplitude: f64,
    ridged: bool,
    exponent: f64,
}

impl HeightNoise {
    /// Bind `recipe` to the noise stream `seed`.
    pub fn new(seed: u32, recipe: &HeightRecipe) -> Self {
        Self {
            fractal: FractalNoise::new(
                seed,
                recipe.frequency,
                recipe.octaves,
                recipe.lacunarity,
                recipe.persistence,
            ),
            base: recipe.base,
            amplitude: recipe.amplitude,
            ridged: recipe.ridged,
            exponent: recipe.exponent,
        }
    }

    /// Height in blocks relative to sea level.
    pub fn height(&self, x: f64, z: f64) -> f64 {
        let shaped = if self.ridged {
            det_pow(self.fractal.ridged(x, z), self.exponent)
        } else {
            let n = self.fractal.fbm(x, z).clamp(-1.0, 1.0);
            if self.exponent == 1.0 {
                n
            } else {
                n.signum() * det_pow(n.abs(), self.exponent)
            }
        };
        self.base + self.amplitude * shaped
    }
}
