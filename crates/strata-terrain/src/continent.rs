//! Continent-scale land/ocean field.
//!
//! Continent cells carry a hash-derived value in `[0, 1)`. Near cell edges the
//! values of nearby cells are mixed with linear-falloff weights so the field is
//! continuous, then a low-amplitude fBm perturbation breaks up straight coasts.
//! The same value doubles as the drainage elevation for rivers.

use strata_config::ContinentConfig;

use crate::cell::CellField;
use crate::noise_field::FractalNoise;
use crate::river::DrainageElevation;
use crate::seed::noise_seed;

const CONTINENT_FIELD_SALT: u64 = 0x94D0_49BB_1331_11EB;
const PERTURB_STREAM: u64 = 0x3000;

/// Continent value and the cell it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContinentSample {
    /// Blended, perturbed continent value. Roughly `[0, 1]`.
    pub value: f64,
    /// Packed id of the nearest continent cell.
    pub cell: u64,
}

/// Continent partition for one world seed.
#[derive(Clone, Debug)]
pub struct ContinentField {
    seed: u64,
    field: CellField,
    edge_blend: f64,
    perturb: FractalNoise,
    perturb_amplitude: f64,
    ocean: f64,
}

impl ContinentField {
    /// Build the field.
    pub fn new(seed: u64, config: &ContinentConfig) -> Self {
        Self {
            seed,
            field: CellField::new(config.frequency, config.jitter, CONTINENT_FIELD_SALT),
            edge_blend: config.edge_blend,
            perturb: FractalNoise::new(
                noise_seed(seed, PERTURB_STREAM),
                config.perturb_frequency,
                4,
                2.0,
                0.5,
            ),
            perturb_amplitude: config.perturb_amplitude,
            ocean: config.ocean,
        }
    }

    /// Continent value at `(x, z)`.
    pub fn sample(&self, x: f64, z: f64) -> ContinentSample {
        let cells = self.field.nearest_two(self.seed, x, z);
        let cell = cells.first().key();

        let value = if cells.edge_distance() >= self.edge_blend {
            cells.first().value
        } else {
            let d1 = cells.d1();
            let mut weight_sum = 0.0;
            let mut value_sum = 0.0;
            for (point, &d) in cells.points.iter().zip(cells.distances.iter()) {
                let extra = d - d1;
                if extra < self.edge_blend {
                    let w = 1.0 - extra / self.edge_blend;
                    weight_sum += w;
                    value_sum += w * point.value;
                }
            }
            if weight_sum > 0.0 {
                value_sum / weight_sum
            } else {
                cells.first().value
            }
        };

        ContinentSample {
            value: value + self.perturb.fbm(x, z) * self.perturb_amplitude,
            cell,
        }
    }
}

impl DrainageElevation for ContinentField {
    fn elevation(&self, x: f64, z: f64) -> f64 {
        self.sample(x, z).value
    }

    fn ocean_threshold(&self) -> f64 {
        self.ocean
    }
}
