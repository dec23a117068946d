//! Terrain archetype selection and boundary blending.
//!
//! Each cell of the archetype [`CellField`] is assigned one archetype by a
//! weighted pick on its hash. Inside a cell the nearest archetype's height is
//! used directly; within `blend_range` of a cell edge, nearby cells contribute
//! with weights falling off linearly with their extra distance.

use hashbrown::HashMap;
use strata_config::{ArchetypeConfig, BlendConfig, ConfigError};

use crate::cell::{CellField, CellPoint};
use crate::chunk::ArchetypeId;
use crate::noise_field::HeightNoise;
use crate::seed::{mix64, noise_seed, unit_f64};

const ARCHETYPE_FIELD_SALT: u64 = 0x5851_F42D_4C95_7F2D;
const ARCHETYPE_NOISE_STREAM: u64 = 0x1000;

/// One configured archetype with its bound noise.
#[derive(Clone, Debug)]
pub struct Archetype {
    /// Archetype name from the configuration.
    pub name: String,
    /// Selection weight.
    pub weight: f64,
    noise: HeightNoise,
}

impl Archetype {
    /// Height contributed by this archetype at `(x, z)`, relative to sea level.
    pub fn height(&self, x: f64, z: f64) -> f64 {
        self.noise.height(x, z)
    }
}

/// Output of [`TerrainBlender::blend`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendResult {
    /// Blended height relative to sea level.
    pub height: f64,
    /// Archetype of the nearest cell.
    pub dominant: ArchetypeId,
}

/// Per-sample memo of archetype heights. Owned by one sampling context.
#[derive(Debug, Default)]
pub struct BlendScratch {
    heights: HashMap<ArchetypeId, f64>,
    evaluations: u64,
}

impl BlendScratch {
    /// Total archetype noise evaluations performed through this scratch.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}

/// Weighted archetype table over a jittered cell grid.
#[derive(Clone, Debug)]
pub struct TerrainBlender {
    seed: u64,
    field: CellField,
    blend_range: f64,
    archetypes: Vec<Archetype>,
    cumulative: Vec<f64>,
    total_weight: f64,
}

impl TerrainBlender {
    /// Build the blender. Rejects an empty archetype list or a zero total weight.
    pub fn new(
        seed: u64,
        blend: &BlendConfig,
        configs: &[ArchetypeConfig],
    ) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::NoArchetypes);
        }
        let mut archetypes = Vec::with_capacity(configs.len());
        let mut cumulative = Vec::with_capacity(configs.len());
        let mut total_weight = 0.0;
        for (i, config) in configs.iter().enumerate() {
            if !config.weight.is_finite() || config.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: config.name.clone(),
                    weight: config.weight,
                });
            }
            total_weight += config.weight;
            cumulative.push(total_weight);
            archetypes.push(Archetype {
                name: config.name.clone(),
                weight: config.weight,
                noise: HeightNoise::new(
                    noise_seed(seed, ARCHETYPE_NOISE_STREAM + i as u64),
                    &config.recipe,
                ),
            });
        }
        if total_weight <= 0.0 {
            return Err(ConfigError::ZeroTotalWeight);
        }

        Ok(Self {
            seed,
            field: CellField::new(blend.frequency, blend.jitter, ARCHETYPE_FIELD_SALT),
            blend_range: blend.blend_range,
            archetypes,
            cumulative,
            total_weight,
        })
    }

    /// Number of archetypes.
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Always `false`; construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// The archetype with the given id.
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.0 as usize)
    }

    /// The archetype cell grid.
    pub fn field(&self) -> &CellField {
        &self.field
    }

    /// Weighted pick keyed by a cell hash. Zero-weight archetypes are never chosen.
    pub fn archetype_for_hash(&self, hash: u64) -> ArchetypeId {
        let r = unit_f64(mix64(hash)) * self.total_weight;
        let index = self
            .cumulative
            .partition_point(|&c| c <= r)
            .min(self.archetypes.len() - 1);
        ArchetypeId(index as u16)
    }

    /// Fraction of cells expected to pick archetype `id`.
    pub fn share(&self, id: ArchetypeId) -> f64 {
        self.archetype(id)
            .map_or(0.0, |a| a.weight / self.total_weight)
    }

    /// Archetype assigned to a cell.
    pub fn archetype_of(&self, cell: &CellPoint) -> ArchetypeId {
        self.archetype_for_hash(cell.hash)
    }

    /// Blended land height relative to sea level at `(x, z)`.
    pub fn blend(&self, scratch: &mut BlendScratch, x: f64, z: f64) -> BlendResult {
        let cells = self.field.nearest_two(self.seed, x, z);
        let dominant = self.archetype_of(cells.first());

        if cells.edge_distance() >= self.blend_range {
            scratch.evaluations += 1;
            return BlendResult {
                height: self.archetypes[dominant.0 as usize].height(x, z),
                dominant,
            };
        }

        scratch.heights.clear();
        let d1 = cells.d1();
        let mut weight_sum = 0.0;
        let mut height_sum = 0.0;
        for (point, &d) in cells.points.iter().zip(cells.distances.iter()) {
            let extra = d - d1;
            if extra >= self.blend_range {
                continue;
            }
            let weight = 1.0 - extra / self.blend_range;
            let id = self.archetype_of(point);
            let height = match scratch.heights.get(&id) {
                Some(&h) => h,
                None => {
                    let h = self.archetypes[id.0 as usize].height(x, z);
                    scratch.evaluations += 1;
                    scratch.heights.insert(id, h);
                    h
                }
            };
            weight_sum += weight;
            height_sum += weight * height;
        }

        let height = if weight_sum > 0.0 {
            height_sum / weight_sum
        } else {
            self.archetypes[dominant.0 as usize].height(x, z)
        };
        BlendResult { height, dominant }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::HeightRecipe;

    fn flat(name: &str, weight: f64, base: f64) -> ArchetypeConfig {
        ArchetypeConfig {
            name: name.to_string(),
            weight,
            recipe: HeightRecipe {
                base,
                amplitude: 0.0,
                ..Default::default()
            },
        }
    }

    fn blender(configs: &[ArchetypeConfig]) -> TerrainBlender {
        let blend = BlendConfig {
            frequency: 1.0 / 64.0,
            jitter: 0.9,
            blend_range: 0.3,
        };
        TerrainBlender::new(42, &blend, configs).unwrap()
    }

    #[test]
    fn test_empty_archetypes_rejected() {
        let err = TerrainBlender::new(1, &BlendConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, ConfigError::NoArchetypes));
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let err = TerrainBlender::new(1, &BlendConfig::default(), &[flat("a", 0.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTotalWeight));
    }

    #[test]
    fn test_weighted_pick_follows_weights() {
        let b = blender(&[flat("a", 3.0, 0.0), flat("b", 1.0, 0.0), flat("c", 0.0, 0.0)]);
        let mut counts = [0_u32; 3];
        for i in 0..40_000_u64 {
            counts[b.archetype_for_hash(crate::seed::mix64(i)).0 as usize] += 1;
        }
        assert_eq!(counts[2], 0, "zero-weight archetype must never be picked");
        let ratio = counts[0] as f64 / counts[1] as f64;
        assert!((2.6..3.4).contains(&ratio), "ratio {ratio} far from 3");
        for (i, &count) in counts.iter().enumerate() {
            let share = b.share(ArchetypeId(i as u16));
            assert!((count as f64 / 40_000.0 - share).abs() < 0.02, "archetype {i}");
        }
        assert_eq!(b.archetype(ArchetypeId(1)).map(|a| a.weight), Some(1.0));
        assert_eq!(b.share(ArchetypeId(7)), 0.0);
    }

    #[test]
    fn test_single_archetype_everywhere() {
        let b = blender(&[flat("only", 1.0, 12.0)]);
        let mut scratch = BlendScratch::default();
        for i in 0..200 {
            let r = b.blend(&mut scratch, i as f64 * 9.7, i as f64 * -4.1);
            assert_eq!(r.dominant, ArchetypeId(0));
            assert!((r.height - 12.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_blend_stays_between_archetype_heights() {
        let b = blender(&[flat("low", 1.0, 0.0), flat("high", 1.0, 100.0)]);
        let mut scratch = BlendScratch::default();
        let mut saw_mix = false;
        for i in 0..4_000 {
            let r = b.blend(&mut scratch, i as f64 * 0.9, 17.0);
            assert!((0.0..=100.0).contains(&r.height));
            if r.height > 1e-6 && r.height < 100.0 - 1e-6 {
                saw_mix = true;
            }
        }
        assert!(saw_mix, "a long transect should cross at least one blended edge");
    }

    #[test]
    fn test_interior_uses_nearest_archetype() {
        let b = blender(&[flat("low", 1.0, 0.0), flat("high", 1.0, 100.0)]);
        let mut scratch = BlendScratch::default();
        let cell = b.field().point(42, 3, 3);
        let r = b.blend(&mut scratch, cell.position.x, cell.position.y);
        let expected = if b.archetype_of(&cell) == ArchetypeId(0) {
            0.0
        } else {
            100.0
        };
        let cells = b.field().nearest_two(42, cell.position.x, cell.position.y);
        if cells.edge_distance() >= 0.3 {
            assert_eq!(r.height, expected);
        }
        assert_eq!(r.dominant, b.archetype_of(&cell));
    }

    #[test]
    fn test_each_archetype_evaluated_at_most_once_per_sample() {
        let b = blender(&[flat("a", 1.0, 0.0), flat("b", 1.0, 5.0)]);
        let mut scratch = BlendScratch::default();
        for i in 0..1_000 {
            let before = scratch.evaluations();
            b.blend(&mut scratch, i as f64 * 1.3, i as f64 * 0.7);
            assert!(scratch.evaluations() - before <= 2);
        }
    }

    #[test]
    fn test_blend_is_continuous() {
        let b = blender(&[flat("low", 1.0, 0.0), flat("high", 1.0, 60.0)]);
        let mut scratch = BlendScratch::default();
        let step = 0.05;
        let mut prev = b.blend(&mut scratch, 0.0, 5.0).height;
        for i in 1..20_000 {
            let h = b.blend(&mut scratch, i as f64 * step, 5.0).height;
            assert!((h - prev).abs() < 10.0, "jump of {} at step {i}", h - prev);
            prev = h;
        }
    }
}
