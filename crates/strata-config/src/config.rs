//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside a config directory.
pub const CONFIG_FILE: &str = "world.ron";

/// Top-level world generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed.
    pub seed: u64,
    /// Absolute height of the sea surface, in blocks.
    pub sea_level: i32,
    /// How far below sea level terrain may reach, in blocks. Heights are
    /// clamped to `sea_level - generation_depth`.
    pub generation_depth: i32,
    /// Continent-scale partition and its control points.
    pub continent: ContinentConfig,
    /// Cell grid used to place terrain archetypes.
    pub blend: BlendConfig,
    /// Ordered list of inland terrain archetypes.
    pub archetypes: Vec<ArchetypeConfig>,
    /// Height recipe for the sea floor, relative to sea level.
    pub ocean: HeightRecipe,
    /// River and lake shaping.
    pub rivers: RiverConfig,
    /// Droplet erosion parameters.
    pub erosion: ErosionConfig,
    /// Cache and worker pool sizing.
    pub cache: CacheConfig,
    /// Logging settings.
    pub log: LogConfig,
}

/// Continent partition settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContinentConfig {
    /// Cells per block. One continent cell spans `1 / frequency` blocks.
    pub frequency: f64,
    /// Fraction of a cell the representative point may move, `[0, 1]`.
    pub jitter: f64,
    /// Edge band, in cell units, over which neighbouring continent values mix.
    pub edge_blend: f64,
    /// Frequency of the fBm perturbation added to the continent value.
    pub perturb_frequency: f64,
    /// Amplitude of that perturbation, in continent-value units.
    pub perturb_amplitude: f64,
    /// Below this value the sea floor reaches its full depth.
    pub deep_ocean: f64,
    /// Below this value the column is ocean.
    pub ocean: f64,
    /// Above this value the column is fully inland.
    pub inland: f64,
    /// Columns deeper than this below sea level are classified deep ocean.
    pub deep_ocean_depth: f64,
}

/// Archetype cell grid settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlendConfig {
    /// Cells per block.
    pub frequency: f64,
    /// Fraction of a cell the representative point may move, `[0, 1]`.
    pub jitter: f64,
    /// Edge band, in cell units, over which archetypes are mixed.
    pub blend_range: f64,
}

/// A named inland terrain archetype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchetypeConfig {
    /// Unique name; doubles as the terrain classification tag.
    pub name: String,
    /// Relative selection weight.
    pub weight: f64,
    /// Height noise recipe, relative to sea level.
    #[serde(default)]
    pub recipe: HeightRecipe,
}

/// A height noise recipe: `base + amplitude * shape(noise)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeightRecipe {
    /// Constant offset in blocks.
    pub base: f64,
    /// Scale applied to the shaped noise, in blocks.
    pub amplitude: f64,
    /// Frequency of the first octave.
    pub frequency: f64,
    /// Number of octaves.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Use ridged noise (`1 - |n|`, range `[0, 1]`) instead of plain fBm.
    pub ridged: bool,
    /// Power applied to the normalised noise before scaling.
    pub exponent: f64,
}

/// A value that varies linearly along a river segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Ramp {
    /// Value at the upstream end (`t = 0`).
    pub start: f64,
    /// Value at the downstream end (`t = 1`).
    pub end: f64,
}

impl Ramp {
    /// A ramp that holds the same value everywhere.
    pub const fn constant(value: f64) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    /// Evaluate at `t`, clamped to `[0, 1]`.
    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        self.start + (self.end - self.start) * t
    }
}

/// One nested river cross-section profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CarveProfile {
    /// Half-width as a multiple of the segment radius.
    pub width: Ramp,
    /// For the valley: floor height above the water level.
    /// For bank and bed: depth below the water level.
    pub depth: Ramp,
}

/// River and lake settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiverConfig {
    /// Disable to skip river carving entirely.
    pub enabled: bool,
    /// Drainage cells per block.
    pub frequency: f64,
    /// Fraction of a drainage cell the node may move, `[0, 1]`.
    pub jitter: f64,
    /// Perpendicular offset of interior path vertices, as a fraction of the edge length.
    pub meander: f64,
    /// Amplitude of the sinusoidal centre-line waviness, in blocks.
    pub wave_amplitude: f64,
    /// Blocks of water height per unit of drainage elevation.
    pub height_scale: f64,
    /// Radius at the highest nodes, in blocks.
    pub radius_min: f64,
    /// Radius at the lowest nodes, in blocks.
    pub radius_max: f64,
    /// Probability that a source cell holds a lake.
    pub lake_density: f64,
    /// Source cells below this elevation always hold a lake.
    pub lake_elevation_threshold: f64,
    /// Radius of a lake, in blocks.
    pub lake_radius: f64,
    /// How strongly the ridged erosion field sharpens or softens valleys, `[0, 1]`.
    pub erosion_intensity: f64,
    /// Frequency of the ridged erosion field.
    pub erosion_frequency: f64,
    /// Widest, shallowest profile.
    pub valley: CarveProfile,
    /// Intermediate step down to the water line.
    pub bank: CarveProfile,
    /// Narrowest, deepest profile.
    pub bed: CarveProfile,
    /// Maximum number of cached region graphs.
    pub cache_capacity: usize,
}

/// Droplet erosion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErosionConfig {
    /// Disable to skip the erosion pass.
    pub enabled: bool,
    /// Droplets seeded per erosion window.
    pub iterations: u32,
    /// Maximum steps a droplet lives.
    pub max_lifetime: u32,
    /// Border, in columns, added around each erosion window. At most 8.
    pub halo: usize,
    /// Radius of the erosion brush, in columns.
    pub brush_radius: usize,
    /// How much a droplet keeps its previous direction, `[0, 1)`.
    pub inertia: f64,
    /// Multiplier on the sediment a droplet can carry.
    pub sediment_capacity: f64,
    /// Floor on the carrying capacity.
    pub min_sediment_capacity: f64,
    /// Fraction of excess sediment deposited per step, `[0, 1]`.
    pub deposit_speed: f64,
    /// Fraction of the capacity deficit eroded per step, `[0, 1]`.
    pub erode_speed: f64,
    /// Fraction of water lost per step, `[0, 1]`.
    pub evaporate_speed: f64,
    /// Acceleration applied to downhill motion.
    pub gravity: f64,
    /// Water volume of a fresh droplet.
    pub initial_water: f64,
    /// Speed of a fresh droplet.
    pub initial_speed: f64,
}

/// Cache and worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Worker threads. `0` picks `num_cpus - 1` (at least one).
    pub worker_threads: usize,
    /// Maximum number of cached pre-erosion raw chunks.
    pub raw_capacity: usize,
    /// Maximum number of idle chunk buffers kept for reuse.
    pub chunk_pool_capacity: usize,
    /// Number of independently locked region-graph cache shards.
    pub region_shards: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (e.g., "info", "strata_terrain=debug").
    pub level: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sea_level: 64,
            generation_depth: 64,
            continent: ContinentConfig::default(),
            blend: BlendConfig::default(),
            archetypes: ArchetypeConfig::defaults(),
            ocean: HeightRecipe {
                base: -28.0,
                amplitude: 10.0,
                frequency: 1.0 / 140.0,
                octaves: 3,
                ..Default::default()
            },
            rivers: RiverConfig::default(),
            erosion: ErosionConfig::default(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ContinentConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0 / 1536.0,
            jitter: 0.85,
            edge_blend: 0.3,
            perturb_frequency: 1.0 / 300.0,
            perturb_amplitude: 0.06,
            deep_ocean: 0.22,
            ocean: 0.38,
            inland: 0.5,
            deep_ocean_depth: 20.0,
        }
    }
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0 / 384.0,
            jitter: 0.9,
            blend_range: 0.3,
        }
    }
}

impl ArchetypeConfig {
    /// The built-in archetype set: plains, hills, plateau, mountains.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "plains".to_string(),
                weight: 3.0,
                recipe: HeightRecipe {
                    base: 6.0,
                    amplitude: 6.0,
                    frequency: 1.0 / 160.0,
                    octaves: 4,
                    ..Default::default()
                },
            },
            Self {
                name: "hills".to_string(),
                weight: 2.0,
                recipe: HeightRecipe {
                    base: 18.0,
                    amplitude: 18.0,
                    frequency: 1.0 / 120.0,
                    octaves: 5,
                    ..Default::default()
                },
            },
            Self {
                name: "plateau".to_string(),
                weight: 1.0,
                recipe: HeightRecipe {
                    base: 28.0,
                    amplitude: 8.0,
                    frequency: 1.0 / 90.0,
                    octaves: 3,
                    ..Default::default()
                },
            },
            Self {
                name: "mountains".to_string(),
                weight: 1.0,
                recipe: HeightRecipe {
                    base: 30.0,
                    amplitude: 70.0,
                    frequency: 1.0 / 200.0,
                    octaves: 6,
                    ridged: true,
                    exponent: 1.5,
                    ..Default::default()
                },
            },
        ]
    }
}

impl Default for HeightRecipe {
    fn default() -> Self {
        Self {
            base: 0.0,
            amplitude: 8.0,
            frequency: 1.0 / 128.0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            ridged: false,
            exponent: 1.0,
        }
    }
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 1.0 / 224.0,
            jitter: 0.7,
            meander: 0.25,
            wave_amplitude: 2.5,
            height_scale: 60.0,
            radius_min: 3.0,
            radius_max: 10.0,
            lake_density: 0.12,
            lake_elevation_threshold: 0.42,
            lake_radius: 16.0,
            erosion_intensity: 0.5,
            erosion_frequency: 1.0 / 80.0,
            valley: CarveProfile {
                width: Ramp {
                    start: 3.0,
                    end: 3.5,
                },
                depth: Ramp {
                    start: 4.0,
                    end: 2.0,
                },
            },
            bank: CarveProfile {
                width: Ramp {
                    start: 1.4,
                    end: 1.5,
                },
                depth: Ramp {
                    start: 0.5,
                    end: 1.0,
                },
            },
            bed: CarveProfile {
                width: Ramp {
                    start: 0.7,
                    end: 0.8,
                },
                depth: Ramp {
                    start: 2.5,
                    end: 4.0,
                },
            },
            cache_capacity: 2048,
        }
    }
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 48,
            max_lifetime: 20,
            halo: 8,
            brush_radius: 2,
            inertia: 0.05,
            sediment_capacity: 4.0,
            min_sediment_capacity: 0.01,
            deposit_speed: 0.3,
            erode_speed: 0.3,
            evaporate_speed: 0.02,
            gravity: 4.0,
            initial_water: 1.0,
            initial_speed: 1.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            raw_capacity: 1024,
            chunk_pool_capacity: 128,
            region_shards: 8,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl WorldConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(ConfigError::ParseError)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config = Self::from_ron(&contents)?;
            log::info!("Loaded world config from {}", config_path.display());
            Ok(config)
        } else {
            let config = WorldConfig::default();
            config.save(config_dir)?;
            log::info!("Created default world config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `world.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config = Self::from_ron(&contents)?;

        if &new_config != self {
            log::info!("World config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = WorldConfig::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("sea_level: 64"));
        assert!(ron_str.contains("\"mountains\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = WorldConfig::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized = WorldConfig::from_ron(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let config = WorldConfig::from_ron("(seed: 1234, erosion: (iterations: 8))").unwrap();
        assert_eq!(config.seed, 1234);
        assert_eq!(config.erosion.iterations, 8);
        assert_eq!(config.erosion.halo, ErosionConfig::default().halo);
        assert_eq!(config.rivers, RiverConfig::default());
        assert_eq!(config.archetypes.len(), 4);
    }

    #[test]
    fn test_extra_field_ignored() {
        assert!(WorldConfig::from_ron("(future_setting: true)").is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorldConfig::default();
        config.seed = 99;
        config.archetypes.truncate(2);
        config.rivers.lake_density = 0.5;

        config.save(dir.path()).unwrap();
        let loaded = WorldConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let created = WorldConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(created, WorldConfig::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.sea_level = 80;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.sea_level), Some(80));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorldConfig::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result = WorldConfig::from_ron("{{not valid}}");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_ramp_clamps_parameter() {
        let ramp = Ramp {
            start: 2.0,
            end: 4.0,
        };
        assert_eq!(ramp.at(-1.0), 2.0);
        assert_eq!(ramp.at(0.5), 3.0);
        assert_eq!(ramp.at(7.0), 4.0);
        assert_eq!(Ramp::constant(1.5).at(0.3), 1.5);
    }
}
