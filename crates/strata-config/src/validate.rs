//! Eager validation of a [`WorldConfig`].

use std::collections::HashSet;

use crate::config::{BlendConfig, ContinentConfig, ErosionConfig, RiverConfig, WorldConfig};
use crate::error::ConfigError;

/// Largest halo the erosion pass accepts. Erosion windows sit half a chunk
/// apart, so a wider halo would read past the neighbouring chunks.
const MAX_HALO: usize = 8;

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

impl WorldConfig {
    /// Reject configurations that would produce NaNs or panics mid-generation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_depth <= 0 {
            return Err(ConfigError::OutOfRange {
                field: "generation_depth",
                value: self.generation_depth as f64,
            });
        }
        validate_continent(&self.continent)?;
        validate_blend(&self.blend)?;
        self.validate_archetypes()?;
        positive("ocean.frequency", self.ocean.frequency)?;
        validate_rivers(&self.rivers)?;
        validate_erosion(&self.erosion)?;

        if self.cache.raw_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cache.raw_capacity",
                value: 0.0,
            });
        }
        if self.cache.region_shards == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cache.region_shards",
                value: 0.0,
            });
        }
        Ok(())
    }

    fn validate_archetypes(&self) -> Result<(), ConfigError> {
        if self.archetypes.is_empty() {
            return Err(ConfigError::NoArchetypes);
        }
        let mut names = HashSet::new();
        let mut total = 0.0;
        for archetype in &self.archetypes {
            if !archetype.weight.is_finite() || archetype.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: archetype.name.clone(),
                    weight: archetype.weight,
                });
            }
            if !names.insert(archetype.name.as_str()) {
                return Err(ConfigError::DuplicateArchetype(archetype.name.clone()));
            }
            positive("archetypes.recipe.frequency", archetype.recipe.frequency)?;
            positive("archetypes.recipe.exponent", archetype.recipe.exponent)?;
            total += archetype.weight;
        }
        if total <= 0.0 {
            return Err(ConfigError::ZeroTotalWeight);
        }
        Ok(())
    }
}

fn validate_continent(c: &ContinentConfig) -> Result<(), ConfigError> {
    positive("continent.frequency", c.frequency)?;
    unit("continent.jitter", c.jitter)?;
    positive("continent.edge_blend", c.edge_blend)?;
    positive("continent.perturb_frequency", c.perturb_frequency)?;
    non_negative("continent.perturb_amplitude", c.perturb_amplitude)?;
    non_negative("continent.deep_ocean_depth", c.deep_ocean_depth)?;
    if !(c.deep_ocean < c.ocean && c.ocean < c.inland) {
        return Err(ConfigError::InvalidControlPoints {
            deep_ocean: c.deep_ocean,
            ocean: c.ocean,
            inland: c.inland,
        });
    }
    Ok(())
}

fn validate_blend(b: &BlendConfig) -> Result<(), ConfigError> {
    positive("blend.frequency", b.frequency)?;
    unit("blend.jitter", b.jitter)?;
    positive("blend.blend_range", b.blend_range)
}

fn validate_rivers(r: &RiverConfig) -> Result<(), ConfigError> {
    positive("rivers.frequency", r.frequency)?;
    unit("rivers.jitter", r.jitter)?;
    non_negative("rivers.meander", r.meander)?;
    non_negative("rivers.wave_amplitude", r.wave_amplitude)?;
    non_negative("rivers.height_scale", r.height_scale)?;
    positive("rivers.radius_min", r.radius_min)?;
    positive("rivers.radius_max", r.radius_max)?;
    if r.radius_max < r.radius_min {
        return Err(ConfigError::OutOfRange {
            field: "rivers.radius_max",
            value: r.radius_max,
        });
    }
    unit("rivers.lake_density", r.lake_density)?;
    positive("rivers.lake_radius", r.lake_radius)?;
    unit("rivers.erosion_intensity", r.erosion_intensity)?;
    positive("rivers.erosion_frequency", r.erosion_frequency)?;
    if r.cache_capacity == 0 {
        return Err(ConfigError::OutOfRange {
            field: "rivers.cache_capacity",
            value: 0.0,
        });
    }

    for (end, t) in [("start", 0.0), ("end", 1.0)] {
        let valley = r.valley.width.at(t);
        let bank = r.bank.width.at(t);
        let bed = r.bed.width.at(t);
        positive("rivers.valley.width", valley)?;
        positive("rivers.bank.width", bank)?;
        positive("rivers.bed.width", bed)?;
        if !(valley > bank && bank > bed) {
            return Err(ConfigError::UnnestedRiverProfile {
                end,
                valley,
                bank,
                bed,
            });
        }
        non_negative("rivers.valley.depth", r.valley.depth.at(t))?;
        non_negative("rivers.bank.depth", r.bank.depth.at(t))?;
        let bed_depth = r.bed.depth.at(t);
        non_negative("rivers.bed.depth", bed_depth)?;
        if bed_depth < r.bank.depth.at(t) {
            return Err(ConfigError::OutOfRange {
                field: "rivers.bed.depth",
                value: bed_depth,
            });
        }
    }
    Ok(())
}

fn validate_erosion(e: &ErosionConfig) -> Result<(), ConfigError> {
    if e.halo == 0 || e.halo > MAX_HALO {
        return Err(ConfigError::OutOfRange {
            field: "erosion.halo",
            value: e.halo as f64,
        });
    }
    if e.brush_radius == 0 {
        return Err(ConfigError::OutOfRange {
            field: "erosion.brush_radius",
            value: 0.0,
        });
    }
    if !(0.0..1.0).contains(&e.inertia) {
        return Err(ConfigError::OutOfRange {
            field: "erosion.inertia",
            value: e.inertia,
        });
    }
    non_negative("erosion.sediment_capacity", e.sediment_capacity)?;
    non_negative("erosion.min_sediment_capacity", e.min_sediment_capacity)?;
    unit("erosion.deposit_speed", e.deposit_speed)?;
    unit("erosion.erode_speed", e.erode_speed)?;
    unit("erosion.evaporate_speed", e.evaporate_speed)?;
    non_negative("erosion.gravity", e.gravity)?;
    positive("erosion.initial_water", e.initial_water)?;
    non_negative("erosion.initial_speed", e.initial_speed)
}
