//! Sampling pipeline: continent → archetype blend → river carve, then
//! windowed erosion and a second river carve for whole chunks.

use std::time::Instant;

use strata_config::WorldConfig;
use tracing::debug;

use crate::blend::{BlendScratch, TerrainBlender};
use crate::chunk::{
    CHUNK_AREA, CHUNK_SIZE, ChunkCoord, ChunkTerrainData, TerrainClass, column_index,
};
use crate::continent::ContinentField;
use crate::erosion::{Eroder, ErosionWindow, HeightTile, WINDOWS_PER_CHUNK};
use crate::error::TerrainError;
use crate::noise_field::HeightNoise;
use crate::river::{RiverNetwork, RiverScratch, RiverSite};
use crate::seed::{det_sqrt, noise_seed};

const OCEAN_NOISE_STREAM: u64 = 0x4000;

/// Fraction of the ocean recipe applied right at the coast.
const SHALLOW_FACTOR: f64 = 0.25;

/// Width of a chunk plus a one-column ring, for gradients.
const RING: usize = CHUNK_SIZE + 2;

/// Where and how a column was carved by a river or lake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarveSite {
    /// Centre line whose valley contains the column.
    pub site: RiverSite,
    /// Water level the profile descends toward.
    pub water_level: f64,
}

/// Result of sampling one column. Reused by its [`SampleContext`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Continent value.
    pub continent: f64,
    /// Packed id of the nearest continent cell.
    pub continent_cell: u64,
    /// Height before river carving.
    pub raw_height: f64,
    /// Height after river carving.
    pub height: f64,
    /// River mask: 0 at a channel centre, 1 with no influence.
    pub river_mask: f64,
    /// Terrain class.
    pub class: TerrainClass,
    /// The site that carved deepest, if any.
    pub carve: Option<CarveSite>,
}

impl Sample {
    /// Restore the default state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            continent: 0.0,
            continent_cell: 0,
            raw_height: 0.0,
            height: 0.0,
            river_mask: 1.0,
            class: TerrainClass::default(),
            carve: None,
        }
    }
}

/// Per-thread mutable state for sampling and chunk generation.
///
/// Never shared: each worker owns one, and one-off callers create their own.
#[derive(Default)]
pub struct SampleContext {
    sample: Sample,
    blend: BlendScratch,
    rivers: RiverScratch,
    sites: Vec<RiverSite>,
    carves: Vec<CarveSite>,
    tile: Option<HeightTile>,
}

impl SampleContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Archetype evaluations performed through this context.
    pub fn blend_evaluations(&self) -> u64 {
        self.blend.evaluations()
    }

    /// Every site that carved the last sampled column.
    pub fn carve_sites(&self) -> &[CarveSite] {
        &self.carves
    }

    fn tile(&mut self, halo: usize) -> &mut HeightTile {
        let tile = self.tile.get_or_insert_with(|| HeightTile::new(halo));
        if tile.halo() != halo {
            *tile = HeightTile::new(halo);
        }
        tile
    }
}

/// Pre-erosion terrain for one chunk, shared with neighbouring chunk jobs.
#[derive(Clone, Debug, PartialEq)]
pub struct RawChunk {
    coord: ChunkCoord,
    heights: Vec<f32>,
    classes: Vec<TerrainClass>,
    masks: Vec<f32>,
    sites: Vec<CarveSite>,
    site_starts: Vec<u32>,
}

impl RawChunk {
    /// The chunk this data belongs to.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Carved, pre-erosion height of local column `(x, z)`.
    pub fn height(&self, x: usize, z: usize) -> f32 {
        self.heights[column_index(x, z)]
    }

    /// Terrain class of local column `(x, z)`.
    pub fn class(&self, x: usize, z: usize) -> TerrainClass {
        self.classes[column_index(x, z)]
    }

    /// River mask of local column `(x, z)`.
    pub fn river_mask(&self, x: usize, z: usize) -> f32 {
        self.masks[column_index(x, z)]
    }

    /// River sites carving local column `(x, z)`.
    pub fn carves(&self, x: usize, z: usize) -> &[CarveSite] {
        let i = column_index(x, z);
        &self.sites[self.site_starts[i] as usize..self.site_starts[i + 1] as usize]
    }
}

/// Raw chunk and local column holding world column `(wx, wz)`, which must lie
/// in the 3×3 neighbourhood of `coord`.
fn raw_column<'r>(
    coord: ChunkCoord,
    neighbourhood: &[&'r RawChunk; 9],
    wx: i32,
    wz: i32,
) -> (&'r RawChunk, usize, usize) {
    let owner = ChunkCoord::containing(wx, wz);
    debug_assert!((owner.x - coord.x).abs() <= 1 && (owner.z - coord.z).abs() <= 1);
    let slot = ((owner.z - coord.z + 1) * 3 + (owner.x - coord.x + 1)) as usize;
    let lx = (wx - owner.min_block_x()) as usize;
    let lz = (wz - owner.min_block_z()) as usize;
    (neighbourhood[slot], lx, lz)
}

/// Terrain generator for one world configuration.
pub struct TerrainGenerator {
    config: WorldConfig,
    sea_level: f64,
    floor: f64,
    continent: ContinentField,
    ocean: HeightNoise,
    blender: TerrainBlender,
    rivers: RiverNetwork,
    eroder: Eroder,
}

impl TerrainGenerator {
    /// Validate `config` and build every stage.
    pub fn new(config: WorldConfig) -> Result<Self, TerrainError> {
        config.validate()?;
        let seed = config.seed;
        let sea_level = config.sea_level as f64;
        let floor = (config.sea_level - config.generation_depth) as f64;
        let blender = TerrainBlender::new(seed, &config.blend, &config.archetypes)?;
        Ok(Self {
            sea_level,
            floor,
            continent: ContinentField::new(seed, &config.continent),
            ocean: HeightNoise::new(noise_seed(seed, OCEAN_NOISE_STREAM), &config.ocean),
            blender,
            rivers: RiverNetwork::new(seed, sea_level, &config.rivers, config.cache.region_shards),
            eroder: Eroder::new(seed, &config.erosion, floor as f32),
            config,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The archetype blender.
    pub fn blender(&self) -> &TerrainBlender {
        &self.blender
    }

    /// The continent field, also the drainage elevation source.
    pub fn continent(&self) -> &ContinentField {
        &self.continent
    }

    /// The river network.
    pub fn rivers(&self) -> &RiverNetwork {
        &self.rivers
    }

    /// The erosion simulator.
    pub fn eroder(&self) -> &Eroder {
        &self.eroder
    }

    /// Height before river carving, continent and archetype class.
    fn base(&self, blend: &mut BlendScratch, x: f64, z: f64) -> (f64, f64, u64, TerrainClass) {
        let c = &self.config.continent;
        let continent = self.continent.sample(x, z);
        let v = continent.value;

        let ocean_height = || {
            let deepness = ((c.ocean - v) / (c.ocean - c.deep_ocean)).clamp(0.0, 1.0);
            let scale = SHALLOW_FACTOR + (1.0 - SHALLOW_FACTOR) * deepness;
            self.sea_level + self.ocean.height(x, z) * scale
        };

        let mut land = None;
        let height = if v < c.ocean {
            ocean_height()
        } else {
            let result = self.blender.blend(blend, x, z);
            land = Some(result.dominant);
            let land_height = self.sea_level + result.height;
            if v > c.inland {
                land_height
            } else {
                let t = (v - c.ocean) / (c.inland - c.ocean);
                let sea_floor = ocean_height();
                sea_floor + (land_height - sea_floor) * t
            }
        };
        let height = height.max(self.floor);

        let class = if height < self.sea_level - c.deep_ocean_depth {
            TerrainClass::DeepOcean
        } else if height < self.sea_level {
            TerrainClass::Ocean
        } else {
            let dominant = land.unwrap_or_else(|| self.blender.blend(blend, x, z).dominant);
            TerrainClass::Land(dominant)
        };
        (height, continent.value, continent.cell, class)
    }

    /// Sample one column through every per-column stage.
    ///
    /// Every site whose valley contains the column carves it; the lowest
    /// height and the lowest mask win.
    pub fn sample<'c>(&self, ctx: &'c mut SampleContext, x: f64, z: f64) -> &'c Sample {
        ctx.sample.reset();
        ctx.carves.clear();
        let (raw, continent, cell, class) = self.base(&mut ctx.blend, x, z);
        self.rivers
            .sites(&self.continent, &mut ctx.rivers, x, z, &mut ctx.sites);

        let mut height = raw;
        let mut mask: f64 = 1.0;
        let mut deepest: Option<(f64, CarveSite)> = None;
        for site in &ctx.sites {
            let (centre_height, ..) = self.base(&mut ctx.blend, site.centre.x, site.centre.y);
            let carve = CarveSite {
                site: *site,
                water_level: RiverNetwork::water_level(site, centre_height),
            };
            let (carved, m) = self.rivers.carve(raw, site, carve.water_level);
            height = height.min(carved);
            mask = mask.min(m);
            if deepest.is_none_or(|(h, _)| carved < h) {
                deepest = Some((carved, carve));
            }
            ctx.carves.push(carve);
        }

        let sample = &mut ctx.sample;
        sample.continent = continent;
        sample.continent_cell = cell;
        sample.raw_height = raw;
        sample.height = height.max(self.floor);
        sample.river_mask = mask;
        sample.class = class;
        sample.carve = deepest.map(|(_, carve)| carve);
        sample
    }

    /// Carve `height` by every site in `sites`. The lowest result wins.
    fn recarve(&self, height: f64, sites: &[CarveSite]) -> f64 {
        sites
            .iter()
            .map(|c| self.rivers.carve(height, &c.site, c.water_level).0)
            .fold(height, f64::min)
            .max(self.floor)
    }

    /// Pre-erosion height of one column.
    pub fn sample_height(&self, ctx: &mut SampleContext, x: i32, z: i32) -> f32 {
        self.sample(ctx, x as f64, z as f64).height as f32
    }

    /// Sample all 16×16 columns of a chunk before erosion.
    pub fn raw_chunk(&self, ctx: &mut SampleContext, coord: ChunkCoord) -> RawChunk {
        let mut raw = RawChunk {
            coord,
            heights: Vec::with_capacity(CHUNK_AREA),
            classes: Vec::with_capacity(CHUNK_AREA),
            masks: Vec::with_capacity(CHUNK_AREA),
            sites: Vec::new(),
            site_starts: Vec::with_capacity(CHUNK_AREA + 1),
        };
        raw.site_starts.push(0);
        let x0 = coord.min_block_x();
        let z0 = coord.min_block_z();
        for lz in 0..CHUNK_SIZE as i32 {
            for lx in 0..CHUNK_SIZE as i32 {
                let s = *self.sample(ctx, (x0 + lx) as f64, (z0 + lz) as f64);
                raw.heights.push(s.height as f32);
                raw.classes.push(s.class);
                raw.masks.push(s.river_mask as f32);
                raw.sites.extend_from_slice(ctx.carve_sites());
                raw.site_starts.push(raw.sites.len() as u32);
            }
        }
        raw
    }

    /// Fill `tile` with the raw heights under `window` and erode it.
    ///
    /// `window` must be one of [`ErosionWindow::covering`]`(coord)`, and
    /// `neighbourhood` holds the raw chunks of `coord.neighborhood()`. Any
    /// chunk whose neighbourhood holds the window's tile gets the same result.
    pub fn erode_window(
        &self,
        tile: &mut HeightTile,
        coord: ChunkCoord,
        neighbourhood: &[&RawChunk; 9],
        window: ErosionWindow,
    ) {
        let halo = tile.halo() as i32;
        let ox = window.min_block_x() - halo;
        let oz = window.min_block_z() - halo;
        for tz in 0..tile.size() {
            for tx in 0..tile.size() {
                let (raw, lx, lz) =
                    raw_column(coord, neighbourhood, ox + tx as i32, oz + tz as i32);
                tile.set(tx, tz, raw.height(lx, lz));
            }
        }
        self.eroder.erode(tile, window);
    }

    /// Erode, re-carve and reduce a chunk into `out`.
    ///
    /// `neighbourhood` holds the raw chunks of `coord.neighborhood()` in the same order.
    pub fn finish_chunk(
        &self,
        ctx: &mut SampleContext,
        coord: ChunkCoord,
        neighbourhood: &[&RawChunk; 9],
        out: &mut ChunkTerrainData,
    ) {
        let started = Instant::now();
        let x0 = coord.min_block_x() - 1;
        let z0 = coord.min_block_z() - 1;

        // Weighted window heights over the chunk and its one-column ring.
        // Ring columns only see this chunk's windows, renormalised.
        let mut sum = [0.0_f64; RING * RING];
        let mut weight = [0.0_f64; RING * RING];
        if self.eroder.enabled() {
            let halo = self.eroder.halo();
            let tile = ctx.tile(halo);
            for window in ErosionWindow::covering(coord) {
                self.erode_window(tile, coord, neighbourhood, window);
                let ox = window.min_block_x() - halo as i32;
                let oz = window.min_block_z() - halo as i32;
                for rz in 0..RING {
                    for rx in 0..RING {
                        let (wx, wz) = (x0 + rx as i32, z0 + rz as i32);
                        let w = window.weight(wx, wz);
                        if w > 0.0 {
                            let h = tile.get((wx - ox) as usize, (wz - oz) as usize) as f64;
                            sum[rz * RING + rx] += w * h;
                            weight[rz * RING + rx] += w;
                        }
                    }
                }
            }
            debug!(
                x = coord.x,
                z = coord.z,
                windows = WINDOWS_PER_CHUNK,
                "eroded chunk"
            );
        }

        let mut field = [0.0_f32; RING * RING];
        for rz in 0..RING {
            for rx in 0..RING {
                let i = rz * RING + rx;
                let (raw, lx, lz) =
                    raw_column(coord, neighbourhood, x0 + rx as i32, z0 + rz as i32);
                let h = if weight[i] > 0.0 {
                    sum[i] / weight[i]
                } else {
                    raw.height(lx, lz) as f64
                };
                field[i] = self.recarve(h, raw.carves(lx, lz)) as f32;
            }
        }

        out.reset(coord);
        let centre = neighbourhood[4];
        let cols = out.columns_mut();
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let at = |dx: usize, dz: usize| field[(lz + dz) * RING + lx + dx];
                let i = column_index(lx, lz);
                let gx = (at(2, 1) - at(0, 1)) as f64 * 0.5;
                let gz = (at(1, 2) - at(1, 0)) as f64 * 0.5;
                cols.heights[i] = at(1, 1);
                cols.gradients[i] = det_sqrt(gx * gx + gz * gz) as f32;
                cols.classes[i] = centre.class(lx, lz);
                cols.river_mask[i] = centre.river_mask(lx, lz);
            }
        }
        out.finalize();

        debug!(
            x = coord.x,
            z = coord.z,
            elapsed_us = started.elapsed().as_micros() as u64,
            max_height = out.max_height(),
            "generated chunk"
        );
    }

    /// Generate a chunk without any cache, computing all nine raw chunks.
    pub fn generate(&self, ctx: &mut SampleContext, coord: ChunkCoord) -> ChunkTerrainData {
        let raws = coord.neighborhood().map(|c| self.raw_chunk(ctx, c));
        let mut out = ChunkTerrainData::new();
        self.finish_chunk(ctx, coord, &raws.each_ref(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use proptest::prelude::*;

    use glam::DVec2;

    use super::*;
    use crate::river::{RiverSegment, SegmentKind};
    use crate::seed::det_sin;

    fn generator(seed: u64) -> TerrainGenerator {
        let mut config = WorldConfig {
            seed,
            ..Default::default()
        };
        config.erosion.iterations = 4;
        TerrainGenerator::new(config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_eagerly() {
        let mut config = WorldConfig::default();
        config.archetypes.clear();
        assert!(matches!(
            TerrainGenerator::new(config),
            Err(TerrainError::Config(_))
        ));
    }

    #[test]
    fn test_sample_is_deterministic() {
        let a = generator(1234);
        let b = generator(1234);
        let mut ctx_a = SampleContext::new();
        let mut ctx_b = SampleContext::new();
        for i in 0..200 {
            let (x, z) = (i as f64 * 53.0 - 4000.0, i as f64 * 29.0);
            assert_eq!(a.sample(&mut ctx_a, x, z), b.sample(&mut ctx_b, x, z));
        }
    }

    #[test]
    fn test_sample_invariants() {
        let generator = generator(99);
        let config = generator.config().clone();
        let floor = (config.sea_level - config.generation_depth) as f64;
        let sea = config.sea_level as f64;
        let mut ctx = SampleContext::new();
        for i in 0..2_000 {
            let s = *generator.sample(&mut ctx, i as f64 * 41.0, i as f64 * -17.0);
            assert!(s.height >= floor);
            assert!(s.height <= s.raw_height + 1e-9, "carving never raises terrain");
            assert!((0.0..=1.0).contains(&s.river_mask));
            match s.class {
                TerrainClass::DeepOcean => {
                    assert!(s.raw_height < sea - config.continent.deep_ocean_depth)
                }
                TerrainClass::Ocean => assert!(s.raw_height < sea),
                TerrainClass::Land(id) => {
                    assert!(s.raw_height >= sea);
                    assert!(generator.blender().archetype(id).is_some());
                }
            }
            if s.carve.is_none() {
                assert_eq!(s.river_mask, 1.0);
            }
        }
    }

    #[test]
    fn test_context_reuse_matches_fresh_context() {
        let generator = generator(5);
        let mut shared = SampleContext::new();
        for i in 0..100 {
            let (x, z) = (i as f64 * 13.0, i as f64 * 7.0);
            let reused = *generator.sample(&mut shared, x, z);
            let fresh = *generator.sample(&mut SampleContext::new(), x, z);
            assert_eq!(reused, fresh);
        }
    }

    #[test]
    fn test_raw_chunk_matches_sample() {
        let generator = generator(8);
        let mut ctx = SampleContext::new();
        let coord = ChunkCoord::new(-2, 3);
        let raw = generator.raw_chunk(&mut ctx, coord);
        assert_eq!(raw.coord(), coord);
        let h = generator.sample_height(&mut ctx, coord.min_block_x() + 5, coord.min_block_z() + 9);
        assert_eq!(raw.height(5, 9), h);
        assert_eq!(raw.carves(5, 9), ctx.carve_sites());
    }

    #[test]
    fn test_every_site_carves() {
        let mut overlapping = 0;
        for seed in WALK_SEEDS {
            let generator = generator(seed);
            let mut ctx = SampleContext::new();
            for segment in river_segments(&generator).iter().take(24) {
                for dz in -4..=4 {
                    for dx in -4..=4 {
                        let p = segment.a + DVec2::new(dx as f64, dz as f64) * 1.5;
                        let s = *generator.sample(&mut ctx, p.x, p.y);
                        let sites = ctx.carve_sites();
                        if sites.len() > 1 {
                            overlapping += 1;
                        }
                        for carve in sites {
                            let (h, m) = generator.rivers().carve(
                                s.raw_height,
                                &carve.site,
                                carve.water_level,
                            );
                            assert!(s.height <= h.max(generator.floor) + 1e-9);
                            assert!(s.river_mask <= m + 1e-12);
                        }
                        if let Some(deepest) = s.carve {
                            assert!(sites.contains(&deepest));
                        }
                    }
                }
            }
        }
        assert!(overlapping > 0, "joints between river pieces lie in both valleys");
    }

    #[test]
    fn test_generate_is_deterministic_and_finite() {
        let generator = generator(1234);
        let mut ctx = SampleContext::new();
        let a = generator.generate(&mut ctx, ChunkCoord::new(0, 0));
        let b = generator.generate(&mut SampleContext::new(), ChunkCoord::new(0, 0));
        assert_eq!(a, b);
        assert!(a.heights().iter().all(|h| h.is_finite()));
        assert!(a.gradients().iter().all(|g| g.is_finite() && *g >= 0.0));
        assert!(a.max_height() >= a.min_height());
    }

    #[test]
    fn test_finish_keeps_raw_classes_and_masks() {
        let generator = generator(21);
        let mut ctx = SampleContext::new();
        let coord = ChunkCoord::new(4, 4);
        let raws = coord.neighborhood().map(|c| generator.raw_chunk(&mut ctx, c));
        let mut out = ChunkTerrainData::new();
        generator.finish_chunk(&mut ctx, coord, &raws.each_ref(), &mut out);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(out.class(x, z), raws[4].class(x, z));
                assert_eq!(out.river_mask(x, z), raws[4].river_mask(x, z));
            }
        }
    }

    #[test]
    fn test_erosion_disabled_keeps_raw_heights() {
        let mut config = WorldConfig {
            seed: 3,
            ..Default::default()
        };
        config.erosion.enabled = false;
        let generator = TerrainGenerator::new(config).unwrap();
        let mut ctx = SampleContext::new();
        let coord = ChunkCoord::new(1, -1);
        let data = generator.generate(&mut ctx, coord);
        let raw = generator.raw_chunk(&mut ctx, coord);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert!(data.height(x, z) <= raw.height(x, z) + 1e-4);
            }
        }
        assert_eq!(generator.eroder().passes(), 0);
    }

    const WALK_SEEDS: [u64; 4] = [1234, 7, 99, 42];

    /// River segments originating near the origin.
    fn river_segments(generator: &TerrainGenerator) -> Vec<RiverSegment> {
        let mut segments = Vec::new();
        for cz in -8..8 {
            for cx in -8..8 {
                segments.extend(
                    generator
                        .rivers()
                        .segments_from(generator.continent(), cx, cz)
                        .into_iter()
                        .filter(|s| s.kind == SegmentKind::River && s.a != s.b),
                );
            }
        }
        segments
    }

    /// Walk from the valley edge to the displaced centre line of `segment` at
    /// fraction `t`, along the segment normal. Returns the number of steps.
    fn walk_toward_centre(
        generator: &TerrainGenerator,
        segment: &RiverSegment,
        t: f64,
        side: f64,
    ) -> usize {
        let ab = segment.b - segment.a;
        let normal = ab.perp().normalize_or_zero();
        let centre = segment.a + ab * t + normal * segment.lateral * det_sin(TAU * t);
        let path_t = segment.path_a + (segment.path_b - segment.path_a) * t;
        let radius = segment.radius_a + (segment.radius_b - segment.radius_a) * t;
        let reach = radius * generator.config().rivers.valley.width.at(path_t);

        let mut ctx = SampleContext::new();
        let mut own_mask: f64 = 1.0;
        let mut seen = 0;
        const STEPS: usize = 48;
        for step in 0..=STEPS {
            let offset = reach * 0.98 * (STEPS - step) as f64 / STEPS as f64;
            let p = centre + normal * offset * side;
            let s = *generator.sample(&mut ctx, p.x, p.y);
            assert!(s.height <= s.raw_height + 1e-9);

            let own = ctx
                .carve_sites()
                .iter()
                .find(|c| c.site.centre.distance(centre) < 1e-6)
                .expect("a point inside the valley carves with its own segment");
            assert!((own.site.distance - offset).abs() < 1e-6);
            let (h, m) = generator
                .rivers()
                .carve(s.raw_height, &own.site, own.water_level);
            assert!(m <= own_mask + 1e-9, "own mask rose toward the centre: {own_mask} -> {m}");
            assert!(s.river_mask <= m + 1e-12, "another site lifted the mask");
            assert!(s.height <= h.max(generator.floor) + 1e-9, "another site lifted the bed");
            own_mask = m;
            seen += 1;
        }
        seen
    }

    #[test]
    fn test_walks_toward_rivers_deepen() {
        let mut seen = 0;
        for seed in WALK_SEEDS {
            let generator = generator(seed);
            for (i, segment) in river_segments(&generator).iter().enumerate().take(16) {
                let t = 0.1 + 0.8 * ((i * 7) % 10) as f64 / 10.0;
                let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                seen += walk_toward_centre(&generator, segment, t, side);
            }
        }
        assert!(seen > 0, "expected rivers near the origin");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_river_mask_falls_toward_centre_line(
            seed in prop::sample::select(WALK_SEEDS.to_vec()),
            pick in 0usize..1024,
            t in 0.05..0.95f64,
            positive in any::<bool>(),
        ) {
            let generator = generator(seed);
            let segments = river_segments(&generator);
            prop_assume!(!segments.is_empty());
            let segment = &segments[pick % segments.len()];
            walk_toward_centre(&generator, segment, t, if positive { 1.0 } else { -1.0 });
        }
    }
}
