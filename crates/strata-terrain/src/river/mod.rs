//! River and lake drainage graph.
//!
//! Rivers follow a drainage relation over a coarse [`CellField`]: each cell
//! flows to its lowest axis neighbour when that neighbour is lower. Every
//! drainage edge becomes two or three gently bent [`RiverSegment`]s; lakes are
//! degenerate segments. A [`RegionGraph`] lists every segment whose valley
//! can reach into one cell, so a query only ever reads the graph of the cell
//! it falls in. Graphs are built lazily and held in a bounded cache.

mod cache;
mod carve;
mod graph;

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::DVec2;
use strata_config::RiverConfig;
use tracing::trace;

pub use carve::{CarveShape, carve_profile};
pub use graph::{DrainageElevation, DrainageNode, RegionGraph, RiverSegment, SegmentKind};

use self::cache::RegionCache;
use self::graph::{Drainage, build_segments};
use crate::cell::{CellField, pack_cell};
use crate::noise_field::FractalNoise;
use crate::seed::{det_sin, det_sqrt, noise_seed};

const DRAINAGE_FIELD_SALT: u64 = 0x8CB9_2BA7_2F3D_8DD7;
const EROSION_NOISE_STREAM: u64 = 0x2000;
const RECENT_GRAPHS: usize = 16;
/// Ocean-mouth extensions run on for half an edge past the mouth node.
const MOUTH_STRETCH: f64 = 1.5;

/// A river or lake centre line whose valley contains a query position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverSite {
    /// Sinusoidally displaced centre-line point.
    pub centre: DVec2,
    /// Distance from the query to `centre`, in blocks.
    pub distance: f64,
    /// Position along the drainage edge, `[0, 1]`. Drives the profile ramps.
    pub path_t: f64,
    /// Segment water height at the projection.
    pub water_height: f64,
    /// Segment radius at the projection.
    pub radius: f64,
    /// River piece or lake.
    pub kind: SegmentKind,
}

/// Recently used region graphs, owned by one sampling context.
#[derive(Default)]
pub struct RiverScratch {
    recent: Vec<(u64, Arc<RegionGraph>)>,
    next: usize,
}

impl RiverScratch {
    fn lookup(&self, key: u64) -> Option<&Arc<RegionGraph>> {
        self.recent.iter().find(|(k, _)| *k == key).map(|(_, g)| g)
    }

    fn remember(&mut self, key: u64, graph: Arc<RegionGraph>) {
        if self.recent.len() < RECENT_GRAPHS {
            self.recent.push((key, graph));
        } else {
            self.recent[self.next] = (key, graph);
            self.next = (self.next + 1) % RECENT_GRAPHS;
        }
    }

    /// Forget every remembered graph so evicted buffers can be reclaimed.
    pub fn clear(&mut self) {
        self.recent.clear();
        self.next = 0;
    }
}

/// Lazily built drainage network for one world seed.
pub struct RiverNetwork {
    seed: u64,
    sea_level: f64,
    config: RiverConfig,
    field: CellField,
    erosion_noise: FractalNoise,
    cache: RegionCache,
    widest_valley: f64,
    reach_cells: i32,
}

impl RiverNetwork {
    /// Build the network. Graphs are cached across `shards` independently locked shards.
    pub fn new(seed: u64, sea_level: f64, config: &RiverConfig, shards: usize) -> Self {
        let widest_valley = config.valley.width.start.max(config.valley.width.end);
        let max_radius = config.radius_max.max(config.radius_min).max(config.lake_radius);
        let field = CellField::new(config.frequency, config.jitter, DRAINAGE_FIELD_SALT);

        // Longest drainage edge between jittered axis neighbours, stretched by
        // the meander offset or the ocean-mouth extension, plus everything a
        // segment's valley can add sideways.
        let jitter = config.jitter.clamp(0.0, 1.0);
        let longest_edge =
            det_sqrt((1.0 + jitter) * (1.0 + jitter) + jitter * jitter) / field.frequency();
        let reach = longest_edge * MOUTH_STRETCH.max(1.0 + config.meander.abs())
            + config.wave_amplitude.abs()
            + max_radius * widest_valley;
        let reach_cells = (reach * field.frequency()).floor() as i32 + 1;

        Self {
            seed,
            sea_level,
            config: config.clone(),
            field,
            erosion_noise: FractalNoise::new(
                noise_seed(seed, EROSION_NOISE_STREAM),
                config.erosion_frequency,
                3,
                2.0,
                0.5,
            ),
            cache: RegionCache::new(config.cache_capacity, shards),
            widest_valley,
            reach_cells,
        }
    }

    /// The drainage cell grid.
    pub fn field(&self) -> &CellField {
        &self.field
    }

    /// How many cells away a segment's origin may lie and still reach a query cell.
    pub fn reach_cells(&self) -> i32 {
        self.reach_cells
    }

    /// Drainage node for cell `(cx, cz)`.
    pub fn node<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        cx: i32,
        cz: i32,
    ) -> DrainageNode {
        Drainage::new(self.seed, &self.field, elevation).node(cx, cz)
    }

    /// Cell that `(cx, cz)` drains into, if any.
    pub fn downstream<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        cx: i32,
        cz: i32,
    ) -> Option<(i32, i32)> {
        Drainage::new(self.seed, &self.field, elevation)
            .downstream(cx, cz)
            .map(|n| (n.cx, n.cz))
    }

    /// Segments originating at cell `(cx, cz)`, uncached.
    pub fn segments_from<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        cx: i32,
        cz: i32,
    ) -> Vec<RiverSegment> {
        let mut segments = Vec::new();
        let mut drainage = Drainage::new(self.seed, &self.field, elevation);
        build_segments(&mut drainage, &self.config, self.sea_level, cx, cz, &mut segments);
        segments
    }

    /// Build the graph for one cell without consulting the cache: every
    /// segment, from any origin cell, whose valley can reach into `(cx, cz)`.
    pub fn build_region<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        cx: i32,
        cz: i32,
    ) -> RegionGraph {
        let mut segments = self.cache.take_buffer();
        let mut drainage = Drainage::new(self.seed, &self.field, elevation);
        let rings = self.reach_cells;
        for oz in cz - rings..=cz + rings {
            for ox in cx - rings..=cx + rings {
                let start = segments.len();
                build_segments(&mut drainage, &self.config, self.sea_level, ox, oz, &mut segments);
                let mut kept = start;
                for i in start..segments.len() {
                    if self.reaches_cell(&segments[i], cx, cz) {
                        segments.swap(kept, i);
                        kept += 1;
                    }
                }
                segments.truncate(kept);
            }
        }
        trace!(cx, cz, segments = segments.len(), "built region graph");
        RegionGraph {
            key: pack_cell(cx, cz),
            segments,
        }
    }

    /// Whether any point of a segment's valley can fall inside cell `(cx, cz)`.
    fn reaches_cell(&self, segment: &RiverSegment, cx: i32, cz: i32) -> bool {
        let margin = DVec2::splat(
            segment.radius_a.max(segment.radius_b) * self.widest_valley + segment.lateral.abs(),
        );
        let lo = segment.a.min(segment.b) - margin;
        let hi = segment.a.max(segment.b) + margin;
        let frequency = self.field.frequency();
        let cell_lo = DVec2::new(cx as f64 / frequency, cz as f64 / frequency);
        let cell_hi = DVec2::new((cx + 1) as f64 / frequency, (cz + 1) as f64 / frequency);
        lo.x <= cell_hi.x && hi.x >= cell_lo.x && lo.y <= cell_hi.y && hi.y >= cell_lo.y
    }

    /// Cached graph for one cell, building it on a miss.
    pub fn region<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        scratch: &mut RiverScratch,
        cx: i32,
        cz: i32,
    ) -> Arc<RegionGraph> {
        let key = pack_cell(cx, cz);
        if let Some(graph) = scratch.lookup(key) {
            return Arc::clone(graph);
        }
        let graph = match self.cache.get(key) {
            Some(graph) => graph,
            None => self.cache.insert(self.build_region(elevation, cx, cz)),
        };
        scratch.remember(key, Arc::clone(&graph));
        graph
    }

    /// Site on `segment` for `query`, if the query lies inside that segment's valley.
    fn site_on(&self, segment: &RiverSegment, query: DVec2) -> Option<RiverSite> {
        let (centre, t) = project(segment, query);
        let path_t = segment.path_a + (segment.path_b - segment.path_a) * t;
        let radius = segment.radius_a + (segment.radius_b - segment.radius_a) * t;
        let reach = radius * self.config.valley.width.at(path_t);
        let d2 = query.distance_squared(centre);
        (d2 < reach * reach).then(|| RiverSite {
            centre,
            distance: det_sqrt(d2),
            path_t,
            water_height: segment.height_a + (segment.height_b - segment.height_a) * t,
            radius,
            kind: segment.kind,
        })
    }

    /// Every centre line whose valley contains `(x, z)`, in segment order.
    /// `out` is cleared first.
    pub fn sites<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        scratch: &mut RiverScratch,
        x: f64,
        z: f64,
        out: &mut Vec<RiverSite>,
    ) {
        out.clear();
        if !self.config.enabled {
            return;
        }
        let query = DVec2::new(x, z);
        let (cx, cz) = self.field.cell_of(x, z);
        let graph = self.region(elevation, scratch, cx, cz);
        out.extend(
            graph
                .segments
                .iter()
                .filter_map(|segment| self.site_on(segment, query)),
        );
    }

    /// Nearest centre line whose valley contains `(x, z)`.
    ///
    /// Returns `None` when the query lies outside every valley.
    pub fn nearest<E: DrainageElevation + ?Sized>(
        &self,
        elevation: &E,
        scratch: &mut RiverScratch,
        x: f64,
        z: f64,
    ) -> Option<RiverSite> {
        if !self.config.enabled {
            return None;
        }
        let query = DVec2::new(x, z);
        let (cx, cz) = self.field.cell_of(x, z);
        let graph = self.region(elevation, scratch, cx, cz);
        graph
            .segments
            .iter()
            .filter_map(|segment| self.site_on(segment, query))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Cross-section at a site. Valley sharpness follows the ridged erosion
    /// field at the centre line.
    pub fn shape(&self, site: &RiverSite) -> CarveShape {
        let t = site.path_t;
        let ridge = self.erosion_noise.ridged(site.centre.x, site.centre.y);
        let sharpness = (1.0 + self.config.erosion_intensity * (2.0 * ridge - 1.0)).max(0.25);
        CarveShape {
            valley_width: site.radius * self.config.valley.width.at(t),
            valley_depth: self.config.valley.depth.at(t),
            bank_width: site.radius * self.config.bank.width.at(t),
            bank_depth: self.config.bank.depth.at(t),
            bed_width: site.radius * self.config.bed.width.at(t),
            bed_depth: self.config.bed.depth.at(t),
            sharpness,
        }
    }

    /// Water level for a site: the segment's water height, capped by the
    /// uncarved terrain height at the centre line.
    pub fn water_level(site: &RiverSite, centre_height: f64) -> f64 {
        site.water_height.min(centre_height)
    }

    /// Carve `height` at a site toward `water_level`. Returns height and mask.
    pub fn carve(&self, height: f64, site: &RiverSite, water_level: f64) -> (f64, f64) {
        carve_profile(height, site.distance, water_level, &self.shape(site))
    }

    /// Region graphs currently cached.
    pub fn cached_regions(&self) -> usize {
        self.cache.len()
    }

    /// Region graphs built so far.
    pub fn regions_built(&self) -> u64 {
        self.cache.built()
    }

    /// Region graphs evicted so far.
    pub fn regions_evicted(&self) -> u64 {
        self.cache.evicted()
    }
}

/// Project `query` onto a segment. Returns the displaced centre-line point and
/// the clamped parameter `t`. Degenerate segments use `t = 0`.
fn project(segment: &RiverSegment, query: DVec2) -> (DVec2, f64) {
    let ab = segment.b - segment.a;
    let len2 = ab.length_squared();
    if len2 <= f64::EPSILON {
        return (segment.a, 0.0);
    }
    let t = ((query - segment.a).dot(ab) / len2).clamp(0.0, 1.0);
    let normal = ab.perp().normalize_or_zero();
    let centre = segment.a + ab * t + normal * segment.lateral * det_sin(TAU * t);
    (centre, t)
}
