//! Droplet-based hydraulic erosion on overlapping windows.
//!
//! The world is covered by [`ErosionWindow`]s: 16×16 cores laid out every
//! eight columns, each eroded on its own haloed tile with droplets derived only
//! from `(seed, window, iteration)`. A window's result is therefore the same no
//! matter which chunk computes it. Final heights blend the windows covering a
//! column with tent weights that fall to zero at each core's edge and sum to
//! one everywhere, so neighbouring chunks agree along their shared edge.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rand::Rng;
use strata_config::ErosionConfig;

use crate::chunk::{CHUNK_SIZE, ChunkCoord};
use crate::seed::{det_sqrt, droplet_rng};

/// Columns between the origins of neighbouring windows.
pub const WINDOW_STRIDE: i32 = CHUNK_SIZE as i32 / 2;

/// Windows with non-zero weight somewhere in a chunk.
pub const WINDOWS_PER_CHUNK: usize = 9;

/// One erosion window: a `CHUNK_SIZE` square core starting at
/// `(x * WINDOW_STRIDE, z * WINDOW_STRIDE)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErosionWindow {
    /// Window index along X.
    pub x: i32,
    /// Window index along Z.
    pub z: i32,
}

impl ErosionWindow {
    /// Create a window coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// First world column of the core along X.
    pub fn min_block_x(self) -> i32 {
        self.x * WINDOW_STRIDE
    }

    /// First world column of the core along Z.
    pub fn min_block_z(self) -> i32 {
        self.z * WINDOW_STRIDE
    }

    /// The windows weighting any column of `chunk`, row-major.
    pub fn covering(chunk: ChunkCoord) -> [ErosionWindow; WINDOWS_PER_CHUNK] {
        let (x, z) = (chunk.x * 2, chunk.z * 2);
        std::array::from_fn(|i| Self::new(x - 1 + (i % 3) as i32, z - 1 + (i / 3) as i32))
    }

    /// Blend weight of world column `(bx, bz)`. Peaks at the core centre and
    /// is zero outside the core.
    pub fn weight(self, bx: i32, bz: i32) -> f64 {
        tent(bx - self.min_block_x()) * tent(bz - self.min_block_z())
    }
}

fn tent(offset: i32) -> f64 {
    let d = (offset - WINDOW_STRIDE).abs();
    if d >= WINDOW_STRIDE {
        0.0
    } else {
        1.0 - d as f64 / WINDOW_STRIDE as f64
    }
}

/// Square `f32` height buffer covering one window core plus a halo on every side.
///
/// Heights are absolute, in blocks. Index `(0, 0)` sits at world column
/// `(window.min_block_x() - halo, window.min_block_z() - halo)`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightTile {
    size: usize,
    halo: usize,
    data: Vec<f32>,
}

impl HeightTile {
    /// Allocate a zeroed tile with the given halo.
    pub fn new(halo: usize) -> Self {
        let size = CHUNK_SIZE + 2 * halo;
        Self {
            size,
            halo,
            data: vec![0.0; size * size],
        }
    }

    /// Width and height of the tile.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Border width around the core.
    pub fn halo(&self) -> usize {
        self.halo
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        z * self.size + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.data[self.index(x, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        let i = self.index(x, z);
        self.data[i] = value;
    }

    /// Raw row-major heights.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Bilinear height and gradient at a continuous position.
    /// The position must satisfy `0 <= x, z < size - 1`.
    fn height_and_gradient(&self, x: f64, z: f64) -> (f64, f64, f64) {
        let cx = x as usize;
        let cz = z as usize;
        let u = x - cx as f64;
        let v = z - cz as f64;
        let i = self.index(cx, cz);
        let nw = self.data[i] as f64;
        let ne = self.data[i + 1] as f64;
        let sw = self.data[i + self.size] as f64;
        let se = self.data[i + self.size + 1] as f64;

        let gx = (ne - nw) * (1.0 - v) + (se - sw) * v;
        let gz = (sw - nw) * (1.0 - u) + (se - ne) * u;
        let h = nw * (1.0 - u) * (1.0 - v) + ne * u * (1.0 - v) + sw * (1.0 - u) * v + se * u * v;
        (h, gx, gz)
    }

    fn inside(&self, x: f64, z: f64) -> bool {
        let limit = (self.size - 1) as f64;
        x >= 0.0 && z >= 0.0 && x < limit && z < limit
    }
}

/// Circular erosion footprint for every position of a square tile.
///
/// Weights fall off linearly from the centre and sum to one per position;
/// entries outside the tile are dropped before normalising.
#[derive(Debug)]
pub struct ErosionBrush {
    size: usize,
    radius: usize,
    starts: Vec<u32>,
    indices: Vec<u32>,
    weights: Vec<f32>,
}

impl ErosionBrush {
    /// Precompute the brush for a `size × size` tile.
    pub fn for_tile(size: usize, radius: usize) -> Self {
        let r = radius as i64;
        let mut starts = Vec::with_capacity(size * size + 1);
        let mut indices = Vec::new();
        let mut weights = Vec::new();
        let mut scratch: Vec<(u32, f64)> = Vec::new();

        for cz in 0..size as i64 {
            for cx in 0..size as i64 {
                starts.push(indices.len() as u32);
                scratch.clear();
                let mut sum = 0.0;
                for dz in -r..=r {
                    for dx in -r..=r {
                        let (x, z) = (cx + dx, cz + dz);
                        if x < 0 || z < 0 || x >= size as i64 || z >= size as i64 {
                            continue;
                        }
                        let dist = det_sqrt((dx * dx + dz * dz) as f64);
                        if dist < radius as f64 {
                            let w = 1.0 - dist / radius as f64;
                            sum += w;
                            scratch.push(((z * size as i64 + x) as u32, w));
                        }
                    }
                }
                for &(index, w) in &scratch {
                    indices.push(index);
                    weights.push((w / sum) as f32);
                }
            }
        }
        starts.push(indices.len() as u32);

        Self {
            size,
            radius,
            starts,
            indices,
            weights,
        }
    }

    /// Tile width this brush was built for.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Brush radius in columns.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// `(tile index, weight)` pairs centred on tile index `centre`.
    pub fn entries(&self, centre: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let range = self.starts[centre] as usize..self.starts[centre + 1] as usize;
        self.indices[range.clone()]
            .iter()
            .zip(&self.weights[range])
            .map(|(&i, &w)| (i as usize, w))
    }
}

/// Droplet erosion with a shared brush cache.
pub struct Eroder {
    seed: u64,
    config: ErosionConfig,
    floor: f32,
    brushes: DashMap<(usize, usize), Arc<ErosionBrush>>,
    passes: AtomicU64,
}

impl Eroder {
    /// Heights never erode below `floor`.
    pub fn new(seed: u64, config: &ErosionConfig, floor: f32) -> Self {
        Self {
            seed,
            config: config.clone(),
            floor,
            brushes: DashMap::new(),
            passes: AtomicU64::new(0),
        }
    }

    /// Halo a tile needs for this eroder.
    pub fn halo(&self) -> usize {
        self.config.halo
    }

    /// Whether erosion runs at all.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Brush for a tile size and radius, computed once and shared.
    pub fn brush(&self, size: usize, radius: usize) -> Arc<ErosionBrush> {
        Arc::clone(
            self.brushes
                .entry((size, radius))
                .or_insert_with(|| Arc::new(ErosionBrush::for_tile(size, radius)))
                .value(),
        )
    }

    /// Number of windows eroded so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Erode `tile`, which must be centred on `window`'s core.
    pub fn erode(&self, tile: &mut HeightTile, window: ErosionWindow) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        let brush = self.brush(tile.size(), self.config.brush_radius);
        let halo = tile.halo() as f64;

        for iteration in 0..self.config.iterations {
            let mut rng = droplet_rng(self.seed, window.x, window.z, iteration);
            let x = halo + rng.random::<f64>() * CHUNK_SIZE as f64;
            let z = halo + rng.random::<f64>() * CHUNK_SIZE as f64;
            if tile.inside(x, z) {
                self.simulate(tile, &brush, x, z);
            }
        }
    }

    fn simulate(&self, tile: &mut HeightTile, brush: &ErosionBrush, mut x: f64, mut z: f64) {
        let c = &self.config;
        let floor = self.floor as f64;
        let (mut dir_x, mut dir_z) = (0.0, 0.0);
        let mut speed = c.initial_speed;
        let mut water = c.initial_water;
        let mut sediment = 0.0;

        for _ in 0..c.max_lifetime {
            let node_x = x as usize;
            let node_z = z as usize;
            let node = tile.index(node_x, node_z);
            let u = x - node_x as f64;
            let v = z - node_z as f64;

            let (height, gx, gz) = tile.height_and_gradient(x, z);
            dir_x = dir_x * c.inertia - gx * (1.0 - c.inertia);
            dir_z = dir_z * c.inertia - gz * (1.0 - c.inertia);
            let len = det_sqrt(dir_x * dir_x + dir_z * dir_z);
            if len <= f64::EPSILON {
                break;
            }
            dir_x /= len;
            dir_z /= len;
            x += dir_x;
            z += dir_z;
            if !tile.inside(x, z) {
                break;
            }

            let delta = tile.height_and_gradient(x, z).0 - height;
            let capacity =
                (-delta * speed * water * c.sediment_capacity).max(c.min_sediment_capacity);

            if sediment > capacity || delta > 0.0 {
                let amount = if delta > 0.0 {
                    delta.min(sediment)
                } else {
                    (sediment - capacity) * c.deposit_speed
                };
                sediment -= amount;
                let size = tile.size;
                let data = &mut tile.data;
                data[node] += (amount * (1.0 - u) * (1.0 - v)) as f32;
                data[node + 1] += (amount * u * (1.0 - v)) as f32;
                data[node + size] += (amount * (1.0 - u) * v) as f32;
                data[node + size + 1] += (amount * u * v) as f32;
            } else {
                let amount = ((capacity - sediment) * c.erode_speed).min(-delta);
                for (index, weight) in brush.entries(node) {
                    let current = tile.data[index] as f64;
                    let removed = (amount * weight as f64).min((current - floor).max(0.0));
                    tile.data[index] = (current - removed) as f32;
                    sediment += removed;
                }
            }

            speed = det_sqrt((speed * speed - delta * c.gravity).max(0.0));
            water *= 1.0 - c.evaporate_speed;
        }
    }
}
