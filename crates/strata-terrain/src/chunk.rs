//! Chunk coordinates, terrain classification, and the public per-chunk result.

/// Columns along one edge of a chunk.
pub const CHUNK_SIZE: usize = 16;

/// Columns in one chunk.
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Index of column `(x, z)` inside a chunk, row-major by `z`.
#[inline]
pub fn column_index(x: usize, z: usize) -> usize {
    debug_assert!(x < CHUNK_SIZE && z < CHUNK_SIZE);
    z * CHUNK_SIZE + x
}

/// Horizontal chunk coordinate. Chunk `(x, z)` covers blocks
/// `[16x, 16x + 16) × [16z, 16z + 16)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkCoord {
    /// Chunk index along X.
    pub x: i32,
    /// Chunk index along Z.
    pub z: i32,
}

impl ChunkCoord {
    /// Create a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing block column `(x, z)`.
    pub fn containing(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE as i32),
            z: block_z.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// World X of the chunk's first column.
    pub fn min_block_x(self) -> i32 {
        self.x * CHUNK_SIZE as i32
    }

    /// World Z of the chunk's first column.
    pub fn min_block_z(self) -> i32 {
        self.z * CHUNK_SIZE as i32
    }

    /// The coordinate offset by `(dx, dz)` chunks.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// This chunk and its 8 neighbours, row-major from `(-1, -1)` to `(1, 1)`.
    /// The centre is at index 4.
    pub fn neighborhood(self) -> [ChunkCoord; 9] {
        let mut out = [self; 9];
        for dz in -1..=1 {
            for dx in -1..=1 {
                out[((dz + 1) * 3 + (dx + 1)) as usize] = self.offset(dx, dz);
            }
        }
        out
    }
}

/// Index of an archetype in the configured archetype list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub u16);

/// Terrain classification of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TerrainClass {
    /// Far below sea level.
    DeepOcean,
    /// Below sea level.
    #[default]
    Ocean,
    /// Land shaped by the given archetype.
    Land(ArchetypeId),
}

impl TerrainClass {
    /// Returns `true` for either ocean class.
    pub fn is_ocean(self) -> bool {
        matches!(self, TerrainClass::DeepOcean | TerrainClass::Ocean)
    }

    /// The archetype for land columns.
    pub fn archetype(self) -> Option<ArchetypeId> {
        match self {
            TerrainClass::Land(id) => Some(id),
            TerrainClass::DeepOcean | TerrainClass::Ocean => None,
        }
    }
}

/// Generated terrain for one chunk.
///
/// Published once per chunk key and shared read-only between consumers.
/// Buffers are recycled through the cache's pool after release.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkTerrainData {
    coord: ChunkCoord,
    heights: Vec<f32>,
    gradients: Vec<f32>,
    classes: Vec<TerrainClass>,
    river_mask: Vec<f32>,
    max_height: f32,
    min_height: f32,
    river_columns: u32,
}

/// Mutable views over a chunk's column arrays, used while generating.
pub(crate) struct ColumnsMut<'a> {
    pub heights: &'a mut [f32],
    pub gradients: &'a mut [f32],
    pub classes: &'a mut [TerrainClass],
    pub river_mask: &'a mut [f32],
}

impl ChunkTerrainData {
    /// Allocate an empty chunk at the origin.
    pub fn new() -> Self {
        Self {
            coord: ChunkCoord::default(),
            heights: vec![0.0; CHUNK_AREA],
            gradients: vec![0.0; CHUNK_AREA],
            classes: vec![TerrainClass::default(); CHUNK_AREA],
            river_mask: vec![1.0; CHUNK_AREA],
            max_height: 0.0,
            min_height: 0.0,
            river_columns: 0,
        }
    }

    /// Clear all columns and retarget the buffers at `coord`.
    pub(crate) fn reset(&mut self, coord: ChunkCoord) {
        self.coord = coord;
        self.heights.fill(0.0);
        self.gradients.fill(0.0);
        self.classes.fill(TerrainClass::default());
        self.river_mask.fill(1.0);
        self.max_height = 0.0;
        self.min_height = 0.0;
        self.river_columns = 0;
    }

    pub(crate) fn columns_mut(&mut self) -> ColumnsMut<'_> {
        ColumnsMut {
            heights: &mut self.heights,
            gradients: &mut self.gradients,
            classes: &mut self.classes,
            river_mask: &mut self.river_mask,
        }
    }

    /// Recompute the summary statistics from the column arrays.
    pub(crate) fn finalize(&mut self) {
        self.max_height = self.heights.iter().copied().fold(f32::MIN, f32::max);
        self.min_height = self.heights.iter().copied().fold(f32::MAX, f32::min);
        self.river_columns = self.river_mask.iter().filter(|&&m| m < 1.0).count() as u32;
    }

    /// The chunk this data belongs to.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Surface height of local column `(x, z)`.
    pub fn height(&self, x: usize, z: usize) -> f32 {
        self.heights[column_index(x, z)]
    }

    /// Gradient magnitude (blocks of rise per block) at local column `(x, z)`.
    pub fn gradient(&self, x: usize, z: usize) -> f32 {
        self.gradients[column_index(x, z)]
    }

    /// Terrain class of local column `(x, z)`.
    pub fn class(&self, x: usize, z: usize) -> TerrainClass {
        self.classes[column_index(x, z)]
    }

    /// River mask of local column `(x, z)`: 0 is river centre, 1 is no influence.
    pub fn river_mask(&self, x: usize, z: usize) -> f32 {
        self.river_mask[column_index(x, z)]
    }

    /// All column heights, row-major by `z`.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// All gradient magnitudes, row-major by `z`.
    pub fn gradients(&self) -> &[f32] {
        &self.gradients
    }

    /// All terrain classes, row-major by `z`.
    pub fn classes(&self) -> &[TerrainClass] {
        &self.classes
    }

    /// All river mask values, row-major by `z`.
    pub fn river_masks(&self) -> &[f32] {
        &self.river_mask
    }

    /// Highest column in the chunk.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Lowest column in the chunk.
    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Number of columns with any river or lake influence.
    pub fn river_columns(&self) -> u32 {
        self.river_columns
    }
}

impl Default for ChunkTerrainData {
    fn default() -> Self {
        Self::new()
    }
}
