//! Jittered-grid cell partition of the plane.
//!
//! Every integer cell owns one representative point placed at a hash-derived
//! offset from the cell centre. The nearest representative point decides which
//! cell a world position belongs to. Used at three scales: continents,
//! terrain archetypes and river drainage.

use glam::DVec2;

use crate::seed::{hash2, mix64, unit_f64};

const VALUE_STREAM: u64 = 0xA076_1D64_78BD_642F;

/// Pack signed cell coordinates into one key.
#[inline]
pub fn pack_cell(cx: i32, cz: i32) -> u64 {
    ((cx as u32 as u64) << 32) | cz as u32 as u64
}

/// Inverse of [`pack_cell`].
#[inline]
pub fn unpack_cell(key: u64) -> (i32, i32) {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

/// The representative point of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPoint {
    /// Cell index along X.
    pub cx: i32,
    /// Cell index along Z.
    pub cz: i32,
    /// Jittered position in world units.
    pub position: DVec2,
    /// Hash-derived value in `[0, 1)`.
    pub value: f64,
    /// Raw cell hash, for callers that derive further decisions from it.
    pub hash: u64,
}

impl CellPoint {
    /// Packed key of this cell.
    pub fn key(&self) -> u64 {
        pack_cell(self.cx, self.cz)
    }
}

/// The nine cells around a position with their distances in cell units.
#[derive(Clone, Copy, Debug)]
pub struct NearestCells {
    /// Cells row-major from `(-1, -1)` to `(1, 1)` around the containing cell.
    pub points: [CellPoint; 9],
    /// Distance from the query position to each point, in cell units.
    pub distances: [f64; 9],
    /// Index of the nearest point.
    pub nearest: usize,
    /// Index of the second-nearest point.
    pub second: usize,
}

impl NearestCells {
    /// Nearest point.
    pub fn first(&self) -> &CellPoint {
        &self.points[self.nearest]
    }

    /// Distance to the nearest point, in cell units.
    pub fn d1(&self) -> f64 {
        self.distances[self.nearest]
    }

    /// Distance to the second-nearest point, in cell units.
    pub fn d2(&self) -> f64 {
        self.distances[self.second]
    }

    /// Distance to the boundary with the second-nearest cell: `d2 - d1`.
    pub fn edge_distance(&self) -> f64 {
        self.d2() - self.d1()
    }
}

/// A jittered-grid partition at one frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellField {
    frequency: f64,
    jitter: f64,
    salt: u64,
}

impl CellField {
    /// Create a field with `frequency` cells per block. `jitter` is clamped to `[0, 1]`
    /// so every representative point stays inside its own cell.
    pub fn new(frequency: f64, jitter: f64, salt: u64) -> Self {
        Self {
            frequency,
            jitter: jitter.clamp(0.0, 1.0),
            salt,
        }
    }

    /// Cells per block.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Cell containing world position `(x, z)`.
    #[inline]
    pub fn cell_of(&self, x: f64, z: f64) -> (i32, i32) {
        (
            (x * self.frequency).floor() as i32,
            (z * self.frequency).floor() as i32,
        )
    }

    /// Representative point of cell `(cx, cz)`.
    pub fn point(&self, seed: u64, cx: i32, cz: i32) -> CellPoint {
        let hash = hash2(seed ^ self.salt, cx, cz);
        let ux = unit_f64(hash);
        let uz = unit_f64(mix64(hash));
        let value = unit_f64(mix64(hash ^ VALUE_STREAM));
        let position = DVec2::new(
            (cx as f64 + 0.5 + (ux - 0.5) * self.jitter) / self.frequency,
            (cz as f64 + 0.5 + (uz - 0.5) * self.jitter) / self.frequency,
        );
        CellPoint {
            cx,
            cz,
            position,
            value,
            hash,
        }
    }

    /// The cell `(cx, cz)` and its eight neighbours, row-major from `(-1, -1)`.
    pub fn neighborhood(&self, seed: u64, cx: i32, cz: i32) -> [CellPoint; 9] {
        std::array::from_fn(|i| {
            let dx = (i % 3) as i32 - 1;
            let dz = (i / 3) as i32 - 1;
            self.point(seed, cx + dx, cz + dz)
        })
    }

    /// Nearest and second-nearest cells to `(x, z)` among the 3×3 neighbourhood.
    ///
    /// Ties resolve to the earlier cell in row-major order.
    pub fn nearest_two(&self, seed: u64, x: f64, z: f64) -> NearestCells {
        let (cx, cz) = self.cell_of(x, z);
        let points = self.neighborhood(seed, cx, cz);
        let query = DVec2::new(x, z) * self.frequency;
        let distances = points.map(|p| (p.position * self.frequency).distance(query));

        let mut nearest = 0;
        let mut second = usize::MAX;
        for i in 1..9 {
            if distances[i] < distances[nearest] {
                second = nearest;
                nearest = i;
            } else if second == usize::MAX || distances[i] < distances[second] {
                second = i;
            }
        }

        NearestCells {
            points,
            distances,
            nearest,
            second,
        }
    }

    /// Packed id of the nearest cell and the squared distance to it, in cell units.
    pub fn nearest_cell(&self, seed: u64, x: f64, z: f64) -> (u64, f64) {
        let (cx, cz) = self.cell_of(x, z);
        let query = DVec2::new(x, z) * self.frequency;
        let mut best = (0, f64::INFINITY);
        for dz in -1..=1 {
            for dx in -1..=1 {
                let p = self.point(seed, cx + dx, cz + dz);
                let d2 = (p.position * self.frequency).distance_squared(query);
                if d2 < best.1 {
                    best = (p.key(), d2);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_roundtrip_negative() {
        for &(x, z) in &[(0, 0), (-1, 5), (i32::MIN, i32::MAX), (123, -456)] {
            assert_eq!(unpack_cell(pack_cell(x, z)), (x, z));
        }
        assert_ne!(pack_cell(1, 2), pack_cell(2, 1));
    }

    #[test]
    fn test_points_stay_inside_their_cell() {
        let field = CellField::new(1.0 / 32.0, 1.0, 17);
        for cx in -10..10 {
            for cz in -10..10 {
                let p = field.point(99, cx, cz);
                assert_eq!(field.cell_of(p.position.x, p.position.y), (cx, cz));
                assert!((0.0..1.0).contains(&p.value));
            }
        }
    }

    #[test]
    fn test_zero_jitter_places_points_at_centres() {
        let field = CellField::new(0.1, 0.0, 0);
        let p = field.point(5, 2, -3);
        assert!((p.position - DVec2::new(25.0, -25.0)).length() < 1e-9);
    }

    #[test]
    fn test_jitter_clamped() {
        let field = CellField::new(0.1, 4.0, 0);
        assert_eq!(field, CellField::new(0.1, 1.0, 0));
    }

    #[test]
    fn test_salt_separates_fields() {
        let a = CellField::new(0.05, 0.9, 1).point(7, 3, 3);
        let b = CellField::new(0.05, 0.9, 2).point(7, 3, 3);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_nearest_two_orders_distances() {
        let field = CellField::new(1.0 / 16.0, 0.8, 3);
        for i in 0..500 {
            let x = i as f64 * 3.7 - 900.0;
            let z = i as f64 * -2.3 + 400.0;
            let cells = field.nearest_two(11, x, z);
            assert_ne!(cells.nearest, cells.second);
            assert!(cells.d1() <= cells.d2());
            assert!(cells.edge_distance() >= 0.0);
            for d in cells.distances {
                assert!(d >= cells.d1());
            }
        }
    }

    #[test]
    fn test_nearest_cell_agrees_with_nearest_two() {
        let field = CellField::new(1.0 / 40.0, 0.85, 9);
        for i in 0..300 {
            let x = i as f64 * 7.1;
            let z = i as f64 * 1.3 - 50.0;
            let (key, d2) = field.nearest_cell(1234, x, z);
            let cells = field.nearest_two(1234, x, z);
            assert_eq!(key, cells.first().key());
            assert!((d2.sqrt() - cells.d1()).abs() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn prop_nearest_matches_wide_search(
            x in -5_000.0..5_000.0f64,
            z in -5_000.0..5_000.0f64,
            seed in any::<u64>(),
        ) {
            let field = CellField::new(1.0 / 50.0, 0.5, 0);
            let (_, d2) = field.nearest_cell(seed, x, z);
            let (cx, cz) = field.cell_of(x, z);
            let query = DVec2::new(x, z) * field.frequency();
            let mut best = f64::INFINITY;
            for dz in -2..=2 {
                for dx in -2..=2 {
                    let p = field.point(seed, cx + dx, cz + dz);
                    best = best.min((p.position * field.frequency()).distance_squared(query));
                }
            }
            prop_assert!((best - d2).abs() < 1e-9);
        }
    }
}
