//! Drainage relation and per-cell segment construction.

use glam::DVec2;
use hashbrown::HashMap;
use strata_config::RiverConfig;

use crate::cell::{CellField, pack_cell};
use crate::seed::{mix64, signed_unit_f64, unit_f64};

/// Fixed neighbour order used to break elevation ties.
const NEIGHBOURS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

const LAKE_STREAM: u64 = 0xD6E8_FEB8_6659_FD93;
const SPLIT_STREAM: u64 = 0x9FB2_1C65_1E98_DF25;
const OFFSET_STREAM: u64 = 0x2545_F491_4F6C_DD1D;
const WAVE_STREAM: u64 = 0x4F1B_BCDC_BFA5_3E0B;

/// Elevation source for the drainage grid.
pub trait DrainageElevation: Send + Sync {
    /// Coarse elevation at a world position. Higher is further inland.
    fn elevation(&self, x: f64, z: f64) -> f64;

    /// Elevation below which a node is ocean.
    fn ocean_threshold(&self) -> f64;

    /// Whether a node at `elevation` lies in the ocean.
    fn is_ocean(&self, elevation: f64) -> bool {
        elevation < self.ocean_threshold()
    }
}

/// A drainage cell evaluated at its jittered position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrainageNode {
    /// Cell index along X.
    pub cx: i32,
    /// Cell index along Z.
    pub cz: i32,
    /// Jittered position in world units.
    pub position: DVec2,
    /// Elevation at `position`.
    pub elevation: f64,
    /// Whether the node is ocean.
    pub ocean: bool,
    /// Cell hash.
    pub hash: u64,
}

/// What a segment carves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// A piece of a river path.
    River,
    /// A lake: a degenerate segment with `a == b`.
    Lake,
}

/// One piece of a carving centre line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverSegment {
    /// Upstream endpoint.
    pub a: DVec2,
    /// Downstream endpoint.
    pub b: DVec2,
    /// Water height at `a`, in blocks.
    pub height_a: f64,
    /// Water height at `b`, in blocks.
    pub height_b: f64,
    /// Radius at `a`, in blocks.
    pub radius_a: f64,
    /// Radius at `b`, in blocks.
    pub radius_b: f64,
    /// Amplitude of the `sin(2πt)` sideways displacement, in blocks.
    pub lateral: f64,
    /// Position of `a` along the whole drainage edge, `[0, 1]`.
    pub path_a: f64,
    /// Position of `b` along the whole drainage edge, `[0, 1]`.
    pub path_b: f64,
    /// River piece or lake.
    pub kind: SegmentKind,
}

/// Every segment whose valley can reach into one drainage cell.
#[derive(Debug)]
pub struct RegionGraph {
    /// Packed key of the cell the graph serves.
    pub key: u64,
    /// Segments, in construction order.
    pub segments: Vec<RiverSegment>,
}

/// Evaluates drainage nodes with a per-build memo.
pub(crate) struct Drainage<'a, E: DrainageElevation + ?Sized> {
    seed: u64,
    field: &'a CellField,
    elevation: &'a E,
    nodes: HashMap<(i32, i32), DrainageNode>,
}

impl<'a, E: DrainageElevation + ?Sized> Drainage<'a, E> {
    pub(crate) fn new(seed: u64, field: &'a CellField, elevation: &'a E) -> Self {
        Self {
            seed,
            field,
            elevation,
            nodes: HashMap::with_capacity(16),
        }
    }

    pub(crate) fn node(&mut self, cx: i32, cz: i32) -> DrainageNode {
        if let Some(node) = self.nodes.get(&(cx, cz)) {
            return *node;
        }
        let point = self.field.point(self.seed, cx, cz);
        let elevation = self
            .elevation
            .elevation(point.position.x, point.position.y);
        let node = DrainageNode {
            cx,
            cz,
            position: point.position,
            elevation,
            ocean: self.elevation.is_ocean(elevation),
            hash: point.hash,
        };
        self.nodes.insert((cx, cz), node);
        node
    }

    /// The strictly lowest axis neighbour, if it is lower than the cell itself.
    ///
    /// Every edge strictly lowers elevation, so the relation has no cycles.
    /// Ocean cells never drain.
    pub(crate) fn downstream(&mut self, cx: i32, cz: i32) -> Option<DrainageNode> {
        let here = self.node(cx, cz);
        if here.ocean {
            return None;
        }
        let mut lowest: Option<DrainageNode> = None;
        for (dx, dz) in NEIGHBOURS {
            let n = self.node(cx + dx, cz + dz);
            if lowest.is_none_or(|l| n.elevation < l.elevation) {
                lowest = Some(n);
            }
        }
        lowest.filter(|l| l.elevation < here.elevation)
    }

    /// No neighbour drains into this cell.
    pub(crate) fn is_source(&mut self, cx: i32, cz: i32) -> bool {
        NEIGHBOURS.iter().all(|&(dx, dz)| {
            self.downstream(cx + dx, cz + dz)
                .is_none_or(|d| (d.cx, d.cz) != (cx, cz))
        })
    }
}

/// Water height and radius of a node.
pub(crate) fn node_profile(
    config: &RiverConfig,
    sea_level: f64,
    ocean_threshold: f64,
    elevation: f64,
) -> (f64, f64) {
    let height = sea_level + (elevation - ocean_threshold) * config.height_scale;
    let span = (1.0 - ocean_threshold).max(f64::EPSILON);
    let inland = ((elevation - ocean_threshold) / span).clamp(0.0, 1.0);
    let radius = config.radius_max + (config.radius_min - config.radius_max) * inland;
    (height, radius)
}

/// Append every segment originating at cell `(cx, cz)` to `out`.
pub(crate) fn build_segments<E: DrainageElevation + ?Sized>(
    drainage: &mut Drainage<'_, E>,
    config: &RiverConfig,
    sea_level: f64,
    cx: i32,
    cz: i32,
    out: &mut Vec<RiverSegment>,
) {
    let here = drainage.node(cx, cz);
    if here.ocean {
        return;
    }
    let threshold = drainage.elevation.ocean_threshold();
    let (height_here, radius_here) = node_profile(config, sea_level, threshold, here.elevation);

    match drainage.downstream(cx, cz) {
        Some(down) => {
            let (height_down, radius_down) =
                node_profile(config, sea_level, threshold, down.elevation);
            push_edge(
                config,
                &here,
                &down,
                (height_here, height_down),
                (radius_here, radius_down),
                out,
            );
            if down.ocean {
                let edge = down.position - here.position;
                let end = down.position + edge * 0.5;
                out.push(RiverSegment {
                    a: down.position,
                    b: end,
                    height_a: height_down,
                    height_b: height_down,
                    radius_a: radius_down,
                    radius_b: radius_down,
                    lateral: 0.0,
                    path_a: 1.0,
                    path_b: 1.0,
                    kind: SegmentKind::River,
                });
            }
            if drainage.is_source(cx, cz) {
                let roll = unit_f64(mix64(here.hash ^ LAKE_STREAM));
                if roll < config.lake_density || here.elevation < config.lake_elevation_threshold {
                    out.push(lake(&here, height_here, config.lake_radius));
                }
            }
        }
        // Inland sink: water collects here.
        None => out.push(lake(&here, height_here, config.lake_radius)),
    }
}

fn lake(node: &DrainageNode, height: f64, radius: f64) -> RiverSegment {
    RiverSegment {
        a: node.position,
        b: node.position,
        height_a: height,
        height_b: height,
        radius_a: radius,
        radius_b: radius,
        lateral: 0.0,
        path_a: 0.0,
        path_b: 0.0,
        kind: SegmentKind::Lake,
    }
}

fn push_edge(
    config: &RiverConfig,
    from: &DrainageNode,
    to: &DrainageNode,
    heights: (f64, f64),
    radii: (f64, f64),
    out: &mut Vec<RiverSegment>,
) {
    let edge_hash = mix64(from.hash ^ pack_cell(to.cx, to.cz));
    let pieces = 2 + (mix64(edge_hash ^ SPLIT_STREAM) & 1) as usize;
    let edge = to.position - from.position;
    let normal = edge.perp().normalize_or_zero();
    let length = edge.length();

    let vertex = |k: usize| -> DVec2 {
        let f = k as f64 / pieces as f64;
        let straight = from.position + edge * f;
        if k == 0 || k == pieces {
            return straight;
        }
        let offset = signed_unit_f64(mix64(edge_hash ^ OFFSET_STREAM ^ k as u64));
        straight + normal * offset * config.meander * length
    };

    for k in 0..pieces {
        let ta = k as f64 / pieces as f64;
        let tb = (k + 1) as f64 / pieces as f64;
        let wave = signed_unit_f64(mix64(edge_hash ^ WAVE_STREAM ^ k as u64));
        out.push(RiverSegment {
            a: vertex(k),
            b: vertex(k + 1),
            height_a: heights.0 + (heights.1 - heights.0) * ta,
            height_b: heights.0 + (heights.1 - heights.0) * tb,
            radius_a: radii.0 + (radii.1 - radii.0) * ta,
            radius_b: radii.0 + (radii.1 - radii.0) * tb,
            lateral: wave * config.wave_amplitude,
            path_a: ta,
            path_b: tb,
            kind: SegmentKind::River,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Elevation falling toward +X, with a gentle Z bowl.
    struct Slope;

    impl DrainageElevation for Slope {
        fn elevation(&self, x: f64, z: f64) -> f64 {
            0.9 - x * 0.0005 + (z * 0.001).powi(2) * 0.01
        }

        fn ocean_threshold(&self) -> f64 {
            0.38
        }
    }

    fn config() -> RiverConfig {
        RiverConfig {
            frequency: 1.0 / 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_downstream_strictly_lower() {
        let field = CellField::new(1.0 / 100.0, 0.7, 1);
        let mut drainage = Drainage::new(5, &field, &Slope);
        for cx in -5..5 {
            for cz in -5..5 {
                let here = drainage.node(cx, cz);
                if let Some(down) = drainage.downstream(cx, cz) {
                    assert!(down.elevation < here.elevation);
                    assert_eq!((down.cx - cx).abs() + (down.cz - cz).abs(), 1);
                }
            }
        }
    }

    #[test]
    fn test_slope_drains_toward_positive_x() {
        let field = CellField::new(1.0 / 100.0, 0.0, 1);
        let mut drainage = Drainage::new(5, &field, &Slope);
        let down = drainage.downstream(0, 0).unwrap();
        assert_eq!((down.cx, down.cz), (1, 0));
    }

    #[test]
    fn test_edge_has_two_or_three_connected_pieces() {
        let field = CellField::new(1.0 / 100.0, 0.7, 1);
        let mut drainage = Drainage::new(9, &field, &Slope);
        let mut out = Vec::new();
        build_segments(&mut drainage, &config(), 64.0, 0, 0, &mut out);
        let rivers: Vec<_> = out
            .iter()
            .filter(|s| s.kind == SegmentKind::River && s.path_a < 1.0)
            .collect();
        assert!((2..=3).contains(&rivers.len()));
        for pair in rivers.windows(2) {
            assert_eq!(pair[0].b, pair[1].a, "pieces must chain");
            assert_eq!(pair[0].height_b, pair[1].height_a);
        }
        assert!(rivers[0].height_a > rivers[rivers.len() - 1].height_b);
    }

    #[test]
    fn test_ocean_downstream_adds_extension() {
        struct Coast;
        impl DrainageElevation for Coast {
            fn elevation(&self, x: f64, _z: f64) -> f64 {
                if x > 100.0 { 0.1 } else { 0.6 - x * 0.0001 }
            }
            fn ocean_threshold(&self) -> f64 {
                0.38
            }
        }
        let field = CellField::new(1.0 / 100.0, 0.0, 1);
        let mut drainage = Drainage::new(3, &field, &Coast);
        let mut out = Vec::new();
        build_segments(&mut drainage, &config(), 64.0, 0, 0, &mut out);
        let ext = out
            .iter()
            .find(|s| s.path_a == 1.0 && s.kind == SegmentKind::River)
            .expect("extension segment");
        assert!((ext.b - ext.a).length() > 49.0);
        assert!(ext.b.x > ext.a.x);
    }

    #[test]
    fn test_ocean_cell_has_no_segments() {
        struct Sea;
        impl DrainageElevation for Sea {
            fn elevation(&self, _x: f64, _z: f64) -> f64 {
                0.1
            }
            fn ocean_threshold(&self) -> f64 {
                0.38
            }
        }
        let field = CellField::new(1.0 / 100.0, 0.5, 1);
        let mut drainage = Drainage::new(3, &field, &Sea);
        let mut out = Vec::new();
        build_segments(&mut drainage, &config(), 64.0, 2, 2, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sink_becomes_lake() {
        struct Bowl;
        impl DrainageElevation for Bowl {
            fn elevation(&self, x: f64, z: f64) -> f64 {
                0.5 + (x * x + z * z) * 1e-6
            }
            fn ocean_threshold(&self) -> f64 {
                0.38
            }
        }
        let field = CellField::new(1.0 / 100.0, 0.0, 1);
        let mut drainage = Drainage::new(3, &field, &Bowl);
        let mut out = Vec::new();
        build_segments(&mut drainage, &config(), 64.0, 0, 0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SegmentKind::Lake);
        assert_eq!(out[0].a, out[0].b);
    }

    #[test]
    fn test_low_source_always_has_lake() {
        struct Ridge;
        impl DrainageElevation for Ridge {
            fn elevation(&self, x: f64, _z: f64) -> f64 {
                0.9 - (x - 50.0).abs() * 0.0005
            }
            fn ocean_threshold(&self) -> f64 {
                0.38
            }
        }
        let mut cfg = config();
        cfg.lake_density = 0.0;
        let field = CellField::new(1.0 / 100.0, 0.0, 1);
        let mut drainage = Drainage::new(3, &field, &Ridge);
        assert!(drainage.is_source(0, 0));
        assert!(!drainage.is_source(2, 0));

        let mut out = Vec::new();
        build_segments(&mut drainage, &cfg, 64.0, 0, 0, &mut out);
        assert!(out.iter().all(|s| s.kind == SegmentKind::River));

        cfg.lake_elevation_threshold = 2.0;
        out.clear();
        build_segments(&mut drainage, &cfg, 64.0, 0, 0, &mut out);
        assert_eq!(out.iter().filter(|s| s.kind == SegmentKind::Lake).count(), 1);
    }

    #[test]
    fn test_node_profile_ranges() {
        let cfg = config();
        let (h_low, r_low) = node_profile(&cfg, 64.0, 0.38, 0.38);
        let (h_high, r_high) = node_profile(&cfg, 64.0, 0.38, 1.0);
        assert_eq!(h_low, 64.0);
        assert!(h_high > h_low);
        assert_eq!(r_low, cfg.radius_max);
        assert!((r_high - cfg.radius_min).abs() < 1e-9);
    }
}
