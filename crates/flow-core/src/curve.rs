//! Link curve geometry.
//!
//! A link is drawn as one or more horizontal-biased cubic Béziers. Control
//! points are pushed horizontally away from each endpoint by
//! `|end.x - start.x| * curvature`; the [`CurveKind`] decides which of the two
//! offsets flips sign when the segment runs right-to-left.

use crate::model::Point;
use kurbo::{CubicBez, ParamCurveNearest};
use std::fmt;

/// Control-point placement rule for a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Leaves a source slot: the second control point flips when running backwards.
    Open,
    /// Enters a target slot: the first control point flips when running backwards.
    Close,
    /// Between two waypoints: both control points flip when running backwards.
    Other,
    /// Slot to slot: symmetric S-curve, never flips.
    OpenClose,
}

/// One cubic segment `M start C c1 c2 end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub start: Point,
    pub c1: Point,
    pub c2: Point,
    pub end: Point,
}

impl CubicSegment {
    pub fn to_kurbo(&self) -> CubicBez {
        CubicBez::new(self.start, self.c1, self.c2, self.end)
    }

    /// Shortest distance from `p` to the curve.
    pub fn distance_to(&self, p: Point) -> f64 {
        self.to_kurbo().nearest(p.into(), 1e-3).distance_sq.sqrt()
    }
}

impl fmt::Display for CubicSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M {} {} C {} {} {} {} {} {}",
            self.start.x,
            self.start.y,
            self.c1.x,
            self.c1.y,
            self.c2.x,
            self.c2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Compute a single segment between two graph-space points.
pub fn compute_segment(start: Point, end: Point, curvature: f64, kind: CurveKind) -> CubicSegment {
    let extension = (end.x - start.x).abs() * curvature;
    let backwards = if start.x >= end.x { -1.0 } else { 1.0 };

    let (hx1, hx2) = match kind {
        CurveKind::Open => (start.x + extension, end.x - extension * backwards),
        CurveKind::Close => (start.x + extension * backwards, end.x - extension),
        CurveKind::Other => (
            start.x + extension * backwards,
            end.x - extension * backwards,
        ),
        CurveKind::OpenClose => (start.x + extension, end.x - extension),
    };

    CubicSegment {
        start,
        c1: Point::new(hx1, start.y),
        c2: Point::new(hx2, end.y),
        end,
    }
}

// ─── Multi-waypoint links ────────────────────────────────────────────────

/// Curvature factors used when stitching a link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSettings {
    /// Links without waypoints.
    pub curvature: f64,
    /// First and last segment of a rerouted link.
    pub reroute_start_end: f64,
    /// Segments between two waypoints.
    pub reroute: f64,
}

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            curvature: 0.5,
            reroute_start_end: 0.5,
            reroute: 0.5,
        }
    }
}

/// How a stitched link is handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    /// All segments concatenated into one drawable path.
    #[default]
    Combined,
    /// One drawable path per segment, so segments can be highlighted on their own.
    PerSegment,
}

/// The stitched segments of one link, source to target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkPath {
    pub segments: Vec<CubicSegment>,
}

impl LinkPath {
    /// Path data as the renderer wants it: a single entry in
    /// [`PathMode::Combined`], one per segment in [`PathMode::PerSegment`].
    pub fn path_data(&self, mode: PathMode) -> Vec<String> {
        let parts = self.segments.iter().map(ToString::to_string);
        match mode {
            PathMode::Combined => vec![parts.collect::<Vec<_>>().join(" ")],
            PathMode::PerSegment => parts.collect(),
        }
    }

    /// Nearest segment to `p` and its distance.
    pub fn nearest_segment(&self, p: Point) -> Option<(usize, f64)> {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.distance_to(p)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Where a waypoint placed at `p` belongs in the waypoint list: segment `i`
    /// runs from waypoint `i - 1` (or the source) to waypoint `i` (or the
    /// target), so splitting it means inserting at `i`.
    pub fn insertion_index(&self, p: Point) -> usize {
        self.nearest_segment(p).map(|(i, _)| i).unwrap_or(0)
    }
}

/// Build the segments of a link from its source anchor, waypoints and
/// target anchor, all in graph space.
///
/// With `W` waypoints this yields `W + 1` segments. A single waypoint uses
/// symmetric segments on both sides; longer chains open from the source,
/// close into the target and use [`CurveKind::Other`] in between.
pub fn stitch_link(
    start: Point,
    waypoints: &[Point],
    end: Point,
    settings: &CurveSettings,
) -> LinkPath {
    let segments = match waypoints {
        [] => vec![compute_segment(
            start,
            end,
            settings.curvature,
            CurveKind::OpenClose,
        )],
        [only] => vec![
            compute_segment(
                start,
                *only,
                settings.reroute_start_end,
                CurveKind::OpenClose,
            ),
            compute_segment(*only, end, settings.reroute_start_end, CurveKind::OpenClose),
        ],
        [first, .., last] => {
            let mut segments = Vec::with_capacity(waypoints.len() + 1);
            segments.push(compute_segment(
                start,
                *first,
                settings.reroute_start_end,
                CurveKind::Open,
            ));
            for pair in waypoints.windows(2) {
                segments.push(compute_segment(
                    pair[0],
                    pair[1],
                    settings.reroute,
                    CurveKind::Other,
                ));
            }
            segments.push(compute_segment(
                *last,
                end,
                settings.reroute_start_end,
                CurveKind::Close,
            ));
            segments
        }
    };
    LinkPath { segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const P0: Point = Point::new(0.0, 0.0);

    #[test]
    fn openclose_starts_and_ends_at_endpoints() {
        let seg = compute_segment(
            Point::new(12.5, 40.0),
            Point::new(212.5, -7.0),
            0.5,
            CurveKind::OpenClose,
        );
        assert_eq!(seg.start, Point::new(12.5, 40.0));
        assert_eq!(seg.end, Point::new(212.5, -7.0));
        assert_eq!(seg.c1, Point::new(112.5, 40.0));
        assert_eq!(seg.c2, Point::new(112.5, -7.0));
    }

    #[test]
    fn path_string_format() {
        let seg = compute_segment(P0, Point::new(100.0, 50.0), 0.5, CurveKind::OpenClose);
        assert_eq!(seg.to_string(), "M 0 0 C 50 0 50 50 100 50");
    }

    #[test]
    fn open_flips_second_control_point_when_backwards() {
        let seg = compute_segment(Point::new(100.0, 0.0), P0, 0.5, CurveKind::Open);
        assert_eq!(seg.c1.x, 150.0);
        assert_eq!(seg.c2.x, -50.0);
    }

    #[test]
    fn close_flips_first_control_point_when_backwards() {
        let seg = compute_segment(Point::new(100.0, 0.0), P0, 0.5, CurveKind::Close);
        assert_eq!(seg.c1.x, 50.0);
        assert_eq!(seg.c2.x, -50.0);
    }

    #[test]
    fn other_flips_both_when_backwards() {
        let seg = compute_segment(Point::new(100.0, 0.0), P0, 0.5, CurveKind::Other);
        assert_eq!(seg.c1.x, 50.0);
        assert_eq!(seg.c2.x, 50.0);

        let forward = compute_segment(P0, Point::new(100.0, 0.0), 0.5, CurveKind::Other);
        assert_eq!(forward.c1.x, 50.0);
        assert_eq!(forward.c2.x, 50.0);
    }

    #[test]
    fn vertical_segment_has_no_horizontal_offset() {
        let seg = compute_segment(P0, Point::new(0.0, 100.0), 0.5, CurveKind::OpenClose);
        assert_eq!(seg.c1, P0);
        assert_eq!(seg.c2, Point::new(0.0, 100.0));
    }

    #[test]
    fn stitch_without_waypoints_is_one_segment() {
        let path = stitch_link(P0, &[], Point::new(10.0, 0.0), &CurveSettings::default());
        assert_eq!(path.segments.len(), 1);
    }

    #[test]
    fn stitch_single_waypoint_uses_symmetric_segments() {
        let wp = Point::new(50.0, 80.0);
        let end = Point::new(100.0, 0.0);
        let path = stitch_link(P0, &[wp], end, &CurveSettings::default());
        assert_eq!(path.segments.len(), 2);
        assert_eq!(
            path.segments[0],
            compute_segment(P0, wp, 0.5, CurveKind::OpenClose)
        );
        assert_eq!(
            path.segments[1],
            compute_segment(wp, end, 0.5, CurveKind::OpenClose)
        );
    }

    #[test]
    fn stitch_chain_is_continuous() {
        let settings = CurveSettings {
            curvature: 0.5,
            reroute_start_end: 0.4,
            reroute: 0.2,
        };
        let wps = [Point::new(40.0, 10.0), Point::new(20.0, 90.0), Point::new(70.0, 30.0)];
        let end = Point::new(200.0, 0.0);
        let path = stitch_link(P0, &wps, end, &settings);

        assert_eq!(path.segments.len(), 4);
        assert_eq!(path.segments[0].start, P0);
        assert_eq!(path.segments[3].end, end);
        for pair in path.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(
            path.segments[1],
            compute_segment(wps[0], wps[1], 0.2, CurveKind::Other)
        );
        assert_eq!(
            path.segments[3],
            compute_segment(wps[2], end, 0.4, CurveKind::Close)
        );
    }

    #[test]
    fn path_data_modes() {
        let path = stitch_link(
            P0,
            &[Point::new(50.0, 50.0)],
            Point::new(100.0, 0.0),
            &CurveSettings::default(),
        );
        let combined = path.path_data(PathMode::Combined);
        let split = path.path_data(PathMode::PerSegment);
        assert_eq!(combined.len(), 1);
        assert_eq!(split.len(), 2);
        assert_eq!(combined[0], split.join(" "));
    }

    #[test]
    fn insertion_index_picks_nearest_segment() {
        let wps = [Point::new(100.0, 0.0), Point::new(200.0, 0.0)];
        let path = stitch_link(P0, &wps, Point::new(300.0, 0.0), &CurveSettings::default());
        assert_eq!(path.insertion_index(Point::new(20.0, 1.0)), 0);
        assert_eq!(path.insertion_index(Point::new(150.0, 1.0)), 1);
        assert_eq!(path.insertion_index(Point::new(290.0, -1.0)), 2);
    }

    #[test]
    fn distance_to_curve() {
        let seg = compute_segment(P0, Point::new(100.0, 0.0), 0.5, CurveKind::OpenClose);
        assert!(seg.distance_to(Point::new(50.0, 3.0)) < 3.01);
        assert!(seg.distance_to(Point::new(50.0, 40.0)) > 39.0);
    }
}
