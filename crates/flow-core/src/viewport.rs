//! Pan/zoom transform between screen space and graph space.
//!
//! `screen = graph * zoom + pan`. Zoom changes rescale the pan offset around
//! the canvas origin, so the graph point under screen `(0, 0)` stays put.

use crate::model::Point;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM_MIN: f64 = 0.5;
pub const DEFAULT_ZOOM_MAX: f64 = 1.6;
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::default(),
            zoom: 1.0,
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            zoom_step: DEFAULT_ZOOM_STEP,
        }
    }
}

impl Viewport {
    pub fn new(zoom_min: f64, zoom_max: f64, zoom_step: f64) -> Self {
        Self {
            zoom_min,
            zoom_max,
            zoom_step,
            ..Self::default()
        }
    }

    /// Screen (pointer) coordinates to graph coordinates.
    pub fn to_graph(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Graph coordinates to screen coordinates.
    pub fn to_screen(&self, graph: Point) -> Point {
        Point::new(
            graph.x * self.zoom + self.pan.x,
            graph.y * self.zoom + self.pan.y,
        )
    }

    /// A screen-space distance expressed in graph units.
    pub fn scale_to_graph(&self, screen_delta: f64) -> f64 {
        screen_delta / self.zoom
    }

    /// Set the zoom, clamped to `[zoom_min, zoom_max]`. Returns whether the
    /// zoom actually changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let clamped = zoom.clamp(self.zoom_min, self.zoom_max);
        if clamped == self.zoom {
            return false;
        }
        let old = self.zoom;
        self.pan = Point::new(self.pan.x / old * clamped, self.pan.y / old * clamped);
        self.zoom = clamped;
        log::trace!("zoom {old} -> {clamped}");
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom < self.zoom_max {
            self.set_zoom(self.zoom + self.zoom_step)
        } else {
            false
        }
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom > self.zoom_min {
            self.set_zoom(self.zoom - self.zoom_step)
        } else {
            false
        }
    }

    pub fn zoom_reset(&mut self) -> bool {
        self.set_zoom(1.0)
    }

    /// Returns whether the pan actually changed.
    pub fn set_pan(&mut self, pan: Point) -> bool {
        if pan == self.pan {
            return false;
        }
        self.pan = pan;
        true
    }

    /// Back to `pan = (0, 0)`, `zoom = 1`, keeping the limits.
    pub fn reset(&mut self) {
        self.pan = Point::default();
        self.zoom = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identity_at_default() {
        let vp = Viewport::default();
        let p = Point::new(42.0, -3.0);
        assert_eq!(vp.to_graph(p), p);
        assert_eq!(vp.to_screen(p), p);
    }

    #[test]
    fn screen_graph_roundtrip() {
        let mut vp = Viewport::default();
        vp.set_pan(Point::new(30.0, -12.0));
        vp.set_zoom(1.5);
        let g = Point::new(100.0, 40.0);
        let back = vp.to_graph(vp.to_screen(g));
        assert!(approx(back.x, g.x) && approx(back.y, g.y));
    }

    #[test]
    fn zoom_clamps_to_bounds() {
        let mut vp = Viewport::default();
        vp.set_zoom(vp.zoom_max + vp.zoom_step);
        assert_eq!(vp.zoom, 1.6);
        vp.set_zoom(vp.zoom_min - vp.zoom_step);
        assert_eq!(vp.zoom, 0.5);
    }

    #[test]
    fn zoom_in_stops_at_max() {
        let mut vp = Viewport::default();
        let mut steps = 0;
        while vp.zoom_in() {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(vp.zoom, vp.zoom_max);
        assert!(!vp.zoom_in());
    }

    #[test]
    fn zoom_out_stops_at_min() {
        let mut vp = Viewport::default();
        while vp.zoom_out() {}
        assert_eq!(vp.zoom, vp.zoom_min);
    }

    #[test]
    fn zoom_rescales_pan_around_origin() {
        let mut vp = Viewport::default();
        vp.set_pan(Point::new(100.0, 50.0));
        let under_origin = vp.to_graph(Point::new(0.0, 0.0));

        assert!(vp.set_zoom(1.5));
        assert!(approx(vp.pan.x, 150.0));
        assert!(approx(vp.pan.y, 75.0));

        let after = vp.to_graph(Point::new(0.0, 0.0));
        assert!(approx(after.x, under_origin.x));
        assert!(approx(after.y, under_origin.y));
    }

    #[test]
    fn unchanged_zoom_reports_false() {
        let mut vp = Viewport::default();
        assert!(!vp.set_zoom(1.0));
        assert!(!vp.zoom_reset());
    }

    #[test]
    fn reset_keeps_limits() {
        let mut vp = Viewport::new(0.2, 3.0, 0.25);
        vp.set_zoom(2.0);
        vp.set_pan(Point::new(5.0, 5.0));
        vp.reset();
        assert_eq!(vp.zoom, 1.0);
        assert_eq!(vp.pan, Point::default());
        assert_eq!(vp.zoom_max, 3.0);
    }
}
