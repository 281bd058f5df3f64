use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Conversion between the machine frame (Y up) and a Y-down surface frame
/// such as SVG documents or screen canvases.
///
/// Everything inside the pipeline is in the machine frame. Surfaces convert
/// once, on the way in or out, through this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTransform {
    /// Height of the surface in its own units; Y is mirrored about it.
    pub height: f64,
    /// Surface units per machine unit.
    pub scale: f64,
}

impl SurfaceTransform {
    pub fn new(height: f64) -> Self {
        Self { height, scale: 1.0 }
    }

    pub fn with_scale(height: f64, scale: f64) -> Self {
        Self { height, scale }
    }

    /// Machine frame to surface frame.
    pub fn to_surface(&self, p: Point) -> Point {
        Point::new(p.x * self.scale, self.height - p.y * self.scale)
    }

    /// Surface frame to machine frame.
    pub fn from_surface(&self, p: Point) -> Point {
        Point::new(p.x / self.scale, (self.height - p.y) / self.scale)
    }
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_round_trip() {
        let t = SurfaceTransform::with_scale(200.0, 2.0);
        let machine = Point::new(12.5, 30.0);
        let surface = t.to_surface(machine);
        assert_eq!(surface, Point::new(25.0, 140.0));
        assert_eq!(t.from_surface(surface), machine);
    }

    #[test]
    fn test_top_of_surface_is_top_of_machine() {
        let t = SurfaceTransform::new(100.0);
        // surface y = 0 is the top edge
        assert_eq!(t.from_surface(Point::new(0.0, 0.0)).y, 100.0);
        assert_eq!(t.from_surface(Point::new(0.0, 100.0)).y, 0.0);
    }
}
