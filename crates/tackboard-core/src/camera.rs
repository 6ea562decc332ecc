//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform for the board.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and world coordinates. The offset
/// and zoom are the "view position + scale" words of the session file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%)
    pub zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        // Convert screen point to world before zoom
        let world_point = self.screen_to_world(screen_point);

        // Apply new zoom
        self.zoom = new_zoom;

        // Adjust offset so world_point stays at screen_point
        let new_screen = self.world_to_screen(world_point);
        let correction = Vec2::new(
            screen_point.x - new_screen.x,
            screen_point.y - new_screen.y,
        );
        self.offset += correction;
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }
}
