//! Small 2D math helpers used by the simulation.
//!
//! Screen coordinates: x grows to the right, y grows downward.

use serde::Serialize;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct Vector2 {
    ///Value along the x-axis.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down.
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Builds a vector of the given length pointing at `degrees`.
    pub fn from_angle_degrees(degrees: f32, length: f32) -> Vector2 {
        let radians = degrees.to_radians();
        Vector2 {
            x: radians.cos() * length,
            y: radians.sin() * length,
        }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2::ZERO
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Rescales to `length`, leaving a zero vector untouched.
    pub fn with_magnitude(&self, length: f32) -> Vector2 {
        self.normalize().scale(length)
    }

    ///Shrinks the vector to `cap` if it is longer.
    pub fn clamp_magnitude(&self, cap: f32) -> Vector2 {
        if self.magnitude() > cap {
            self.with_magnitude(cap)
        } else {
            *self
        }
    }
}

///Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Rect {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn from_center(center: Vector2, width: f32, height: f32) -> Self {
        Rect {
            left: center.x - width / 2.0,
            top: center.y - height / 2.0,
            right: center.x + width / 2.0,
            bottom: center.y + height / 2.0,
        }
    }

    pub fn center(&self) -> Vector2 {
        Vector2 {
            x: (self.left + self.right) / 2.0,
            y: (self.top + self.bottom) / 2.0,
        }
    }

    ///Closest point of the rectangle to `p`.
    pub fn nearest_point(&self, p: Vector2) -> Vector2 {
        Vector2 {
            x: p.x.clamp(self.left, self.right),
            y: p.y.clamp(self.top, self.bottom),
        }
    }

    ///Circle-vs-rectangle test: touching counts as overlapping.
    pub fn intersects_circle(&self, center: Vector2, radius: f32) -> bool {
        let nearest = self.nearest_point(center);
        let dx = center.x - nearest.x;
        let dy = center.y - nearest.y;
        dx * dx + dy * dy <= radius * radius
    }

    ///Distance from `p` to the nearer vertical edge.
    pub fn overlap_x(&self, p: Vector2) -> f32 {
        (p.x - self.left).min(self.right - p.x)
    }

    ///Distance from `p` to the nearer horizontal edge.
    pub fn overlap_y(&self, p: Vector2) -> f32 {
        (p.y - self.top).min(self.bottom - p.y)
    }
}
