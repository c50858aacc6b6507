//! Axis-aligned boxes and the minimum-penetration collision side heuristic.
//!
//! Coordinates follow the canvas convention: `x` grows to the right, `y` grows
//! downward, and a box is anchored at its top-left corner.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap test; boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// Face of the obstacle that the mover is judged to have hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionSide {
    /// Mover came down onto the obstacle's top face.
    Top,
    /// Mover came up into the obstacle's underside.
    Bottom,
    /// Mover hit the obstacle's left face (mover is on the left).
    Left,
    /// Mover hit the obstacle's right face (mover is on the right).
    Right,
}

/// Distances between each obstacle face and the mover's opposing edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDistances {
    pub from_top: f32,
    pub from_bottom: f32,
    pub from_left: f32,
    pub from_right: f32,
}

impl FaceDistances {
    pub fn between(mover: &Rect, obstacle: &Rect) -> Self {
        Self {
            from_top: (mover.bottom() - obstacle.top()).abs(),
            from_bottom: (mover.top() - obstacle.bottom()).abs(),
            from_left: (mover.right() - obstacle.left()).abs(),
            from_right: (mover.left() - obstacle.right()).abs(),
        }
    }

    /// Face with the smallest distance. Ties resolve top, bottom, left, right.
    pub fn closest_side(&self) -> CollisionSide {
        let min = self
            .from_top
            .min(self.from_bottom)
            .min(self.from_left)
            .min(self.from_right);

        if min == self.from_top {
            CollisionSide::Top
        } else if min == self.from_bottom {
            CollisionSide::Bottom
        } else if min == self.from_left {
            CollisionSide::Left
        } else {
            CollisionSide::Right
        }
    }
}

/// Returns the side of `obstacle` that `mover` collided with, or `None` when the
/// boxes do not overlap.
pub fn detect_collision_side(mover: &Rect, obstacle: &Rect) -> Option<CollisionSide> {
    if !mover.overlaps(obstacle) {
        return None;
    }

    Some(FaceDistances::between(mover, obstacle).closest_side())
}
