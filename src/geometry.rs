//! Structures used to map areas on the screen

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================== Point ==============================
// ====================================================================

/// A position on the screen, relative to the root window
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset from the left edge
    pub x: i32,
    /// Vertical offset from the top edge
    pub y: i32,
}

impl Point {
    /// Create a new [`Point`]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================= Dimension ============================
// ====================================================================

/// The size of a window or screen
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Width in pixels
    pub width:  u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimension {
    /// Create a new [`Dimension`]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ============================= Rectangle ============================
// ====================================================================

/// A [`Point`] and a [`Dimension`] describing where a window sits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    /// The top-left corner
    pub point:     Point,
    /// The size of the area
    pub dimension: Dimension,
}

impl Rectangle {
    /// Create a new [`Rectangle`]
    #[must_use]
    pub const fn new(point: Point, dimension: Dimension) -> Self {
        Self { point, dimension }
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.point, self.dimension)
    }
}
