//! Display geometry and rotation compensation.
//!
//! Touch coordinates arrive from the controller relative to the display in its
//! natural (unrotated) orientation.  Before injection they must be mapped into
//! the coordinate space of the display's *current* rotation.
//!
//! ```text
//! rotation 0:   (x, y)       -> (x, y)
//! rotation 1:   (x, y)       -> (y, W - x)
//! rotation 2:   (x, y)       -> (W - x, H - y)
//! rotation 3:   (x, y)       -> (H - y, x)
//! ```
//!
//! where `W` x `H` is the natural size of the display.  Each mapping is a
//! bijection; [`restore_rotated_point`] is the inverse of [`rotate_point`].

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns the size as seen after rotating by `rotation` quarter turns.
    pub fn rotated(&self, rotation: Rotation) -> Size {
        if rotation.is_sideways() {
            Size::new(self.height, self.width)
        } else {
            *self
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Display rotation in quarter turns counter-clockwise from the natural
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rotation {
    #[default]
    Deg0 = 0,
    Deg90 = 1,
    Deg180 = 2,
    Deg270 = 3,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    /// Converts a quarter-turn count in `0..=3`; anything else is rejected.
    pub fn from_quarter_turns(value: i32) -> Option<Rotation> {
        match value {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Like [`Rotation::from_quarter_turns`] but reduces the value modulo 4.
    pub fn normalized(value: i32) -> Rotation {
        match value & 3 {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        self as i32
    }

    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Maps a point given in natural display coordinates into the coordinate
/// space of a display rotated by `rotation`.
pub fn rotate_point(point: Point, natural_size: Size, rotation: Rotation) -> Point {
    let Size { width, height } = natural_size;
    match rotation {
        Rotation::Deg0 => point,
        Rotation::Deg90 => Point::new(point.y, width - point.x),
        Rotation::Deg180 => Point::new(width - point.x, height - point.y),
        Rotation::Deg270 => Point::new(height - point.y, point.x),
    }
}

/// Inverse of [`rotate_point`].
pub fn restore_rotated_point(point: Point, natural_size: Size, rotation: Rotation) -> Point {
    let Size { width, height } = natural_size;
    match rotation {
        Rotation::Deg0 => point,
        Rotation::Deg90 => Point::new(width - point.y, point.x),
        Rotation::Deg180 => Point::new(width - point.x, height - point.y),
        Rotation::Deg270 => Point::new(point.y, height - point.x),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const NATURAL: Size = Size::new(1080, 2400);

    #[test]
    fn test_rotation_round_trip_at_corners() {
        let corners = [Point::new(0, 0), Point::new(NATURAL.width, NATURAL.height)];
        for rotation in Rotation::ALL {
            for corner in corners {
                let rotated = rotate_point(corner, NATURAL, rotation);
                let restored = restore_rotated_point(rotated, NATURAL, rotation);
                assert_eq!(restored, corner, "rotation {rotation:?}, corner {corner:?}");
            }
        }
    }

    #[test]
    fn test_rotation_round_trip_at_interior_point() {
        let point = Point::new(123, 456);
        for rotation in Rotation::ALL {
            let rotated = rotate_point(point, NATURAL, rotation);
            assert_eq!(restore_rotated_point(rotated, NATURAL, rotation), point);
        }
    }

    #[test]
    fn test_rotate_point_quarter_turn() {
        // (x, y) -> (y, W - x)
        let rotated = rotate_point(Point::new(100, 200), NATURAL, Rotation::Deg90);
        assert_eq!(rotated, Point::new(200, 980));
    }

    #[test]
    fn test_rotate_point_half_turn() {
        let rotated = rotate_point(Point::new(0, 0), NATURAL, Rotation::Deg180);
        assert_eq!(rotated, Point::new(1080, 2400));
    }

    #[test]
    fn test_rotate_point_three_quarter_turn() {
        // (x, y) -> (H - y, x)
        let rotated = rotate_point(Point::new(100, 200), NATURAL, Rotation::Deg270);
        assert_eq!(rotated, Point::new(2200, 100));
    }

    #[test]
    fn test_from_quarter_turns_rejects_out_of_range() {
        assert_eq!(Rotation::from_quarter_turns(3), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_quarter_turns(4), None);
        assert_eq!(Rotation::from_quarter_turns(-1), None);
    }

    #[test]
    fn test_size_rotated_swaps_only_when_sideways() {
        assert_eq!(NATURAL.rotated(Rotation::Deg90), Size::new(2400, 1080));
        assert_eq!(NATURAL.rotated(Rotation::Deg180), NATURAL);
    }

    #[test]
    fn test_size_is_positive() {
        assert!(Size::new(1, 1).is_positive());
        assert!(!Size::new(0, 720).is_positive());
        assert!(!Size::new(1280, -1).is_positive());
    }
}
