use serde::{Deserialize, Serialize};

use crate::domain::geometry::{Rotation, Size};

/// Display identifier of the built-in screen.
pub const DEFAULT_DISPLAY: i32 = 0;

/// Display flag set on displays whose content must not be mirrored.
pub const FLAG_PRIVATE: i32 = 1 << 2;

/// Snapshot of one display as reported by the display registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Size in the current orientation.
    pub logical_size: Size,
    pub rotation: Rotation,
    /// Platform display flags, see [`FLAG_PRIVATE`].
    pub flags: i32,
    pub display_type: i32,
    /// `false` while the screen is off (dozing or asleep).
    pub on: bool,
}

impl DisplayInfo {
    pub fn new(logical_size: Size, rotation: Rotation) -> Self {
        Self {
            logical_size,
            rotation,
            flags: 0,
            display_type: 0,
            on: true,
        }
    }

    /// Size of the display in its natural orientation.
    pub fn natural_size(&self) -> Size {
        self.logical_size.rotated(self.rotation)
    }

    pub fn is_valid(&self) -> bool {
        self.logical_size.is_positive()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_private(&self) -> bool {
        self.flags & FLAG_PRIVATE != 0
    }
}
