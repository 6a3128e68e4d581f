//! Domain types for the device mirroring agent.
//!
//! Pure data and arithmetic with no infrastructure dependencies: display
//! geometry, display descriptions, and the platform input constants that the
//! gesture translator needs.

/// Sizes, points, rotations, and the rotation compensation transform.
pub mod geometry;

/// Display descriptions returned by the display registry.
pub mod display;

/// Platform input constants (motion actions, key actions, sources, key codes).
pub mod input;
