//! Frame marker bytes.
//!
//! A payload byte equal to any of these is sent as [`ESCAPE`] followed by
//! its bitwise complement, so markers only ever appear unescaped at frame
//! boundaries.

/// Start of frame (ASCII SOH).
pub const START: u8 = 0x01;

/// End of frame (ASCII SUB / EOF).
pub const END: u8 = 0x1A;

/// Escape prefix (ASCII ESC).
pub const ESCAPE: u8 = 0x1B;

/// Returns true if `byte` must be escaped inside a frame.
#[inline]
pub fn is_marker(byte: u8) -> bool {
    matches!(byte, START | END | ESCAPE)
}
