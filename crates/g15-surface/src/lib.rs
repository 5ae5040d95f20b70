//! Drawing surface implementations.
//!
//! All three backends compose a shared [`PixelBuffer`] and the built-in
//! [`FontTable`]; they differ only in how a committed frame leaves the
//! process.

pub mod composer;
pub mod daemon;
pub mod font;
pub mod memory;
pub mod pixels;

pub use composer::ComposerSurface;
pub use daemon::DaemonSurface;
pub use font::{BlockFont, FontTable, glyph_bitmap};
pub use memory::{MemorySurface, TextDraw};
pub use pixels::PixelBuffer;
