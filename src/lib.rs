//! glyphpack
pub mod atlas;
pub mod bitmap;
pub mod core;
pub mod font;
pub mod logging;
