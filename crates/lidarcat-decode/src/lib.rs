//! Frame decoding for the `$M` distance sensor protocol.

pub mod frame;
pub mod stream;

pub use frame::{CombineMode, FrameParser, ParserState, ParserStats, Reading, SYNC1, SYNC2};
pub use stream::{Readings, ReadingsExt};
