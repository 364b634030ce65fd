//! Byte-at-a-time parser for distance frames.
//!
//! Frame format:
//! - SYNC1 (1 byte): `'$'`
//! - SYNC2 (1 byte): `'M'`
//! - LOW (1 byte): distance low byte
//! - HIGH (1 byte): distance high byte
//!
//! There is no length field and no checksum. Synchronization is recovered by
//! dropping back to [`ParserState::Idle`] whenever the second sync byte does
//! not follow the first.

use serde::{Deserialize, Serialize};

/// First synchronization byte
pub const SYNC1: u8 = b'$';

/// Second synchronization byte
pub const SYNC2: u8 = b'M';

/// A decoded distance, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading(pub u16);

impl Reading {
    pub fn distance_cm(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cm", self.0)
    }
}

/// How the two payload bytes are folded into a [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// `low | ((high << 8) & 0xFF)`. The mask discards the high byte, so the
    /// reading is always the low byte. Matches the output of the existing
    /// sensor tool byte for byte.
    #[default]
    Legacy,
    /// Little-endian `low | (high << 8)`.
    Full16,
}

impl CombineMode {
    pub fn combine(self, low: u8, high: u8) -> u16 {
        let low = u16::from(low);
        let high = u16::from(high);
        match self {
            Self::Legacy => low | ((high << 8) & 0xFF),
            Self::Full16 => low | (high << 8),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Full16 => "full16",
        }
    }
}

impl std::str::FromStr for CombineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "full16" | "full" => Ok(Self::Full16),
            other => Err(format!("unknown combine mode `{other}` (expected legacy or full16)")),
        }
    }
}

/// Parser position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Waiting for SYNC1
    #[default]
    Idle,
    /// Got SYNC1, waiting for SYNC2
    SawSync1,
    /// Got the sync marker, waiting for the low byte
    AwaitingLow,
    /// Holding the low byte, waiting for the high byte
    AwaitingHigh { low: u8 },
}

/// Running counters kept alongside the parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ParserStats {
    pub bytes: u64,
    pub frames: u64,
    pub resyncs: u64,
}

/// State machine extracting [`Reading`]s from a raw byte stream.
///
/// One parser serves one byte stream. It holds no I/O handles, so callers can
/// run as many independent instances as they have streams.
#[derive(Debug, Clone, Default)]
pub struct FrameParser {
    state: ParserState,
    mode: CombineMode,
    stats: ParserStats,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: CombineMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn mode(&self) -> CombineMode {
        self.mode
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Drop any partial frame and wait for a fresh sync marker.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
    }

    /// Feed a single byte to the parser.
    ///
    /// Returns `Some(reading)` when this byte completes a frame.
    pub fn feed(&mut self, byte: u8) -> Option<Reading> {
        self.stats.bytes += 1;
        match self.state {
            ParserState::Idle => {
                if byte == SYNC1 {
                    self.state = ParserState::SawSync1;
                }
                None
            }
            ParserState::SawSync1 => {
                if byte == SYNC2 {
                    self.state = ParserState::AwaitingLow;
                } else {
                    // The offending byte is consumed, even if it is another SYNC1.
                    self.state = ParserState::Idle;
                    self.stats.resyncs += 1;
                }
                None
            }
            ParserState::AwaitingLow => {
                self.state = ParserState::AwaitingHigh { low: byte };
                None
            }
            ParserState::AwaitingHigh { low } => {
                self.state = ParserState::Idle;
                self.stats.frames += 1;
                Some(Reading(self.mode.combine(low, byte)))
            }
        }
    }

    /// Feed a chunk of bytes, collecting every completed reading in order.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Reading> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_ignores_non_sync() {
        let mut parser = FrameParser::new();
        for byte in (0u8..=255).filter(|&b| b != SYNC1) {
            assert_eq!(parser.feed(byte), None);
            assert_eq!(parser.state(), ParserState::Idle);
        }
    }

    #[test]
    fn test_full_frame_transitions() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(b'$'), None);
        assert_eq!(parser.state(), ParserState::SawSync1);
        assert_eq!(parser.feed(b'M'), None);
        assert_eq!(parser.state(), ParserState::AwaitingLow);
        assert_eq!(parser.feed(0x05), None);
        assert_eq!(parser.state(), ParserState::AwaitingHigh { low: 0x05 });
        assert_eq!(parser.feed(0x00), Some(Reading(5)));
        assert_eq!(parser.state(), ParserState::Idle);
    }

    #[test]
    fn test_legacy_mode_ignores_high_byte() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_slice(&[0x24, 0x4D, 0x05, 0xFF]), vec![Reading(5)]);
    }

    #[test]
    fn test_leading_noise() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_slice(&[0x41, 0x24, 0x4D, 0x0A, 0x00]), vec![Reading(10)]);
    }

    #[test]
    fn test_double_sync1_resyncs() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(0x24), None);
        assert_eq!(parser.feed(0x24), None);
        // second '$' was consumed by the resync, not taken as a new marker
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(parser.feed_slice(&[0x24, 0x4D, 0x02, 0x00]), vec![Reading(2)]);
        assert_eq!(parser.stats().resyncs, 1);
    }

    #[test]
    fn test_double_sync1_in_one_chunk() {
        // '$' '$' 'M' 2 0: the 'M' arrives while Idle and is dropped too
        let mut parser = FrameParser::new();
        assert!(parser.feed_slice(&[0x24, 0x24, 0x4D, 0x02, 0x00]).is_empty());
        assert_eq!(parser.state(), ParserState::Idle);
    }

    #[test]
    fn test_sync_bytes_are_valid_payload() {
        let mut parser = FrameParser::with_mode(CombineMode::Full16);
        assert_eq!(
            parser.feed_slice(&[b'$', b'M', b'$', b'M']),
            vec![Reading(u16::from_le_bytes([b'$', b'M']))]
        );
    }

    #[test]
    fn test_full16_mode() {
        let mut parser = FrameParser::with_mode(CombineMode::Full16);
        assert_eq!(parser.feed_slice(&[0x24, 0x4D, 0x2C, 0x01]), vec![Reading(300)]);
    }

    #[test]
    fn test_combine_rule() {
        for low in [0u8, 1, 0x7F, 0xFF] {
            for high in [0u8, 1, 0x80, 0xFF] {
                assert_eq!(CombineMode::Legacy.combine(low, high), u16::from(low));
                assert_eq!(CombineMode::Full16.combine(low, high), u16::from_le_bytes([low, high]));
            }
        }
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut parser = FrameParser::new();
        parser.feed_slice(&[b'$', b'M', 0x10]);
        parser.reset();
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(parser.feed(0x00), None);
    }

    #[test]
    fn test_stats() {
        let mut parser = FrameParser::new();
        parser.feed_slice(&[b'$', b'x', b'$', b'M', 1, 0, b'$', b'M', 2, 0]);
        assert_eq!(
            parser.stats(),
            ParserStats {
                bytes: 10,
                frames: 2,
                resyncs: 1,
            }
        );
    }

    #[test]
    fn test_independent_instances() {
        let mut a = FrameParser::new();
        let mut b = FrameParser::new();
        a.feed_slice(&[b'$', b'M']);
        assert_eq!(b.state(), ParserState::Idle);
        assert_eq!(a.feed_slice(&[7, 0]), vec![Reading(7)]);
        assert!(b.feed_slice(&[7, 0]).is_empty());
    }

    #[test]
    fn test_combine_mode_from_str() {
        assert_eq!("legacy".parse::<CombineMode>(), Ok(CombineMode::Legacy));
        assert_eq!("FULL16".parse::<CombineMode>(), Ok(CombineMode::Full16));
        assert!("bogus".parse::<CombineMode>().is_err());
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(Reading(42).to_string(), "42 cm");
        assert_eq!(Reading(42).distance_cm(), 42);
    }
}
