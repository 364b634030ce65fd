//! Lazy adapter from a byte iterator to a reading iterator.

use crate::frame::{CombineMode, FrameParser, Reading};

/// Iterator yielding a [`Reading`] for every complete frame in `bytes`.
///
/// Pulls only as many bytes as needed for the next reading, so it works on
/// unbounded sources.
#[derive(Debug, Clone)]
pub struct Readings<I> {
    bytes: I,
    parser: FrameParser,
}

impl<I> Readings<I>
where
    I: Iterator<Item = u8>,
{
    pub fn new(bytes: I, mode: CombineMode) -> Self {
        Self {
            bytes,
            parser: FrameParser::with_mode(mode),
        }
    }

    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    pub fn into_inner(self) -> (I, FrameParser) {
        (self.bytes, self.parser)
    }
}

impl<I> Iterator for Readings<I>
where
    I: Iterator<Item = u8>,
{
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        for byte in self.bytes.by_ref() {
            if let Some(reading) = self.parser.feed(byte) {
                return Some(reading);
            }
        }
        None
    }
}

pub trait ReadingsExt: Iterator<Item = u8> + Sized {
    fn readings(self) -> Readings<Self> {
        Readings::new(self, CombineMode::default())
    }

    fn readings_with(self, mode: CombineMode) -> Readings<Self> {
        Readings::new(self, mode)
    }
}

impl<I: Iterator<Item = u8>> ReadingsExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let bytes = [b'$', b'M', 1, 0, 0xAA, b'$', b'M', 2, 0, b'$', b'M', 3];
        let readings: Vec<_> = bytes.into_iter().readings().collect();
        assert_eq!(readings, vec![Reading(1), Reading(2)]);
    }

    #[test]
    fn test_lazy_on_infinite_source() {
        let frame = [b'$', b'M', 9, 1];
        let mut readings = frame.into_iter().cycle().readings_with(CombineMode::Full16);
        assert_eq!(readings.next(), Some(Reading(0x0109)));
        assert_eq!(readings.next(), Some(Reading(0x0109)));
        assert_eq!(readings.parser().stats().bytes, 8);
    }

    #[test]
    fn test_partial_frame_left_in_parser() {
        let mut readings = [b'$', b'M', 4].into_iter().readings();
        assert_eq!(readings.next(), None);
        let (_, parser) = readings.into_inner();
        assert_eq!(parser.state(), crate::ParserState::AwaitingHigh { low: 4 });
    }
}
