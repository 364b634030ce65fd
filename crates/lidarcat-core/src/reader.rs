//! Blocking reading iterator over any [`std::io::Read`] byte source.

use lidarcat_decode::{CombineMode, FrameParser, Reading};
use std::io::{BufReader, Read};

use crate::error::Result;
use crate::serial_service::is_transient;

/// Pulls bytes one at a time from `R` and yields each completed reading.
///
/// Timeouts and would-block results are retried, so a serial port opened with
/// a read timeout can be iterated directly. End of stream ends the iterator,
/// and so does the first hard I/O error (after yielding it).
pub struct FrameReader<R> {
    inner: BufReader<R>,
    parser: FrameParser,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R, mode: CombineMode) -> Self {
        Self {
            inner: BufReader::new(reader),
            parser: FrameParser::with_mode(mode),
            done: false,
        }
    }

    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Reading>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    if let Some(reading) = self.parser.feed(byte[0]) {
                        return Some(Ok(reading));
                    }
                }
                Err(e) if is_transient(e.kind()) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, ErrorKind};

    /// Hands out its script one step at a time.
    struct Scripted(Vec<io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            match self.0.remove(0) {
                Ok(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Err(e) => Err(e),
            }
        }
    }

    #[test]
    fn test_reads_until_eof() {
        let bytes = vec![0x41, b'$', b'M', 0x0A, 0x00, b'$', b'M', 0x05, 0xFF, b'$'];
        let readings: Vec<_> = FrameReader::new(Cursor::new(bytes), CombineMode::Legacy)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(readings, vec![Reading(10), Reading(5)]);
    }

    #[test]
    fn test_retries_timeouts() {
        let source = Scripted(vec![
            Ok(vec![b'$', b'M']),
            Err(io::Error::new(ErrorKind::TimedOut, "no data")),
            Err(io::Error::from(ErrorKind::WouldBlock)),
            Ok(vec![0x2C, 0x01]),
        ]);
        let mut reader = FrameReader::new(source, CombineMode::Full16);
        assert_eq!(reader.next().unwrap().unwrap(), Reading(300));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_hard_error_ends_iteration() {
        let source = Scripted(vec![
            Ok(vec![b'$']),
            Err(io::Error::from(ErrorKind::BrokenPipe)),
            Ok(vec![b'M', 1, 0]),
        ]);
        let mut reader = FrameReader::new(source, CombineMode::Legacy);
        assert!(matches!(reader.next(), Some(Err(crate::Error::Io(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_parser_stats_visible() {
        let mut reader = FrameReader::new(Cursor::new(vec![b'$', b'x', b'$', b'M', 3, 0]), CombineMode::Legacy);
        assert_eq!(reader.next().unwrap().unwrap(), Reading(3));
        assert_eq!(reader.parser().stats().resyncs, 1);
    }
}
