//! Core functionalities: serial transport, blocking frame reader, report output.

pub mod error;
pub mod serial_service;
pub mod reader;
pub mod report;

pub use error::{Error, Result};
pub use serial_service::{SerialConfig, SerialEvent, SerialService, PortInfo, PortKind};
pub use reader::FrameReader;
pub use report::ReportFormat;

pub use lidarcat_decode::{CombineMode, FrameParser, ParserState, ParserStats, Reading};
