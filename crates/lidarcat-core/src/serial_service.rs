use crossbeam_channel::{unbounded, Receiver, Sender};
use lidarcat_decode::{CombineMode, FrameParser, ParserStats, Reading};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// How a port is attached. USB bridges keep their ids so a sensor adapter can
/// be picked out of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        product: Option<String>,
    },
    Pci,
    Bluetooth,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: PortKind,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let kind = match info.port_type {
            SerialPortType::UsbPort(usb) => PortKind::Usb {
                vid: usb.vid,
                pid: usb.pid,
                product: usb.product,
            },
            SerialPortType::PciPort => PortKind::Pci,
            SerialPortType::BluetoothPort => PortKind::Bluetooth,
            SerialPortType::Unknown => PortKind::Unknown,
        };
        Self {
            name: info.port_name,
            kind,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PortKind::Usb { vid, pid, product } => {
                write!(f, "{} [USB {vid:04X}:{pid:04X}]", self.name)?;
                if let Some(product) = product {
                    write!(f, " {product}")?;
                }
                Ok(())
            }
            PortKind::Pci => write!(f, "{} [PCI]", self.name),
            PortKind::Bluetooth => write!(f, "{} [Bluetooth]", self.name),
            PortKind::Unknown => write!(f, "{}", self.name),
        }
    }
}

/// Line settings for the sensor. Defaults are 115200 8N1, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub timeout: Duration,
}

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            timeout: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SerialEvent {
    Opened(String),
    Reading(Reading),
    Error(String),
    Closed,
}

enum Command {
    Reset,
    Close,
}

/// Background reader feeding a [`FrameParser`] from a byte source.
///
/// The parser lives on the reader thread. Consumers poll [`events`](Self::events)
/// for readings.
pub struct SerialService {
    source: String,
    tx_cmd: Sender<Command>,
    rx_evt: Receiver<SerialEvent>,
    stats: Arc<Mutex<ParserStats>>,
}

impl SerialService {
    pub fn list_ports() -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports().map_err(Error::Enumerate)?;
        Ok(ports.into_iter().map(PortInfo::from).collect())
    }

    /// Open and configure the port, then start reading on a background thread.
    ///
    /// Failing to open or configure the port is reported here, before any
    /// thread is started.
    pub fn open(cfg: &SerialConfig, mode: CombineMode) -> Result<Self> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.timeout)
            .open()
            .map_err(|source| Error::Open {
                port: cfg.port_name.clone(),
                source,
            })?;
        // Discard whatever queued up before we were listening.
        port.clear(serialport::ClearBuffer::Input)?;
        info!(
            "opened {} at {} baud ({:?} data bits, parity {:?}, stop bits {:?})",
            cfg.port_name, cfg.baud_rate, cfg.data_bits, cfg.parity, cfg.stop_bits
        );
        Self::spawn(cfg.port_name.clone(), port, mode)
    }

    /// Start the reader thread on an arbitrary byte source.
    ///
    /// `Ok(0)` from the source is treated as end of stream.
    pub fn spawn<R>(source: String, reader: R, mode: CombineMode) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let (tx_evt, rx_evt) = unbounded::<SerialEvent>();
        let stats = Arc::new(Mutex::new(ParserStats::default()));

        let _ = tx_evt.send(SerialEvent::Opened(source.clone()));
        let worker = Worker {
            parser: FrameParser::with_mode(mode),
            tx_evt,
            rx_cmd,
            stats: Arc::clone(&stats),
        };
        std::thread::Builder::new()
            .name(format!("lidarcat-rx:{source}"))
            .spawn(move || worker.run(reader))?;

        Ok(Self {
            source,
            tx_cmd,
            rx_evt,
            stats,
        })
    }

    /// Drop any partially received frame on the reader thread.
    pub fn reset_parser(&self) -> Result<()> {
        self.tx_cmd
            .send(Command::Reset)
            .map_err(|_| Error::Disconnected)
    }

    pub fn close(&self) {
        let _ = self.tx_cmd.send(Command::Close);
    }

    pub fn events(&self) -> &Receiver<SerialEvent> {
        &self.rx_evt
    }

    pub fn stats(&self) -> ParserStats {
        *self.stats.lock()
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Drop for SerialService {
    fn drop(&mut self) {
        self.close();
    }
}

struct Worker {
    parser: FrameParser,
    tx_evt: Sender<SerialEvent>,
    rx_cmd: Receiver<Command>,
    stats: Arc<Mutex<ParserStats>>,
}

impl Worker {
    fn run<R: Read>(mut self, mut reader: R) {
        let mut buf = [0u8; 256];
        loop {
            while let Ok(cmd) = self.rx_cmd.try_recv() {
                match cmd {
                    Command::Reset => {
                        debug!("parser reset requested");
                        self.parser.reset();
                    }
                    Command::Close => {
                        self.finish();
                        return;
                    }
                }
            }

            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("byte source reached end of stream");
                    self.finish();
                    return;
                }
                Ok(n) => {
                    trace!("rx {}", hex::encode(&buf[..n]));
                    let resyncs_before = self.parser.stats().resyncs;
                    for &byte in &buf[..n] {
                        if let Some(reading) = self.parser.feed(byte) {
                            if self.tx_evt.send(SerialEvent::Reading(reading)).is_err() {
                                // nobody is listening anymore
                                return;
                            }
                        }
                    }
                    let stats = self.parser.stats();
                    if stats.resyncs > resyncs_before {
                        debug!("lost sync {} time(s) in chunk", stats.resyncs - resyncs_before);
                    }
                    *self.stats.lock() = stats;
                }
                Err(e) if is_transient(e.kind()) => {}
                Err(e) => {
                    warn!("serial read failed: {e}");
                    let _ = self.tx_evt.send(SerialEvent::Error(e.to_string()));
                    self.finish();
                    return;
                }
            }
        }
    }

    fn finish(&self) {
        *self.stats.lock() = self.parser.stats();
        info!("reader stopped after {} frame(s)", self.parser.stats().frames);
        let _ = self.tx_evt.send(SerialEvent::Closed);
    }
}

/// Read outcomes that only mean "no bytes available yet".
pub(crate) fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
