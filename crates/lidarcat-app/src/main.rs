mod cli;
mod settings;

use anyhow::{bail, Context, Result};
use clap::Parser;
use lidarcat_core::{FrameReader, ParserStats, Reading, SerialEvent, SerialService};
use log::{info, warn};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

use cli::Cli;
use settings::{RunOptions, Settings};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.list {
        return list_ports();
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let opts = RunOptions::resolve(&cli, &settings);

    let stdout = io::stdout();
    let mut printer = Printer::new(stdout.lock(), &opts);

    match &cli.input {
        Some(path) => replay(path, &opts, &mut printer),
        None => stream_serial(&opts, &mut printer),
    }
}

fn list_ports() -> Result<()> {
    let ports = SerialService::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

/// Blocking path: run a recorded capture through the reader.
fn replay(path: &Path, opts: &RunOptions, printer: &mut Printer<impl Write>) -> Result<()> {
    let source: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path).with_context(|| format!("opening capture {}", path.display()))?)
    };

    let mut reader = FrameReader::new(source, opts.combine);
    for reading in reader.by_ref() {
        if !printer.emit(reading?)? {
            break;
        }
    }
    info!("replay finished: {}", stats_json(&reader.parser().stats()));
    Ok(())
}

/// Polling path: the serial service decodes on its own thread.
fn stream_serial(opts: &RunOptions, printer: &mut Printer<impl Write>) -> Result<()> {
    let service = SerialService::open(&opts.serial, opts.combine)
        .context("Ensure the port exists and is not in use by another application")?;

    while let Ok(event) = service.events().recv() {
        match event {
            SerialEvent::Opened(port) => info!("listening on {port}"),
            SerialEvent::Reading(reading) => {
                if !printer.emit(reading)? {
                    service.close();
                    break;
                }
            }
            SerialEvent::Error(e) => bail!("serial read failed on {}: {e}", service.source()),
            SerialEvent::Closed => {
                warn!("{} closed", service.source());
                break;
            }
        }
    }
    info!("stream finished: {}", stats_json(&service.stats()));
    Ok(())
}

fn stats_json(stats: &ParserStats) -> String {
    serde_json::to_string(stats).unwrap_or_else(|_| format!("{stats:?}"))
}

/// Writes readings and tracks the `--count` limit.
struct Printer<W> {
    out: W,
    opts: RunOptions,
    emitted: u64,
}

impl<W: Write> Printer<W> {
    fn new(out: W, opts: &RunOptions) -> Self {
        Self {
            out,
            opts: opts.clone(),
            emitted: 0,
        }
    }

    fn satisfied(&self) -> bool {
        self.opts.count.is_some_and(|limit| self.emitted >= limit)
    }

    /// Returns `false` once no more readings are wanted.
    fn emit(&mut self, reading: Reading) -> Result<bool> {
        if self.satisfied() {
            return Ok(false);
        }
        match self.opts.format.write_line(&mut self.out, reading) {
            Ok(()) => {}
            // downstream pipe closed, e.g. `lidarcat | head`
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(false),
            Err(e) => return Err(e).context("writing reading to stdout"),
        }
        self.emitted += 1;
        Ok(!self.satisfied())
    }
}
