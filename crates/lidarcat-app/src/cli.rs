use clap::Parser;
use lidarcat_core::{CombineMode, ReportFormat};
use std::path::PathBuf;

/// Print distance readings from a `$M` framed serial lidar sensor.
#[derive(Debug, Parser)]
#[command(name = "lidarcat", version, about)]
pub struct Cli {
    /// Serial device to read from [default: /dev/ttyUSB0]
    #[arg(short, long)]
    pub port: Option<String>,

    /// Line speed [default: 115200]
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Replay a raw byte capture instead of opening a port ("-" for stdin)
    #[arg(short, long, conflicts_with_all = ["port", "baud"])]
    pub input: Option<PathBuf>,

    /// Output format: text or json [default: text]
    #[arg(short, long)]
    pub format: Option<ReportFormat>,

    /// Payload reassembly: legacy (low byte only) or full16 [default: legacy]
    #[arg(long)]
    pub combine: Option<CombineMode>,

    /// Stop after this many readings
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// List available serial ports and exit
    #[arg(short, long)]
    pub list: bool,

    /// Settings file [default: <config dir>/lidarcat/settings.json]
    #[arg(long)]
    pub config: Option<PathBuf>,
}
