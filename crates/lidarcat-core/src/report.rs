use lidarcat_decode::Reading;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Console representation of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `LIDAR Sensor Distance : <value> cm`
    #[default]
    Text,
    /// `{"distance_cm":<value>}`
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format `{other}` (expected text or json)")),
        }
    }
}

#[derive(Serialize)]
struct JsonLine {
    distance_cm: Reading,
}

impl ReportFormat {
    pub fn render(&self, reading: Reading) -> String {
        match self {
            Self::Text => format!("LIDAR Sensor Distance : {reading}"),
            Self::Json => serde_json::to_string(&JsonLine { distance_cm: reading })
                .unwrap_or_else(|_| format!("{{\"distance_cm\":{}}}", reading.distance_cm())),
        }
    }

    /// Write one line for `reading` and flush, so piped consumers see it immediately.
    pub fn write_line<W: Write>(&self, out: &mut W, reading: Reading) -> io::Result<()> {
        writeln!(out, "{}", self.render(reading))?;
        out.flush()
    }
}
