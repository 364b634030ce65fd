use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("unable to list serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("unable to configure serial port: {0}")]
    Configure(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("serial reader thread is no longer running")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
