use serialport::{ClearBuffer, SerialPort};
use std::{
    io::{self, Read},
    time::Duration,
};
use symbridge_core::{Link, LinkError, LinkOpener};

/// Opens the configured serial device; every attempt starts from scratch.
pub struct SerialOpener {
    path: String,
    baud: u32,
    timeout: Duration,
}

impl SerialOpener {
    pub fn new(path: &str, baud: u32, timeout: Duration) -> Self {
        Self {
            path: path.to_string(),
            baud,
            timeout,
        }
    }
}

impl LinkOpener for SerialOpener {
    type Link = SerialLink;

    fn target(&self) -> String {
        format!("{} @ {}", self.path, self.baud)
    }

    fn open(&mut self) -> Result<SerialLink, LinkError> {
        serialport::new(&self.path, self.baud)
            .timeout(self.timeout)
            .open()
            .map(|port| SerialLink { port })
            .map_err(|err| LinkError::Unavailable(err.to_string()))
    }
}

/// The port closes when this is dropped.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Link for SerialLink {
    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
