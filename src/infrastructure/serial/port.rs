use crate::domain::error::{WeldLinkError, WeldLinkResult};
use serialport::SerialPort;
use std::io;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Byte-stream access to an open link
///
/// The session engine talks to the link through this seam so tests can
/// substitute an in-memory wire for a real serial port.
pub trait LinkPort: Send {
    /// Write all bytes or fail
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is currently available without blocking.
    /// `Ok(0)` means nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens ports and enumerates what the host offers
pub trait PortFactory: Send + Sync {
    fn open(&self, port_name: &str, baud_rate: u32) -> WeldLinkResult<Box<dyn LinkPort>>;

    /// Pure query, no side effects; re-queried on every refresh rather
    /// than cached.
    fn list_ports(&self) -> WeldLinkResult<Vec<String>>;
}

/// Real serial port behind the `LinkPort` seam
pub struct SerialLinkPort {
    port: Box<dyn SerialPort>,
}

impl LinkPort for SerialLinkPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.port.bytes_to_read()? == 0 {
            return Ok(0);
        }
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Factory for real serial ports via the serialport crate
#[derive(Debug, Clone, Default)]
pub struct SerialPortFactory;

impl PortFactory for SerialPortFactory {
    fn open(&self, port_name: &str, baud_rate: u32) -> WeldLinkResult<Box<dyn LinkPort>> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| WeldLinkError::PortUnavailable {
                message: format!("failed to open '{}': {}", port_name, e),
            })?;

        info!(port = port_name, baud_rate, "serial port opened");
        Ok(Box::new(SerialLinkPort { port }))
    }

    fn list_ports(&self) -> WeldLinkResult<Vec<String>> {
        let ports = serialport::available_ports().map_err(|e| WeldLinkError::PortUnavailable {
            message: format!("failed to enumerate ports: {}", e),
        })?;

        debug!(count = ports.len(), "enumerated serial ports");
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}
