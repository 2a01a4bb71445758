// Serial module - Serial port access behind the LinkPort seam
pub mod port;

pub use port::{LinkPort, PortFactory, SerialLinkPort, SerialPortFactory};
