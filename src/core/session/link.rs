use tracing::{info, warn};

use crate::core::protocol::codec::{DecodedLine, LineCodec};
use crate::domain::error::{WeldLinkError, WeldLinkResult};
use crate::infrastructure::serial::port::LinkPort;

/// Exclusive owner of the one link handle per process
///
/// Created closed at engine construction; opened and closed only
/// through the methods here; torn down at process shutdown. The
/// `safe_disconnect` / `was_open_last_tick` pair lets the poll loop
/// report an unexpected loss exactly once per edge.
pub struct Session {
    port: Option<Box<dyn LinkPort>>,
    codec: LineCodec,
    port_name: String,
    is_open: bool,
    safe_disconnect: bool,
    was_open_last_tick: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            port: None,
            codec: LineCodec::new(),
            port_name: String::new(),
            is_open: false,
            safe_disconnect: false,
            was_open_last_tick: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Take ownership of a freshly opened port
    pub fn attach(&mut self, port_name: &str, port: Box<dyn LinkPort>) {
        self.codec.clear();
        self.port = Some(port);
        self.port_name = port_name.to_string();
        self.is_open = true;
        self.safe_disconnect = false;
        self.was_open_last_tick = true;
        info!(port = port_name, "session opened");
    }

    /// Close the link. Idempotent; a user-initiated close is "safe"
    /// and must never surface as a connection loss.
    pub fn close(&mut self, user_initiated: bool) {
        if self.is_open {
            info!(port = %self.port_name, user_initiated, "session closed");
        }
        self.port = None;
        self.is_open = false;
        self.safe_disconnect = user_initiated;
    }

    /// Edge-triggered loss detection, called once per poll cycle.
    /// Returns `Some(unexpected)` exactly once after each close.
    pub fn take_loss_edge(&mut self) -> Option<bool> {
        if self.is_open || !self.was_open_last_tick {
            return None;
        }
        self.was_open_last_tick = false;
        Some(!self.safe_disconnect)
    }

    /// Frame and write one outbound command line.
    ///
    /// A failed write is an unexpected loss: the session closes itself
    /// and the next poll cycle reports it.
    pub fn send_line(&mut self, text: &str) -> WeldLinkResult<()> {
        if !self.is_open {
            return Err(WeldLinkError::WriteFailed {
                message: "session is closed".to_string(),
            });
        }

        let data = LineCodec::encode(text);
        let port = self.port.as_mut().ok_or_else(|| WeldLinkError::WriteFailed {
            message: "session has no port".to_string(),
        })?;

        if let Err(e) = port.write_all(&data) {
            warn!(error = %e, "write failed, closing session");
            self.close(false);
            return Err(WeldLinkError::WriteFailed {
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Non-blocking read of the next complete status line.
    ///
    /// Returns `None` when no full line is buffered. A read error is
    /// treated as link loss: the session closes itself and the poll
    /// loop picks up the edge.
    pub fn try_read_line(&mut self) -> Option<DecodedLine> {
        if !self.is_open {
            return None;
        }

        loop {
            if let Some(line) = self.codec.next_line() {
                return Some(line);
            }

            let port = self.port.as_mut()?;
            let mut buf = [0u8; 256];
            match port.read_available(&mut buf) {
                Ok(0) => return None,
                Ok(n) => self.codec.push_bytes(&buf[..n]),
                Err(e) => {
                    warn!(error = %e, "read failed, closing session");
                    self.close(false);
                    return None;
                }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// In-memory wire shared between a test and the port it handed out
    #[derive(Default)]
    struct MockWire {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        fail_writes: bool,
        fail_reads: bool,
    }

    struct MockPort {
        wire: Arc<Mutex<MockWire>>,
    }

    impl LinkPort for MockPort {
        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            let mut wire = self.wire.lock().unwrap();
            if wire.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire cut"));
            }
            wire.outbound.extend_from_slice(data);
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut wire = self.wire.lock().unwrap();
            if wire.fail_reads {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire cut"));
            }
            let mut n = 0;
            while n < buf.len() {
                match wire.inbound.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    fn open_session() -> (Session, Arc<Mutex<MockWire>>) {
        let wire = Arc::new(Mutex::new(MockWire::default()));
        let mut session = Session::new();
        session.attach("COM5", Box::new(MockPort { wire: Arc::clone(&wire) }));
        (session, wire)
    }

    #[test]
    fn test_new_session_is_closed() {
        let mut session = Session::new();
        assert!(!session.is_open());
        assert_eq!(session.take_loss_edge(), None);
    }

    #[test]
    fn test_attach_sets_flags() {
        let (mut session, _wire) = open_session();
        assert!(session.is_open());
        assert_eq!(session.port_name(), "COM5");
        assert_eq!(session.take_loss_edge(), None);
    }

    #[test]
    fn test_send_line_frames_with_newline() {
        let (mut session, wire) = open_session();
        session.send_line("yMove 5").unwrap();
        assert_eq!(wire.lock().unwrap().outbound, b"yMove 5\n");
    }

    #[test]
    fn test_send_on_closed_session_fails_without_write() {
        let (mut session, wire) = open_session();
        session.close(true);
        let result = session.send_line("stop");
        assert!(matches!(result, Err(WeldLinkError::WriteFailed { .. })));
        assert!(wire.lock().unwrap().outbound.is_empty());
    }

    #[test]
    fn test_write_failure_closes_unsafely() {
        let (mut session, wire) = open_session();
        wire.lock().unwrap().fail_writes = true;

        let result = session.send_line("pause");
        assert!(matches!(result, Err(WeldLinkError::WriteFailed { .. })));
        assert!(!session.is_open());
        // Exactly one unexpected loss edge
        assert_eq!(session.take_loss_edge(), Some(true));
        assert_eq!(session.take_loss_edge(), None);
    }

    #[test]
    fn test_user_close_is_safe_edge() {
        let (mut session, _wire) = open_session();
        session.close(true);
        assert_eq!(session.take_loss_edge(), Some(false));
        assert_eq!(session.take_loss_edge(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut session, _wire) = open_session();
        session.close(false);
        session.close(false);
        assert_eq!(session.take_loss_edge(), Some(true));
        assert_eq!(session.take_loss_edge(), None);
    }

    #[test]
    fn test_read_drains_burst() {
        let (mut session, wire) = open_session();
        wire.lock()
            .unwrap()
            .inbound
            .extend(b"R1 2\nfinished\n".iter());

        assert_eq!(
            session.try_read_line(),
            Some(DecodedLine::Text("R1 2".to_string()))
        );
        assert_eq!(
            session.try_read_line(),
            Some(DecodedLine::Text("finished".to_string()))
        );
        assert_eq!(session.try_read_line(), None);
    }

    #[test]
    fn test_read_failure_closes_unsafely() {
        let (mut session, wire) = open_session();
        wire.lock().unwrap().fail_reads = true;

        assert_eq!(session.try_read_line(), None);
        assert!(!session.is_open());
        assert_eq!(session.take_loss_edge(), Some(true));
    }

    #[test]
    fn test_reattach_clears_stale_partial_line() {
        let (mut session, wire) = open_session();
        wire.lock().unwrap().inbound.extend(b"fini".iter());
        assert_eq!(session.try_read_line(), None);

        let wire2 = Arc::new(Mutex::new(MockWire::default()));
        session.attach("COM6", Box::new(MockPort { wire: Arc::clone(&wire2) }));
        wire2.lock().unwrap().inbound.extend(b"idle\n".iter());
        assert_eq!(
            session.try_read_line(),
            Some(DecodedLine::Text("idle".to_string()))
        );
    }
}
