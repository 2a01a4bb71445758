/// One decoded inbound line
///
/// The protocol is 7-bit ASCII; a line that fails to decode is handed
/// to the classifier as `NonAscii` instead of aborting the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    Text(String),
    NonAscii,
}

/// Line codec for the firmware protocol
///
/// Outbound commands are newline-terminated ASCII, always a bare `\n`.
/// Inbound bytes arrive in arbitrary chunks; the codec buffers partial
/// lines and yields one complete line at a time, accepting either `\n`
/// or `\r\n` terminators.
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Frame an outbound command. The protocol never uses `\r\n` on
    /// the host-to-firmware side.
    pub fn encode(text: &str) -> Vec<u8> {
        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text.as_bytes());
        data.push(b'\n');
        data
    }

    /// Feed raw bytes from the link into the decode buffer
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete line out of the buffer, if one is there.
    ///
    /// Strips exactly one trailing `\r\n` or `\n`. Firmware bursts of
    /// several lines in one read are handled by calling this until it
    /// returns `None`.
    pub fn next_line(&mut self) -> Option<DecodedLine> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;

        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop(); // the '\n'
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        if !line.is_ascii() {
            return Some(DecodedLine::NonAscii);
        }

        // Safe: just checked ASCII
        Some(DecodedLine::Text(
            String::from_utf8(line).unwrap_or_default(),
        ))
    }

    /// Number of buffered bytes not yet forming a complete line
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received line, e.g. after a reconnect
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_appends_single_newline() {
        assert_eq!(LineCodec::encode("yMove 5"), b"yMove 5\n");
        assert_eq!(LineCodec::encode(""), b"\n");
    }

    #[test]
    fn test_decode_lf_terminated() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"finished\n");
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("finished".to_string()))
        );
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_decode_crlf_terminated() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"paused\r\n");
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("paused".to_string()))
        );
    }

    #[test]
    fn test_partial_reads_buffer_until_complete() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"fini");
        assert_eq!(codec.next_line(), None);
        assert_eq!(codec.pending_bytes(), 4);
        codec.push_bytes(b"shed\n");
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("finished".to_string()))
        );
    }

    #[test]
    fn test_burst_of_consecutive_lines() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"R1 2\nR1 3\r\nfinished\n");
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("R1 2".to_string()))
        );
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("R1 3".to_string()))
        );
        assert_eq!(
            codec.next_line(),
            Some(DecodedLine::Text("finished".to_string()))
        );
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_only_one_terminator_stripped() {
        let mut codec = LineCodec::new();
        // An embedded '\r' not adjacent to the '\n' stays in the line
        codec.push_bytes(b"a\rb\n");
        assert_eq!(codec.next_line(), Some(DecodedLine::Text("a\rb".to_string())));
    }

    #[test]
    fn test_blank_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"\r\n");
        assert_eq!(codec.next_line(), Some(DecodedLine::Text(String::new())));
    }

    #[test]
    fn test_non_ascii_surfaces_as_marker_not_panic() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&[0xFF, 0xFE, b'\n', b'i', b'd', b'l', b'e', b'\n']);
        assert_eq!(codec.next_line(), Some(DecodedLine::NonAscii));
        // Stream recovers at the next line
        assert_eq!(codec.next_line(), Some(DecodedLine::Text("idle".to_string())));
    }

    proptest! {
        #[test]
        fn prop_encode_decode_round_trip(text in "[ -~]{0,64}") {
            let mut codec = LineCodec::new();
            codec.push_bytes(&LineCodec::encode(&text));
            prop_assert_eq!(codec.next_line(), Some(DecodedLine::Text(text)));
            prop_assert_eq!(codec.next_line(), None);
        }

        #[test]
        fn prop_arbitrary_chunking_preserves_lines(
            lines in proptest::collection::vec("[ -~]{0,16}", 1..8),
            split in 1usize..16,
        ) {
            let mut wire = Vec::new();
            for line in &lines {
                wire.extend_from_slice(&LineCodec::encode(line));
            }

            let mut codec = LineCodec::new();
            let mut decoded = Vec::new();
            for chunk in wire.chunks(split) {
                codec.push_bytes(chunk);
                while let Some(DecodedLine::Text(line)) = codec.next_line() {
                    decoded.push(line);
                }
            }
            prop_assert_eq!(decoded, lines);
        }
    }
}
