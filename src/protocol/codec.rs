use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::ProtocolError;

/// Maximum accepted line length in bytes, excluding the terminator.
///
/// Anything longer without a newline is rejected as a protocol violation
/// and discarded up to the next newline.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Codec for newline-terminated UTF-8 text frames.
///
/// Decoding yields complete lines without the terminator, normalizing CRLF
/// to a bare newline. Encoding appends a trailing `\n` when the outgoing
/// message lacks one, so every frame on the wire is properly terminated.
/// The protocol is symmetric: clients and the server share this codec.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Next offset to scan for a newline, so repeated decode calls over a
    /// growing buffer stay linear.
    next_index: usize,
    /// Set after an oversized frame; input is dropped until the next
    /// newline resynchronizes the stream.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_line(&mut self, src: &mut BytesMut, newline_at: usize) -> Result<String, ProtocolError> {
        let mut line = src.split_to(newline_at + 1);
        self.next_index = 0;

        // Drop the newline, then a carriage return if the peer sent CRLF.
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        String::from_utf8(line.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            if self.discarding {
                match src.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        src.advance(pos + 1);
                        self.discarding = false;
                        self.next_index = 0;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
                continue;
            }

            match src[self.next_index..].iter().position(|&b| b == b'\n') {
                Some(offset) => {
                    let line = self.take_line(src, self.next_index + offset)?;
                    return Ok(Some(line));
                }
                None if src.len() > MAX_LINE_LENGTH => {
                    self.discarding = true;
                    return Err(ProtocolError::LineTooLong);
                }
                None => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() || self.discarding => Ok(None),
            None => {
                // The stream closed mid-line; surface what was buffered.
                let len = src.len();
                src.put_u8(b'\n');
                let line = self.take_line(src, len)?;
                Ok(Some(line))
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        if !line.ends_with('\n') {
            dst.put_u8(b'\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, src: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = codec.decode(src) {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_decode_splits_on_newlines() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"hello\nworld\npartial"[..]);
        assert_eq!(decode_all(&mut codec, &mut src), ["hello", "world"]);
        assert_eq!(src, b"partial"[..]);
    }

    #[test]
    fn test_decode_normalizes_crlf() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"hello\r\nworld\n"[..]);
        assert_eq!(decode_all(&mut codec, &mut src), ["hello", "world"]);
    }

    #[test]
    fn test_decode_yields_empty_frames() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"\n\r\n"[..]);
        assert_eq!(decode_all(&mut codec, &mut src), ["", ""]);
    }

    #[test]
    fn test_decode_incremental_reads() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"hel"[..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"lo\n");
        assert_eq!(codec.decode(&mut src).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_oversized_line_errors_then_resynchronizes() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::new();
        src.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH + 1]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtocolError::LineTooLong)
        ));

        // The rest of the oversized line is dropped up to its newline.
        src.extend_from_slice(b"aaaa\nnext\n");
        assert_eq!(codec.decode(&mut src).unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn test_invalid_utf8_poisons_only_that_frame() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"\xff\xfe\nok\n"[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtocolError::InvalidUtf8)
        ));
        assert_eq!(codec.decode(&mut src).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_decode_eof_flushes_unterminated_line() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"tail"[..]);
        assert_eq!(codec.decode_eof(&mut src).unwrap().as_deref(), Some("tail"));
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn test_encode_ensures_trailing_newline() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();
        codec.encode("hello".to_string(), &mut dst).unwrap();
        codec.encode("bye\n".to_string(), &mut dst).unwrap();
        assert_eq!(dst, b"hello\nbye\n"[..]);
    }
}
