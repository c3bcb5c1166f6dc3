//! Newline framing shared by the server and the client.

use tokio_util::codec::LinesCodec;

/// Longest accepted line, terminator excluded (64 KiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Line codec capped at `max_length` bytes.
///
/// Decoding strips the `\n` and any `\r` before it. A longer line
/// surfaces as `LinesCodecError::MaxLineLengthExceeded`.
pub fn line_codec(max_length: usize) -> LinesCodec {
    LinesCodec::new_with_max_length(max_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::bytes::BytesMut;
    use tokio_util::codec::{Decoder, LinesCodecError};

    #[test]
    fn test_decodes_crlf_and_lf_lines() {
        let mut codec = line_codec(DEFAULT_MAX_LINE_LENGTH);
        let mut buf = BytesMut::from("one\r\ntwo\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("one"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("two"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let mut codec = line_codec(DEFAULT_MAX_LINE_LENGTH);
        let mut buf = BytesMut::from("no newline yet");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_over_long_line_is_an_error() {
        let mut codec = line_codec(4);
        let mut buf = BytesMut::from("toolong\n");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(LinesCodecError::MaxLineLengthExceeded)
        ));
    }
}
