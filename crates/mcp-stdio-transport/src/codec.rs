//! The Frame Codec (C2): LSP-style `Content-Length: <N>\r\n\r\n<N bytes>`
//! framing for the stdio transport.
//!
//! No repo in the retrieval pack implements this exact scheme — the
//! teacher's stdio-adjacent code and the rest of the pack frame messages
//! either newline-delimited or length-delimited-without-headers. Written
//! fresh as a `tokio_util::codec::Decoder`/`Encoder` pair, the shape the
//! teacher already reaches for elsewhere (`tokio-util` is part of its
//! dependency stack) when it needs to turn a byte stream into discrete
//! messages.

use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Headers this large without a terminator can only be a misbehaving peer;
/// bail rather than buffer it forever.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Decodes/encodes one JSON-RPC message per frame. Stateful only in that it
/// remembers the `Content-Length` of a header it has already consumed but
/// whose body hasn't fully arrived yet.
#[derive(Debug, Default)]
pub struct FrameCodec {
    expected_len: Option<usize>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Case-insensitive `Content-Length` lookup among the header's `\r\n`-joined
/// lines. Any other header line is accepted and ignored.
fn parse_content_length(header_text: &str) -> Option<usize> {
    header_text.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    })
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            if let Some(len) = self.expected_len {
                if src.len() < len {
                    return Ok(None);
                }
                let body = src.split_to(len);
                self.expected_len = None;
                return String::from_utf8(body.to_vec())
                    .map(Some)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
            }

            let Some(header_end) = find_subslice(src, HEADER_TERMINATOR) else {
                if src.len() > MAX_HEADER_BYTES {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "stdio frame header exceeded 64KiB without a terminator",
                    ));
                }
                return Ok(None);
            };

            let header_bytes = src.split_to(header_end + HEADER_TERMINATOR.len());
            let header_text = String::from_utf8_lossy(&header_bytes[..header_end]).into_owned();

            match parse_content_length(&header_text) {
                Some(len) => self.expected_len = Some(len),
                None => {
                    tracing::warn!(
                        header = %header_text,
                        "stdio frame header missing a valid Content-Length; dropping and resynchronizing"
                    );
                    continue;
                }
            }
        }
    }
}

impl Encoder<String> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        let body = item.as_bytes();
        dst.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        dst.extend_from_slice(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_single_complete_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("Content-Length: 13\r\n\r\n{\"a\":\"bcd\"}\n");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "{\"a\":\"bcd\"}\n");
    }

    #[test]
    fn returns_none_when_body_is_incomplete() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("Content-Length: 20\r\n\r\n{\"partial\":true}");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decodes_across_multiple_chunks() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("Content-Length: 7\r\n");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\r\n{\"a\":");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"1}");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "{\"a\":1}");
    }

    #[test]
    fn header_name_matching_is_case_insensitive() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("CONTENT-LENGTH: 2\r\n\r\n{}");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "{}");
    }

    #[test]
    fn malformed_header_resynchronizes_at_next_terminator() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("Garbage: nope\r\n\r\nContent-Length: 2\r\n\r\n{}");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "{}");
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode("{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}".to_string(), &mut buf)
            .unwrap();
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}");
    }
}
