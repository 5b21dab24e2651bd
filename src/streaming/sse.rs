//! # SSE Record Decoder
//!
//! Incremental splitter for `data: ...` records separated by a blank line.
//! Used on both sides of the relay: the provider adapters decode upstream
//! chunks with it and the client consumer decodes relay records with it.
//!
//! Bytes are buffered until a full record is present, so a record (or a
//! multi-byte UTF-8 character) split across reads is reassembled before
//! anything is parsed.

use bytes::{Buf, BytesMut};
use tracing::warn;

/// # SSE Decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    /// Where the next delimiter search starts; bytes before it are known
    /// not to contain one.
    scan_from: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes and return the data payload of every
    /// record completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, delimiter_len)) = self.find_delimiter() {
            let record = self.buffer.split_to(end);
            self.buffer.advance(delimiter_len);
            self.scan_from = 0;

            if let Some(data) = parse_record(&record) {
                payloads.push(data);
            }
        }

        payloads
    }

    /// Flush whatever is left once the byte stream has ended. A final record
    /// that lost its trailing blank line is still delivered.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = self.buffer.split();
        self.scan_from = 0;

        if rest.iter().all(|b| b.is_ascii_whitespace()) {
            return Vec::new();
        }
        parse_record(&rest).into_iter().collect()
    }

    /// Number of buffered bytes not yet forming a complete record.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn find_delimiter(&mut self) -> Option<(usize, usize)> {
        let buf = &self.buffer[..];
        let mut i = self.scan_from;
        while i < buf.len() {
            if let Some(first) = line_break_at(buf, i) {
                if let Some(second) = line_break_at(buf, i + first) {
                    return Some((i, first + second));
                }
            }
            i += 1;
        }
        // A delimiter may straddle the next read
        self.scan_from = buf.len().saturating_sub(3);
        None
    }
}

/// Length of the `\n` or `\r\n` line break starting at `i`, if any.
fn line_break_at(buf: &[u8], i: usize) -> Option<usize> {
    match (buf.get(i), buf.get(i + 1)) {
        (Some(b'\n'), _) => Some(1),
        (Some(b'\r'), Some(b'\n')) => Some(2),
        _ => None,
    }
}

/// Extract the data field of one record. Multiple `data:` lines are joined
/// with `\n`; comments and other fields are ignored.
fn parse_record(record: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(record) {
        Ok(text) => text,
        Err(e) => {
            warn!("Skipping SSE record with invalid UTF-8: {}", e);
            return None;
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: {\"content\":\"Hi\"}\n\n"), vec!["{\"content\":\"Hi\"}"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_record_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"cont").is_empty());
        assert!(decoder.push(b"ent\":\"Hi\"}\n").is_empty());
        assert_eq!(decoder.push(b"\ndata: {\"done\":true}\n\n"), vec![
            "{\"content\":\"Hi\"}".to_string(),
            "{\"done\":true}".to_string(),
        ]);
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let record = "data: {\"content\":\"héllo 👋\"}\n\n".as_bytes();
        let split = record.iter().position(|b| *b == 0xF0).unwrap() + 2;

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&record[..split]).is_empty());
        assert_eq!(decoder.push(&record[split..]), vec!["{\"content\":\"héllo 👋\"}"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let input = b"data: one\n\ndata: two\n\n";
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for b in input.iter() {
            out.extend(decoder.push(std::slice::from_ref(b)));
        }
        assert_eq!(out, vec!["one", "two"]);
    }

    #[test]
    fn test_crlf_delimiters() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: one\r\n\r\ndata: two\r\n\r\n"), vec!["one", "two"]);
    }

    #[test]
    fn test_mixed_line_endings_split() {
        let input = b"data: one\n\r\ndata: two\r\n\ndata: three\n\n";

        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(input), vec!["one", "two", "three"]);

        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for b in input.iter() {
            out.extend(decoder.push(std::slice::from_ref(b)));
        }
        assert_eq!(out, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_comments_and_empty_records_skipped() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b": keep-alive\n\nevent: ping\n\ndata: x\n\n"), vec!["x"]);
    }

    #[test]
    fn test_multiple_data_lines_joined() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_record() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]\n").is_empty());
        assert_eq!(decoder.finish(), vec!["[DONE]"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_invalid_utf8_record_skipped() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(b"data: \xff\xfe\n\ndata: ok\n\n");
        assert_eq!(out, vec!["ok"]);
    }
}
