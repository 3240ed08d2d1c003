//! Frame parsing for the line-oriented streaming protocol.
//!
//! A frame is an `event:` line followed by one or more `data:` lines and a
//! terminating blank line. Chunk boundaries are arbitrary relative to frame
//! boundaries; the parser buffers partial lines internally, so feeding the
//! same bytes split at any boundaries yields the same frames.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::error::{WireError, WireResult};

const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// One `event:`/`data:` block of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event tag, if the frame carried an `event:` line.
    pub event: Option<String>,
    /// Newline-joined contents of the `data:` lines.
    pub data: String,
}

impl Frame {
    /// Create a frame with an event tag and data.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}

/// Parser for the frame protocol.
///
/// Stateful per open stream; create one per request and discard it when the
/// stream ends.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
    frames: VecDeque<Frame>,
}

impl FrameParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes into the parser.
    pub fn feed_bytes(&mut self, bytes: &Bytes) -> WireResult<Vec<Frame>> {
        let chunk = String::from_utf8_lossy(bytes);
        self.feed(&chunk)
    }

    /// Feed a chunk of text into the parser, returning frames completed by it.
    pub fn feed(&mut self, s: &str) -> WireResult<Vec<Frame>> {
        self.buffer.push_str(s);

        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(WireError::BufferOverflow);
        }

        Ok(self.drain_complete())
    }

    /// Flush any trailing frame when the stream ends.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = self.drain_complete();

        if !self.buffer.trim().is_empty() {
            if let Some(frame) = parse_frame(self.buffer.trim_end_matches(['\n', '\r'])) {
                self.frames.push_back(frame.clone());
                frames.push(frame);
            }
        }

        self.buffer.clear();
        frames
    }

    /// Pop the next buffered frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    fn drain_complete(&mut self) -> Vec<Frame> {
        let mut parsed = Vec::new();

        while let Some((pos, delimiter_len)) = self.find_boundary() {
            let block = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + delimiter_len..].to_string();
            self.buffer = self.buffer.trim_start_matches(['\n', '\r']).to_string();

            if let Some(frame) = parse_frame(&block) {
                self.frames.push_back(frame.clone());
                parsed.push(frame);
            }
        }

        parsed
    }

    fn find_boundary(&self) -> Option<(usize, usize)> {
        let newline = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let carriage = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));

        match (newline, carriage) {
            (Some(nl), Some(cr)) => Some(if cr.0 < nl.0 { cr } else { nl }),
            (Some(nl), None) => Some(nl),
            (None, Some(cr)) => Some(cr),
            (None, None) => None,
        }
    }
}

fn parse_frame(block: &str) -> Option<Frame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            // Comment line.
            continue;
        }

        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        } else if line == "data" {
            data_lines.push(String::new());
        }
    }

    if event.is_none() && data_lines.is_empty() {
        return None;
    }

    Some(Frame {
        event,
        data: data_lines.join("\n"),
    })
}

pin_project! {
    /// Stream adapter that parses frames from a byte stream.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        parser: FrameParser,
        finished: bool,
    }
}

impl<S, E> FrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    /// Create a frame stream over a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: FrameParser::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = WireResult<Frame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if let Some(frame) = this.parser.next_frame() {
            return Poll::Ready(Some(Ok(frame)));
        }

        if *this.finished {
            return Poll::Ready(None);
        }

        let mut inner = this.inner;
        loop {
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(error) = this.parser.feed_bytes(&bytes) {
                        return Poll::Ready(Some(Err(error)));
                    }
                    if let Some(frame) = this.parser.next_frame() {
                        return Poll::Ready(Some(Ok(frame)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(WireError::Io(std::io::Error::other(e.into())))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.parser.finish();
                    return match this.parser.next_frame() {
                        Some(frame) => Poll::Ready(Some(Ok(frame))),
                        None => Poll::Ready(None),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_frame() {
        let mut parser = FrameParser::new();
        let frames = parser.feed("event: message\ndata: hello\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("message"));
        assert_eq!(frames[0].data, "hello");
    }

    #[test]
    fn test_multiline_data_joined_with_newlines() {
        let mut parser = FrameParser::new();
        let frames = parser
            .feed("event: e\ndata: line1\ndata: line2\n\n")
            .unwrap();
        assert_eq!(frames[0].data, "line1\nline2");
    }

    #[test]
    fn test_comments_ignored() {
        let mut parser = FrameParser::new();
        let frames = parser
            .feed(": keep-alive\nevent: e\ndata: x\n\n")
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn test_partial_frame_buffered_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.feed("event: e\ndata: hel").unwrap().is_empty());
        let frames = parser.feed("lo\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hello");
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let body = "event: a\ndata: one\n\n: comment\nevent: b\ndata: two\ndata: three\n\nevent: c\ndata: {\"k\":\"v\"}\n\n";

        let mut whole = FrameParser::new();
        let mut expected = whole.feed(body).unwrap();
        expected.extend(whole.finish());

        // Split at every single byte boundary.
        for split in 1..body.len() {
            let mut parser = FrameParser::new();
            let mut got = parser.feed(&body[..split]).unwrap();
            got.extend(parser.feed(&body[split..]).unwrap());
            got.extend(parser.finish());
            assert_eq!(got, expected, "split at {split}");
        }

        // One-byte chunks.
        let mut parser = FrameParser::new();
        let mut got = Vec::new();
        for i in 0..body.len() {
            got.extend(parser.feed(&body[i..=i]).unwrap());
        }
        got.extend(parser.finish());
        assert_eq!(got, expected);
    }

    #[rstest::rstest]
    #[case::lf("event: e\ndata: x\n\n", "x")]
    #[case::crlf("event: e\r\ndata: x\r\n\r\n", "x")]
    #[case::no_space("event: e\ndata:x\n\n", "x")]
    #[case::extra_space_kept("event: e\ndata:  padded\n\n", " padded")]
    fn test_data_line_variants(#[case] body: &str, #[case] expected: &str) {
        let mut parser = FrameParser::new();
        let frames = parser.feed(body).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, expected);
    }

    #[test]
    fn test_finish_flushes_trailing_frame() {
        let mut parser = FrameParser::new();
        assert!(parser.feed("event: e\ndata: tail").unwrap().is_empty());
        let frames = parser.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "tail");
    }

    #[tokio::test]
    async fn test_frame_stream_adapter() {
        use futures::stream;

        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from("event: a\ndata: on")),
            Ok(Bytes::from("e\n\nevent: b\ndata: two\n\n")),
        ];
        let mut frames = FrameStream::new(stream::iter(chunks));

        let first = frames.next().await.unwrap().unwrap();
        assert_eq!(first.data, "one");
        let second = frames.next().await.unwrap().unwrap();
        assert_eq!(second.event.as_deref(), Some("b"));
        assert!(frames.next().await.is_none());
    }
}
