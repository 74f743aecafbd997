use std::fmt::{self, Display, Formatter};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chunks(err) => write!(f, "body stream failed: {err}"),
            Error::InvalidUtf8 => f.write_str("event stream is not valid UTF-8"),
        }
    }
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Lines may end with `\n` or `\r\n`. Comment lines and fields other than
/// `data` are skipped. Several `data` lines in one event are joined with
/// `\n`. An event is only delivered once its terminating blank line has
/// arrived, so a stream cut in the middle of an event drops that event.
pub struct Sse {
    buf: Vec<u8>,
    data: Option<String>,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            data: None,
            chunks,
            eof: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(line) = self.take_line()? {
                if line.is_empty() {
                    if let Some(data) = self.data.take() {
                        return Ok(Some(data));
                    }
                    continue;
                }
                if line.starts_with(':') {
                    continue;
                }

                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line.as_str(), ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut self.data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => self.data = Some(value.to_owned()),
                }
            }

            if self.eof {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }

    /// Pops one complete line (without its terminator) from the buffer.
    ///
    /// Decoding happens per line, so a multi-byte character split across
    /// two chunks is fine.
    fn take_line(&mut self) -> Result<Option<String>, Error> {
        let Some(pos) = self.buf.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| Error::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(slices: &[&'static [u8]]) -> Result<Vec<String>, Error> {
        let mut sse = Sse::new(Chunks::from_slices(slices));
        let mut events = vec![];
        while let Some(event) = sse.next_event().await? {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_normal_events() {
        let events = collect(&[b"data: hello\n\ndata: bye\n\n"]).await;
        assert_eq!(events.unwrap(), ["hello", "bye"]);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let events = collect(&[b"da", b"ta:", b" hel", b"lo\r", b"\n\r\n"]).await;
        assert_eq!(events.unwrap(), ["hello"]);

        // "é" is two bytes, split between chunks.
        let events = collect(&[b"data: caf\xc3", b"\xa9\n\n"]).await;
        assert_eq!(events.unwrap(), ["café"]);
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let events = collect(&[
            b": keep-alive\n\n",
            b"event: chunk\nid: 7\ndata: {\"a\":1}\n\n",
            b"data:no-space\n\n",
        ])
        .await;
        assert_eq!(events.unwrap(), ["{\"a\":1}", "no-space"]);
    }

    #[tokio::test]
    async fn test_multi_line_data() {
        let events = collect(&[b"data: first\ndata: second\n\n"]).await;
        assert_eq!(events.unwrap(), ["first\nsecond"]);
    }

    #[tokio::test]
    async fn test_truncated_event_is_dropped() {
        let events = collect(&[b"data: complete\n\n", b"data: cut"]).await;
        assert_eq!(events.unwrap(), ["complete"]);

        let events = collect(&[b"data: hello\n", b"data: bye\n"]).await;
        assert!(events.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let err = collect(&[b"data: \xff\xfe\n\n"]).await.unwrap_err();
        assert_eq!(err, Error::InvalidUtf8);
    }
}
