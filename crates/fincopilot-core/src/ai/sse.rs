//! Server-sent events decoding for streamed chat completions
//!
//! The body arrives in arbitrary network chunks. Lines are buffered as raw
//! bytes so a multi-byte character split across chunks (₹ is three bytes)
//! is only decoded once the line is complete.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use super::TextStream;
use crate::error::{Error, Result};

/// One meaningful SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    Data(String),
    Done,
}

/// Incremental line splitter
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk, returning every event completed by it
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline
    pub(crate) fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);

    // Comments (": keep-alive"), event names and ids carry no text
    let data = line.strip_prefix("data:")?.trim_start();
    match data {
        "" => None,
        "[DONE]" => Some(SseEvent::Done),
        _ => Some(SseEvent::Data(data.to_string())),
    }
}

/// Streamed chat completion chunk
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the text fragment out of one `data:` payload
///
/// Role-only and finish-reason chunks carry no content and yield `None`.
pub(crate) fn parse_delta(payload: &str) -> Result<Option<String>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;

    if let Some(error) = chunk.error {
        return Err(Error::Ai(format!("Upstream stream error: {}", error)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

struct RelayState<B, E> {
    body: BoxStream<'static, std::result::Result<B, E>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

/// Turn a raw SSE byte stream into a stream of text fragments
///
/// Ends on `data: [DONE]` or end of body, whichever comes first. The first
/// error ends the stream after being yielded.
pub(crate) fn text_stream<S, B, E>(body: S) -> TextStream
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = RelayState {
        body: body.boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                match event {
                    SseEvent::Done => return None,
                    SseEvent::Data(payload) => match parse_delta(&payload) {
                        Ok(Some(text)) => return Some((Ok(text), st)),
                        Ok(None) => continue,
                        Err(e) => {
                            st.pending.clear();
                            st.finished = true;
                            return Some((Err(e), st));
                        }
                    },
                }
            }

            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.finished = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn content_line(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
        )
    }

    fn byte_chunks(parts: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Vec<u8>>> {
        stream::iter(parts.into_iter().map(Ok))
    }

    #[test]
    fn test_decoder_splits_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        let events = decoder.push(b":1}\n\ndata: [DONE]\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"a\":1}".to_string()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_decoder_ignores_comments_and_crlf() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_string())]);
    }

    #[test]
    fn test_decoder_finish_flushes_tail() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Data("tail".to_string())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_parse_delta() {
        let payload = r#"{"id":"x","choices":[{"index":0,"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_delta(payload).unwrap(), Some("Hello".to_string()));

        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta(role_only).unwrap(), None);

        let empty = r#"{"choices":[{"index":0,"delta":{"content":""},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_delta(empty).unwrap(), None);

        let no_choices = r#"{"choices":[],"x_groq":{"usage":{}}}"#;
        assert_eq!(parse_delta(no_choices).unwrap(), None);

        assert!(parse_delta("not json").is_err());
        assert!(matches!(
            parse_delta(r#"{"error":{"message":"rate limited"}}"#),
            Err(Error::Ai(_))
        ));
    }

    #[tokio::test]
    async fn test_text_stream_in_order() {
        let body = format!(
            "{}{}{}data: [DONE]\n\n",
            content_line("Save "),
            content_line("₹500 "),
            content_line("monthly.")
        );
        let chunks: Vec<String> = text_stream(byte_chunks(vec![body.into_bytes()]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec!["Save ", "₹500 ", "monthly."]);
    }

    #[tokio::test]
    async fn test_text_stream_reassembles_split_chunks() {
        let body = format!("{}{}", content_line("₹1,000"), content_line(" saved"));
        let bytes = body.into_bytes();
        // Split one byte at a time, which also splits the ₹ sign
        let parts: Vec<Vec<u8>> = bytes.iter().map(|b| vec![*b]).collect();

        let chunks: Vec<String> = text_stream(byte_chunks(parts)).try_collect().await.unwrap();
        assert_eq!(chunks, vec!["₹1,000", " saved"]);
    }

    #[tokio::test]
    async fn test_text_stream_stops_at_done() {
        let body = format!(
            "{}data: [DONE]\n\n{}",
            content_line("before"),
            content_line("after")
        );
        let chunks: Vec<String> = text_stream(byte_chunks(vec![body.into_bytes()]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec!["before"]);
    }

    #[tokio::test]
    async fn test_text_stream_without_done() {
        let body = content_line("only");
        let chunks: Vec<String> = text_stream(byte_chunks(vec![body.into_bytes()]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec!["only"]);
    }

    #[tokio::test]
    async fn test_text_stream_surfaces_body_error() {
        let parts: Vec<Result<Vec<u8>>> = vec![
            Ok(content_line("partial").into_bytes()),
            Err(Error::Ai("connection reset".into())),
            Ok(content_line("never").into_bytes()),
        ];
        let mut stream = text_stream(stream::iter(parts));

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
