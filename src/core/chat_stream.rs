//! Streaming transport for chat responses.
//!
//! The Ultron streaming endpoints return a chunked `text/plain` body. A
//! spawned task reads the body and forwards decoded text over an unbounded
//! channel, tagged with a stream id so state updates can ignore chunks from
//! a superseded stream. Cancellation is cooperative via the token.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::StreamChatRequest;
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Incremental UTF-8 decoder for byte chunks that may split multi-byte
/// sequences. Valid text is returned immediately; an incomplete trailing
/// sequence is carried into the next call. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid_len = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.carry[..valid_len]));
                    match e.error_len() {
                        Some(invalid_len) => {
                            out.push('\u{FFFD}');
                            self.carry.drain(..valid_len + invalid_len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes
                            self.carry.drain(..valid_len);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is still buffered when the stream ends. A trailing
    /// incomplete sequence can no longer complete and decodes lossily.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            return String::new();
        }
        let remainder = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        remainder
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub endpoint: String,
    pub request: StreamChatRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct StreamDispatcher {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl StreamDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<(StreamMessage, u64)>) -> Self {
        Self { tx }
    }

    pub fn spawn(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                endpoint,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = async {
                    let stream_url = construct_api_url(&base_url, &endpoint);
                    debug!(%stream_url, stream_id, "starting chat stream");

                    match client
                        .post(stream_url)
                        .header("Content-Type", "application/json")
                        .json(&request)
                        .send()
                        .await
                    {
                        Ok(response) => {
                            if !response.status().is_success() {
                                let status = response.status();
                                let error_text = response
                                    .text()
                                    .await
                                    .unwrap_or_else(|_| "<no body>".to_string());
                                warn!(stream_id, %status, "stream request rejected");
                                let _ = tx_clone.send((
                                    StreamMessage::Error(format!(
                                        "API error ({status}): {}",
                                        error_text.trim()
                                    )),
                                    stream_id,
                                ));
                                let _ = tx_clone.send((StreamMessage::End, stream_id));
                                return;
                            }

                            let mut stream = response.bytes_stream();
                            let mut decoder = Utf8ChunkDecoder::new();

                            while let Some(chunk) = stream.next().await {
                                if cancel_token.is_cancelled() {
                                    return;
                                }

                                match chunk {
                                    Ok(chunk_bytes) => {
                                        let text = decoder.push(&chunk_bytes);
                                        if !text.is_empty() {
                                            let _ = tx_clone
                                                .send((StreamMessage::Chunk(text), stream_id));
                                        }
                                    }
                                    Err(e) => {
                                        warn!(stream_id, error = %e, "stream read failed");
                                        let _ = tx_clone.send((
                                            StreamMessage::Error(format!(
                                                "Connection error: {e}"
                                            )),
                                            stream_id,
                                        ));
                                        let _ = tx_clone.send((StreamMessage::End, stream_id));
                                        return;
                                    }
                                }
                            }

                            let remainder = decoder.finish();
                            if !remainder.is_empty() {
                                let _ = tx_clone
                                    .send((StreamMessage::Chunk(remainder), stream_id));
                            }
                            // Connection closed: the response is complete
                            let _ = tx_clone.send((StreamMessage::End, stream_id));
                        }
                        Err(e) => {
                            warn!(stream_id, error = %e, "stream request failed");
                            let _ = tx_clone.send((
                                StreamMessage::Error(format!("Connection error: {e}")),
                                stream_id,
                            ));
                            let _ = tx_clone.send((StreamMessage::End, stream_id));
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "chat stream cancelled");
                }
            }
        });
    }
}

#[cfg(test)]
impl StreamDispatcher {
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_chunks_pass_through() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(b"Hel"), "Hel");
        assert_eq!(decoder.push(b"lo, "), "lo, ");
        assert_eq!(decoder.push(b"world"), "world");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn multibyte_sequences_split_across_chunks_decode_losslessly() {
        // "héllo" with the é (0xC3 0xA9) split between chunks
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(&[0x68, 0xC3]), "h");
        assert_eq!(decoder.push(&[0xA9, 0x6C, 0x6C, 0x6F]), "éllo");
    }

    #[test]
    fn four_byte_emoji_split_three_ways() {
        let bytes = "🚀".as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(&bytes[..1]), "");
        assert_eq!(decoder.push(&bytes[1..3]), "");
        assert_eq!(decoder.push(&bytes[3..]), "🚀");
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(&[0x61, 0xFF, 0x62]), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_flushes_lossily_on_finish() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.push(&[0x61, 0xC3]), "a");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[tokio::test]
    async fn dispatcher_tags_messages_with_the_stream_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = StreamDispatcher::new(tx);
        dispatcher.send_for_test(StreamMessage::Chunk("hi".to_string()), 7);
        dispatcher.send_for_test(StreamMessage::End, 7);

        match rx.recv().await {
            Some((StreamMessage::Chunk(text), 7)) => assert_eq!(text, "hi"),
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some((StreamMessage::End, 7))));
    }
}
