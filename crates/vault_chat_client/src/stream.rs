//! Token decoding over an open `/chat/stream` response body.
//!
//! [`TokenStream`] is the consumer-facing side: a lazy, single-pass
//! [`Stream`] of decoded text tokens that also carries the conversation id
//! announced by the final `done` event. Bytes flow one way:
//! chunks → [`LineAssembler`] → [`EventDispatcher`] → tokens / thread id.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::ready;
use futures_util::stream::{BoxStream, FusedStream, Stream, StreamExt};

use crate::error::ClientError;
use crate::messages::{EventRecord, DONE_EVENT, TOKEN_EVENT};
use crate::sse::{EventDispatcher, LineAssembler};

/// Raw body chunks as handed out by reqwest.
pub type ByteSource = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Token stream over a live HTTP response.
pub type ChatStream = TokenStream<ByteSource>;

/// A fully drained stream: the concatenated answer and its conversation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub thread_id: String,
}

/// Decodes a byte source into text tokens.
///
/// The source is only polled when no decoded token is waiting, so it advances
/// one chunk at a time at the consumer's pace. Dropping the stream drops the
/// source, which closes the underlying connection.
pub struct TokenStream<S> {
    source: S,
    lines: LineAssembler,
    events: EventDispatcher,
    ready: VecDeque<String>,
    thread_id: String,
    finished: bool,
}

impl<S> TokenStream<S> {
    /// `thread_id` is reported by [`thread_id`](Self::thread_id) until the
    /// server sends a `done` event.
    pub fn new(source: S, thread_id: Option<&str>) -> Self {
        Self {
            source,
            lines: LineAssembler::new(),
            events: EventDispatcher::new(),
            ready: VecDeque::new(),
            thread_id: thread_id.unwrap_or_default().to_string(),
            finished: false,
        }
    }

    /// Conversation id: the last `done` payload seen so far, or the id the
    /// stream was opened with.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn into_thread_id(self) -> String {
        self.thread_id
    }

    fn absorb(&mut self, chunk: &[u8]) {
        for line in self.lines.feed(chunk) {
            if let Some(record) = self.events.push_line(&line) {
                self.handle(record);
            }
        }
    }

    fn handle(&mut self, record: EventRecord) {
        match record.event_type.as_str() {
            TOKEN_EVENT => match serde_json::from_str::<String>(&record.data) {
                Ok(token) => self.ready.push_back(token),
                Err(e) => {
                    tracing::warn!(error = %e, data = %record.data, "skipping malformed token payload");
                }
            },
            DONE_EVENT => {
                tracing::debug!(thread_id = %record.data, "received done event");
                self.thread_id = record.data;
            }
            other => tracing::trace!(event = other, "ignoring event"),
        }
    }

    fn end_of_input(&mut self) {
        self.finished = true;
        let dropped = self.lines.finish();
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "discarding unterminated trailing line");
        }
    }
}

impl<S> TokenStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    /// Drain the stream, appending every token to one buffer.
    pub async fn into_reply(mut self) -> Result<ChatReply, ClientError> {
        let mut text = String::new();
        while let Some(token) = self.next().await {
            text.push_str(&token?);
        }
        Ok(ChatReply {
            text,
            thread_id: self.thread_id,
        })
    }
}

impl<S> Stream for TokenStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(token) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            match ready!(this.source.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.absorb(&chunk),
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "response body read failed");
                    this.end_of_input();
                    return Poll::Ready(Some(Err(ClientError::Transport(e))));
                }
                None => this.end_of_input(),
            }
        }
    }
}

impl<S> FusedStream for TokenStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.finished && self.ready.is_empty()
    }
}
