//! Provider capability (§6) — the boundary between the Agent Loop and a
//! concrete LLM backend. Grounded on the teacher's `src/core/provider.rs`
//! (`LlmProvider` trait with `generate`/`generate_stream`); the HTTP clients
//! for specific vendors are explicitly out of scope (spec.md §1), so only
//! the trait and the stream-event shape live here.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::message::Message;
use crate::tools::WireTool;

/// One event from a provider's streaming call. The Agent Loop only consumes
/// `TextDelta` and `Done`; the others are tolerated and ignored (§6).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta { text: String },
    ToolStart { id: String, name: String },
    ToolDelta,
    Done { message: Message },
    Error { error: String },
}

/// A stream of provider events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Abstract LLM backend. Concrete vendor bindings (HTTP clients for specific
/// providers) are an external collaborator; this crate only depends on the
/// trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Blocking single-shot completion.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[WireTool],
        system_prompt: Option<&str>,
    ) -> Result<Message>;

    /// Streaming completion. Consumers iterate `TextDelta` events for
    /// incremental text and stop at the first `Done`.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[WireTool],
        system_prompt: Option<&str>,
    ) -> Result<EventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_variants_are_constructible() {
        let _ = StreamEvent::TextDelta { text: "hi".into() };
        let _ = StreamEvent::ToolStart {
            id: "1".into(),
            name: "mock".into(),
        };
        let _ = StreamEvent::ToolDelta;
        let _ = StreamEvent::Done {
            message: Message::assistant_text("done"),
        };
        let _ = StreamEvent::Error {
            error: "boom".into(),
        };
    }
}
