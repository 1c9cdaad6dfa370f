//! Context-window compaction adapter (§4.4.2) — installed as `onTurnEnd`.
//! Summarizes the oldest part of the conversation once its estimated size
//! crosses a trigger ratio of the model's context window, folding any
//! existing summary into the new one and preserving a trailing manifest of
//! files the archived turns touched.
//!
//! Grounded on `src/agent/conversation.rs`'s history-management role in the
//! teacher (the `ConversationManager` owns message history the way this
//! hook observes it) and on `src/core/provider.rs`'s `LlmProvider::generate`
//! for producing the summary text, since the teacher has no compaction step
//! of its own to generalize directly from. The role-prefixed transcript
//! string this hook builds follows the same plain-text framing
//! `agent_loop.rs`/`scheduler.rs` build when composing a prompt out of
//! conversation history.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::AgentHooks;
use crate::message::{ContentBlock, Message};
use crate::provider::Provider;

const SUMMARIZATION_SYSTEM_PROMPT: &str =
    "You summarize agent conversation history. Produce a brief summary structured as \
     Goal / Key Decisions / Context. Be concise; omit anything not load-bearing for \
     continuing the conversation.";

const EXISTING_SUMMARY_MARKER: &str = "## Previous Context";

/// Compaction thresholds (§4.4.2). `chars_per_token` is a coarse token
/// estimator; the teacher's crates carry no tokenizer, and spec.md
/// explicitly accepts an approximation here.
#[derive(Debug, Clone, Copy)]
pub struct CompactionConfig {
    pub context_window: usize,
    pub trigger_ratio: f64,
    pub preserve_ratio: f64,
    pub chars_per_token: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            context_window: 128_000,
            trigger_ratio: 0.75,
            preserve_ratio: 0.25,
            chars_per_token: 4,
        }
    }
}

impl CompactionConfig {
    fn message_chars(message: &Message) -> usize {
        match message {
            Message::User { content } => content.len(),
            Message::ToolResult { content, .. } => content.len(),
            Message::Assistant { content } => content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text(t) => t.len(),
                    ContentBlock::ToolCall(call) => {
                        call.name.len()
                            + serde_json::to_string(&call.arguments).map(|s| s.len()).unwrap_or(0)
                    }
                })
                .sum(),
        }
    }

    fn message_tokens(&self, message: &Message) -> usize {
        let chars = Self::message_chars(message);
        (chars as f64 / self.chars_per_token.max(1) as f64).ceil() as usize
    }

    fn estimate_tokens(&self, messages: &[Message]) -> usize {
        let chars: usize = messages.iter().map(Self::message_chars).sum();
        (chars as f64 / self.chars_per_token.max(1) as f64).ceil() as usize
    }

    fn trigger_threshold(&self) -> f64 {
        self.context_window as f64 * self.trigger_ratio
    }

    fn preserve_budget(&self) -> usize {
        (self.context_window as f64 * self.preserve_ratio) as usize
    }

    /// Walk backwards accumulating per-message token estimates, selecting a
    /// cut index such that the preserved suffix fits the preserve budget.
    /// Always keeps at least the latest message (§4.4.2 step 3).
    fn select_cut(&self, messages: &[Message]) -> usize {
        if messages.is_empty() {
            return 0;
        }
        let budget = self.preserve_budget();
        let mut running = 0usize;
        let mut cut = messages.len();
        for i in (0..messages.len()).rev() {
            let tok = self.message_tokens(&messages[i]);
            if cut != messages.len() && running + tok > budget {
                break;
            }
            running += tok;
            cut = i;
        }
        cut
    }
}

/// Extracted `read_file`/`load`/`write_file` path arguments from a slice of
/// archived messages, sorted and de-duplicated (§4.4.2 step 6).
#[derive(Debug, Default, PartialEq, Eq)]
struct TouchedFiles {
    read: Vec<String>,
    modified: Vec<String>,
}

fn extract_touched_files(messages: &[Message]) -> TouchedFiles {
    let mut read = Vec::new();
    let mut modified = Vec::new();
    for message in messages {
        if let Message::Assistant { content } = message {
            for block in content {
                if let ContentBlock::ToolCall(call) = block {
                    let path = call
                        .arguments
                        .get("path")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    let Some(path) = path else { continue };
                    match call.name.as_str() {
                        "read_file" | "load" => read.push(path),
                        "write_file" => modified.push(path),
                        _ => {}
                    }
                }
            }
        }
    }
    read.sort();
    read.dedup();
    modified.sort();
    modified.dedup();
    TouchedFiles { read, modified }
}

fn serialize_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| match message {
            Message::User { content } => format!("User: {content}"),
            Message::Assistant { content } => {
                let blocks = serde_json::to_string(content).unwrap_or_default();
                format!("Assistant: {blocks}")
            }
            Message::ToolResult {
                tool_call_id,
                content,
                ..
            } => format!("Tool Result ({tool_call_id}): {content}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_summary_block(summary: &str, touched: &TouchedFiles) -> String {
    let mut block = format!("{EXISTING_SUMMARY_MARKER}\n\n{summary}");
    if !touched.read.is_empty() || !touched.modified.is_empty() {
        block.push_str("\n\n## Touched Files (Archived)\n");
        if !touched.read.is_empty() {
            block.push_str(&format!("\nRead: {}", touched.read.join(", ")));
        }
        if !touched.modified.is_empty() {
            block.push_str(&format!("\nModified: {}", touched.modified.join(", ")));
        }
    }
    block
}

/// Compacts history at each `onTurnEnd` once it crosses the trigger ratio.
/// Failures are logged, never propagated (§7 category 5, §4.4.2 last
/// paragraph) — compaction is best-effort.
///
/// Known hazard (§4.4.2, §9): the chosen cut index may orphan a tool-result
/// at the head of the preserved suffix whose originating tool-call was
/// archived. This implementation matches the spec's reference behavior and
/// does not extend the cut to avoid it; see DESIGN.md for the rationale.
pub struct Compaction {
    config: CompactionConfig,
    provider: Arc<dyn Provider>,
}

impl Compaction {
    pub fn new(provider: Arc<dyn Provider>, config: CompactionConfig) -> Self {
        Self { config, provider }
    }

    async fn summarize(&self, transcript: &str, existing_summary: Option<&str>) -> crate::error::Result<String> {
        let prompt = match existing_summary {
            Some(existing) => format!(
                "Existing summary:\n{existing}\n\nNew conversation events to fold in:\n{transcript}\n\n\
                 Produce an updated summary that incorporates the new events."
            ),
            None => format!("Conversation so far:\n{transcript}\n\nProduce a fresh summary."),
        };
        let response = self
            .provider
            .complete(&[Message::user(prompt)], &[], Some(SUMMARIZATION_SYSTEM_PROMPT))
            .await?;
        Ok(response.text())
    }
}

#[async_trait]
impl AgentHooks for Compaction {
    async fn on_turn_end(&self, messages: &mut Vec<Message>) {
        if (self.config.estimate_tokens(messages) as f64) < self.config.trigger_threshold() {
            return;
        }
        let cut = self.config.select_cut(messages);
        if cut == 0 {
            return;
        }

        let mut archive = &messages[..cut][..];
        let existing_summary = match archive.first() {
            Some(Message::User { content }) if content.starts_with(EXISTING_SUMMARY_MARKER) => {
                let summary = content.clone();
                archive = &archive[1..];
                Some(summary)
            }
            _ => None,
        };

        let touched = extract_touched_files(archive);
        let transcript = serialize_transcript(archive);

        let summary = match self.summarize(&transcript, existing_summary.as_deref()).await {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "compaction summarization failed; skipping this turn");
                return;
            }
        };

        let mut compacted = vec![Message::user(build_summary_block(&summary, &touched))];
        compacted.extend_from_slice(&messages[cut..]);
        *messages = compacted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::message::ToolCallBlock;
    use crate::provider::EventStream;
    use crate::tools::WireTool;

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<Message> {
            Ok(Message::assistant_text(self.reply.clone()))
        }

        async fn stream(
            &self,
            _messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<EventStream> {
            unimplemented!("not exercised in this test")
        }
    }

    #[test]
    fn estimate_tokens_rounds_up() {
        let config = CompactionConfig {
            chars_per_token: 4,
            ..CompactionConfig::default()
        };
        let messages = vec![Message::user("a".repeat(401))];
        assert_eq!(config.estimate_tokens(&messages), 101);
    }

    #[test]
    fn extract_touched_files_separates_reads_and_writes() {
        let messages = vec![Message::Assistant {
            content: vec![
                ContentBlock::ToolCall(ToolCallBlock {
                    id: "1".into(),
                    name: "read_file".into(),
                    arguments: serde_json::json!({"path": "b.txt"}).as_object().unwrap().clone(),
                }),
                ContentBlock::ToolCall(ToolCallBlock {
                    id: "2".into(),
                    name: "write_file".into(),
                    arguments: serde_json::json!({"path": "a.txt"}).as_object().unwrap().clone(),
                }),
                ContentBlock::ToolCall(ToolCallBlock {
                    id: "3".into(),
                    name: "load".into(),
                    arguments: serde_json::json!({"path": "a.txt"}).as_object().unwrap().clone(),
                }),
            ],
        }];
        let touched = extract_touched_files(&messages);
        assert_eq!(touched.read, vec!["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(touched.modified, vec!["a.txt".to_string()]);
    }

    /// §8 scenario S5.
    #[tokio::test]
    async fn s5_compaction_rollup() {
        let config = CompactionConfig {
            context_window: 100,
            trigger_ratio: 0.5,
            preserve_ratio: 0.2,
            chars_per_token: 1,
        };
        let compaction = Compaction::new(
            Arc::new(StubProvider {
                reply: "Summary of 50 chars".into(),
            }),
            config,
        );
        let mut messages: Vec<Message> = [10, 10, 10, 10, 10]
            .iter()
            .map(|n| Message::user("x".repeat(*n)))
            .collect();
        messages.push(Message::user("keep me please"));

        compaction.on_turn_end(&mut messages).await;

        assert_eq!(messages.len(), 2);
        let head = messages[0].text();
        assert!(head.contains("## Previous Context"));
        assert!(head.contains("Summary of 50 chars"));
        assert_eq!(messages[1].text(), "keep me please");
    }

    #[tokio::test]
    async fn on_turn_end_is_noop_below_trigger() {
        let config = CompactionConfig::default();
        let compaction = Compaction::new(Arc::new(StubProvider { reply: String::new() }), config);
        let mut messages = vec![Message::user("hi")];
        let before = messages.clone();
        compaction.on_turn_end(&mut messages).await;
        assert_eq!(messages.len(), before.len());
    }

    #[tokio::test]
    async fn folds_existing_summary_into_new_one() {
        let config = CompactionConfig {
            context_window: 100,
            trigger_ratio: 0.1,
            preserve_ratio: 0.05,
            chars_per_token: 1,
        };
        let compaction = Compaction::new(
            Arc::new(StubProvider {
                reply: "updated summary".into(),
            }),
            config,
        );
        let mut messages = vec![
            Message::user(format!("{EXISTING_SUMMARY_MARKER}\n\nold summary")),
            Message::user("x".repeat(50)),
            Message::user("tail"),
        ];
        compaction.on_turn_end(&mut messages).await;
        assert!(messages[0].text().contains("updated summary"));
    }
}
