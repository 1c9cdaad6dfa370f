//! JSONL trace adapter (§3 "Trace event", §4.4.1) — a stateful span tree
//! emitted as one JSON line per event, suitable for offline inspection of a
//! loop run (§8 property 8).
//!
//! Grounded on the teacher's `LoopTrace`/`LoopStep` types in
//! `src/agent/agentic_loop.rs`, which accumulate a run's steps in memory;
//! here each step is written out immediately as a JSON object rather than
//! buffered, and span ids come from `uuid` the same way
//! `src/agent/conversation.rs` mints conversation ids.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use super::AgentHooks;
use crate::error::Error;
use crate::message::Message;
use crate::tools::{ToolCall, ToolResult};

/// The span ids this tracer threads through one loop invocation (§4.4.1
/// "State closed over"): one agent-level span assigned in `on_loop_start`,
/// one current-LLM-span reassigned on each `on_llm_start`, and a mapping
/// from tool-call id to tool-span id.
#[derive(Default)]
struct SpanState {
    agent_span: Option<String>,
    llm_span: Option<String>,
    tool_spans: HashMap<String, String>,
}

/// Emits one JSON object per line to the wrapped writer, maintaining the
/// parent/child span relationships §4.4.1 requires rather than minting an
/// unrelated random span id per event.
pub struct Tracer<W: Write + Send> {
    trace_id: String,
    model: String,
    writer: Mutex<W>,
    state: Mutex<SpanState>,
}

impl<W: Write + Send> Tracer<W> {
    pub fn new(writer: W, model: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), writer, model.into())
    }

    fn with_id(trace_id: String, writer: W, model: String) -> Self {
        Self {
            trace_id,
            model,
            writer: Mutex::new(writer),
            state: Mutex::new(SpanState::default()),
        }
    }

    /// Writes one trace event line. `span_id` and `parent_span` are the
    /// specific span this event belongs to and the span it nests under
    /// (§3 "Trace event": {trace-id, span-id, optional parent-span, ...}),
    /// not fresh ids minted per call.
    fn emit(
        &self,
        span_id: &str,
        parent_span: Option<&str>,
        kind: &str,
        duration_ms: Option<u64>,
        fields: serde_json::Value,
    ) {
        let mut record = json!({
            "ts": Utc::now().to_rfc3339(),
            "trace_id": self.trace_id,
            "span_id": span_id,
            "parent_span": parent_span,
            "kind": kind,
        });
        if let Some(duration_ms) = duration_ms {
            record["duration_ms"] = json!(duration_ms);
        }
        if let (Some(obj), Some(extra)) = (record.as_object_mut(), fields.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        let mut w = self.writer.lock().unwrap();
        let _ = writeln!(w, "{}", record);
    }
}

impl Tracer<LazyTraceFile> {
    /// One trace per loop invocation, written lazily to
    /// `<dir>/<trace-id>.jsonl` (§4.4.1, §6 "Trace file format"). The file
    /// is created on first emit, not at construction time.
    pub fn for_directory(dir: PathBuf, model: impl Into<String>) -> Self {
        let trace_id = Uuid::new_v4().to_string();
        let writer = LazyTraceFile {
            dir,
            trace_id: trace_id.clone(),
            file: None,
        };
        Self::with_id(trace_id, writer, model.into())
    }
}

/// A writer that defers creating its backing file (and the containing
/// directory) until the first write, so a loop that never emits a trace
/// event never touches the filesystem.
pub struct LazyTraceFile {
    dir: PathBuf,
    trace_id: String,
    file: Option<std::fs::File>,
}

impl Write for LazyTraceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.file.is_none() {
            std::fs::create_dir_all(&self.dir)?;
            let path = self.dir.join(format!("{}.jsonl", self.trace_id));
            self.file = Some(std::fs::OpenOptions::new().create(true).append(true).open(path)?);
        }
        self.file.as_mut().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> AgentHooks for Tracer<W> {
    /// Mints the agent span for this whole loop invocation and emits
    /// `agent_start` with no parent and `{model}` data (§4.4.1).
    async fn on_loop_start(&self) {
        let span = Uuid::new_v4().to_string();
        self.state.lock().unwrap().agent_span = Some(span.clone());
        self.emit(&span, None, "agent_start", None, json!({ "model": self.model }));
    }

    /// Emits `agent_end` on the same agent span id `on_loop_start` minted
    /// (§4.4.1, §8 property 8: "agent_end is the last event").
    async fn on_loop_end(&self, turns: u32) {
        let span = self.state.lock().unwrap().agent_span.clone().unwrap_or_default();
        self.emit(&span, None, "agent_end", None, json!({ "total_turns": turns }));
    }

    /// Reassigns the current-LLM-span for this turn and emits `llm_start`
    /// parented to the agent span (§4.4.1).
    async fn on_llm_start(&self, messages: &[Message]) {
        let llm_span = Uuid::new_v4().to_string();
        let agent_span = {
            let mut state = self.state.lock().unwrap();
            state.llm_span = Some(llm_span.clone());
            state.agent_span.clone()
        };
        self.emit(
            &llm_span,
            agent_span.as_deref(),
            "llm_start",
            None,
            json!({ "message_count": messages.len() }),
        );
    }

    /// Emits `llm_end` on the same LLM span id `on_llm_start` minted for
    /// this turn, parented to the agent span, with duration attached
    /// (§4.4.1).
    async fn on_llm_end(&self, _message: &Message, duration_ms: u64) {
        let (llm_span, agent_span) = {
            let state = self.state.lock().unwrap();
            (state.llm_span.clone().unwrap_or_default(), state.agent_span.clone())
        };
        self.emit(&llm_span, agent_span.as_deref(), "llm_end", Some(duration_ms), json!({}));
    }

    /// Mints a tool span for this call, records it under the call's id, and
    /// emits `tool_start` parented to the current LLM span with `{tool
    /// name, arguments}` (§4.4.1).
    async fn on_tool_start(&self, call: &ToolCall) {
        let tool_span = Uuid::new_v4().to_string();
        let llm_span = {
            let mut state = self.state.lock().unwrap();
            state.tool_spans.insert(call.id.clone(), tool_span.clone());
            state.llm_span.clone()
        };
        self.emit(
            &tool_span,
            llm_span.as_deref(),
            "tool_start",
            None,
            json!({ "tool_name": call.name, "arguments": call.arguments }),
        );
    }

    /// Emits `tool_end` on the same tool span id `on_tool_start` minted for
    /// this call, with duration and `{tool name, result length, isError}`,
    /// then removes the tool-call-id → tool-span-id mapping (§4.4.1).
    async fn on_tool_end(
        &self,
        call: &ToolCall,
        result: ToolResult,
        duration_ms: u64,
    ) -> crate::error::Result<ToolResult> {
        let (tool_span, llm_span) = {
            let mut state = self.state.lock().unwrap();
            (state.tool_spans.remove(&call.id), state.llm_span.clone())
        };
        let tool_span = tool_span.unwrap_or_default();
        self.emit(
            &tool_span,
            llm_span.as_deref(),
            "tool_end",
            Some(duration_ms),
            json!({
                "tool_name": call.name,
                "result_length": result.content.len(),
                "is_error": result.is_error,
            }),
        );
        Ok(result)
    }

    async fn on_error(&self, err: &Error) {
        let agent_span = self.state.lock().unwrap().agent_span.clone();
        let span = Uuid::new_v4().to_string();
        self.emit(&span, agent_span.as_deref(), "error", None, json!({ "message": err.to_string() }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn agent_start_and_end_share_one_span_and_carry_model() {
        let buf: Vec<u8> = Vec::new();
        let tracer = Tracer::new(buf, "gpt-5");
        tracer.on_loop_start().await;
        tracer.on_loop_end(3).await;

        let lines = {
            let w = tracer.writer.lock().unwrap();
            String::from_utf8(w.clone()).unwrap()
        };
        let records: Vec<serde_json::Value> = lines.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["kind"], "agent_start");
        assert_eq!(records[0]["model"], "gpt-5");
        assert!(records[0]["parent_span"].is_null());
        assert_eq!(records[1]["kind"], "agent_end");
        assert_eq!(records[1]["total_turns"], 3);
        assert_eq!(records[0]["span_id"], records[1]["span_id"]);
    }

    /// §8 property 8 — the full span tree shape for one turn with one tool call.
    #[tokio::test]
    async fn tool_start_parents_to_the_current_llm_span() {
        let buf: Vec<u8> = Vec::new();
        let tracer = Tracer::new(buf, "gpt-5");
        tracer.on_loop_start().await;
        tracer.on_llm_start(&[]).await;
        let call = ToolCall {
            id: "1".into(),
            name: "mock".into(),
            arguments: Default::default(),
        };
        tracer.on_tool_start(&call).await;
        tracer
            .on_tool_end(&call, ToolResult::success("done"), 5)
            .await
            .unwrap();
        tracer.on_llm_end(&Message::assistant_text("ok"), 10).await;
        tracer.on_loop_end(1).await;

        let lines = {
            let w = tracer.writer.lock().unwrap();
            String::from_utf8(w.clone()).unwrap()
        };
        let records: Vec<serde_json::Value> = lines.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        let kinds: Vec<&str> = records.iter().map(|r| r["kind"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["agent_start", "llm_start", "tool_start", "tool_end", "llm_end", "agent_end"]
        );

        let agent_span = records[0]["span_id"].as_str().unwrap();
        let llm_span = records[1]["span_id"].as_str().unwrap();
        let tool_span = records[2]["span_id"].as_str().unwrap();

        assert!(records[0]["parent_span"].is_null());
        assert_eq!(records[1]["parent_span"], agent_span);
        assert_eq!(records[2]["parent_span"], llm_span);
        assert_eq!(records[3]["span_id"], tool_span);
        assert_eq!(records[3]["parent_span"], llm_span);
        assert_eq!(records[4]["span_id"], llm_span);
        assert_eq!(records[4]["parent_span"], agent_span);
        assert_eq!(records[5]["span_id"], agent_span);

        assert_eq!(records[2]["tool_name"], "mock");
        assert_eq!(records[3]["result_length"], 4);
        assert_eq!(records[3]["is_error"], false);
        assert_eq!(records[3]["duration_ms"], 5);

        // agent_end really is the last event.
        assert_eq!(kinds.last(), Some(&"agent_end"));
    }

    #[tokio::test]
    async fn for_directory_creates_the_file_lazily_on_first_emit() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("traces");
        let tracer = Tracer::for_directory(nested.clone(), "gpt-5");
        assert!(!nested.exists());

        tracer.on_loop_start().await;

        let mut entries = std::fs::read_dir(&nested).unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert!(entry.file_name().to_string_lossy().ends_with(".jsonl"));
    }
}
