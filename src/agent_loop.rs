//! The Agent Loop (§4.3) — the tool-calling turn loop shared by the main
//! conversation and every worker. Generalizes the teacher's
//! `run_agentic_loop` in `src/agent/agentic_loop.rs`: same log call sites
//! (iteration/turn number, tool name, tool duration, result length, loop
//! outcome) and the same "mutate history in place, return the final
//! assistant message" shape, but driven by the spec's nine-hook
//! `AgentHooks` instead of the teacher's four-callback `LoopCallback`, and
//! with the streaming-vs-blocking branch selected by
//! `ComposedHooks::has_text_delta_handler` rather than a config flag.

use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::hooks::ComposedHooks;
use crate::message::Message;
use crate::provider::{Provider, StreamEvent};
use crate::tools::{ToolCall, ToolContext, ToolRegistry, ToolResult};

/// Content longer than this is truncated before becoming part of a
/// tool-result message (§4.3 truncation rule, §8 property 2).
const TRUNCATE_THRESHOLD: usize = 32_000;
const TRUNCATE_HEAD: usize = 24_000;
const TRUNCATE_TAIL: usize = 6_000;
const TRUNCATE_KEEP: usize = 30_000;

/// Applies the 32k head-plus-tail truncation rule. Operates on `char`
/// boundaries rather than bytes so the guarantee holds for non-ASCII
/// content too.
pub fn truncate_tool_result(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    if len <= TRUNCATE_THRESHOLD {
        return content.to_string();
    }
    let head: String = chars[..TRUNCATE_HEAD].iter().collect();
    let tail: String = chars[len - TRUNCATE_TAIL..].iter().collect();
    let truncated_count = len - TRUNCATE_KEEP;
    format!("{head}\n... [{truncated_count} chars truncated] ...\n{tail}")
}

/// Runs the tool-calling turn loop to completion and returns the final
/// assistant message (§4.3). `messages` is mutated in place and is the
/// durable conversation state; callers needing isolation must clone first.
pub async fn run_agent_loop(
    messages: &mut Vec<Message>,
    tools: &ToolRegistry,
    provider: &dyn Provider,
    ctx: &ToolContext,
    system_prompt: Option<&str>,
    hooks: &ComposedHooks,
) -> Result<Message> {
    let wire_tools = tools.wire_definitions();
    hooks.on_loop_start().await;

    match run_turns(messages, &wire_tools, tools, provider, ctx, system_prompt, hooks).await {
        Ok(message) => Ok(message),
        Err(err) => {
            warn!(error = %err, "agent loop exiting with error");
            hooks.on_error(&err).await;
            Err(err)
        }
    }
}

async fn run_turns(
    messages: &mut Vec<Message>,
    wire_tools: &[crate::tools::WireTool],
    tools: &ToolRegistry,
    provider: &dyn Provider,
    ctx: &ToolContext,
    system_prompt: Option<&str>,
    hooks: &ComposedHooks,
) -> Result<Message> {
    let mut turns: u32 = 0;

    loop {
        turns += 1;
        debug!(turn = turns, "starting agent loop turn");
        hooks.on_llm_start(messages).await;

        let start = Instant::now();
        let assistant_message = call_provider(messages, wire_tools, provider, system_prompt, hooks).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        hooks.on_llm_end(&assistant_message, duration_ms).await;
        messages.push(assistant_message.clone());

        let tool_calls: Vec<ToolCall> = assistant_message
            .tool_calls()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments: tc.arguments.clone(),
            })
            .collect();

        if tool_calls.is_empty() {
            info!(turns, "agent loop complete, no further tool calls");
            hooks.on_loop_end(turns).await;
            return Ok(assistant_message);
        }

        for call in &tool_calls {
            run_tool_call(messages, tools, ctx, hooks, call).await?;
        }

        hooks.on_turn_end(messages).await;
    }
}

async fn call_provider(
    messages: &[Message],
    wire_tools: &[crate::tools::WireTool],
    provider: &dyn Provider,
    system_prompt: Option<&str>,
    hooks: &ComposedHooks,
) -> Result<Message> {
    if hooks.has_text_delta_handler() {
        let mut stream = provider.stream(messages, wire_tools, system_prompt).await?;
        let mut final_message = None;
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text } => hooks.on_text_delta(&text),
                StreamEvent::Done { message } => {
                    final_message = Some(message);
                    break;
                }
                // §6: the loop only consumes `TextDelta` and `Done`; every
                // other event (including `Error`) is tolerated and ignored.
                StreamEvent::ToolStart { .. } | StreamEvent::ToolDelta | StreamEvent::Error { .. } => {}
            }
        }
        final_message.ok_or(Error::StreamEndedWithoutMessage)
    } else {
        provider.complete(messages, wire_tools, system_prompt).await
    }
}

async fn run_tool_call(
    messages: &mut Vec<Message>,
    tools: &ToolRegistry,
    ctx: &ToolContext,
    hooks: &ComposedHooks,
    call: &ToolCall,
) -> Result<()> {
    hooks.on_tool_start(call).await;
    let start = Instant::now();

    let raw_result = dispatch(tools, call, ctx).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        tool = %call.name,
        duration_ms,
        result_len = raw_result.content.len(),
        is_error = raw_result.is_error,
        "tool executed"
    );

    let truncated = ToolResult {
        content: truncate_tool_result(&raw_result.content),
        is_error: raw_result.is_error,
    };

    let final_result = hooks.on_tool_end(call, truncated, duration_ms).await?;

    messages.push(Message::tool_result(
        call.id.clone(),
        final_result.content,
        final_result.is_error,
    ));
    Ok(())
}

/// Resolves and runs one tool call (§4.3 step 3e): unknown tools and schema
/// failures never invoke `execute`; exceptions from `execute` are caught and
/// turned into error-flagged results. None of this is fatal to the loop
/// (§7 category 1).
async fn dispatch(tools: &ToolRegistry, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(tool) = tools.get(&call.name) else {
        return ToolResult::failure("Tool not found");
    };

    if let Err(validation_error) = tool.schema().validate(&call.arguments) {
        return ToolResult::failure(format!("Invalid arguments: {}", validation_error.describe()));
    }

    match tool.execute(call.arguments.clone(), ctx).await {
        Ok(result) => result,
        Err(err) => ToolResult::failure(format!("Error: {err}")),
    }
}
