use anyhow::{Result, anyhow};
use std::io::Write;

use super::conversation::{Conversation, ask_stateless};
use crate::llm::provider::LlmProvider;
use crate::trace::{SessionTrace, TraceEvent};

pub const MEMORY_DEMO_QUESTIONS: [&str; 3] = [
    "Suggest one business area that might be worth exploring for an Agentic AI opportunity.",
    "What are the main pain points in this industry that could benefit from Agentic AI?",
    "What would be an effective Agentic AI solution to address these pain points?",
];

pub const STATELESS_DEMO_QUESTIONS: [&str; 2] = [
    "Suggest one business area for Agentic AI",
    "What are pain points in this industry?",
];

const PREVIEW_CHARS: usize = 200;

const KEY_LESSONS: &str = "\n=== KEY LESSONS ===
1. ChatGPT API calls are STATELESS - each call only sees the messages you send it
2. To maintain memory, keep ALL messages in a list
3. Always append both user messages AND assistant responses to the conversation
4. Pass the ENTIRE conversation history to each API call
5. Never reset the messages list between calls!

=== WHAT HAPPENS IF YOU DON'T DO THIS ===
If you reset messages = [] between calls, the AI loses all context
It will ask 'which industry?' because it doesn't remember your previous messages!";

/// Asks every question in [`MEMORY_DEMO_QUESTIONS`] through one
/// [`Conversation`] and prints the transcript.
pub async fn run_memory_demo<P: LlmProvider, W: Write>(
    provider: &P,
    trace: Option<&SessionTrace>,
    out: &mut W,
) -> Result<Conversation> {
    writeln!(out, "=== CONVERSATION MEMORY DEMO ===\n")?;

    let mut conversation = Conversation::new();
    for question in MEMORY_DEMO_QUESTIONS {
        writeln!(out, "User: {question}")?;
        writeln!(out, "{}", "-".repeat(50))?;
        record(trace, TraceEvent::UserTurn(question));

        let answer = conversation
            .ask(provider, question)
            .await
            .map_err(|err| anyhow!("Assistant request failed: {err}"))?;

        record(trace, TraceEvent::AssistantTurn(&answer));
        writeln!(out, "Assistant: {answer}")?;
        writeln!(out, "{}", "=".repeat(50))?;
    }

    writeln!(out, "{KEY_LESSONS}")?;
    Ok(conversation)
}

/// The anti-pattern: every call starts from an empty history, so the second
/// question arrives without the industry it refers to. Each answer is printed
/// as soon as it arrives.
pub async fn run_stateless_demo<P: LlmProvider, W: Write>(
    provider: &P,
    trace: Option<&SessionTrace>,
    out: &mut W,
) -> Result<Vec<String>> {
    let [first_question, second_question] = STATELESS_DEMO_QUESTIONS;
    writeln!(out, "\n=== DEMONSTRATING THE WRONG WAY ===\n")?;

    let first = ask_fresh(provider, trace, first_question).await?;
    writeln!(out, "First call result:")?;
    writeln!(out, "{}...", preview(&first))?;

    let second = ask_fresh(provider, trace, second_question).await?;
    writeln!(out, "\nSecond call result (context lost):")?;
    writeln!(out, "{second}")?;
    writeln!(
        out,
        "\n❌ Notice how the AI asks for clarification - it forgot the previous context!"
    )?;

    Ok(vec![first, second])
}

async fn ask_fresh<P: LlmProvider>(
    provider: &P,
    trace: Option<&SessionTrace>,
    question: &str,
) -> Result<String> {
    record(trace, TraceEvent::UserTurn(question));
    let answer = ask_stateless(provider, question)
        .await
        .map_err(|err| anyhow!("Assistant request failed: {err}"))?;
    record(trace, TraceEvent::AssistantTurn(&answer));
    Ok(answer)
}

fn record(trace: Option<&SessionTrace>, event: TraceEvent<'_>) {
    if let Some(trace) = trace {
        trace.record(event);
    }
}

pub fn write_summary<W: Write>(out: &mut W) -> Result<()> {
    let rule = "=".repeat(60);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "SUMMARY: Always maintain conversation history!")?;
    writeln!(out, "Use messages.append() to add new messages")?;
    writeln!(out, "Pass the full messages list to each API call")?;
    writeln!(out, "{rule}")?;
    Ok(())
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
