use super::document::{Cell, CellKind, Notebook, NotebookError};
use super::edit::CellEdit;

/// Identifies the original cell that resets `messages` before every call.
pub const PAIN_POINT_MARKER: &str = r#"pain_point = "What is the pain point in this industry?""#;
/// Identifies the rewritten cell once `FixMemory` has been applied.
pub const FIXED_MARKER: &str = "FIXED VERSION: Maintain conversation history";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    FixMemory,
    AddSetup,
    AddExplanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The notebook was changed; `cell` is the index of the matched code cell.
    Applied { cell: usize },
    AlreadyApplied { cell: usize },
}

impl PatchOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl Patch {
    /// The order the patches were written to be run in.
    pub const ALL: [Patch; 3] = [Patch::FixMemory, Patch::AddSetup, Patch::AddExplanation];

    pub fn name(self) -> &'static str {
        match self {
            Self::FixMemory => "fix-memory",
            Self::AddSetup => "add-setup",
            Self::AddExplanation => "add-explanation",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::FixMemory => PAIN_POINT_MARKER,
            Self::AddSetup | Self::AddExplanation => FIXED_MARKER,
        }
    }

    pub fn apply(self, notebook: &mut Notebook) -> Result<PatchOutcome, NotebookError> {
        match self {
            Self::FixMemory => apply_fix_memory(notebook),
            Self::AddSetup => apply_setup(notebook),
            Self::AddExplanation => apply_explanation(notebook),
        }
    }

    pub fn describe(self, outcome: PatchOutcome) -> String {
        match (self, outcome) {
            (Self::FixMemory, PatchOutcome::Applied { cell }) => format!("Fixed cell {cell}"),
            (Self::AddSetup, PatchOutcome::Applied { cell }) => {
                format!("Added setup code to cell {cell}")
            }
            (Self::AddExplanation, PatchOutcome::Applied { cell }) => {
                format!("Added explanation cell after cell {cell}")
            }
            (_, PatchOutcome::AlreadyApplied { cell }) => {
                format!("{}: already applied at cell {cell}, skipping", self.name())
            }
        }
    }
}

fn apply_fix_memory(notebook: &mut Notebook) -> Result<PatchOutcome, NotebookError> {
    if let Some(index) = notebook.find_code_cell(PAIN_POINT_MARKER) {
        let cell = notebook.apply_edit(index, CellEdit::Replace(fixed_block()))?;
        return Ok(PatchOutcome::Applied { cell });
    }

    match notebook.find_code_cell(FIXED_MARKER) {
        Some(cell) => Ok(PatchOutcome::AlreadyApplied { cell }),
        None => Err(NotebookError::MarkerNotFound {
            marker: PAIN_POINT_MARKER.to_string(),
        }),
    }
}

fn apply_setup(notebook: &mut Notebook) -> Result<PatchOutcome, NotebookError> {
    let index = notebook.require_code_cell(FIXED_MARKER)?;
    let block = setup_block();
    if notebook.cells[index].source_starts_with(&block) {
        return Ok(PatchOutcome::AlreadyApplied { cell: index });
    }

    let cell = notebook.apply_edit(index, CellEdit::Prepend(block))?;
    Ok(PatchOutcome::Applied { cell })
}

fn apply_explanation(notebook: &mut Notebook) -> Result<PatchOutcome, NotebookError> {
    let index = notebook.require_code_cell(FIXED_MARKER)?;
    let explanation = explanation_cell();
    let already_present = notebook.cells.get(index + 1).is_some_and(|next| {
        next.cell_type == CellKind::Markdown && next.source == explanation.source
    });
    if already_present {
        return Ok(PatchOutcome::AlreadyApplied { cell: index });
    }

    notebook.apply_edit(index, CellEdit::InsertAfter(explanation))?;
    Ok(PatchOutcome::Applied { cell: index })
}

fn to_lines(block: &[&str]) -> Vec<String> {
    block.iter().map(|line| format!("{line}\n")).collect()
}

pub fn fixed_block() -> Vec<String> {
    to_lines(FIXED_BLOCK)
}

pub fn setup_block() -> Vec<String> {
    to_lines(SETUP_BLOCK)
}

pub fn explanation_cell() -> Cell {
    Cell::markdown(to_lines(EXPLANATION_BLOCK))
}

const FIXED_BLOCK: &[&str] = &[
    "# FIXED VERSION: Maintain conversation history to avoid memory loss",
    "# The key issue was that ChatGPT API calls are stateless - each call only sees the messages you send it",
    "# To maintain context, we need to keep all previous messages in the conversation",
    "",
    "# Initialize conversation with the first message",
    r#"messages = [{"role": "user", "content": "Suggest one business area that might be worth exploring for an Agentic AI opportunity."}]"#,
    "",
    "# Make the first call",
    "response = openai.chat.completions.create(",
    r#"    model="gpt-4.1-mini","#,
    "    messages=messages",
    ")",
    "",
    "# Add the AI's response to the conversation history",
    r#"messages.append({"role": "assistant", "content": response.choices[0].message.content})"#,
    "",
    "business_idea = response.choices[0].message.content",
    "",
    r#"print("Business Idea:")"#,
    "print(business_idea)",
    r#"print("\n" + "="*50 + "\n")"#,
    "",
    "# Now ask about pain points - the AI will remember the context from the previous message",
    r#"pain_point_question = "What is the pain point in this industry?""#,
    r#"messages.append({"role": "user", "content": pain_point_question})"#,
    "",
    "pain_point_response = openai.chat.completions.create(",
    r#"    model="gpt-4.1-mini","#,
    "    messages=messages  # Now contains the full conversation history",
    ")",
    "",
    "# Add this response to history too",
    r#"messages.append({"role": "assistant", "content": pain_point_response.choices[0].message.content})"#,
    "",
    r#"print("Pain Points:")"#,
    "print(pain_point_response.choices[0].message.content)",
    r#"print("\n" + "="*50 + "\n")"#,
    "",
    "# Now ask for the solution - again with full context",
    r#"solution_question = "What is the Agentic AI solution to this pain point?""#,
    r#"messages.append({"role": "user", "content": solution_question})"#,
    "",
    "solution_response = openai.chat.completions.create(",
    r#"    model="gpt-4.1-mini","#,
    "    messages=messages  # Full conversation history maintained",
    ")",
    "",
    r#"print("Agentic AI Solution:")"#,
    "print(solution_response.choices[0].message.content)",
    "",
    r#"print("\n" + "="*50)"#,
    r#"print("SUCCESS: Conversation memory maintained throughout!")"#,
    r#"print("The AI now remembers the context from previous messages")"#,
    r#"print("="*50)"#,
];

const SETUP_BLOCK: &[&str] = &[
    "# Required setup (run this cell independently)",
    "from dotenv import load_dotenv",
    "from openai import OpenAI",
    "import os",
    "",
    "# Load environment variables",
    "load_dotenv(override=True)",
    "",
    "# Initialize OpenAI client",
    "openai = OpenAI()",
    "",
    "# Verify API key",
    r#"openai_api_key = os.getenv("OPENAI_API_KEY")"#,
    "if not openai_api_key:",
    r#"    print("❌ OpenAI API Key not set - please check your .env file")"#,
    "else:",
    r#"    print(f"✅ OpenAI API Key loaded (starts with {openai_api_key[:8]})...")"#,
    "",
    r#"print("=" * 50)"#,
    "",
];

const EXPLANATION_BLOCK: &[&str] = &[
    "## What Was Fixed: Conversation Memory Issue",
    "",
    "The original code had a **critical flaw** that caused ChatGPT to lose memory between API calls:",
    "",
    "### ❌ The Problem:",
    "- Each `openai.chat.completions.create()` call was stateless",
    "- The `messages` list was reset with `messages = [...]` before each call",
    "- ChatGPT only saw the current message, not the conversation history",
    r#"- Result: AI asked "which industry?" because it forgot the previous context"#,
    "",
    "### ✅ The Solution:",
    "- Maintain a single `messages` list throughout the conversation",
    "- Use `messages.append()` to add both user messages AND AI responses",
    "- Pass the complete conversation history to each API call",
    "- Result: AI remembers context and provides coherent, contextual responses",
    "",
    "**Key Changes Made:**",
    "1. Initialize `messages` once at the start",
    r#"2. Add AI responses with `messages.append({"role": "assistant", "content": ...})`"#,
    r#"3. Add follow-up questions with `messages.append({"role": "user", "content": ...})`"#,
    "4. Pass the full `messages` list to each API call",
    "",
    "This pattern ensures **persistent conversation memory** across all API interactions! 🎉",
];
