pub mod openai;
pub mod provider;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
