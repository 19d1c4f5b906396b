pub mod messages;
pub mod quiz_prompt;
