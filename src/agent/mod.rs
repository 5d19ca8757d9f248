//! Language-model side of the orchestrator: the `genai` backed decision
//! oracle, tool schemas, system prompt assembly and the JSONL run log.

pub mod genai_oracle;
pub mod logging;
pub mod system_prompt;
pub mod tools;
