//! System prompt assembly for the decision oracle.
//!
//! The operator-supplied base prompt (from the request or config) is extended
//! with instructions on how attached files are presented, so the model can
//! pass file references on to the agents that need them.

/// Appended to every base prompt.
pub const FILE_HANDLING_PROMPT: &str = "\
## Attached files
Files attached by the user are listed after a `FILES:` marker at the end of \
their message, as a JSON array of file descriptors. Never invent file ids or \
names. When an agent needs a file, pass the descriptor fields it asks for \
exactly as listed.";

/// Build the system prompt for one run.
pub fn build_system_prompt(base_prompt: &str) -> String {
    let base = base_prompt.trim();
    if base.is_empty() {
        FILE_HANDLING_PROMPT.to_string()
    } else {
        format!("{base}\n\n{FILE_HANDLING_PROMPT}")
    }
}
