//! Tools bundled with the prebuilt agents

use crate::prompts::MAKE_PROMPT_DESCRIPTION;
use parley_core::tool::Tool;
use serde::Deserialize;
use serde_json::json;

/// Name of the guidance hand-off tool
pub const MAKE_PROMPT_TOOL: &str = "make_prompt";

#[derive(Debug, Deserialize)]
struct MakePromptArgs {
    internal_prompt: String,
}

/// Tool that returns its `internal_prompt` argument unchanged.
///
/// The guidance agent calls it to hand a short task description to the analyst.
pub fn make_prompt_tool() -> Tool {
    Tool::typed(
        MAKE_PROMPT_TOOL,
        MAKE_PROMPT_DESCRIPTION,
        json!({
            "type": "object",
            "properties": {
                "internal_prompt": {"type": "string"}
            },
            "required": ["internal_prompt"]
        }),
        |args: MakePromptArgs| Ok(args.internal_prompt),
    )
}
