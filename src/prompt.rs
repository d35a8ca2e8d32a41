//! Builds the fixed English prompts sent to the vision model.
//!
//! Every function here is a pure string builder: same inputs, same output, no I/O. Each prompt
//! spells out the exact reply format the corresponding parser in [`crate::protocol`] expects.

/// The system prompt, parameterised by the remote desktop's resolution.
pub fn system_prompt(width: u32, height: u32) -> String {
    format!(
        "You are controlling a remote desktop session through screenshots alone. The screen \
         resolution is {width}x{height} pixels, with (0,0) at the top-left corner. You will be \
         shown a screenshot and asked to locate an element, answer a yes/no question, or read a \
         value. Reply with only the exact format requested for each prompt — no extra commentary."
    )
}

/// Prompt for an `expect` action: does the screenshot match `description`.
pub fn expect_prompt(description: &str) -> String {
    format!(
        "Look at the screenshot. Does it show: {description}?\n\
         Reply with exactly one word on the first line: MATCH, NO_MATCH, or UNCERTAIN."
    )
}

/// Prompt used by click/double-click/right-click/type/select to locate `target` on screen.
pub fn locate_prompt(target: &str) -> String {
    format!(
        "Look at the screenshot. Find this element: {target}\n\
         If you can see it, reply with its centre pixel coordinates on the first line in the \
         exact form `x,y` (two integers separated by a comma).\n\
         If you cannot find it, reply with `NOT_FOUND` followed by a short reason."
    )
}

/// Prompt for an `extract` action: read the value shown at `source`.
pub fn extract_prompt(source: &str) -> String {
    format!(
        "Look at the screenshot. Read the value shown at: {source}\n\
         Reply with just that value. If the value is present but blank, reply with `EMPTY`. \
         If you cannot find {source} on screen at all, reply with `NOT_FOUND`."
    )
}

/// Prompt for an `if screen shows` condition check.
pub fn condition_prompt(condition: &str) -> String {
    format!(
        "Look at the screenshot. Does it show: {condition}?\n\
         Reply with exactly one word on the first line: YES or NO."
    )
}
