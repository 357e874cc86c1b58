use super::*;

pub const REQUIRED_TABLE_HEADER: &str =
    "| UID | Raw Sentence | Narrative Purpose | Characters | Locations | Key Items/Concepts | Links |";
const TABLE_SEPARATOR: &str =
    "|-----|--------------|-------------------|------------|-----------|-------------------|-------|";

const INSTRUCTION_PREAMBLE: &str = "You are the Mapping Agent for a story analysis system.

For each UID below, produce **one Markdown table row** with these columns:
- UID: The unique identifier (copy exactly)
- Raw Sentence: The original text (copy exactly, no changes)
- Narrative Purpose: Brief description of what this text accomplishes in the story
- Characters: Main characters mentioned (comma-separated)
- Locations: Locations mentioned (comma-separated)
- Key Items/Concepts: Important items, abilities, or concepts (comma-separated)
- Links: Related UIDs this connects to (comma-separated, can be empty)

CRITICAL RULES:
1. You MUST include EVERY UID listed below - no omissions
2. Copy the Raw Sentence text EXACTLY as provided
3. Do NOT merge, paraphrase, or skip any entries
4. Each UID gets exactly ONE row
5. Use \"N/A\" for empty fields rather than leaving blank
6. Escape any pipe character inside a cell as \\|

Start your response with the table header:";

const INSTRUCTION_CLOSING: &str = "Remember: One row per UID, no omissions, exact text copying.";

/// Renders the instructions for exactly `units`, in order.
///
/// The output depends on nothing but the slice, so re-batching an unchanged
/// unit set reproduces byte-identical payloads.
pub fn render_instruction_payload(units: &[Unit]) -> String {
    let mut payload = String::with_capacity(
        INSTRUCTION_PREAMBLE.len() + units.iter().map(|unit| unit.text.len() + 20).sum::<usize>(),
    );
    payload.push_str(INSTRUCTION_PREAMBLE);
    payload.push('\n');
    payload.push_str(REQUIRED_TABLE_HEADER);
    payload.push('\n');
    payload.push_str(TABLE_SEPARATOR);
    payload.push_str("\n\nUID List and Sentences:\n");

    for unit in units {
        payload.push('\n');
        payload.push_str(&unit.uid);
        payload.push_str(": ");
        payload.push_str(&unit.text);
    }

    payload.push_str("\n\n");
    payload.push_str(INSTRUCTION_CLOSING);
    payload
}
