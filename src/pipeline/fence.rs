//! Fenced-code-block extraction for model completions.
//!
//! The synthesizer asks the model for a bare SQL statement, but models often
//! wrap it in a Markdown fence anyway. The grammar accepted here:
//!
//! ```text
//! block     := "```" [tag] body "```"
//! tag       := word with no whitespace, alone on the opening line
//! body      := any text up to the next "```"
//! ```
//!
//! The first complete block wins; an unclosed fence does not count as a
//! block. When no block is found the whole trimmed completion is taken as
//! the statement.

const FENCE: &str = "```";

/// A parsed fenced block.
#[derive(Debug, Clone, PartialEq)]
pub struct FencedBlock {
    /// Language tag on the opening fence line, if any (e.g. `sql`).
    pub tag: Option<String>,
    /// Interior text, trimmed of leading/trailing whitespace.
    pub body: String,
}

/// Find the first complete fenced block in `text`.
pub fn first_block(text: &str) -> Option<FencedBlock> {
    let open = text.find(FENCE)?;
    let after_open = &text[open + FENCE.len()..];

    // A tag is the rest of the opening line when it is a single word.
    let (tag, body_start) = match after_open.find('\n') {
        Some(nl) => {
            let line = after_open[..nl].trim();
            if !line.is_empty() && !line.contains(char::is_whitespace) {
                (Some(line.to_string()), nl + 1)
            } else {
                (None, 0)
            }
        }
        None => (None, 0),
    };

    let rest = &after_open[body_start..];
    let close = rest.find(FENCE)?;

    Some(FencedBlock {
        tag,
        body: rest[..close].trim().to_string(),
    })
}

/// Extract the SQL statement from a raw completion.
///
/// First complete fenced block if present, otherwise the whole completion;
/// either way trimmed.
pub fn extract_sql(raw: &str) -> String {
    match first_block(raw) {
        Some(block) => block.body,
        None => raw.trim().to_string(),
    }
}
