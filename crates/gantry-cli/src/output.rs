//! Output layer: human text or stable JSON, chosen per invocation.

use serde::Serialize;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON, one object per result.
    Json,
}

/// Print a result value in the selected mode. `human` renders the text
/// form; JSON mode serializes the value itself.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn emit<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Human => println!("{}", human(value)),
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
