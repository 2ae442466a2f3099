//! Single-turn prompt template and stop handling.
//!
//! The template is a plain `Human:`/`Assistant:` transcript, which every
//! catalog model follows well enough without a model-specific chat format.

/// Stop sequences applied to every chat completion.
pub const STOP_SEQUENCES: [&str; 2] = ["Human:", "\n\n"];

/// Build the completion prompt for one user message.
pub fn build_prompt(message: &str) -> String {
    format!("Human: {}\nAssistant:", message)
}

/// Truncate `text` at the earliest occurrence of any stop sequence.
///
/// Returns true if a stop sequence was found.
pub fn cut_at_stop<S: AsRef<str>>(text: &mut String, stops: &[S]) -> bool {
    let earliest = stops
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s))
        .min();

    match earliest {
        Some(pos) => {
            text.truncate(pos);
            true
        }
        None => false,
    }
}
