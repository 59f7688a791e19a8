/// Rough token count: one token per four characters, rounded up.
///
/// Whitespace-only input counts as zero; any other input counts as at least one.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    text.chars().count().div_ceil(4).max(1)
}
