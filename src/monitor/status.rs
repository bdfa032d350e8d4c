// Wildcard status-code classification
//
// A mask is a string over digits and the wildcard character `x`; trailing
// wildcards match any character in that position as long as the overall
// lengths agree ("2xx" matches "200" and "226" but not "20" or "3000").
// Non-wildcard positions are compared literally, so masks are not required
// to be digits.
//
// This classification is used at discovery time to decide whether a freshly
// observed response counts as a healthy baseline worth recording. Validation
// against an already-recorded baseline uses exact equality instead (see
// `monitor::validator`).

/// Returns true iff `code` satisfies at least one of the `masks`.
///
/// A mask matches when its length equals the code's length and the code
/// starts with the mask's literal prefix (the mask with all trailing `x`
/// characters stripped).
pub fn is_success_code(masks: &[String], code: &str) -> bool {
    masks
        .iter()
        .any(|mask| mask.len() == code.len() && code.starts_with(mask.trim_end_matches('x')))
}
