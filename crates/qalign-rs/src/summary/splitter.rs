//! Budgeted text splitting at line breaks near the midpoint.
//!
//! Entity statement dumps are one statement per line, so line breaks are
//! the natural unit boundary. A text over budget is split at the first
//! line break at or after its midpoint (falling back to the last one
//! before it, then to the midpoint itself), and both halves are split
//! again until everything fits. Concatenating the output reconstructs the
//! input byte for byte.

use crate::size::SizeEstimate;

/// Split `text` into ordered units, each within `budget` by `sizer`.
///
/// Every split index is strictly inside the text, so each recursive call
/// shrinks its input and the recursion terminates for any input. The one
/// budget exception: a unit with no usable line break is eventually cut at
/// raw midpoints, and a residue that cannot be cut further (a single char)
/// is passed through even if the estimator still prices it over budget.
pub fn split_to_budget(text: &str, budget: usize, sizer: &dyn SizeEstimate) -> Vec<String> {
    if sizer.size(text) <= budget {
        return vec![text.to_string()];
    }
    let Some(at) = split_index(text) else {
        // Unsplittable residue: pass through oversized rather than erroring.
        return vec![text.to_string()];
    };
    let (left, right) = text.split_at(at);
    let mut units = split_to_budget(left, budget, sizer);
    units.extend(split_to_budget(right, budget, sizer));
    units
}

/// Pick a split index strictly inside `text`, or `None` if no such index
/// exists (empty or single-char text).
///
/// Preference order: first `\n` at or after the midpoint, last `\n` before
/// it, the midpoint itself. A line break at position 0 would leave an empty
/// left half and a non-shrinking recursion, so it counts as not found.
fn split_index(text: &str) -> Option<usize> {
    let mid = floor_char_boundary(text, text.len() / 2);

    if let Some(offset) = text.get(mid..).and_then(|tail| tail.find('\n')) {
        let at = mid + offset;
        if at > 0 && at < text.len() {
            return Some(at);
        }
    }

    if let Some(at) = text.get(..mid).and_then(|head| head.rfind('\n'))
        && at > 0
    {
        return Some(at);
    }

    if mid > 0 && mid < text.len() {
        return Some(mid);
    }

    // Midpoint collapsed to 0 behind a wide leading char; try the next
    // boundary up instead.
    let up = ceil_char_boundary(text, text.len() / 2);
    (up > 0 && up < text.len()).then_some(up)
}

fn floor_char_boundary(text: &str, mut at: usize) -> usize {
    while at > 0 && !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

fn ceil_char_boundary(text: &str, mut at: usize) -> usize {
    while at < text.len() && !text.is_char_boundary(at) {
        at += 1;
    }
    at
}
