//! Order index arithmetic for templates and customer steps.
//!
//! Template indices are dense integers, unique per release/category. Customer
//! steps copy them as floats so a custom step can be slotted between two
//! neighbours without renumbering anything.

/// Lower bound of the range rows are parked in during a two-phase reorder.
pub const STAGING_OFFSET: i32 = 10_000;

/// `max + 1`, or `0` for an empty category.
pub fn next_order_index<I>(existing: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    existing.into_iter().max().map_or(0, |max| max + 1)
}

/// First staging value for a reorder. Always above every live index so the
/// parked rows cannot collide with rows that are not being moved.
pub fn staging_base(live_max: Option<i32>) -> i32 {
    live_max
        .map(|max| max.saturating_add(1))
        .unwrap_or(0)
        .max(STAGING_OFFSET)
}

/// Position strictly between two neighbours.
///
/// * both neighbours: midpoint
/// * only `before`: `before + 1` (append)
/// * only `after`: half of `after` when positive, otherwise `after - 1`
/// * neither: `0`
pub fn index_between(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(before), Some(after)) => (before + after) / 2.0,
        (Some(before), None) => before + 1.0,
        (None, Some(after)) if after > 0.0 => after / 2.0,
        (None, Some(after)) => after - 1.0,
        (None, None) => 0.0,
    }
}
