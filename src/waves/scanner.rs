//! Extremum scanner
//!
//! Pure forward scans over aligned `lows` / `highs` slices. Each function returns
//! `Some((value, index))` for the extremum it found or `None` when the series ends
//! before one can be confirmed. `None` is the search-exhausted signal; it is never
//! an error.

/// First local high after `idx_start`.
///
/// The running maximum is seeded with `highs[idx_start]` and advanced while each
/// following high is strictly greater. The extremum is confirmed at the first bar
/// that fails to increase. Reaching the end of the series while still rising
/// returns the last maximum. Returns `None` only when no bar follows `idx_start`.
#[inline]
pub fn first_high(lows: &[f64], highs: &[f64], idx_start: usize) -> Option<(f64, usize)> {
    debug_assert_eq!(lows.len(), highs.len());
    if idx_start + 1 >= highs.len() {
        return None;
    }

    let mut high = highs[idx_start];
    let mut high_idx = idx_start;

    for (idx, &act_high) in highs.iter().enumerate().skip(idx_start + 1) {
        if act_high > high {
            high = act_high;
            high_idx = idx;
        } else {
            break;
        }
    }

    Some((high, high_idx))
}

/// First local low after `idx_start`. Mirror of [`first_high`] over `lows`.
#[inline]
pub fn first_low(lows: &[f64], highs: &[f64], idx_start: usize) -> Option<(f64, usize)> {
    debug_assert_eq!(lows.len(), highs.len());
    if idx_start + 1 >= lows.len() {
        return None;
    }

    let mut low = lows[idx_start];
    let mut low_idx = idx_start;

    for (idx, &act_low) in lows.iter().enumerate().skip(idx_start + 1) {
        if act_low < low {
            low = act_low;
            low_idx = idx;
        } else {
            break;
        }
    }

    Some((low, low_idx))
}

/// Next swing high strictly after `idx_from` that exceeds `prev_high`.
///
/// Highs at or below `prev_high` are ignored until one exceeds it; from there a
/// running maximum is tracked exactly as in [`first_high`]. Unlike `first_high`,
/// the maximum must be confirmed by a non-increasing bar: running into the end of
/// the series returns `None`.
pub fn next_high(
    lows: &[f64],
    highs: &[f64],
    idx_from: usize,
    prev_high: f64,
) -> Option<(f64, usize)> {
    debug_assert_eq!(lows.len(), highs.len());
    let mut tracking: Option<(f64, usize)> = None;

    for (idx, &act_high) in highs.iter().enumerate().skip(idx_from + 1) {
        match tracking {
            None if act_high > prev_high => tracking = Some((act_high, idx)),
            None => continue,
            Some((high, _)) if act_high > high => tracking = Some((act_high, idx)),
            Some(found) => return Some(found),
        }
    }

    None
}

/// Next swing low strictly after `idx_from` that undercuts `prev_low`.
/// Mirror of [`next_high`].
pub fn next_low(
    lows: &[f64],
    highs: &[f64],
    idx_from: usize,
    prev_low: f64,
) -> Option<(f64, usize)> {
    debug_assert_eq!(lows.len(), highs.len());
    let mut tracking: Option<(f64, usize)> = None;

    for (idx, &act_low) in lows.iter().enumerate().skip(idx_from + 1) {
        match tracking {
            None if act_low < prev_low => tracking = Some((act_low, idx)),
            None => continue,
            Some((low, _)) if act_low < low => tracking = Some((act_low, idx)),
            Some(found) => return Some(found),
        }
    }

    None
}

/// Minimum of `values[from..to]`, `None` for an empty range.
#[inline]
pub(crate) fn min_in(values: &[f64], from: usize, to: usize) -> Option<f64> {
    values
        .get(from..to.min(values.len()))?
        .iter()
        .copied()
        .reduce(f64::min)
}

/// Maximum of `values[from..to]`, `None` for an empty range.
#[inline]
pub(crate) fn max_in(values: &[f64], from: usize, to: usize) -> Option<f64> {
    values
        .get(from..to.min(values.len()))?
        .iter()
        .copied()
        .reduce(f64::max)
}
