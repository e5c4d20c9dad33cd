//! Monowaves: single directional price swings between two extrema.
//!
//! A monowave is either [`Direction::Up`] (anchored at the low of its start bar,
//! searching forward for a high) or [`Direction::Down`] (anchored at the high of its
//! start bar, searching forward for a low). Construction either yields a fully
//! populated value or `None` when no end exists in the data.

use std::fmt;

use super::pattern::WavePattern;
use super::scanner::{first_high, first_low, max_in, min_in, next_high, next_low};
use crate::{PriceSeries, Result, WaveError};

// ============================================================
// DIRECTION & LABELS
// ============================================================

/// Direction of a monowave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Direction::Down)
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Position label of a wave inside a pattern
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum WaveLabel {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    A,
    B,
    C,
}

impl WaveLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            WaveLabel::One => "1",
            WaveLabel::Two => "2",
            WaveLabel::Three => "3",
            WaveLabel::Four => "4",
            WaveLabel::Five => "5",
            WaveLabel::A => "A",
            WaveLabel::B => "B",
            WaveLabel::C => "C",
        }
    }

    /// Labels whose display carries a length ratio against the first wave.
    #[inline]
    pub fn is_annotated(self) -> bool {
        matches!(self, WaveLabel::Two | WaveLabel::Three | WaveLabel::B)
    }
}

impl fmt::Display for WaveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// MONOWAVE
// ============================================================

/// A directional price swing.
///
/// `low`/`high` are the prices at `low_idx`/`high_idx`. For an up wave the low sits
/// at `idx_start` and the high at `idx_end`; a down wave is the other way round.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Monowave {
    pub direction: Direction,
    pub idx_start: usize,
    pub idx_end: usize,
    pub low: f64,
    pub high: f64,
    pub low_idx: usize,
    pub high_idx: usize,
    pub date_start: i64,
    pub date_end: i64,
    /// Number of minor extrema bypassed to reach the end
    pub skip: usize,
    pub label: Option<WaveLabel>,
    /// Nesting level, 1 = base timeframe
    pub degree: u32,
}

impl Monowave {
    /// Build a monowave in `direction` starting at `idx_start`, skipping `skip`
    /// intermediate extrema. Returns `None` when the series has no valid end.
    pub fn new(
        direction: Direction,
        series: &PriceSeries,
        idx_start: usize,
        skip: usize,
    ) -> Option<Self> {
        if idx_start >= series.len() {
            return None;
        }
        match direction {
            Direction::Up => Self::up(series, idx_start, skip),
            Direction::Down => Self::down(series, idx_start, skip),
        }
    }

    /// Upward swing from the low of `idx_start`.
    pub fn up(series: &PriceSeries, idx_start: usize, skip: usize) -> Option<Self> {
        let (lows, highs, dates) = (series.lows(), series.highs(), series.dates());
        let (high, high_idx) = find_up_end(lows, highs, idx_start, skip)?;

        Some(Self {
            direction: Direction::Up,
            idx_start,
            idx_end: high_idx,
            low: lows[idx_start],
            high,
            low_idx: idx_start,
            high_idx,
            date_start: dates[idx_start],
            date_end: dates[high_idx],
            skip,
            label: None,
            degree: 1,
        })
    }

    /// Downward swing from the high of `idx_start`.
    pub fn down(series: &PriceSeries, idx_start: usize, skip: usize) -> Option<Self> {
        let (lows, highs, dates) = (series.lows(), series.highs(), series.dates());
        let (low, low_idx) = find_down_end(lows, highs, idx_start, skip)?;

        Some(Self {
            direction: Direction::Down,
            idx_start,
            idx_end: low_idx,
            low,
            high: highs[idx_start],
            low_idx,
            high_idx: idx_start,
            date_start: dates[idx_start],
            date_end: dates[low_idx],
            skip,
            label: None,
            degree: 1,
        })
    }

    /// Collapse a resolved pattern into one monowave of the next degree.
    ///
    /// A 5-wave impulse becomes an up wave from the low of wave 1 to the high of
    /// wave 5; a 3-wave correction becomes a down wave from the high of wave A to
    /// the low of wave C. Other wave counts are rejected.
    pub fn from_pattern(pattern: &WavePattern) -> Result<Self> {
        let waves = pattern.waves();
        let (first, last) = match waves {
            [first, .., last] if waves.len() == 5 || waves.len() == 3 => (first, last),
            _ => {
                return Err(WaveError::UnsupportedShape {
                    waves: waves.len(),
                    context: "degree promotion needs a 3 or 5 wave pattern",
                })
            }
        };

        let wave = if waves.len() == 5 {
            Self {
                direction: Direction::Up,
                idx_start: first.idx_start,
                idx_end: last.idx_end,
                low: first.low,
                high: last.high,
                low_idx: first.low_idx,
                high_idx: last.high_idx,
                date_start: first.date_start,
                date_end: last.date_end,
                skip: 0,
                label: None,
                degree: first.degree + 1,
            }
        } else {
            Self {
                direction: Direction::Down,
                idx_start: first.idx_start,
                idx_end: last.idx_end,
                low: last.low,
                high: first.high,
                low_idx: last.low_idx,
                high_idx: first.high_idx,
                date_start: first.date_start,
                date_end: last.date_end,
                skip: 0,
                label: None,
                degree: first.degree + 1,
            }
        };

        Ok(wave)
    }

    /// Same wave carrying `label`
    #[inline]
    pub fn with_label(mut self, label: WaveLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Price extent `|high - low|`
    #[inline]
    pub fn length(&self) -> f64 {
        (self.high - self.low).abs()
    }

    /// Number of bars from start to end
    #[inline]
    pub fn duration(&self) -> usize {
        self.idx_end - self.idx_start
    }

    /// Difference in price length against another wave
    #[inline]
    pub fn length_diff(&self, other: &Monowave) -> f64 {
        self.length() - other.length()
    }

    /// Start and end price in traversal order
    #[inline]
    pub fn points(&self) -> [f64; 2] {
        match self.direction {
            Direction::Up => [self.low, self.high],
            Direction::Down => [self.high, self.low],
        }
    }

    #[inline]
    pub fn dates(&self) -> [i64; 2] {
        [self.date_start, self.date_end]
    }

    /// Display label, empty when unlabeled
    pub fn labels(&self) -> &'static str {
        self.label.map(WaveLabel::as_str).unwrap_or("")
    }
}

// ============================================================
// END SEARCH
// ============================================================

/// End of an up wave: first high, then `skip` higher highs. Advancing to a higher
/// high must not leave a low under the starting low in between.
fn find_up_end(lows: &[f64], highs: &[f64], idx_start: usize, skip: usize) -> Option<(f64, usize)> {
    let (mut high, mut high_idx) = first_high(lows, highs, idx_start)?;
    let low_at_start = lows[idx_start];

    for _ in 0..skip {
        // no further high to skip to: the current one stands
        let Some((act_high, act_high_idx)) = next_high(lows, highs, high_idx, high) else {
            break;
        };
        high = act_high;
        high_idx = act_high_idx;

        if min_in(lows, idx_start + 1, act_high_idx).is_some_and(|low| low < low_at_start) {
            return None;
        }
    }

    Some((high, high_idx))
}

/// End of a down wave. Mirror of [`find_up_end`].
fn find_down_end(
    lows: &[f64],
    highs: &[f64],
    idx_start: usize,
    skip: usize,
) -> Option<(f64, usize)> {
    let (mut low, mut low_idx) = first_low(lows, highs, idx_start)?;
    let high_at_start = highs[idx_start];

    for _ in 0..skip {
        let Some((act_low, act_low_idx)) = next_low(lows, highs, low_idx, low) else {
            break;
        };
        low = act_low;
        low_idx = act_low_idx;

        if max_in(highs, idx_start + 1, act_low_idx).is_some_and(|high| high > high_at_start) {
            return None;
        }
    }

    Some((low, low_idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(lows: &[f64], highs: &[f64]) -> PriceSeries {
        let dates = (0..lows.len() as i64).map(|d| 20_210_101 + d).collect();
        PriceSeries::new(dates, lows.to_vec(), highs.to_vec()).unwrap()
    }

    fn synthetic() -> PriceSeries {
        series(
            &[10.0, 8.0, 12.0, 6.0, 10.0, 4.0, 8.0, 2.0, 6.0],
            &[20.0, 18.0, 22.0, 16.0, 20.0, 14.0, 18.0, 12.0, 16.0],
        )
    }

    #[test]
    fn test_up_degenerate_skip() {
        let wave = Monowave::up(&synthetic(), 2, 1).unwrap();
        assert_eq!(wave.high, 22.0);
        assert_eq!(wave.high_idx, 2);
        assert_eq!(wave.idx_end, 2);
        assert_eq!(wave.points(), [12.0, 22.0]);
        assert_eq!(wave.dates(), [20_210_103, 20_210_103]);
    }

    #[test]
    fn test_up_without_skip() {
        let s = series(&[1.0, 2.0, 3.0, 2.5, 4.0], &[2.0, 3.0, 4.0, 3.5, 5.0]);
        let wave = Monowave::up(&s, 0, 0).unwrap();
        assert_eq!(wave.low, 1.0);
        assert_eq!(wave.high, 4.0);
        assert_eq!(wave.idx_end, 2);
        assert_eq!(wave.duration(), 2);
        assert_eq!(wave.length(), 3.0);
    }

    #[test]
    fn test_up_skips_minor_reversal() {
        let s = series(
            &[1.0, 2.0, 1.5, 3.0, 2.0, 1.0],
            &[2.0, 3.0, 2.5, 4.0, 3.0, 2.0],
        );
        let wave = Monowave::up(&s, 0, 1).unwrap();
        assert_eq!(wave.high, 4.0);
        assert_eq!(wave.idx_end, 3);
        assert_eq!(wave.skip, 1);
    }

    #[test]
    fn test_up_breach_of_start_low_fails() {
        // the dip at idx 2 undercuts the starting low before the higher high
        let s = series(
            &[1.0, 2.0, 0.5, 3.0, 2.0, 1.0],
            &[2.0, 3.0, 2.5, 4.0, 3.0, 2.0],
        );
        assert!(Monowave::up(&s, 0, 1).is_none());
        assert!(Monowave::up(&s, 0, 0).is_some());
    }

    #[test]
    fn test_up_from_last_bar_has_no_end() {
        let s = series(&[5.0, 4.0, 3.0, 2.0], &[6.0, 5.0, 4.0, 3.0]);
        assert!(Monowave::up(&s, 3, 0).is_none());
        assert!(Monowave::new(Direction::Up, &s, 10, 0).is_none());
    }

    #[test]
    fn test_down_wave() {
        let wave = Monowave::down(&synthetic(), 0, 0).unwrap();
        assert_eq!(wave.direction, Direction::Down);
        assert_eq!(wave.high, 20.0);
        assert_eq!(wave.low, 8.0);
        assert_eq!(wave.low_idx, 1);
        assert_eq!(wave.points(), [20.0, 8.0]);
    }

    #[test]
    fn test_down_wave_skip_breach() {
        // from the 22 peak no later high exceeds the start, so every skip holds
        let wave = Monowave::down(&synthetic(), 2, 1).unwrap();
        assert_eq!(wave.low, 4.0);
        assert_eq!(wave.low_idx, 5);
        let wave = Monowave::down(&synthetic(), 2, 2).unwrap();
        assert_eq!(wave.low, 2.0);
        assert_eq!(wave.low_idx, 7);

        // from the 20 high at idx 0 the path to 6 passes the 22 high at idx 2
        assert!(Monowave::down(&synthetic(), 0, 1).is_none());
    }

    #[test]
    fn test_label_display() {
        let wave = Monowave::up(&synthetic(), 2, 0).unwrap();
        assert_eq!(wave.labels(), "");
        let wave = wave.with_label(WaveLabel::Three);
        assert_eq!(wave.labels(), "3");
        assert_eq!(WaveLabel::B.to_string(), "B");
    }

    #[test]
    fn test_length_diff() {
        let s = synthetic();
        let up = Monowave::up(&s, 1, 0).unwrap();
        let down = Monowave::down(&s, 2, 0).unwrap();
        assert_eq!(up.length(), 14.0);
        assert_eq!(down.length(), 16.0);
        assert_eq!(up.length_diff(&down), -2.0);
    }
}
