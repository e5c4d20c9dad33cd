//! Wave options: skip-count tuples and the space they are enumerated from.
//!
//! A [`WaveOption`] holds one skip count per monowave of a pattern. Once a position
//! is zero every later position is zero too (zero-collapse); [`WaveOption::new`]
//! normalizes any tuple into that form. [`WaveOptionSpace`] enumerates every valid
//! option below a bound in ascending lexicographic order, lazily.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::monowave::{Direction, WaveLabel};
use crate::{Result, SkipBound, WaveError};

/// Largest number of monowaves in a pattern
pub const MAX_WAVES: usize = 5;

// ============================================================
// WAVE SHAPE
// ============================================================

/// Number and layout of monowaves in a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WaveShape {
    /// 1-2 (up, down)
    TwoWave,
    /// A-B-C (down, up, down)
    ThreeWave,
    /// 1-2-3-4-5 (up, down, up, down, up)
    FiveWave,
}

impl WaveShape {
    /// Shape for a wave count, `None` for anything but 2, 3 or 5
    pub fn from_len(waves: usize) -> Option<Self> {
        match waves {
            2 => Some(WaveShape::TwoWave),
            3 => Some(WaveShape::ThreeWave),
            5 => Some(WaveShape::FiveWave),
            _ => None,
        }
    }

    #[inline]
    pub const fn len(self) -> usize {
        match self {
            WaveShape::TwoWave => 2,
            WaveShape::ThreeWave => 3,
            WaveShape::FiveWave => 5,
        }
    }

    pub fn labels(self) -> &'static [WaveLabel] {
        match self {
            WaveShape::TwoWave => &[WaveLabel::One, WaveLabel::Two],
            WaveShape::ThreeWave => &[WaveLabel::A, WaveLabel::B, WaveLabel::C],
            WaveShape::FiveWave => &[
                WaveLabel::One,
                WaveLabel::Two,
                WaveLabel::Three,
                WaveLabel::Four,
                WaveLabel::Five,
            ],
        }
    }

    pub fn directions(self) -> &'static [Direction] {
        use Direction::{Down, Up};
        match self {
            WaveShape::TwoWave => &[Up, Down],
            WaveShape::ThreeWave => &[Down, Up, Down],
            WaveShape::FiveWave => &[Up, Down, Up, Down, Up],
        }
    }

    /// Position of `label` in this shape
    #[inline]
    pub fn position(self, label: WaveLabel) -> Option<usize> {
        self.labels().iter().position(|&l| l == label)
    }
}

// ============================================================
// WAVE OPTION
// ============================================================

/// Skip counts for the monowaves of one candidate pattern.
///
/// Ordered lexicographically, so `[0,0,0,0,0] < [1,0,0,0,0] < [1,1,0,0,0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaveOption {
    skips: [usize; MAX_WAVES],
    len: u8,
}

impl WaveOption {
    /// Create an option from raw skip counts, applying zero-collapse.
    ///
    /// Fails for any length other than 2, 3 or 5.
    pub fn new(values: &[usize]) -> Result<Self> {
        let shape = WaveShape::from_len(values.len()).ok_or(WaveError::UnsupportedShape {
            waves: values.len(),
            context: "wave options hold 2, 3 or 5 skip counts",
        })?;

        let mut option = Self::zeros(shape);
        for (slot, &value) in option.skips.iter_mut().zip(values) {
            if value == 0 {
                break;
            }
            *slot = value;
        }
        Ok(option)
    }

    /// All-zero option: every monowave takes its first extremum
    #[inline]
    pub const fn zeros(shape: WaveShape) -> Self {
        Self {
            skips: [0; MAX_WAVES],
            len: shape.len() as u8,
        }
    }

    #[inline]
    pub fn values(&self) -> &[usize] {
        &self.skips[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn shape(&self) -> WaveShape {
        match self.len {
            2 => WaveShape::TwoWave,
            3 => WaveShape::ThreeWave,
            _ => WaveShape::FiveWave,
        }
    }

    /// Skip count for the monowave at `position`
    #[inline]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.values().get(position).copied()
    }

    /// Next valid option in ascending order with every count below `up_to`.
    fn successor(&self, up_to: usize) -> Option<Self> {
        if up_to < 2 {
            return None;
        }

        let len = self.len();
        let mut next = *self;
        let prefix = self.values().iter().position(|&v| v == 0).unwrap_or(len);

        // [1,2,0,0,0] -> [1,2,1,0,0]: nothing valid lies in between
        if prefix < len {
            next.skips[prefix] = 1;
            return Some(next);
        }

        let pos = (0..len).rev().find(|&p| self.skips[p] < up_to - 1)?;
        next.skips[pos] += 1;
        next.skips[pos + 1..len].iter_mut().for_each(|v| *v = 0);
        Some(next)
    }
}

impl Ord for WaveOption {
    fn cmp(&self, other: &Self) -> Ordering {
        self.values()
            .cmp(other.values())
            .then(self.len.cmp(&other.len))
    }
}

impl PartialOrd for WaveOption {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WaveOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.values())
    }
}

impl serde::Serialize for WaveOption {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.values().serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for WaveOption {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<usize>::deserialize(d)?;
        WaveOption::new(&values).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OPTION SPACE
// ============================================================

/// Every valid [`WaveOption`] of one shape with counts in `[0, up_to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveOptionSpace {
    shape: WaveShape,
    up_to: SkipBound,
}

impl WaveOptionSpace {
    pub fn new(shape: WaveShape, up_to: SkipBound) -> Self {
        Self { shape, up_to }
    }

    #[inline]
    pub fn shape(&self) -> WaveShape {
        self.shape
    }

    #[inline]
    pub fn up_to(&self) -> SkipBound {
        self.up_to
    }

    /// Number of options in the space.
    ///
    /// With `n = up_to` there are `(n-1)^z` options whose first `z` counts are
    /// non-zero, summed over `z = 0..=len`.
    pub fn len(&self) -> usize {
        let base = self.up_to.get() - 1;
        (0..=self.shape.len() as u32).map(|z| base.pow(z)).sum()
    }

    /// Never empty: the all-zero option is always present
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, option: &WaveOption) -> bool {
        option.shape() == self.shape && option.values().iter().all(|&v| v < self.up_to.get())
    }

    /// Lazy ascending enumeration, smallest skips first
    pub fn iter(&self) -> WaveOptionIter {
        WaveOptionIter {
            next: Some(WaveOption::zeros(self.shape)),
            up_to: self.up_to.get(),
        }
    }

    /// The whole space as a set
    pub fn generate(&self) -> BTreeSet<WaveOption> {
        self.iter().collect()
    }

    /// The whole space, smallest (tightest) options first
    pub fn sorted_ascending(&self) -> Vec<WaveOption> {
        self.iter().collect()
    }
}

impl IntoIterator for &WaveOptionSpace {
    type Item = WaveOption;
    type IntoIter = WaveOptionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a [`WaveOptionSpace`]
#[derive(Debug, Clone)]
pub struct WaveOptionIter {
    next: Option<WaveOption>,
    up_to: usize,
}

impl Iterator for WaveOptionIter {
    type Item = WaveOption;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.successor(self.up_to);
        Some(current)
    }
}

impl std::iter::FusedIterator for WaveOptionIter {}
