//! Impulse + correction pairs.

use std::hash::{Hash, Hasher};

use super::monowave::Monowave;
use super::options::WaveShape;
use super::pattern::WavePattern;
use crate::{Result, WaveError};

/// A five-wave impulse followed directly by a three-wave correction.
///
/// Equal when both patterns have the same price values, so the same cycle found
/// through different skip options collapses to one.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WaveCycle {
    impulse: WavePattern,
    correction: WavePattern,
}

impl WaveCycle {
    /// Pair `impulse` with `correction`. The correction must start where the
    /// impulse ends.
    pub fn new(impulse: WavePattern, correction: WavePattern) -> Result<Self> {
        if impulse.shape() != WaveShape::FiveWave {
            return Err(WaveError::UnsupportedShape {
                waves: impulse.waves().len(),
                context: "cycle impulse must have 5 waves",
            });
        }
        if correction.shape() != WaveShape::ThreeWave {
            return Err(WaveError::UnsupportedShape {
                waves: correction.waves().len(),
                context: "cycle correction must have 3 waves",
            });
        }
        if correction.idx_start() != impulse.idx_end() {
            return Err(WaveError::InvalidConfig(format!(
                "correction starts at {} but impulse ends at {}",
                correction.idx_start(),
                impulse.idx_end()
            )));
        }

        Ok(Self { impulse, correction })
    }

    #[inline]
    pub fn impulse(&self) -> &WavePattern {
        &self.impulse
    }

    #[inline]
    pub fn correction(&self) -> &WavePattern {
        &self.correction
    }

    pub fn start_idx(&self) -> usize {
        self.impulse.idx_start()
    }

    pub fn end_idx(&self) -> usize {
        self.correction.idx_end()
    }

    pub fn degree(&self) -> u32 {
        self.impulse.degree()
    }

    /// All eight waves, impulse first
    pub fn waves(&self) -> impl Iterator<Item = &Monowave> + '_ {
        self.impulse.waves().iter().chain(self.correction.waves())
    }

    pub fn dates(&self) -> Vec<i64> {
        let mut dates = self.impulse.dates();
        dates.extend(self.correction.dates());
        dates
    }

    pub fn values(&self) -> Vec<f64> {
        let mut values = self.impulse.values();
        values.extend(self.correction.values());
        values
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels = self.impulse.labels();
        labels.extend(self.correction.labels());
        labels
    }
}

impl PartialEq for WaveCycle {
    fn eq(&self, other: &Self) -> bool {
        let bits = |c: &WaveCycle| c.values().into_iter().map(f64::to_bits).collect::<Vec<_>>();
        bits(self) == bits(other)
    }
}

impl Eq for WaveCycle {}

impl Hash for WaveCycle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in self.values() {
            value.to_bits().hash(state);
        }
    }
}
