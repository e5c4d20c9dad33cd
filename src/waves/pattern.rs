//! Wave patterns: ordered, labeled groups of monowaves checked against rule sets.

use std::hash::{Hash, Hasher};

use super::monowave::{Monowave, WaveLabel};
use super::options::{WaveOption, WaveShape};
use super::rules::{RuleSet, Verdict};
use crate::{Result, WaveError};

/// One candidate wave structure: 2, 3 or 5 consecutive monowaves.
///
/// Two patterns are equal when every corresponding wave has the same low and
/// high, whatever [`WaveOption`] produced them.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WavePattern {
    waves: Vec<Monowave>,
    shape: WaveShape,
    option: Option<WaveOption>,
}

impl WavePattern {
    /// Label `waves` by position (1-5, A-C or 1-2) and wrap them.
    ///
    /// Wave directions must alternate as the shape requires.
    pub fn new(waves: Vec<Monowave>) -> Result<Self> {
        let shape = WaveShape::from_len(waves.len()).ok_or(WaveError::UnsupportedShape {
            waves: waves.len(),
            context: "patterns hold 2, 3 or 5 waves",
        })?;

        let directions_match = waves
            .iter()
            .zip(shape.directions())
            .all(|(wave, &direction)| wave.direction == direction);
        if !directions_match {
            return Err(WaveError::UnsupportedShape {
                waves: waves.len(),
                context: "wave directions do not alternate as the shape requires",
            });
        }

        let waves = waves
            .into_iter()
            .zip(shape.labels())
            .map(|(wave, &label)| wave.with_label(label))
            .collect();

        Ok(Self {
            waves,
            shape,
            option: None,
        })
    }

    /// Attach the option the pattern was found with
    pub fn with_option(mut self, option: WaveOption) -> Self {
        self.option = Some(option);
        self
    }

    #[inline]
    pub fn waves(&self) -> &[Monowave] {
        &self.waves
    }

    #[inline]
    pub fn shape(&self) -> WaveShape {
        self.shape
    }

    #[inline]
    pub fn option(&self) -> Option<WaveOption> {
        self.option
    }

    /// Wave carrying `label`, `None` if this shape has no such wave
    pub fn wave(&self, label: WaveLabel) -> Option<&Monowave> {
        self.shape.position(label).and_then(|i| self.waves.get(i))
    }

    /// Degree of the first wave
    pub fn degree(&self) -> u32 {
        self.first().degree
    }

    /// Low of the first wave
    pub fn low(&self) -> f64 {
        self.first().low
    }

    /// High of the last wave
    pub fn high(&self) -> f64 {
        self.last().high
    }

    pub fn idx_start(&self) -> usize {
        self.first().idx_start
    }

    pub fn idx_end(&self) -> usize {
        self.last().idx_end
    }

    /// Start and end date of every wave, in wave order
    pub fn dates(&self) -> Vec<i64> {
        self.waves.iter().flat_map(|w| w.dates()).collect()
    }

    /// Start and end price of every wave, in wave order
    pub fn values(&self) -> Vec<f64> {
        self.waves.iter().flat_map(|w| w.points()).collect()
    }

    /// Display labels placed at wave ends.
    ///
    /// Each wave contributes a blank for its start and its label for its end.
    /// Waves 2, 3 and B carry their length as a ratio of the first wave.
    pub fn labels(&self) -> Vec<String> {
        let reference = self.first().length();

        self.waves
            .iter()
            .flat_map(|wave| {
                let label = wave.labels();
                let end = match wave.label {
                    Some(l) if l.is_annotated() && reference > 0.0 => {
                        let ratio = (wave.length() / reference * 1000.0).round() / 1000.0;
                        format!("{label} ({ratio})")
                    }
                    _ => label.to_string(),
                };
                [" ".to_string(), end]
            })
            .collect()
    }

    /// Evaluate every condition of `rules` in order, stopping at the first
    /// violation.
    ///
    /// Fails when the rule set was written for a different shape.
    pub fn evaluate(&self, rules: &RuleSet) -> Result<Verdict> {
        if rules.shape() != self.shape {
            return Err(WaveError::UnsupportedShape {
                waves: self.waves.len(),
                context: "rule set written for a different pattern shape",
            });
        }

        for condition in rules.conditions() {
            if !condition.holds(self)? {
                log::debug!(
                    "rule violation of {} for condition {}: {}",
                    rules.name(),
                    condition.name,
                    condition.message
                );
                return Ok(Verdict::Violated {
                    condition: condition.name,
                    message: condition.message,
                });
            }
        }

        Ok(Verdict::Satisfied)
    }

    /// True iff every condition of `rules` holds
    pub fn check_rule(&self, rules: &RuleSet) -> Result<bool> {
        self.evaluate(rules).map(|v| v.is_satisfied())
    }

    /// Flattened view for a rendering collaborator
    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            dates: self.dates(),
            values: self.values(),
            labels: self.labels(),
            idx_start: self.idx_start(),
            idx_end: self.idx_end(),
            degree: self.degree(),
            option: self.option.map(|o| o.values().to_vec()),
            rule: None,
        }
    }

    // `new` rejects empty wave lists
    fn first(&self) -> &Monowave {
        &self.waves[0]
    }

    fn last(&self) -> &Monowave {
        &self.waves[self.waves.len() - 1]
    }
}

impl PartialEq for WavePattern {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.waves.iter().zip(&other.waves).all(|(a, b)| {
                a.low.to_bits() == b.low.to_bits() && a.high.to_bits() == b.high.to_bits()
            })
    }
}

impl Eq for WavePattern {}

impl Hash for WavePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
        for wave in &self.waves {
            wave.low.to_bits().hash(state);
            wave.high.to_bits().hash(state);
        }
    }
}

/// Serializable rendering data for one accepted pattern
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternSummary {
    pub dates: Vec<i64>,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
    pub idx_start: usize,
    pub idx_end: usize,
    pub degree: u32,
    /// Skip counts the pattern was found with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<Vec<usize>>,
    /// Name of the rule set it satisfied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waves::monowave::Direction;
    use std::collections::HashSet;

    fn wave(direction: Direction, start: usize, end: usize, from: f64, to: f64) -> Monowave {
        let (low, high, low_idx, high_idx) = match direction {
            Direction::Up => (from, to, start, end),
            Direction::Down => (to, from, end, start),
        };
        Monowave {
            direction,
            idx_start: start,
            idx_end: end,
            low,
            high,
            low_idx,
            high_idx,
            date_start: start as i64,
            date_end: end as i64,
            skip: 0,
            label: None,
            degree: 1,
        }
    }

    fn impulse() -> WavePattern {
        WavePattern::new(vec![
            wave(Direction::Up, 0, 4, 10.0, 20.0),
            wave(Direction::Down, 4, 7, 20.0, 15.0),
            wave(Direction::Up, 7, 14, 15.0, 35.0),
            wave(Direction::Down, 14, 17, 35.0, 28.0),
            wave(Direction::Up, 17, 21, 28.0, 40.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_labels_assigned_by_position() {
        let p = impulse();
        let labels: Vec<_> = p.waves().iter().filter_map(|w| w.label).collect();
        assert_eq!(labels, WaveShape::FiveWave.labels());
        assert_eq!(p.wave(WaveLabel::Three).unwrap().high, 35.0);
        assert!(p.wave(WaveLabel::B).is_none());
    }

    #[test]
    fn test_derived_fields() {
        let p = impulse();
        assert_eq!(p.idx_start(), 0);
        assert_eq!(p.idx_end(), 21);
        assert_eq!(p.low(), 10.0);
        assert_eq!(p.high(), 40.0);
        assert_eq!(p.degree(), 1);
        assert_eq!(p.values()[..4], [10.0, 20.0, 20.0, 15.0]);
        assert_eq!(p.dates().len(), 10);
    }

    #[test]
    fn test_render_labels() {
        let labels = impulse().labels();
        assert_eq!(
            labels,
            vec![" ", "1", " ", "2 (0.5)", " ", "3 (2)", " ", "4", " ", "5"]
        );
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let up = wave(Direction::Up, 0, 2, 1.0, 2.0);
        let down = wave(Direction::Down, 2, 3, 2.0, 1.5);
        assert!(matches!(
            WavePattern::new(vec![up, down, up, down]),
            Err(WaveError::UnsupportedShape { waves: 4, .. })
        ));
        assert!(WavePattern::new(vec![down, down]).is_err());
        assert!(WavePattern::new(vec![up, down]).is_ok());
    }

    #[test]
    fn test_equality_ignores_option_and_indices() {
        let a = impulse().with_option(WaveOption::new(&[1, 2, 3, 4, 5]).unwrap());
        let mut waves = impulse().waves().to_vec();
        waves[4].idx_end = 25;
        let b = WavePattern::new(waves)
            .unwrap()
            .with_option(WaveOption::new(&[1, 2, 3, 4, 10]).unwrap());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        assert!(set.insert(a));
        assert!(!set.insert(b));
    }

    #[test]
    fn test_rule_shape_mismatch_is_error() {
        assert!(impulse().check_rule(&RuleSet::correction()).is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let p = impulse().with_option(WaveOption::new(&[0, 0, 0, 0, 0]).unwrap());
        let summary = p.summary();
        assert_eq!(summary.idx_end, 21);
        let json = serde_json::to_string(&summary).unwrap();
        let back: PatternSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert!(!json.contains("rule"));
    }
}
