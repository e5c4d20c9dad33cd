//! Rule sets: named, ordered conditions over the waves of a pattern.
//!
//! Each [`Condition`] names the waves it reads by label and carries a plain
//! function over exactly that many monowaves (two, three or four). The built-in
//! sets encode the Elliott Wave constraints for impulses, leading diagonals, ABC
//! corrections and the narrow wave-2 retracement of a TD wave. Thresholds are the
//! literal constants of the theory and compared exactly as written.

use std::fmt;

use super::monowave::{Monowave, WaveLabel};
use super::options::WaveShape;
use super::pattern::WavePattern;
use crate::{Result, WaveError};

use WaveLabel::{Five, Four, One, Three, Two, A, B, C};

/// Predicate over two waves
pub type PairFn = fn(&Monowave, &Monowave) -> bool;
/// Predicate over three waves
pub type TripleFn = fn(&Monowave, &Monowave, &Monowave) -> bool;
/// Predicate over four waves
pub type QuadFn = fn(&Monowave, &Monowave, &Monowave, &Monowave) -> bool;

/// Operand labels and the predicate applied to the waves they resolve to
#[derive(Clone, Copy)]
pub enum Predicate {
    Pair([WaveLabel; 2], PairFn),
    Triple([WaveLabel; 3], TripleFn),
    Quad([WaveLabel; 4], QuadFn),
}

impl Predicate {
    pub fn labels(&self) -> &[WaveLabel] {
        match self {
            Predicate::Pair(l, _) => &l[..],
            Predicate::Triple(l, _) => &l[..],
            Predicate::Quad(l, _) => &l[..],
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.labels()).finish()
    }
}

/// One named check inside a [`RuleSet`]
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub name: &'static str,
    pub predicate: Predicate,
    /// Diagnostic reported when the check fails
    pub message: &'static str,
}

impl Condition {
    pub fn pair(
        name: &'static str,
        labels: [WaveLabel; 2],
        f: PairFn,
        message: &'static str,
    ) -> Self {
        Self {
            name,
            predicate: Predicate::Pair(labels, f),
            message,
        }
    }

    pub fn triple(
        name: &'static str,
        labels: [WaveLabel; 3],
        f: TripleFn,
        message: &'static str,
    ) -> Self {
        Self {
            name,
            predicate: Predicate::Triple(labels, f),
            message,
        }
    }

    pub fn quad(
        name: &'static str,
        labels: [WaveLabel; 4],
        f: QuadFn,
        message: &'static str,
    ) -> Self {
        Self {
            name,
            predicate: Predicate::Quad(labels, f),
            message,
        }
    }

    #[inline]
    pub fn labels(&self) -> &[WaveLabel] {
        self.predicate.labels()
    }

    /// Resolve the operand labels against `pattern` and apply the predicate.
    pub fn holds(&self, pattern: &WavePattern) -> Result<bool> {
        let wave = |label: WaveLabel| {
            pattern.wave(label).ok_or(WaveError::UnsupportedShape {
                waves: pattern.waves().len(),
                context: "condition references a wave the pattern does not have",
            })
        };

        Ok(match self.predicate {
            Predicate::Pair([a, b], f) => f(wave(a)?, wave(b)?),
            Predicate::Triple([a, b, c], f) => f(wave(a)?, wave(b)?, wave(c)?),
            Predicate::Quad([a, b, c, d], f) => f(wave(a)?, wave(b)?, wave(c)?, wave(d)?),
        })
    }
}

/// Outcome of evaluating a rule set against a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    /// First condition that failed; later ones were not evaluated
    Violated {
        condition: &'static str,
        message: &'static str,
    },
}

impl Verdict {
    #[inline]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }
}

// ============================================================
// RULE SET
// ============================================================

/// Named, ordered list of conditions for one pattern shape
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: &'static str,
    shape: WaveShape,
    conditions: Vec<Condition>,
}

impl RuleSet {
    pub fn new(name: &'static str, shape: WaveShape) -> Self {
        Self {
            name,
            shape,
            conditions: Vec::new(),
        }
    }

    /// Append a condition. Every label it reads must exist in this shape.
    pub fn with_condition(mut self, condition: Condition) -> Result<Self> {
        let foreign = condition
            .labels()
            .iter()
            .find(|&&l| self.shape.position(l).is_none());
        if let Some(&label) = foreign {
            return Err(WaveError::InvalidConfig(format!(
                "condition {} of rule set {} reads wave {label}, not part of a {}-wave pattern",
                condition.name,
                self.name,
                self.shape.len()
            )));
        }
        self.conditions.push(condition);
        Ok(self)
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn shape(&self) -> WaveShape {
        self.shape
    }

    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn condition(&self, name: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    // Built-in sets are checked by tests to only read labels of their shape.
    fn builtin(name: &'static str, shape: WaveShape, conditions: Vec<Condition>) -> Self {
        Self {
            name,
            shape,
            conditions,
        }
    }

    /// Standard 1-2-3-4-5 impulse
    pub fn impulse() -> Self {
        let mut conditions = wave2_conditions();
        conditions.extend(wave3_conditions());
        conditions.push(Condition::pair(
            "w4_1",
            [One, Four],
            |w1, w4| w4.low > w1.high,
            "End of Wave4 is lower than End of Wave1",
        ));
        conditions.push(wave4_length());
        conditions.extend(wave5_conditions());
        Self::builtin("impulse", WaveShape::FiveWave, conditions)
    }

    /// Impulse variant where wave 4 dips into wave 1 and the 1-3 and 2-4
    /// trendlines converge
    pub fn leading_diagonal() -> Self {
        let mut conditions = vec![Condition::quad(
            "w2_0",
            [One, Two, Three, Four],
            |w1, w2, w3, w4| {
                let upper = slope(w1.idx_end, w3.idx_end, w1.high, w3.high);
                let lower = slope(w2.idx_end, w4.idx_end, w2.low, w4.low);
                matches!((lower, upper), (Some(lower), Some(upper)) if lower > upper && upper > 0.0)
            },
            "Trend lines of Wave1-3 and Wave2-4 not forming Leading Diagonal.",
        )];
        conditions.extend(wave2_conditions());
        conditions.extend(wave3_conditions());
        conditions.push(Condition::pair(
            "w4_1",
            [One, Four],
            |w1, w4| w4.low < w1.high,
            "End of Wave4 is not lower than End of Wave1",
        ));
        conditions.push(wave4_length());
        conditions.extend(wave5_conditions());
        conditions.push(Condition::pair(
            "w5_3",
            [One, Five],
            |w1, w5| w5.length() > 0.70 * w1.length(),
            "Wave5 is shorter (value wise) than 0.70 x Wave1",
        ));
        conditions.push(Condition::pair(
            "w5_4",
            [Three, Five],
            |w3, w5| w5.length() < w3.length(),
            "Wave5 is not shorter (value wise) than Wave3",
        ));
        Self::builtin("leading diagonal", WaveShape::FiveWave, conditions)
    }

    /// A-B-C correction
    pub fn correction() -> Self {
        let conditions = vec![
            Condition::pair(
                "w2_1",
                [A, B],
                |a, b| a.high > b.high,
                "End of WaveB is higher than Start of WaveA.",
            ),
            Condition::pair(
                "w2_2",
                [A, C],
                |a, c| a.low > c.low,
                "End of WaveC is not lower than End of WaveA.",
            ),
            Condition::pair(
                "w2_3",
                [A, B],
                |a, b| a.length() > b.length(),
                "WaveB longer than WaveA.",
            ),
            Condition::pair(
                "w2_4",
                [A, B],
                |a, b| (b.duration() as f64) < 10.0 * a.duration() as f64,
                "WaveB longer (time wise) than 10 x WaveA.",
            ),
            Condition::pair(
                "w2_5",
                [A, C],
                |a, c| c.length() > 0.6 * a.length(),
                "WaveC shorter (value wise) than 0.60 x WaveA.",
            ),
            Condition::pair(
                "w2_6",
                [A, C],
                |a, c| c.length() < 2.61 * a.length(),
                "WaveC longer (value wise) than 2.61 x WaveA.",
            ),
            Condition::pair(
                "w2_7",
                [A, B],
                |a, b| b.length() < 0.618 * a.length(),
                "WaveB longer (value wise) than 0.618 x WaveA.",
            ),
            Condition::pair(
                "w3_1",
                [A, C],
                |a, c| (c.duration() as f64) < 10.0 * a.duration() as f64,
                "WaveC longer (time wise) than 10 x WaveA.",
            ),
            Condition::pair(
                "w3_2",
                [A, B],
                |a, b| b.length() > 0.35 * a.length(),
                "WaveB shorter (value wise) than 0.35 x WaveA.",
            ),
        ];
        Self::builtin("correction", WaveShape::ThreeWave, conditions)
    }

    /// 1-2 setup where wave 2 retraces close to the 61.8% level
    pub fn td_wave() -> Self {
        let conditions = vec![
            Condition::pair(
                "w2_1",
                [One, Two],
                |w1, w2| w2.length() > w1.length() * 0.59,
                "Wave2 corrected less than 59% of Wave1.",
            ),
            Condition::pair(
                "w2_2",
                [One, Two],
                |w1, w2| w2.length() < w1.length() * 0.64,
                "Wave2 corrected more than 64% of Wave1.",
            ),
            Condition::pair(
                "w2_3",
                [One, Two],
                |w1, w2| 9 * w2.duration() > w1.duration(),
                "Wave2 is longer than 9x Wave1",
            ),
        ];
        Self::builtin("td wave", WaveShape::TwoWave, conditions)
    }
}

fn wave2_conditions() -> Vec<Condition> {
    vec![
        Condition::pair(
            "w2_1",
            [One, Two],
            |w1, w2| w2.low > w1.low,
            "End of Wave2 is lower than Start of Wave1.",
        ),
        Condition::pair(
            "w2_2",
            [One, Two],
            |w1, w2| w2.length() >= 0.2 * w1.length(),
            "Wave2 is shorter than 20% of Wave1.",
        ),
        Condition::pair(
            "w2_3",
            [One, Two],
            |w1, w2| 9 * w2.duration() > w1.duration(),
            "Wave2 is longer than 9x Wave1",
        ),
    ]
}

fn wave3_conditions() -> Vec<Condition> {
    vec![
        Condition::triple(
            "w3_1",
            [One, Three, Five],
            |w1, w3, w5| !(w3.length() < w5.length() && w3.length() < w1.length()),
            "Wave3 is the shortest Wave.",
        ),
        Condition::pair(
            "w3_2",
            [One, Three],
            |w1, w3| w3.high > w1.high,
            "End of Wave3 is lower than End of Wave1",
        ),
        Condition::pair(
            "w3_3",
            [One, Three],
            |w1, w3| w3.length() >= w1.length() / 3.0,
            "Wave3 is shorter than 1/3 of Wave1",
        ),
        Condition::pair(
            "w3_4",
            [Two, Three],
            |w2, w3| w3.length() > w2.length(),
            "Wave3 shorter than Wave2",
        ),
        Condition::pair(
            "w3_5",
            [One, Three],
            |w1, w3| 7 * w3.duration() > w1.duration(),
            "Wave3 more than 7 times longer than Wave1.",
        ),
    ]
}

fn wave4_length() -> Condition {
    Condition::pair(
        "w4_2",
        [Two, Four],
        |w2, w4| w4.length() > w2.length() / 3.0,
        "Length of Wave4 is shorter than 1/3 of Wave2",
    )
}

fn wave5_conditions() -> Vec<Condition> {
    vec![
        Condition::pair(
            "w5_1",
            [Three, Five],
            |w3, w5| w3.high < w5.high,
            "End of Wave5 is lower than End of Wave3",
        ),
        Condition::pair(
            "w5_2",
            [One, Five],
            |w1, w5| w5.length() < 2.0 * w1.length(),
            "Wave5 is longer (value wise) than 2.0 x Wave1",
        ),
    ]
}

/// Slope of the line through `(x1, y1)` and `(x2, y2)`, `None` if vertical
fn slope(x1: usize, x2: usize, y1: f64, y2: f64) -> Option<f64> {
    let delta_x = x2 as f64 - x1 as f64;
    (delta_x != 0.0).then(|| (y2 - y1) / delta_x)
}
