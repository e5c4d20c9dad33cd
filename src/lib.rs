//! # Elliott - Elliott Wave detection
//!
//! Finds 5-wave impulses, 3-wave corrections and their variants in price series by
//! decomposing the series into monowaves and checking every skip combination
//! against rule sets.
//!
//! ## Quick Start
//!
//! ```rust
//! use elliott::prelude::*;
//!
//! let highs = vec![11.0, 14.0, 17.0, 15.0, 13.0, 19.0, 23.0, 27.0, 24.0, 22.0, 26.0, 30.0, 28.0];
//! let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
//! let dates: Vec<i64> = (0..highs.len() as i64).collect();
//! let series = PriceSeries::new(dates, lows, highs)?;
//!
//! let analyzer = AnalyzerBuilder::new()
//!     .impulse_up_to(4)
//!     .max_matches(10)
//!     .build(&series)?;
//!
//! let outcome = analyzer.find_impulses(series.absolute_low_index())?;
//! for found in &outcome.matches {
//!     println!("{} {} {:?}", found.rule, found.option, found.pattern.values());
//! }
//! # Ok::<(), elliott::WaveError>(())
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub mod waves;

use waves::scanner::min_in;
use waves::{
    Monowave, PatternSummary, RuleSet, WaveCycle, WaveOption, WaveOptionIter, WaveOptionSpace,
    WavePattern, WaveShape,
};

pub mod prelude {
    pub use crate::{
        // Parallel
        scan_parallel,
        // Waves
        waves::{
            first_high, first_low, next_high, next_low, Condition, Direction, Monowave,
            PatternSummary, Predicate, RuleSet, Verdict, WaveCycle, WaveLabel, WaveOption,
            WaveOptionSpace, WavePattern, WaveShape,
        },
        // Analyzer
        AnalyzerBuilder,
        AnalyzerConfig,
        CycleIter,
        // Input
        PriceSeries,
        Result,
        ScanError,
        ScanResult,
        SearchBudget,
        SearchOutcome,
        SkipBound,
        StopReason,
        WaveAnalyzer,
        // Errors
        WaveError,
        WaveMatch,
        OHLC,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, WaveError>;

/// Errors raised before or outside the search.
///
/// A monowave without an end and a pattern breaking a rule are normal search
/// outcomes (`None` and [`waves::Verdict::Violated`]), never errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaveError {
    #[error("Length mismatch: {lows} lows, {highs} highs, {dates} dates")]
    LengthMismatch {
        lows: usize,
        highs: usize,
        dates: usize,
    },

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Start index {index} out of range for {len} bars")]
    StartOutOfRange { index: usize, len: usize },

    #[error("Invalid price at index {index}: {reason}")]
    InvalidPrice { index: usize, reason: &'static str },

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported shape ({waves} waves): {context}")]
    UnsupportedShape { waves: usize, context: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Largest accepted skip bound. Five-wave spaces grow as `(n-1)^5`.
pub const MAX_SKIP_BOUND: usize = 25;

/// Exclusive upper bound on skip counts, in `1..=MAX_SKIP_BOUND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SkipBound(usize);

impl SkipBound {
    pub fn new(value: usize) -> Result<Self> {
        if !(1..=MAX_SKIP_BOUND).contains(&value) {
            return Err(WaveError::OutOfRange {
                field: "SkipBound",
                value,
                min: 1,
                max: MAX_SKIP_BOUND,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for SkipBound {
    fn default() -> Self {
        Self::new_const(10)
    }
}

impl serde::Serialize for SkipBound {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for SkipBound {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        SkipBound::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// PRICE DATA
// ============================================================

/// Bar with a high and a low
pub trait OHLC {
    fn high(&self) -> f64;
    fn low(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

impl<T: OHLC + ?Sized> OHLC for &T {
    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn timestamp(&self) -> Option<i64> {
        (**self).timestamp()
    }
}

/// Aligned dates, lows and highs of one instrument.
///
/// Never empty; all three columns have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    dates: Vec<i64>,
    lows: Vec<f64>,
    highs: Vec<f64>,
}

impl PriceSeries {
    pub fn new(dates: Vec<i64>, lows: Vec<f64>, highs: Vec<f64>) -> Result<Self> {
        if dates.len() != lows.len() || lows.len() != highs.len() {
            return Err(WaveError::LengthMismatch {
                lows: lows.len(),
                highs: highs.len(),
                dates: dates.len(),
            });
        }
        if lows.is_empty() {
            return Err(WaveError::InsufficientData { need: 1, got: 0 });
        }
        Ok(Self { dates, lows, highs })
    }

    /// Collect a series from bars. Bars without a timestamp are dated by index.
    pub fn from_bars<T: OHLC>(bars: &[T]) -> Result<Self> {
        let dates = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| bar.timestamp().unwrap_or(i as i64))
            .collect();
        let lows = bars.iter().map(|bar| bar.low()).collect();
        let highs = bars.iter().map(|bar| bar.high()).collect();
        Self::new(dates, lows, highs)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lows.is_empty()
    }

    #[inline]
    pub fn lows(&self) -> &[f64] {
        &self.lows
    }

    #[inline]
    pub fn highs(&self) -> &[f64] {
        &self.highs
    }

    #[inline]
    pub fn dates(&self) -> &[i64] {
        &self.dates
    }

    /// Strict check: finite prices and `high >= low` on every bar
    pub fn validate(&self) -> Result<()> {
        for (index, (&low, &high)) in self.lows.iter().zip(&self.highs).enumerate() {
            if !low.is_finite() || !high.is_finite() {
                return Err(WaveError::InvalidPrice {
                    index,
                    reason: "price is NaN or infinite",
                });
            }
            if high < low {
                return Err(WaveError::InvalidPrice {
                    index,
                    reason: "high below low",
                });
            }
        }
        Ok(())
    }

    /// Index of the lowest low (first one on ties), the usual search start
    pub fn absolute_low_index(&self) -> usize {
        self.lows
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i)
    }

    /// Index of the highest high
    pub fn absolute_high_index(&self) -> usize {
        self.highs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i)
    }
}

// ============================================================
// SEARCH CONFIG
// ============================================================

/// Limits that make a search stop early.
///
/// `deadline` and `cancel` are runtime-only and never serialized.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    /// Stop after this many accepted patterns
    pub max_matches: Option<usize>,
    /// Stop after trying this many options
    pub max_candidates: Option<usize>,
    #[serde(skip)]
    pub deadline: Option<Instant>,
    #[serde(skip)]
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchBudget {
    /// Cancellation or deadline hit, checked between candidates
    pub fn interrupted(&self) -> Option<StopReason> {
        if self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Some(StopReason::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(StopReason::Deadline);
        }
        None
    }

    fn validate(&self) -> Result<()> {
        if self.max_matches == Some(0) {
            return Err(WaveError::InvalidValue("max_matches must be > 0"));
        }
        if self.max_candidates == Some(0) {
            return Err(WaveError::InvalidValue("max_candidates must be > 0"));
        }
        Ok(())
    }
}

/// Analyzer configuration
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Skip bound of the 5-wave space
    pub impulse_up_to: SkipBound,
    /// Skip bound of the 3-wave space
    pub correction_up_to: SkipBound,
    /// Skip bound of the 2-wave space
    pub td_up_to: SkipBound,
    /// Run [`PriceSeries::validate`] when building
    pub validate_data: bool,
    pub budget: SearchBudget,
}

/// Why a search ended before exhausting its option space
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    MaxMatches,
    MaxCandidates,
    Deadline,
    Cancelled,
}

/// Budget bookkeeping for one search
#[derive(Debug)]
struct SearchGuard<'a> {
    budget: &'a SearchBudget,
    candidates: usize,
    matches: usize,
    stopped: Option<StopReason>,
}

impl<'a> SearchGuard<'a> {
    fn new(budget: &'a SearchBudget) -> Self {
        Self {
            budget,
            candidates: 0,
            matches: 0,
            stopped: None,
        }
    }

    /// Count one more candidate, or refuse once the budget is spent
    fn admit_candidate(&mut self) -> bool {
        if self.stopped.is_some() {
            return false;
        }
        if self.budget.max_candidates.is_some_and(|max| self.candidates >= max) {
            self.stop(StopReason::MaxCandidates);
            return false;
        }
        if let Some(reason) = self.budget.interrupted() {
            self.stop(reason);
            return false;
        }
        self.candidates += 1;
        true
    }

    /// Count an accepted pattern. False once `max_matches` is reached.
    fn record_match(&mut self) -> bool {
        self.matches += 1;
        if self.budget.max_matches.is_some_and(|max| self.matches >= max) {
            self.stop(StopReason::MaxMatches);
            return false;
        }
        true
    }

    fn stop(&mut self, reason: StopReason) {
        log::warn!(
            "search stopped early ({reason:?}) after {} candidates, {} matches",
            self.candidates,
            self.matches
        );
        self.stopped = Some(reason);
    }
}

// ============================================================
// WAVE ANALYZER
// ============================================================

/// A pattern that satisfied one of the searched rule sets
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WaveMatch {
    pub pattern: WavePattern,
    /// Name of the first rule set the pattern satisfied
    pub rule: &'static str,
    pub option: WaveOption,
}

impl WaveMatch {
    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            rule: Some(self.rule.to_string()),
            ..self.pattern.summary()
        }
    }
}

/// Result of an option-space search
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Distinct accepted patterns, in ascending option order
    pub matches: Vec<WaveMatch>,
    pub candidates_tried: usize,
    /// Set when the budget ended the search
    pub stopped: Option<StopReason>,
}

/// Searches one price series for wave patterns
#[derive(Debug, Clone)]
pub struct WaveAnalyzer<'s> {
    series: &'s PriceSeries,
    config: AnalyzerConfig,
}

impl<'s> WaveAnalyzer<'s> {
    /// Analyzer with the default configuration
    pub fn new(series: &'s PriceSeries) -> Self {
        Self {
            series,
            config: AnalyzerConfig::default(),
        }
    }

    #[inline]
    pub fn series(&self) -> &'s PriceSeries {
        self.series
    }

    #[inline]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Change the skip bounds of the 5-wave (`n_up`) and 3-wave (`n_down`) spaces
    pub fn set_combinatorial_limits(&mut self, n_up: usize, n_down: usize) -> Result<()> {
        self.config.impulse_up_to = SkipBound::new(n_up)?;
        self.config.correction_up_to = SkipBound::new(n_down)?;
        Ok(())
    }

    pub fn impulse_options(&self) -> WaveOptionSpace {
        WaveOptionSpace::new(WaveShape::FiveWave, self.config.impulse_up_to)
    }

    pub fn correction_options(&self) -> WaveOptionSpace {
        WaveOptionSpace::new(WaveShape::ThreeWave, self.config.correction_up_to)
    }

    pub fn td_options(&self) -> WaveOptionSpace {
        WaveOptionSpace::new(WaveShape::TwoWave, self.config.td_up_to)
    }

    // ===========================================
    // Single option
    // ===========================================

    /// Up, down, up, down, up from `idx_start` with the skips of `option`.
    ///
    /// Beyond each monowave having an end, wave 2 must hold the lowest low up to
    /// wave 4 and wave 4 the lowest low up to the top of wave 5.
    pub fn find_impulsive_wave(
        &self,
        idx_start: usize,
        option: &WaveOption,
    ) -> Result<Option<Vec<Monowave>>> {
        self.find_waves(idx_start, option, WaveShape::FiveWave)
    }

    /// Down, up, down (A-B-C) from `idx_start`
    pub fn find_corrective_wave(
        &self,
        idx_start: usize,
        option: &WaveOption,
    ) -> Result<Option<Vec<Monowave>>> {
        self.find_waves(idx_start, option, WaveShape::ThreeWave)
    }

    /// Up, down (1-2) from `idx_start`
    pub fn find_td_wave(
        &self,
        idx_start: usize,
        option: &WaveOption,
    ) -> Result<Option<Vec<Monowave>>> {
        self.find_waves(idx_start, option, WaveShape::TwoWave)
    }

    // ===========================================
    // Option space
    // ===========================================

    /// Impulses and leading diagonals from `idx_start`
    pub fn find_impulses(&self, idx_start: usize) -> Result<SearchOutcome> {
        self.search(
            idx_start,
            &self.impulse_options(),
            &[RuleSet::impulse(), RuleSet::leading_diagonal()],
        )
    }

    /// ABC corrections from `idx_start`
    pub fn find_corrections(&self, idx_start: usize) -> Result<SearchOutcome> {
        self.search(idx_start, &self.correction_options(), &[RuleSet::correction()])
    }

    /// TD waves from `idx_start`
    pub fn find_td_waves(&self, idx_start: usize) -> Result<SearchOutcome> {
        self.search(idx_start, &self.td_options(), &[RuleSet::td_wave()])
    }

    /// Walk `space` in ascending order, keeping each distinct pattern that
    /// satisfies one of `rule_sets` (checked in the given order).
    pub fn search(
        &self,
        idx_start: usize,
        space: &WaveOptionSpace,
        rule_sets: &[RuleSet],
    ) -> Result<SearchOutcome> {
        self.check_start(idx_start)?;
        check_rule_shapes(space.shape(), rule_sets)?;

        let mut guard = SearchGuard::new(&self.config.budget);
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for option in space {
            if !guard.admit_candidate() {
                break;
            }
            let Some(found) = self.evaluate_option(idx_start, &option, rule_sets)? else {
                continue;
            };
            if !seen.insert(found.pattern.clone()) {
                continue;
            }
            matches.push(found);
            if !guard.record_match() {
                break;
            }
        }

        log::info!(
            "{:?} search from {idx_start}: {} of {} options tried, {} patterns found",
            space.shape(),
            guard.candidates,
            space.len(),
            matches.len()
        );

        Ok(SearchOutcome {
            matches,
            candidates_tried: guard.candidates,
            stopped: guard.stopped,
        })
    }

    /// [`find_impulses`](Self::find_impulses) with options evaluated on the
    /// rayon pool.
    ///
    /// Without a deadline or cancellation the outcome equals the sequential one.
    pub fn find_impulses_parallel(&self, idx_start: usize) -> Result<SearchOutcome> {
        self.search_parallel(
            idx_start,
            &self.impulse_options(),
            &[RuleSet::impulse(), RuleSet::leading_diagonal()],
        )
    }

    /// Parallel [`search`](Self::search)
    pub fn search_parallel(
        &self,
        idx_start: usize,
        space: &WaveOptionSpace,
        rule_sets: &[RuleSet],
    ) -> Result<SearchOutcome> {
        self.check_start(idx_start)?;
        check_rule_shapes(space.shape(), rule_sets)?;

        let budget = &self.config.budget;
        let mut options = space.sorted_ascending();
        let mut stopped = None;
        if let Some(max) = budget.max_candidates {
            if options.len() > max {
                options.truncate(max);
                stopped = Some(StopReason::MaxCandidates);
            }
        }

        let evaluated = options
            .par_iter()
            .map(|option| match budget.interrupted() {
                Some(reason) => Ok(Err(reason)),
                None => self.evaluate_option(idx_start, option, rule_sets).map(Ok),
            })
            .collect::<Result<Vec<_>>>()?;

        // merge in option order so dedup keeps the smallest option
        let mut guard = SearchGuard::new(budget);
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for result in evaluated {
            let found = match result {
                Ok(found) => found,
                Err(reason) => {
                    guard.stop(reason);
                    break;
                }
            };
            guard.candidates += 1;
            let Some(found) = found else { continue };
            if !seen.insert(found.pattern.clone()) {
                continue;
            }
            matches.push(found);
            if !guard.record_match() {
                break;
            }
        }

        log::info!(
            "{:?} parallel search from {idx_start}: {} options evaluated, {} patterns found",
            space.shape(),
            guard.candidates,
            matches.len()
        );

        Ok(SearchOutcome {
            matches,
            candidates_tried: guard.candidates,
            stopped: guard.stopped.or(stopped),
        })
    }

    // ===========================================
    // Cycles
    // ===========================================

    /// Lazily pair impulses with the corrections that follow them.
    ///
    /// The outer loop walks the 5-wave space ascending; for every impulse it walks
    /// the whole 3-wave space from the impulse end. Equal cycles are yielded once.
    /// The search budget applies to impulse and correction candidates alike.
    pub fn next_cycle(&self, start: usize) -> Result<CycleIter<'_>> {
        self.check_start(start)?;
        Ok(CycleIter {
            analyzer: self,
            start,
            impulses: self.impulse_options().iter(),
            current: None,
            seen: HashSet::new(),
            guard: SearchGuard::new(&self.config.budget),
            impulse_rules: RuleSet::impulse(),
            correction_rules: RuleSet::correction(),
            failed: false,
        })
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn check_start(&self, idx_start: usize) -> Result<()> {
        if idx_start >= self.series.len() {
            return Err(WaveError::StartOutOfRange {
                index: idx_start,
                len: self.series.len(),
            });
        }
        Ok(())
    }

    fn find_waves(
        &self,
        idx_start: usize,
        option: &WaveOption,
        shape: WaveShape,
    ) -> Result<Option<Vec<Monowave>>> {
        self.check_start(idx_start)?;
        if option.shape() != shape {
            return Err(WaveError::UnsupportedShape {
                waves: option.len(),
                context: "wave option does not match the searched shape",
            });
        }
        Ok(self.build_waves(idx_start, option))
    }

    /// Chain monowaves in the directions of the option's shape, each starting
    /// where the previous one ended.
    /// A wave that ends on its own start bar drops the candidate.
    fn build_waves(&self, idx_start: usize, option: &WaveOption) -> Option<Vec<Monowave>> {
        let shape = option.shape();
        let mut waves = Vec::with_capacity(shape.len());
        let mut idx = idx_start;

        let steps = shape.directions().iter().zip(shape.labels()).zip(option.values());
        for ((&direction, &label), &skip) in steps {
            let Some(wave) = Monowave::new(direction, self.series, idx, skip) else {
                log::trace!("wave {label} has no end in data (option {option})");
                return None;
            };
            if wave.idx_end == wave.idx_start {
                log::trace!("wave {label} ends on its start bar (option {option})");
                return None;
            }
            idx = wave.idx_end;
            waves.push(wave.with_label(label));

            if shape == WaveShape::FiveWave && !self.impulse_lows_hold(&waves) {
                log::trace!("impulse lows undercut after wave {label} (option {option})");
                return None;
            }
        }

        Some(waves)
    }

    /// Wave 2 must stay the lowest low until wave 4 ends, and wave 4 until wave 5
    /// tops. Checked as soon as the later wave exists.
    fn impulse_lows_hold(&self, waves: &[Monowave]) -> bool {
        let lows = self.series.lows();
        match waves {
            [_, w2, _, w4] => !min_in(lows, w2.low_idx, w4.low_idx).is_some_and(|m| w2.low > m),
            [_, _, _, w4, w5] => !min_in(lows, w4.low_idx, w5.high_idx).is_some_and(|m| w4.low > m),
            _ => true,
        }
    }

    fn evaluate_option(
        &self,
        idx_start: usize,
        option: &WaveOption,
        rule_sets: &[RuleSet],
    ) -> Result<Option<WaveMatch>> {
        let Some(waves) = self.build_waves(idx_start, option) else {
            return Ok(None);
        };
        let pattern = WavePattern::new(waves)?.with_option(*option);

        for rules in rule_sets {
            if pattern.check_rule(rules)? {
                log::debug!("{} found with option {option}", rules.name());
                return Ok(Some(WaveMatch {
                    pattern,
                    rule: rules.name(),
                    option: *option,
                }));
            }
        }
        Ok(None)
    }
}

fn check_rule_shapes(shape: WaveShape, rule_sets: &[RuleSet]) -> Result<()> {
    match rule_sets.iter().find(|rules| rules.shape() != shape) {
        Some(rules) => Err(WaveError::InvalidConfig(format!(
            "rule set {} checks {} waves, search builds {}",
            rules.name(),
            rules.shape().len(),
            shape.len()
        ))),
        None => Ok(()),
    }
}

// ============================================================
// CYCLE ITERATOR
// ============================================================

/// Lazy sequence of [`WaveCycle`]s, see [`WaveAnalyzer::next_cycle`]
pub struct CycleIter<'a> {
    analyzer: &'a WaveAnalyzer<'a>,
    start: usize,
    impulses: WaveOptionIter,
    /// Accepted impulse and the corrections still to try after it
    current: Option<(WavePattern, WaveOptionIter)>,
    seen: HashSet<WaveCycle>,
    guard: SearchGuard<'a>,
    impulse_rules: RuleSet,
    correction_rules: RuleSet,
    failed: bool,
}

impl<'a> CycleIter<'a> {
    /// Candidates tried so far, impulses and corrections together
    pub fn candidates_tried(&self) -> usize {
        self.guard.candidates
    }

    pub fn stopped(&self) -> Option<StopReason> {
        self.guard.stopped
    }

    fn advance(&mut self) -> Result<Option<WaveCycle>> {
        loop {
            if let Some((impulse, corrections)) = &mut self.current {
                for option in corrections.by_ref() {
                    if !self.guard.admit_candidate() {
                        return Ok(None);
                    }
                    let Some(waves) = self.analyzer.build_waves(impulse.idx_end(), &option) else {
                        continue;
                    };
                    let correction = WavePattern::new(waves)?.with_option(option);
                    if !correction.check_rule(&self.correction_rules)? {
                        continue;
                    }

                    let cycle = WaveCycle::new(impulse.clone(), correction)?;
                    if self.seen.insert(cycle.clone()) {
                        log::debug!("cycle found: correction option {option}");
                        self.guard.record_match();
                        return Ok(Some(cycle));
                    }
                }
                self.current = None;
            }

            let Some(option) = self.impulses.next() else {
                log::info!(
                    "cycle search from {}: {} candidates tried, {} cycles found",
                    self.start,
                    self.guard.candidates,
                    self.seen.len()
                );
                return Ok(None);
            };
            if !self.guard.admit_candidate() {
                return Ok(None);
            }
            let Some(waves) = self.analyzer.build_waves(self.start, &option) else {
                continue;
            };
            let impulse = WavePattern::new(waves)?.with_option(option);
            if impulse.check_rule(&self.impulse_rules)? {
                log::debug!("impulse found with option {option}");
                let corrections = self.analyzer.correction_options().iter();
                self.current = Some((impulse, corrections));
            }
        }
    }
}

impl<'a> Iterator for CycleIter<'a> {
    type Item = Result<WaveCycle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.advance();
        self.failed = next.is_err();
        next.transpose()
    }
}

impl<'a> std::iter::FusedIterator for CycleIter<'a> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`WaveAnalyzer`]. Values are checked in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct AnalyzerBuilder {
    impulse_up_to: usize,
    correction_up_to: usize,
    td_up_to: usize,
    validate_data: bool,
    budget: SearchBudget,
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::from_config(AnalyzerConfig::default())
    }

    fn from_config(config: AnalyzerConfig) -> Self {
        Self {
            impulse_up_to: config.impulse_up_to.get(),
            correction_up_to: config.correction_up_to.get(),
            td_up_to: config.td_up_to.get(),
            validate_data: config.validate_data,
            budget: config.budget,
        }
    }

    /// Replace every setting with `config`
    pub fn config(self, config: AnalyzerConfig) -> Self {
        Self::from_config(config)
    }

    pub fn impulse_up_to(mut self, n: usize) -> Self {
        self.impulse_up_to = n;
        self
    }

    pub fn correction_up_to(mut self, n: usize) -> Self {
        self.correction_up_to = n;
        self
    }

    pub fn td_up_to(mut self, n: usize) -> Self {
        self.td_up_to = n;
        self
    }

    /// Skip bounds of the 5-wave and 3-wave spaces at once
    pub fn combinatorial_limits(self, n_up: usize, n_down: usize) -> Self {
        self.impulse_up_to(n_up).correction_up_to(n_down)
    }

    /// Enable/disable strict price validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    pub fn max_matches(mut self, n: usize) -> Self {
        self.budget.max_matches = Some(n);
        self
    }

    pub fn max_candidates(mut self, n: usize) -> Self {
        self.budget.max_candidates = Some(n);
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.budget.deadline = Some(deadline);
        self
    }

    /// Searches stop once `flag` is set
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.budget.cancel = Some(flag);
        self
    }

    /// Validated configuration, without a series
    pub fn build_config(self) -> Result<AnalyzerConfig> {
        self.budget.validate()?;
        Ok(AnalyzerConfig {
            impulse_up_to: SkipBound::new(self.impulse_up_to)?,
            correction_up_to: SkipBound::new(self.correction_up_to)?,
            td_up_to: SkipBound::new(self.td_up_to)?,
            validate_data: self.validate_data,
            budget: self.budget,
        })
    }

    /// Build an analyzer over `series`
    pub fn build(self, series: &PriceSeries) -> Result<WaveAnalyzer<'_>> {
        let config = self.build_config()?;
        if config.validate_data {
            series.validate()?;
        }
        Ok(WaveAnalyzer { series, config })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Impulses found in a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    /// Search start, the instrument's absolute low
    pub start: usize,
    pub outcome: SearchOutcome,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: WaveError,
}

/// Search every instrument for impulses from its absolute low, in parallel
pub fn scan_parallel<'a, I>(
    config: &AnalyzerConfig,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a PriceSeries)>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, series)| {
            let start = series.absolute_low_index();
            AnalyzerBuilder::new()
                .config(config.clone())
                .build(series)
                .and_then(|analyzer| analyzer.find_impulses(start))
                .map(|outcome| ScanResult {
                    symbol: symbol.to_string(),
                    start,
                    outcome,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    log::info!(
        "scanned {} instruments, {} failed",
        successes.len() + errors.len(),
        errors.len()
    );

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
