//! Integration tests for the Elliott Wave search.
//!
//! These tests drive the public API end to end on small synthetic series.

use std::collections::HashSet;

use elliott::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bars on straight legs between pivots, `high = mid + 0.5`, `low = mid - 0.5`
fn zigzag(pivots: &[(usize, f64)]) -> PriceSeries {
    let mut mids = Vec::new();
    for pair in pivots.windows(2) {
        let ((i0, p0), (i1, p1)) = (pair[0], pair[1]);
        let n = i1 - i0;
        for k in 0..n {
            mids.push(p0 + (p1 - p0) * k as f64 / n as f64);
        }
    }
    mids.push(pivots[pivots.len() - 1].1);

    let dates = (0..mids.len() as i64).collect();
    let lows = mids.iter().map(|m| m - 0.5).collect();
    let highs = mids.iter().map(|m| m + 0.5).collect();
    PriceSeries::new(dates, lows, highs).unwrap()
}

/// 12345 up to bar 21, then ABC down to bar 33
fn impulse_then_correction() -> PriceSeries {
    zigzag(&[
        (0, 10.0),
        (4, 20.0),
        (7, 15.0),
        (14, 35.0),
        (17, 28.0),
        (21, 40.0),
        (25, 30.0),
        (28, 35.0),
        (33, 22.0),
        (36, 30.0),
    ])
}

fn reference_series() -> PriceSeries {
    let lows = vec![10.0, 8.0, 12.0, 6.0, 10.0, 4.0, 8.0, 2.0, 6.0];
    let highs = vec![20.0, 18.0, 22.0, 16.0, 20.0, 14.0, 18.0, 12.0, 16.0];
    PriceSeries::new((0..9).collect(), lows, highs).unwrap()
}

// ============================================================
// MONOWAVES
// ============================================================

#[test]
fn test_degenerate_skip_on_reference_series() {
    let series = reference_series();
    let wave = Monowave::up(&series, 2, 1).unwrap();
    assert_eq!(wave.high, 22.0);
    assert_eq!(wave.high_idx, 2);
    assert_eq!(wave.low, 12.0);
}

#[test]
fn test_up_wave_from_last_bar_has_no_end() {
    let series = PriceSeries::new(
        (0..5).collect(),
        vec![9.0, 8.0, 7.0, 6.0, 5.0],
        vec![10.0, 9.0, 8.0, 7.0, 6.0],
    )
    .unwrap();
    assert!(Monowave::up(&series, 4, 0).is_none());
    assert!(Monowave::up(&series, 4, 3).is_none());

    // earlier starts end on their own bar instead
    let wave = Monowave::up(&series, 0, 0).unwrap();
    assert_eq!((wave.idx_start, wave.idx_end), (0, 0));
    assert_eq!(wave.duration(), 0);
}

#[test]
fn test_degree_promotion() {
    let series = impulse_then_correction();
    let analyzer = WaveAnalyzer::new(&series);
    let waves = analyzer
        .find_impulsive_wave(0, &WaveOption::zeros(WaveShape::FiveWave))
        .unwrap()
        .unwrap();
    let pattern = WavePattern::new(waves).unwrap();

    let promoted = Monowave::from_pattern(&pattern).unwrap();
    assert_eq!(promoted.direction, Direction::Up);
    assert_eq!(promoted.degree, 2);
    assert_eq!((promoted.idx_start, promoted.idx_end), (0, 21));
    assert_eq!(promoted.points(), [9.5, 40.5]);

    let td = WavePattern::new(pattern.waves()[..2].to_vec()).unwrap();
    assert!(matches!(
        Monowave::from_pattern(&td),
        Err(WaveError::UnsupportedShape { waves: 2, .. })
    ));
}

// ============================================================
// OPTIONS
// ============================================================

#[test]
fn test_option_ordering() {
    let a = WaveOption::new(&[0, 0, 0, 0, 0]).unwrap();
    let b = WaveOption::new(&[1, 0, 0, 0, 0]).unwrap();
    let c = WaveOption::new(&[1, 1, 0, 0, 0]).unwrap();
    assert!(a < b && b < c);

    let space = WaveOptionSpace::new(WaveShape::FiveWave, SkipBound::new(3).unwrap());
    let sorted = space.sorted_ascending();
    assert_eq!(&sorted[..3], &[a, b, c]);
    assert_eq!(sorted.len(), space.len());
}

// ============================================================
// PATTERNS AND RULES
// ============================================================

#[test]
fn test_pattern_bounds_follow_waves() {
    let series = impulse_then_correction();
    let analyzer = WaveAnalyzer::new(&series);
    let waves = analyzer
        .find_impulsive_wave(0, &WaveOption::zeros(WaveShape::FiveWave))
        .unwrap()
        .unwrap();
    let (first, last) = (waves[0], waves[4]);
    let pattern = WavePattern::new(waves).unwrap();

    assert_eq!(pattern.idx_start(), first.idx_start);
    assert_eq!(pattern.idx_end(), last.idx_end);
    assert_eq!(pattern.low(), first.low);
    assert_eq!(pattern.high(), last.high);
}

#[test]
fn test_wave4_overlap_fails_w4_1() {
    // wave 4 bottoms at 19, inside wave 1 (high 20.5)
    let series = zigzag(&[
        (0, 10.0),
        (4, 20.0),
        (7, 15.0),
        (14, 35.0),
        (18, 19.0),
        (22, 40.0),
        (23, 39.0),
    ]);
    let analyzer = WaveAnalyzer::new(&series);
    let waves = analyzer
        .find_impulsive_wave(0, &WaveOption::zeros(WaveShape::FiveWave))
        .unwrap()
        .unwrap();
    let pattern = WavePattern::new(waves).unwrap();

    match pattern.evaluate(&RuleSet::impulse()).unwrap() {
        Verdict::Violated { condition, .. } => assert_eq!(condition, "w4_1"),
        Verdict::Satisfied => panic!("overlapping wave 4 accepted as impulse"),
    }
}

#[test]
fn test_equal_extrema_dedup() {
    let series = impulse_then_correction();
    let analyzer = WaveAnalyzer::new(&series);
    let waves = analyzer
        .find_impulsive_wave(0, &WaveOption::zeros(WaveShape::FiveWave))
        .unwrap()
        .unwrap();

    let mut shifted = waves.clone();
    shifted[4].skip = 4;
    shifted[4].idx_end += 1;

    let a = WavePattern::new(waves)
        .unwrap()
        .with_option(WaveOption::new(&[1, 2, 3, 4, 5]).unwrap());
    let b = WavePattern::new(shifted)
        .unwrap()
        .with_option(WaveOption::new(&[1, 2, 3, 4, 10]).unwrap());
    assert_eq!(a, b);

    let set: HashSet<_> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_summary_for_rendering() {
    init_logging();
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new().impulse_up_to(2).build(&series).unwrap();
    let outcome = analyzer.find_impulses(0).unwrap();

    let summary = outcome.matches[0].summary();
    assert_eq!(
        summary.labels,
        [" ", "1", " ", "2 (0.545)", " ", "3 (1.909)", " ", "4", " ", "5"]
    );
    assert_eq!(summary.values[..2], [9.5, 20.5]);
    assert_eq!(summary.dates.len(), 10);
    assert_eq!((summary.idx_start, summary.idx_end, summary.degree), (0, 21, 1));
    assert_eq!(summary.option, Some(vec![0, 0, 0, 0, 0]));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["rule"], "impulse");
}

// ============================================================
// SEARCH
// ============================================================

#[test]
fn test_find_impulses_distinct_and_ordered() {
    init_logging();
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new().impulse_up_to(4).build(&series).unwrap();
    let outcome = analyzer.find_impulses(0).unwrap();

    assert!(!outcome.matches.is_empty());
    let patterns: HashSet<_> = outcome.matches.iter().map(|m| m.pattern.clone()).collect();
    assert_eq!(patterns.len(), outcome.matches.len());
    assert!(outcome.matches.windows(2).all(|w| w[0].option < w[1].option));
    for found in &outcome.matches {
        assert!(["impulse", "leading diagonal"].contains(&found.rule));
    }
}

#[test]
fn test_find_corrections() {
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new().correction_up_to(3).build(&series).unwrap();
    let outcome = analyzer.find_corrections(21).unwrap();

    let first = &outcome.matches[0];
    assert_eq!(first.rule, "correction");
    assert_eq!(first.pattern.idx_end(), 33);
    assert_eq!(first.pattern.wave(WaveLabel::C).unwrap().low, 21.5);
}

#[test]
fn test_find_td_waves() {
    // wave 2 retraces 62% of wave 1
    let series = zigzag(&[(0, 100.0), (5, 200.0), (9, 138.0), (12, 170.0)]);
    let analyzer = AnalyzerBuilder::new().td_up_to(2).build(&series).unwrap();
    let outcome = analyzer.find_td_waves(0).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].rule, "td wave");
    assert_eq!(outcome.matches[0].pattern.idx_end(), 9);
}

#[test]
fn test_custom_rule_set_search() {
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new().correction_up_to(2).build(&series).unwrap();
    let deep = RuleSet::new("deep c", WaveShape::ThreeWave)
        .with_condition(Condition::pair(
            "c_1",
            [WaveLabel::A, WaveLabel::C],
            |a, c| c.length() > a.length(),
            "WaveC not longer than WaveA",
        ))
        .unwrap();

    let outcome = analyzer
        .search(21, &analyzer.correction_options(), &[deep])
        .unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].rule, "deep c");
}

#[test]
fn test_cycles_pair_adjacent_patterns() {
    init_logging();
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new()
        .combinatorial_limits(3, 3)
        .build(&series)
        .unwrap();

    let cycles: Vec<WaveCycle> = analyzer
        .next_cycle(0)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    assert!(!cycles.is_empty());
    for cycle in &cycles {
        assert_eq!(cycle.correction().idx_start(), cycle.impulse().idx_end());
        assert!(cycle.impulse().check_rule(&RuleSet::impulse()).unwrap());
        assert!(cycle.correction().check_rule(&RuleSet::correction()).unwrap());
    }
    let distinct: HashSet<_> = cycles.iter().cloned().collect();
    assert_eq!(distinct.len(), cycles.len());
}

#[test]
fn test_cycle_search_respects_budget() {
    let series = impulse_then_correction();
    let analyzer = AnalyzerBuilder::new().max_candidates(3).build(&series).unwrap();
    let mut cycles = analyzer.next_cycle(0).unwrap();
    while cycles.next().is_some() {}
    assert_eq!(cycles.candidates_tried(), 3);
    assert_eq!(cycles.stopped(), Some(StopReason::MaxCandidates));
}

#[test]
fn test_invalid_inputs_rejected_before_search() {
    assert!(PriceSeries::new(vec![0, 1, 2], vec![1.0, 2.0], vec![2.0, 3.0]).is_err());

    let series = reference_series();
    let analyzer = WaveAnalyzer::new(&series);
    assert!(matches!(
        analyzer.find_corrections(9),
        Err(WaveError::StartOutOfRange { index: 9, len: 9 })
    ));
}
