//! Elliott impulse wave detection.
//!
//! Prices are reduced to alternating swing pivots with a percentage zig-zag,
//! then every run of six pivots is checked against the impulse rules:
//!
//! - wave 2 never retraces beyond the start of wave 1
//! - wave 3 is never the shortest of waves 1, 3 and 5
//! - wave 4 never enters wave 1's territory
//! - waves 3 and 5 make new extremes
//!
//! With Fibonacci validation on, wave 2 must retrace 23.6%..88.6% of wave 1
//! and wave 4 must retrace 23.6%..61.8% of wave 3.
//!
//! A five-pivot run at the end of the series that satisfies every rule that
//! can already be checked is reported as a developing impulse.

use chrono::NaiveDateTime;
use std::fmt::Write as _;

use crate::domain::ohlcv::Candle;
use crate::domain::signal::WaveAction;

const FIB_MIN: f64 = 0.236;
const FIB_WAVE2_MAX: f64 = 0.886;
const FIB_WAVE4_MAX: f64 = 0.618;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
    pub kind: PivotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Swing {
    Undecided,
    Rising,
    Falling,
}

/// Confirmed swing pivots of `prices`.
///
/// A swing extreme becomes a pivot once price has moved `min_swing_pct`
/// percent against it. The trailing, unconfirmed extreme is not reported.
pub fn find_pivots(prices: &[f64], min_swing_pct: f64) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    if prices.len() < 2 || min_swing_pct <= 0.0 {
        return pivots;
    }
    let f = min_swing_pct / 100.0;

    let mut state = Swing::Undecided;
    let (mut hi_idx, mut lo_idx) = (0usize, 0usize);
    let (mut ext_idx, mut ext) = (0usize, prices[0]);

    for (i, &p) in prices.iter().enumerate().skip(1) {
        match state {
            Swing::Undecided => {
                if p > prices[hi_idx] {
                    hi_idx = i;
                }
                if p < prices[lo_idx] {
                    lo_idx = i;
                }
                if p <= prices[hi_idx] * (1.0 - f) {
                    pivots.push(Pivot {
                        index: hi_idx,
                        price: prices[hi_idx],
                        kind: PivotKind::High,
                    });
                    state = Swing::Falling;
                    (ext_idx, ext) = (i, p);
                } else if p >= prices[lo_idx] * (1.0 + f) {
                    pivots.push(Pivot {
                        index: lo_idx,
                        price: prices[lo_idx],
                        kind: PivotKind::Low,
                    });
                    state = Swing::Rising;
                    (ext_idx, ext) = (i, p);
                }
            }
            Swing::Rising => {
                if p > ext {
                    (ext_idx, ext) = (i, p);
                } else if p <= ext * (1.0 - f) {
                    pivots.push(Pivot {
                        index: ext_idx,
                        price: ext,
                        kind: PivotKind::High,
                    });
                    state = Swing::Falling;
                    (ext_idx, ext) = (i, p);
                }
            }
            Swing::Falling => {
                if p < ext {
                    (ext_idx, ext) = (i, p);
                } else if p >= ext * (1.0 + f) {
                    pivots.push(Pivot {
                        index: ext_idx,
                        price: ext,
                        kind: PivotKind::Low,
                    });
                    state = Swing::Rising;
                    (ext_idx, ext) = (i, p);
                }
            }
        }
    }

    pivots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveDirection {
    Upward,
    Downward,
}

impl WaveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaveDirection::Upward => "UPWARD",
            WaveDirection::Downward => "DOWNWARD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveKind {
    Impulse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavePoint {
    pub index: usize,
    pub price: f64,
    pub time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub direction: WaveDirection,
    pub kind: WaveKind,
    pub points: Vec<WavePoint>,
    pub search_index: usize,
    pub confidence: f64,
}

impl Wave {
    pub fn last_index(&self) -> usize {
        self.points.iter().map(|p| p.index).max().unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= 6
    }
}

/// Confidence from the number of labelled points.
pub fn wave_confidence(points: usize) -> f64 {
    match points {
        n if n >= 6 => 0.9,
        5 => 0.8,
        n if n >= 3 => 0.6,
        _ => 0.3,
    }
}

/// Impulse rules on prices oriented so the impulse points up.
fn impulse_holds(v: &[f64], fib_validation: bool) -> bool {
    let (p0, p1, p2, p3, p4) = (v[0], v[1], v[2], v[3], v[4]);
    let w1 = p1 - p0;
    let w3 = p3 - p2;
    if !(w1 > 0.0 && p2 > p0 && p3 > p1 && p4 > p1 && p4 < p3) {
        return false;
    }

    if fib_validation {
        let r2 = (p1 - p2) / w1;
        let r4 = (p3 - p4) / w3;
        if !(FIB_MIN..=FIB_WAVE2_MAX).contains(&r2) || !(FIB_MIN..=FIB_WAVE4_MAX).contains(&r4) {
            return false;
        }
    }

    // Wave 3 can only be ruled the shortest once wave 5 exists.
    match v.get(5) {
        Some(&p5) => {
            let w5 = p5 - p4;
            p5 > p3 && !(w3 < w1 && w3 < w5)
        }
        None => true,
    }
}

fn orient(pivots: &[Pivot], direction: WaveDirection) -> Vec<f64> {
    pivots
        .iter()
        .map(|p| match direction {
            WaveDirection::Upward => p.price,
            WaveDirection::Downward => -p.price,
        })
        .collect()
}

fn start_kind(direction: WaveDirection) -> PivotKind {
    match direction {
        WaveDirection::Upward => PivotKind::Low,
        WaveDirection::Downward => PivotKind::High,
    }
}

/// Complete impulses (six points) plus a developing one at the tail.
pub fn detect_impulses(
    pivots: &[Pivot],
    direction: WaveDirection,
    fib_validation: bool,
) -> Vec<Vec<Pivot>> {
    let mut found = Vec::new();
    let first = start_kind(direction);

    for start in 0..pivots.len().saturating_sub(5) {
        let run = &pivots[start..start + 6];
        if run[0].kind == first && impulse_holds(&orient(run, direction), fib_validation) {
            found.push(run.to_vec());
        }
    }

    if pivots.len() >= 5 {
        let tail = &pivots[pivots.len() - 5..];
        if tail[0].kind == first && impulse_holds(&orient(tail, direction), fib_validation) {
            found.push(tail.to_vec());
        }
    }

    found
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveAnalyzer {
    pub min_wave_length: usize,
    pub swing_threshold_pct: f64,
    pub fib_validation: bool,
    pub both_directions: bool,
}

impl Default for WaveAnalyzer {
    fn default() -> Self {
        WaveAnalyzer {
            min_wave_length: 15,
            swing_threshold_pct: 1.0,
            fib_validation: true,
            both_directions: true,
        }
    }
}

impl WaveAnalyzer {
    /// Impulses in `candles` (closing prices). Point indices are relative to
    /// the slice.
    pub fn analyze(&self, candles: &[Candle]) -> Vec<Wave> {
        if candles.is_empty() || candles.len() < self.min_wave_length {
            return Vec::new();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let pivots = find_pivots(&closes, self.swing_threshold_pct);

        let mut directions = vec![WaveDirection::Upward];
        if self.both_directions {
            directions.push(WaveDirection::Downward);
        }

        directions
            .into_iter()
            .flat_map(|direction| {
                detect_impulses(&pivots, direction, self.fib_validation)
                    .into_iter()
                    .map(move |run| (direction, run))
            })
            .map(|(direction, run)| Wave {
                direction,
                kind: WaveKind::Impulse,
                search_index: run[0].index,
                confidence: wave_confidence(run.len()),
                points: run
                    .iter()
                    .map(|p| WavePoint {
                        index: p.index,
                        price: p.price,
                        time: candles.get(p.index).map(|c| c.close_time),
                    })
                    .collect(),
            })
            .filter(|w| w.points.len() >= 5)
            .collect()
    }
}

/// The most recent wave and what it suggests.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSignal {
    pub direction: WaveDirection,
    pub points: usize,
    pub confidence: f64,
    pub action: WaveAction,
    pub wave: Wave,
}

pub fn suggested_action(wave: &Wave) -> WaveAction {
    match (wave.direction, wave.points.len()) {
        (WaveDirection::Downward, n) if n >= 5 => WaveAction::ConsiderLong,
        (WaveDirection::Upward, n) if n >= 5 => WaveAction::ConsiderShort,
        _ => WaveAction::Hold,
    }
}

/// Pick the wave whose last point is most recent; ties go to the earlier
/// entry in `waves`.
pub fn latest_wave_signal(waves: &[Wave]) -> Option<WaveSignal> {
    let mut latest: Option<&Wave> = None;
    for wave in waves {
        if latest.is_none_or(|l| wave.last_index() > l.last_index()) {
            latest = Some(wave);
        }
    }
    latest.map(|wave| WaveSignal {
        direction: wave.direction,
        points: wave.points.len(),
        confidence: wave.confidence,
        action: suggested_action(wave),
        wave: wave.clone(),
    })
}

pub fn wave_summary(waves: &[Wave]) -> String {
    if waves.is_empty() {
        return "No Elliott waves detected.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "=== Elliott Wave Summary ===");
    let _ = writeln!(out, "Waves detected: {}", waves.len());
    for (i, wave) in waves.iter().enumerate() {
        let prices: Vec<String> = wave.points.iter().map(|p| format!("{:.4}", p.price)).collect();
        let _ = writeln!(out, "\nWave #{}:", i + 1);
        let _ = writeln!(out, "  Direction:  {}", wave.direction.as_str());
        let _ = writeln!(
            out,
            "  Points:     {}{}",
            wave.points.len(),
            if wave.is_complete() { "" } else { " (developing)" }
        );
        let _ = writeln!(out, "  Confidence: {:.2}", wave.confidence);
        let _ = writeln!(out, "  Prices:     [{}]", prices.join(", "));
        if let (Some(first), Some(last)) = (wave.points.first(), wave.points.last()) {
            if let (Some(t0), Some(t1)) = (first.time, last.time) {
                let _ = writeln!(out, "  Span:       {} -> {}", t0, t1);
            }
        }
    }
    out
}
