// strategy.rs - Per-family search grids and the size-targeting fold

use crate::candidate::{Candidate, SearchStep};
use crate::error::EncodeError;
use crate::settings::{CompressionSettings, SearchConfig};
use crate::source::CodecFamily;
use tracing::debug;

/// Per-image numbers every strategy starts from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPlan {
    /// Target with the safety margin applied
    pub effective_target: f64,
    /// Linear scale expected to land near the target at full quality
    pub initial_scale: f64,
}

impl SearchPlan {
    pub fn new(original_size: u64, settings: &CompressionSettings, config: &SearchConfig) -> Self {
        let effective_target = config.effective_target(settings);
        // Encoded size tracks pixel count, so sqrt of the size ratio per axis
        let initial_scale = (effective_target / original_size.max(1) as f64)
            .sqrt()
            .min(1.0);
        Self {
            effective_target,
            initial_scale,
        }
    }

    fn distance(&self, size: u64) -> f64 {
        (size as f64 - self.effective_target).abs()
    }
}

/// A grid of steps plus the band that stops the search early.
///
/// Grid scales are multipliers on [`SearchPlan::initial_scale`]. Rows are
/// walked in order; inside a row steps go from most to least faithful.
pub trait SearchStrategy: Send + Sync {
    fn family(&self) -> CodecFamily;

    fn grid(&self) -> &[Vec<SearchStep>];

    /// Lower edge of the acceptance band as a fraction of the effective target
    fn band_floor(&self) -> f64;

    /// Whether an undershooting candidate ends the current row
    fn advance_on_undershoot(&self) -> bool {
        false
    }

    /// Worst-case number of encoder calls for one image
    fn max_calls(&self) -> usize {
        self.grid().iter().map(Vec::len).sum()
    }
}

/// PNG-like codecs: quality first, resolution only once quality runs out
pub struct PaletteStrategy {
    grid: Vec<Vec<SearchStep>>,
    band_floor: f64,
}

impl PaletteStrategy {
    const QUALITIES: [f64; 8] = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3];
    const SCALES: [f64; 8] = [1.0, 1.0, 1.0, 1.0, 0.95, 0.9, 0.85, 0.8];

    pub fn new(config: &SearchConfig) -> Self {
        let row = Self::SCALES
            .iter()
            .zip(Self::QUALITIES)
            .map(|(&scale, quality)| SearchStep::new(scale, quality))
            .collect();
        Self {
            grid: vec![row],
            band_floor: config.palette_band_floor,
        }
    }
}

impl SearchStrategy for PaletteStrategy {
    fn family(&self) -> CodecFamily {
        CodecFamily::Palette
    }

    fn grid(&self) -> &[Vec<SearchStep>] {
        &self.grid
    }

    fn band_floor(&self) -> f64 {
        self.band_floor
    }
}

/// JPEG/WebP-like codecs: sweep quality at each of a few shrinking scales
pub struct LossyStrategy {
    grid: Vec<Vec<SearchStep>>,
    band_floor: f64,
}

impl LossyStrategy {
    const SCALES: [f64; 6] = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5];
    const QUALITIES: [f64; 10] = [0.95, 0.9, 0.85, 0.8, 0.75, 0.7, 0.65, 0.6, 0.55, 0.5];

    pub fn new(config: &SearchConfig) -> Self {
        let grid = Self::SCALES
            .iter()
            .map(|&scale| {
                Self::QUALITIES
                    .iter()
                    .map(|&quality| SearchStep::new(scale, quality))
                    .collect()
            })
            .collect();
        Self {
            grid,
            band_floor: config.lossy_band_floor,
        }
    }
}

impl SearchStrategy for LossyStrategy {
    fn family(&self) -> CodecFamily {
        CodecFamily::Lossy
    }

    fn grid(&self) -> &[Vec<SearchStep>] {
        &self.grid
    }

    fn band_floor(&self) -> f64 {
        self.band_floor
    }

    fn advance_on_undershoot(&self) -> bool {
        true
    }
}

/// Pick the strategy variant for a codec family
pub fn strategy_for(family: CodecFamily, config: &SearchConfig) -> Box<dyn SearchStrategy> {
    match family {
        CodecFamily::Palette => Box::new(PaletteStrategy::new(config)),
        CodecFamily::Lossy => Box::new(LossyStrategy::new(config)),
    }
}

/// What a search produced for one image
#[derive(Debug)]
pub struct SearchOutcome {
    /// Accepted candidate, or the closest one to the effective target
    pub best: Option<Candidate>,
    /// True when `best` landed inside the acceptance band
    pub accepted: bool,
    /// Steps attempted, failed ones included
    pub attempts: usize,
    /// Most recent encoder failure, if any step failed
    pub last_error: Option<EncodeError>,
}

/// Walk the strategy's grid, stopping at the first in-band candidate.
///
/// `attempt` performs one encode. Failed or empty encodes are never
/// kept; the closest successful candidate is folded by absolute distance
/// to the effective target, first seen wins ties.
pub fn run_search<F>(strategy: &dyn SearchStrategy, plan: &SearchPlan, mut attempt: F) -> SearchOutcome
where
    F: FnMut(SearchStep) -> Result<Candidate, EncodeError>,
{
    let ceiling = plan.effective_target;
    let floor = ceiling * strategy.band_floor();
    let mut outcome = SearchOutcome {
        best: None,
        accepted: false,
        attempts: 0,
        last_error: None,
    };

    for row in strategy.grid() {
        for relative in row {
            let step = SearchStep::new(relative.scale * plan.initial_scale, relative.quality);
            outcome.attempts += 1;

            let candidate = match attempt(step) {
                Ok(candidate) if candidate.size() > 0 => candidate,
                Ok(_) => {
                    outcome.last_error = Some(EncodeError::EmptyOutput);
                    continue;
                }
                Err(e) => {
                    debug!(scale = step.scale, quality = step.quality, error = %e, "step failed");
                    outcome.last_error = Some(e);
                    continue;
                }
            };

            let size = candidate.size() as f64;
            debug!(
                family = ?strategy.family(),
                scale = step.scale,
                quality = step.quality,
                width = candidate.width,
                height = candidate.height,
                size = candidate.size(),
                "candidate"
            );

            let in_band = size >= floor && size <= ceiling;
            let undershoot = size < floor;

            let closer = outcome
                .best
                .as_ref()
                .map_or(true, |best| plan.distance(candidate.size()) < plan.distance(best.size()));
            if in_band {
                outcome.best = Some(candidate);
                outcome.accepted = true;
                return outcome;
            }
            if closer {
                outcome.best = Some(candidate);
            }

            if undershoot && strategy.advance_on_undershoot() {
                break;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(effective_target: f64) -> SearchPlan {
        SearchPlan {
            effective_target,
            initial_scale: 1.0,
        }
    }

    fn sized(step: SearchStep, size: usize) -> Result<Candidate, EncodeError> {
        Ok(Candidate {
            data: vec![1u8; size],
            step,
            width: 1,
            height: 1,
        })
    }

    #[test]
    fn test_initial_scale() {
        let settings = CompressionSettings::new(1_048_576).unwrap();
        let p = SearchPlan::new(3_000_000, &settings, &SearchConfig::default());
        assert!((p.effective_target - 996_147.2).abs() < 1e-6);
        assert!((p.initial_scale - 0.5762).abs() < 1e-3);

        // Never upscales
        let p = SearchPlan::new(10, &settings, &SearchConfig::default());
        assert_eq!(p.initial_scale, 1.0);
    }

    #[test]
    fn test_grids() {
        let config = SearchConfig::default();
        let palette = PaletteStrategy::new(&config);
        let steps: Vec<_> = palette.grid().concat();
        assert_eq!(palette.max_calls(), 8);
        assert_eq!(steps[3], SearchStep::new(1.0, 0.7));
        assert_eq!(steps[4], SearchStep::new(0.95, 0.6));
        assert_eq!(steps[7], SearchStep::new(0.8, 0.3));

        let lossy = LossyStrategy::new(&config);
        assert_eq!(lossy.max_calls(), 60);
        assert_eq!(lossy.grid().len(), 6);
        assert_eq!(lossy.grid()[5][9], SearchStep::new(0.5, 0.5));
        assert_eq!(lossy.grid()[0][0], SearchStep::new(1.0, 0.95));
    }

    #[test]
    fn test_strategy_for_family() {
        let config = SearchConfig::default();
        assert_eq!(strategy_for(CodecFamily::Palette, &config).family(), CodecFamily::Palette);
        assert_eq!(strategy_for(CodecFamily::Lossy, &config).max_calls(), 60);
    }

    #[test]
    fn test_palette_accepts_first_in_band() {
        let strategy = PaletteStrategy::new(&SearchConfig::default());
        let sizes = [2000, 1500, 900, 850];
        let mut calls = 0;
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            calls += 1;
            sized(step, sizes[calls - 1])
        });
        assert!(outcome.accepted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.best.unwrap().size(), 900);
    }

    #[test]
    fn test_palette_falls_back_to_closest_even_above_target() {
        let strategy = PaletteStrategy::new(&SearchConfig::default());
        // Nothing in [800, 1000]; 1050 is closest
        let sizes = [3000, 2000, 1500, 1200, 1050, 1100, 700, 500];
        let mut calls = 0;
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            calls += 1;
            sized(step, sizes[calls - 1])
        });
        assert!(!outcome.accepted);
        assert_eq!(outcome.attempts, 8);
        let best = outcome.best.unwrap();
        assert_eq!(best.size(), 1050);
        assert_eq!(best.step, SearchStep::new(0.95, 0.6));
    }

    #[test]
    fn test_palette_does_not_skip_on_undershoot() {
        let strategy = PaletteStrategy::new(&SearchConfig::default());
        let mut calls = 0;
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            calls += 1;
            sized(step, 100)
        });
        assert_eq!(outcome.attempts, 8);
        assert_eq!(outcome.best.unwrap().step.quality, 1.0);
    }

    #[test]
    fn test_lossy_undershoot_advances_scale() {
        let strategy = LossyStrategy::new(&SearchConfig::default());
        let mut seen = Vec::new();
        // Too big at 0.95, way too small from 0.9 on: every row gives up after two steps
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            seen.push(step);
            let size = if step.quality > 0.92 { 1500 } else { 200 };
            sized(step, size)
        });
        assert!(!outcome.accepted);
        assert_eq!(outcome.attempts, 12);
        assert_eq!(seen[2].scale, 0.9);
        assert_eq!(seen[2].quality, 0.95);
        // 1500 is 500 away, 200 is 800 away
        assert_eq!(outcome.best.unwrap().size(), 1500);
    }

    #[test]
    fn test_lossy_band_is_wider() {
        let strategy = LossyStrategy::new(&SearchConfig::default());
        let outcome = run_search(&strategy, &plan(1000.0), |step| sized(step, 720));
        assert!(outcome.accepted);
        assert_eq!(outcome.attempts, 1);

        let palette = PaletteStrategy::new(&SearchConfig::default());
        let outcome = run_search(&palette, &plan(1000.0), |step| sized(step, 720));
        assert!(!outcome.accepted);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let palette = PaletteStrategy::new(&SearchConfig::default());
        let lossy = LossyStrategy::new(&SearchConfig::default());

        for size in [1000, 800] {
            let outcome = run_search(&palette, &plan(1000.0), |step| sized(step, size));
            assert!(outcome.accepted, "palette {}", size);
            assert_eq!(outcome.attempts, 1);
        }
        for size in [1000, 700] {
            let outcome = run_search(&lossy, &plan(1000.0), |step| sized(step, size));
            assert!(outcome.accepted, "lossy {}", size);
            assert_eq!(outcome.attempts, 1);
        }

        // One byte past either edge is out of band
        let outcome = run_search(&palette, &plan(1000.0), |step| sized(step, 1001));
        assert!(!outcome.accepted);
        let outcome = run_search(&palette, &plan(1000.0), |step| sized(step, 799));
        assert!(!outcome.accepted);
    }

    #[test]
    fn test_lossy_just_below_floor_advances_row() {
        let strategy = LossyStrategy::new(&SearchConfig::default());
        let mut seen = Vec::new();
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            seen.push(step);
            sized(step, 699)
        });
        assert!(!outcome.accepted);
        assert_eq!(outcome.attempts, 6);
        assert_eq!(seen[1], SearchStep::new(0.9, 0.95));
    }

    #[test]
    fn test_lossy_worst_case_is_sixty_calls() {
        let strategy = LossyStrategy::new(&SearchConfig::default());
        let outcome = run_search(&strategy, &plan(1000.0), |step| sized(step, 5000));
        assert_eq!(outcome.attempts, 60);
        assert!(outcome.best.is_some());
    }

    #[test]
    fn test_failures_are_never_kept() {
        let strategy = PaletteStrategy::new(&SearchConfig::default());
        let outcome = run_search(&strategy, &plan(1000.0), |step| {
            if step.quality > 0.45 {
                Err(EncodeError::EmptyOutput)
            } else {
                sized(step, 0)
            }
        });
        assert!(outcome.best.is_none());
        assert_eq!(outcome.attempts, 8);
        assert!(outcome.last_error.is_some());
    }

    #[test]
    fn test_steps_are_scaled_by_initial_scale() {
        let strategy = PaletteStrategy::new(&SearchConfig::default());
        let p = SearchPlan {
            effective_target: 1000.0,
            initial_scale: 0.5,
        };
        let mut scales = Vec::new();
        run_search(&strategy, &p, |step| {
            scales.push(step.scale);
            sized(step, 5000)
        });
        assert_eq!(scales, vec![0.5, 0.5, 0.5, 0.5, 0.475, 0.45, 0.425, 0.4]);
    }
}
