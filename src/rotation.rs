// Landing rotation: given the wheel's cumulative rotation and a target slice, find
// the absolute angle that brings a point inside that slice under the pointer.
//
// final = whole_turns(current) + extra_turns * 360 + (360 - (slice_start + offset))
//
// `offset` is drawn from `[0, margin * slice)`, so the landing point never sits in
// the last part of the slice. Offsets that land exactly on a boundary, or whose
// angle does not resolve back to the target after rounding, are re-drawn.

use serde::{Deserialize, Serialize};

use crate::error::WheelError;
use crate::resolver::resolve_index;
use crate::rng::RandomSource;
use crate::types::{Category, CategoryId, Degrees, WheelConfig, FULL_TURN};

/// Rejected offset draws before falling back to the middle of the landing window.
pub const MAX_REROLLS: usize = 16;

/// Landing settings taken from `WheelConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingParams {
    pub min_extra_turns: u32,
    pub max_extra_turns: u32,
    pub margin: f64,
}

impl From<&WheelConfig> for LandingParams {
    fn from(config: &WheelConfig) -> Self {
        LandingParams {
            min_extra_turns: config.min_extra_turns,
            max_extra_turns: config.max_extra_turns,
            margin: config.landing_margin,
        }
    }
}

impl Default for LandingParams {
    fn default() -> Self {
        LandingParams::from(&WheelConfig::default())
    }
}

/// A committed landing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingPlan {
    pub target_index: usize,
    pub slice_start: f64,
    pub offset: f64,
    pub extra_turns: u32,
    pub final_angle: Degrees,
}

impl LandingPlan {
    /// Wheel angle that ends up under the pointer.
    pub fn landing_point(&self) -> f64 {
        self.slice_start + self.offset
    }
}

/// Landing angle for `target` on `categories`, starting from `current`.
pub fn compute_target_rotation<R>(
    current: Degrees,
    categories: &[Category],
    target: CategoryId,
    params: &LandingParams,
    rng: &mut R,
) -> Result<LandingPlan, WheelError>
where
    R: RandomSource + ?Sized,
{
    let target_index = categories
        .iter()
        .position(|c| c.id == target)
        .ok_or(WheelError::UnknownCategory(target))?;
    Ok(plan_landing(current, categories.len(), target_index, params, rng))
}

/// Landing angle for slice `target_index` of `slice_count`.
/// `target_index` must be below `slice_count`.
pub fn plan_landing<R>(
    current: Degrees,
    slice_count: usize,
    target_index: usize,
    params: &LandingParams,
    rng: &mut R,
) -> LandingPlan
where
    R: RandomSource + ?Sized,
{
    debug_assert!(target_index < slice_count);

    let slice = FULL_TURN / slice_count as f64;
    let slice_start = target_index as f64 * slice;
    let window = slice * params.margin;

    let turn_choices = params.max_extra_turns.saturating_sub(params.min_extra_turns) as usize + 1;
    let extra_turns = params.min_extra_turns + rng.next_index(turn_choices) as u32;
    let base = current.whole_turns() + extra_turns as f64 * FULL_TURN;

    let plan = |offset: f64| LandingPlan {
        target_index,
        slice_start,
        offset,
        extra_turns,
        final_angle: base + (FULL_TURN - (slice_start + offset)),
    };

    for _ in 0..MAX_REROLLS {
        let offset = rng.next_unit() * window;
        if !(offset > 0.0 && offset < slice) {
            continue;
        }
        let candidate = plan(offset);
        if resolve_index(candidate.final_angle, slice_count) == Some(target_index) {
            return candidate;
        }
    }

    log::debug!(
        "landing offset re-drawn {} times for slice {}; using window midpoint",
        MAX_REROLLS,
        target_index
    );
    let fallback = plan(window / 2.0);
    let resolved = resolve_index(fallback.final_angle, slice_count);
    debug_assert_eq!(
        resolved,
        Some(target_index),
        "window midpoint at {} resolves to the wrong slice",
        fallback.final_angle
    );
    if resolved != Some(target_index) {
        log::error!(
            "window midpoint for slice {} resolves to {:?} at {}",
            target_index,
            resolved,
            fallback.final_angle
        );
    }
    fallback
}
