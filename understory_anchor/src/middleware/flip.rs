// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::{MiddlewareReturn, MiddlewareState, Reset};
use crate::overflow::{DetectOverflowOptions, detect_overflow};
use crate::types::{Alignment, Axis, Placement};

/// Whether [`Flip`] also checks overflow along the alignment axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum CrossAxisCheck {
    /// Only the side the floating element sits on.
    Off,
    /// Both alignment-axis sides too.
    #[default]
    On,
    /// Alignment-axis sides, but only while trying placements on the initial side axis.
    Alignment,
}

/// What [`Flip`] settles on when no candidate fits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum FallbackStrategy {
    /// The candidate with the least total overflow.
    #[default]
    BestFit,
    /// The requested placement.
    InitialPlacement,
}

/// Move the floating element to the opposite side (or a fallback) when it overflows.
///
/// Candidates are the requested placement followed by its fallbacks. Each overflowing
/// candidate resets the pipeline onto the next one. The first candidate that fits wins;
/// when none does, [`FallbackStrategy`] decides, and ties keep the earliest candidate.
#[derive(Clone, PartialEq)]
pub struct Flip<E> {
    /// Check the side the floating element sits on.
    pub main_axis: bool,
    /// Check the alignment-axis sides.
    pub cross_axis: CrossAxisCheck,
    /// Explicit fallback order. `None` derives it from the requested placement.
    pub fallback_placements: Option<Vec<Placement>>,
    /// Choice when nothing fits.
    pub fallback_strategy: FallbackStrategy,
    /// Also try the perpendicular sides, starting from this direction.
    pub fallback_axis_side_direction: Option<Alignment>,
    /// Try the other alignment as well when deriving fallbacks.
    pub flip_alignment: bool,
    /// Boundary and padding.
    pub overflow: DetectOverflowOptions<E>,
}

impl<E> Default for Flip<E> {
    fn default() -> Self {
        Self {
            main_axis: true,
            cross_axis: CrossAxisCheck::On,
            fallback_placements: None,
            fallback_strategy: FallbackStrategy::BestFit,
            fallback_axis_side_direction: None,
            flip_alignment: true,
            overflow: DetectOverflowOptions::default(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Flip<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flip")
            .field("main_axis", &self.main_axis)
            .field("cross_axis", &self.cross_axis)
            .field("fallback_placements", &self.fallback_placements)
            .field("fallback_strategy", &self.fallback_strategy)
            .field(
                "fallback_axis_side_direction",
                &self.fallback_axis_side_direction,
            )
            .field("flip_alignment", &self.flip_alignment)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> Flip<E> {
    /// Candidate placements, the requested one first.
    pub fn candidates(&self, initial: Placement, rtl: bool) -> Vec<Placement> {
        let mut list = vec![initial];
        match &self.fallback_placements {
            Some(explicit) => list.extend_from_slice(explicit),
            None => {
                if initial.is_centered() || !self.flip_alignment {
                    list.push(initial.opposite());
                } else {
                    list.extend(initial.expanded());
                }
                if let Some(direction) = self.fallback_axis_side_direction {
                    list.extend(initial.opposite_axis_placements(
                        self.flip_alignment,
                        direction,
                        rtl,
                    ));
                }
            }
        }
        list
    }

    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let data = state.middleware_data;
        if data
            .arrow
            .as_ref()
            .is_some_and(|a| a.alignment_offset.is_some())
        {
            // The arrow re-ran the pipeline after flip had settled.
            return MiddlewareReturn::default();
        }

        let rtl = state.rtl();
        let placement = state.placement;
        let initial = state.initial_placement;
        let initial_axis = initial.side_axis();
        let candidates = self.candidates(initial, rtl);
        let overflow = detect_overflow(state, &self.overflow);

        let mut overflows = Vec::with_capacity(3);
        if self.main_axis {
            overflows.push(overflow.get(placement.side()));
        }
        if self.cross_axis != CrossAxisCheck::Off {
            let (a, b) = placement.alignment_sides(&state.rects, rtl);
            overflows.push(overflow.get(a));
            overflows.push(overflow.get(b));
        }

        let mut history = data
            .flip
            .as_ref()
            .map(|f| f.overflows.clone())
            .unwrap_or_default();
        history.push(PlacementOverflow {
            placement,
            overflows: overflows.clone(),
        });

        if overflows.iter().all(|o| *o <= 0.0) {
            return MiddlewareReturn::default();
        }

        let next_index = data.flip.as_ref().map_or(0, |f| f.index) + 1;
        if let Some(&next) = candidates.get(next_index) {
            let ignore_cross = self.cross_axis == CrossAxisCheck::Alignment
                && initial_axis != next.side_axis();
            let main_overflowed_on_initial_axis = history.iter().all(|d| {
                d.placement.side_axis() != initial_axis
                    || d.overflows.first().is_some_and(|o| *o > 0.0)
            });
            if !ignore_cross || main_overflowed_on_initial_axis {
                return MiddlewareReturn::default()
                    .with_data(FlipData {
                        index: next_index,
                        overflows: history,
                    })
                    .with_reset(Reset::placement(next));
            }
        }

        // Prefer a candidate that fits on its own side with the least alignment overflow.
        let fits_main = history
            .iter()
            .filter(|d| d.overflows.first().is_some_and(|o| *o <= 0.0))
            .min_by(|a, b| {
                let a = a.overflows.get(1).copied().unwrap_or(0.0);
                let b = b.overflows.get(1).copied().unwrap_or(0.0);
                a.total_cmp(&b)
            })
            .map(|d| d.placement);

        let reset_placement = fits_main.or_else(|| match self.fallback_strategy {
            FallbackStrategy::BestFit => history
                .iter()
                .filter(|d| {
                    self.fallback_axis_side_direction.is_none() || {
                        let axis = d.placement.side_axis();
                        axis == initial_axis || axis == Axis::Y
                    }
                })
                .map(|d| (d.placement, d.total()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(p, _)| p),
            FallbackStrategy::InitialPlacement => Some(initial),
        });

        match reset_placement {
            Some(p) if p != placement => {
                tracing::debug!(from = %placement, to = %p, "flip fallback");
                MiddlewareReturn::default().with_reset(Reset::placement(p))
            }
            _ => MiddlewareReturn::default(),
        }
    }
}

/// Overflow recorded for one tried placement.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementOverflow {
    /// The placement tried.
    pub placement: Placement,
    /// Main side overflow first, then the alignment sides when checked.
    pub overflows: Vec<f64>,
}

impl PlacementOverflow {
    /// Sum of the positive overflows.
    pub fn total(&self) -> f64 {
        self.overflows.iter().filter(|o| **o > 0.0).sum()
    }
}

/// Progress of [`Flip`] through its candidates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlipData {
    /// Index of the candidate being tried.
    pub index: usize,
    /// Every placement tried so far.
    pub overflows: Vec<PlacementOverflow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComputeConfig, RectPlatform, Reference, compute_position};
    use kurbo::Rect;

    fn scenario() -> RectPlatform {
        let p = RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 140.0));
        p.set_rect(1, Rect::new(100.0, 100.0, 150.0, 120.0));
        p.set_rect(2, Rect::new(0.0, 0.0, 120.0, 40.0));
        p
    }

    #[test]
    fn flips_to_top_when_the_bottom_overflows() {
        let p = scenario();
        let config = ComputeConfig::new(Placement::BottomStart).with(Flip::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::TopStart);
        assert_eq!((r.x, r.y), (100.0, 60.0));

        let centered = ComputeConfig::new(Placement::Bottom).with(Flip::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &centered).unwrap();
        assert_eq!(r.placement, Placement::Top);
        assert_eq!((r.x, r.y), (65.0, 60.0));
        assert_eq!(r.middleware_data.flip.unwrap().index, 1);
    }

    #[test]
    fn keeps_placement_when_it_fits() {
        let p = scenario();
        p.set_rect(1, Rect::new(100.0, 40.0, 150.0, 60.0));
        let config = ComputeConfig::new(Placement::Bottom).with(Flip::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::Bottom);
        assert!(r.middleware_data.flip.is_none());
    }

    #[test]
    fn best_fit_when_nothing_fits() {
        // 30px above, 20px below: neither side fits 40px; top overflows less.
        let p = scenario();
        p.set_rect(1, Rect::new(100.0, 30.0, 150.0, 120.0));
        let config = ComputeConfig::new(Placement::Bottom).with(Flip::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::Top);

        let initial = ComputeConfig::new(Placement::Bottom).with(Flip {
            fallback_strategy: FallbackStrategy::InitialPlacement,
            ..Flip::default()
        });
        let r = compute_position(&p, &Reference::Element(1), &2, &initial).unwrap();
        assert_eq!(r.placement, Placement::Bottom);
    }

    #[test]
    fn equal_overflow_keeps_the_requested_placement() {
        let p = scenario();
        p.set_rect(1, Rect::new(100.0, 25.0, 150.0, 115.0));
        let config = ComputeConfig::new(Placement::Bottom).with(Flip::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::Bottom);
    }

    #[test]
    fn derived_candidates() {
        let flip: Flip<u32> = Flip::default();
        assert_eq!(
            flip.candidates(Placement::Top, false),
            [Placement::Top, Placement::Bottom]
        );
        assert_eq!(
            flip.candidates(Placement::TopStart, false),
            [
                Placement::TopStart,
                Placement::TopEnd,
                Placement::BottomStart,
                Placement::BottomEnd
            ]
        );
        let sideways: Flip<u32> = Flip {
            fallback_axis_side_direction: Some(Alignment::End),
            ..Flip::default()
        };
        assert_eq!(
            sideways.candidates(Placement::Top, false),
            [
                Placement::Top,
                Placement::Bottom,
                Placement::Right,
                Placement::Left
            ]
        );
    }
}
