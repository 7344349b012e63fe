// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::fmt;

use super::{MiddlewareReturn, MiddlewareState, PlacementOverflow, Reset};
use crate::overflow::{DetectOverflowOptions, detect_overflow};
use crate::types::{Alignment, Placement};

/// Choose the placement with the most space.
///
/// Every candidate is tried once (each try is a reset), then the pipeline settles on the
/// first candidate, in [`Placement::ALL`] order filtered by the options, that fits on every
/// checked side, or else on the one with the least overflow on its own side.
#[derive(Clone, PartialEq)]
pub struct AutoPlacement<E> {
    /// Rank aligned placements by their side and alignment overflow together.
    pub cross_axis: bool,
    /// Prefer placements with this alignment. `None` considers centered placements only
    /// (unless `allowed_placements` is given).
    pub alignment: Option<Alignment>,
    /// With `alignment`, also allow the opposite alignment.
    pub auto_alignment: bool,
    /// Restrict the candidates. `None` allows all twelve.
    pub allowed_placements: Option<Vec<Placement>>,
    /// Boundary and padding.
    pub overflow: DetectOverflowOptions<E>,
}

impl<E> Default for AutoPlacement<E> {
    fn default() -> Self {
        Self {
            cross_axis: false,
            alignment: None,
            auto_alignment: true,
            allowed_placements: None,
            overflow: DetectOverflowOptions::default(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for AutoPlacement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoPlacement")
            .field("cross_axis", &self.cross_axis)
            .field("alignment", &self.alignment)
            .field("auto_alignment", &self.auto_alignment)
            .field("allowed_placements", &self.allowed_placements)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> AutoPlacement<E> {
    /// Candidates in the order they are tried.
    pub fn candidates(&self) -> Vec<Placement> {
        let allowed: &[Placement] = self.allowed_placements.as_deref().unwrap_or(&Placement::ALL);
        if self.alignment.is_none() && self.allowed_placements.is_some() {
            return allowed.to_vec();
        }
        match self.alignment {
            Some(alignment) => {
                let (preferred, rest): (Vec<Placement>, Vec<Placement>) = allowed
                    .iter()
                    .partition(|p| p.alignment() == Some(alignment));
                preferred
                    .into_iter()
                    .chain(
                        rest.into_iter()
                            .filter(|p| self.auto_alignment && !p.is_centered()),
                    )
                    .collect()
            }
            None => allowed.iter().copied().filter(|p| p.is_centered()).collect(),
        }
    }

    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let candidates = self.candidates();
        let data = state.middleware_data.auto_placement.as_ref();
        let index = data.map_or(0, |d| d.index);
        let Some(&current) = candidates.get(index) else {
            return MiddlewareReturn::default();
        };
        if state.placement != current {
            return MiddlewareReturn::default().with_reset(Reset::placement(candidates[0]));
        }

        let overflow = detect_overflow(state, &self.overflow);
        let (a, b) = current.alignment_sides(&state.rects, state.rtl());
        let mut history = data.map(|d| d.overflows.clone()).unwrap_or_default();
        history.push(PlacementOverflow {
            placement: current,
            overflows: alloc::vec![
                overflow.get(current.side()),
                overflow.get(a),
                overflow.get(b),
            ],
        });

        let next_data = AutoPlacementData {
            index: index + 1,
            overflows: history,
        };
        if let Some(&next) = candidates.get(index + 1) {
            return MiddlewareReturn::default()
                .with_data(next_data)
                .with_reset(Reset::placement(next));
        }

        let score = |d: &PlacementOverflow| {
            if self.cross_axis && !d.placement.is_centered() {
                d.overflows[0] + d.overflows[1]
            } else {
                d.overflows[0]
            }
        };
        let mut ranked: Vec<&PlacementOverflow> = next_data.overflows.iter().collect();
        // Stable, so equal scores keep candidate order.
        ranked.sort_by(|x, y| score(x).total_cmp(&score(y)));
        let fits = ranked.iter().find(|d| {
            let checked = if d.placement.is_centered() { 3 } else { 2 };
            d.overflows[..checked].iter().all(|o| *o <= 0.0)
        });
        let best = fits.or(ranked.first()).map(|d| d.placement);

        match best {
            Some(p) if p != state.placement => MiddlewareReturn::default()
                .with_data(next_data)
                .with_reset(Reset::placement(p)),
            _ => MiddlewareReturn::default(),
        }
    }
}

/// Progress of [`AutoPlacement`] through its candidates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoPlacementData {
    /// Index of the next candidate.
    pub index: usize,
    /// Every placement tried so far.
    pub overflows: Vec<PlacementOverflow>,
}
