// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use kurbo::Size;

use super::{MiddlewareReturn, MiddlewareState};
use crate::overflow::{DetectOverflowOptions, ElementContext, detect_overflow};
use crate::types::{Side, SideOffsets};

/// What [`Hide`] checks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum HideStrategy {
    /// The reference is fully clipped by the floating element's clipping ancestors.
    #[default]
    ReferenceHidden,
    /// The floating element is fully outside the reference's clipping ancestors.
    Escaped,
}

/// Flag when the floating element should be visually hidden.
///
/// Never moves the floating element. Add one step per strategy to get both flags.
#[derive(Clone, PartialEq)]
pub struct Hide<E> {
    /// What to check.
    pub strategy: HideStrategy,
    /// Boundary and padding. `element_context` and `alt_boundary` are set by the strategy.
    pub overflow: DetectOverflowOptions<E>,
}

impl<E> Default for Hide<E> {
    fn default() -> Self {
        Self {
            strategy: HideStrategy::ReferenceHidden,
            overflow: DetectOverflowOptions::default(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Hide<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hide")
            .field("strategy", &self.strategy)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> Hide<E> {
    /// A hide step with `strategy`.
    pub fn new(strategy: HideStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let mut options = self.overflow.clone();
        match self.strategy {
            HideStrategy::ReferenceHidden => {
                options.element_context = ElementContext::Reference;
                options.alt_boundary = false;
                let offsets = clipped_by(
                    detect_overflow(state, &options),
                    state.rects.reference.size(),
                );
                MiddlewareReturn::default().with_data(HideData {
                    reference_hidden: Some(fully_clipped(&offsets)),
                    reference_hidden_offsets: Some(offsets),
                    ..HideData::default()
                })
            }
            HideStrategy::Escaped => {
                options.element_context = ElementContext::Floating;
                options.alt_boundary = true;
                let offsets = clipped_by(
                    detect_overflow(state, &options),
                    state.rects.floating.size(),
                );
                MiddlewareReturn::default().with_data(HideData {
                    escaped: Some(fully_clipped(&offsets)),
                    escaped_offsets: Some(offsets),
                    ..HideData::default()
                })
            }
        }
    }
}

/// Overflow minus the element's extent; non-negative on a side means fully past it.
fn clipped_by(overflow: SideOffsets, size: Size) -> SideOffsets {
    SideOffsets {
        top: overflow.top - size.height,
        right: overflow.right - size.width,
        bottom: overflow.bottom - size.height,
        left: overflow.left - size.width,
    }
}

fn fully_clipped(offsets: &SideOffsets) -> bool {
    Side::ALL.into_iter().any(|side| offsets.get(side) >= 0.0)
}

/// Visibility flags written by [`Hide`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HideData {
    /// The reference is fully clipped.
    pub reference_hidden: Option<bool>,
    /// How far past each clip edge the reference is.
    pub reference_hidden_offsets: Option<SideOffsets>,
    /// The floating element escaped the reference's clipping context.
    pub escaped: Option<bool>,
    /// How far past each clip edge the floating element is.
    pub escaped_offsets: Option<SideOffsets>,
}

impl HideData {
    pub(crate) fn merge(&mut self, newer: Self) {
        self.reference_hidden = newer.reference_hidden.or(self.reference_hidden);
        self.reference_hidden_offsets = newer
            .reference_hidden_offsets
            .or(self.reference_hidden_offsets);
        self.escaped = newer.escaped.or(self.escaped);
        self.escaped_offsets = newer.escaped_offsets.or(self.escaped_offsets);
    }
}
