// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overflow detection against clipping boundaries.

use core::fmt;

use kurbo::{Insets, Rect, Vec2};

use crate::middleware::MiddlewareState;
use crate::platform::{Boundary, RootBoundary};
use crate::types::SideOffsets;

/// Which element's rectangle is measured.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ElementContext {
    /// The floating element at the state's coordinates.
    #[default]
    Floating,
    /// The reference.
    Reference,
}

impl ElementContext {
    /// The other element.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Floating => Self::Reference,
            Self::Reference => Self::Floating,
        }
    }
}

/// Options for [`detect_overflow`].
#[derive(Clone, PartialEq)]
pub struct DetectOverflowOptions<E> {
    /// Rectangles to stay inside.
    pub boundary: Boundary<E>,
    /// Outermost rectangle.
    pub root_boundary: RootBoundary,
    /// Element to measure.
    pub element_context: ElementContext,
    /// Measure against the other element's clipping ancestors.
    pub alt_boundary: bool,
    /// Virtual padding per side; positive values shrink the allowed area.
    pub padding: Insets,
}

impl<E> Default for DetectOverflowOptions<E> {
    fn default() -> Self {
        Self {
            boundary: Boundary::ClippingAncestors,
            root_boundary: RootBoundary::Viewport,
            element_context: ElementContext::Floating,
            alt_boundary: false,
            padding: Insets::ZERO,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for DetectOverflowOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectOverflowOptions")
            .field("boundary", &self.boundary)
            .field("root_boundary", &self.root_boundary)
            .field("element_context", &self.element_context)
            .field("alt_boundary", &self.alt_boundary)
            .field("padding", &self.padding)
            .finish()
    }
}

/// Per-side overflow of an element against its clipping rectangle.
///
/// Positive values mean the element crosses the boundary by that many pixels;
/// zero or negative means it fits with that much room to spare. Amounts are in
/// the floating element's offset-parent units.
pub fn detect_overflow<E: Clone + PartialEq + fmt::Debug>(
    state: &MiddlewareState<'_, E>,
    options: &DetectOverflowOptions<E>,
) -> SideOffsets {
    let platform = state.platform;
    let floating = state.elements.floating;
    let clip_context = if options.alt_boundary {
        options.element_context.opposite()
    } else {
        options.element_context
    };
    let clip_element = match clip_context {
        ElementContext::Floating => Some(floating),
        ElementContext::Reference => state.elements.reference.element(),
    };
    let clip = platform.clipping_rect(
        clip_element,
        &options.boundary,
        &options.root_boundary,
        state.strategy,
    );

    let rect = match options.element_context {
        ElementContext::Floating => {
            let size = state.rects.floating.size();
            Rect::new(state.x, state.y, state.x + size.width, state.y + size.height)
        }
        ElementContext::Reference => state.rects.reference,
    };
    let element = platform.to_viewport(floating, rect, state.strategy);
    let scale = usable_scale(platform.offset_scale(floating));
    let pad = options.padding;

    SideOffsets {
        top: (clip.y0 - element.y0 + pad.y0) / scale.y,
        bottom: (element.y1 - clip.y1 + pad.y1) / scale.y,
        left: (clip.x0 - element.x0 + pad.x0) / scale.x,
        right: (element.x1 - clip.x1 + pad.x1) / scale.x,
    }
}

/// Zero or non-finite scale components fall back to 1.
fn usable_scale(scale: Vec2) -> Vec2 {
    let fix = |s: f64| if s.is_finite() && s != 0.0 { s } else { 1.0 };
    Vec2::new(fix(scale.x), fix(scale.y))
}
