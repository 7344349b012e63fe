// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::fmt;

use kurbo::Vec2;

use super::{MiddlewareReturn, MiddlewareState};
use crate::types::{Alignment, Axis, ElementRects, Placement, Side};

/// Distances along the placement's axes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OffsetAxes {
    /// Away from the reference (the gap).
    pub main_axis: f64,
    /// Along the reference edge ("skidding").
    pub cross_axis: f64,
    /// Like `cross_axis`, but only for aligned placements and negated for `end`.
    pub alignment_axis: Option<f64>,
}

/// Offset distances computed from the current placement.
pub type OffsetFn = Rc<dyn Fn(Placement, &ElementRects) -> OffsetAxes>;

/// Translate the floating element away from or along the reference.
///
/// Runs before collision handling. Never changes the placement.
#[derive(Clone)]
pub enum Offset {
    /// Fixed distances.
    Axes(OffsetAxes),
    /// Distances chosen per placement.
    Fn(OffsetFn),
}

impl Offset {
    /// A gap of `distance` between reference and floating element.
    pub fn main_axis(distance: f64) -> Self {
        Self::Axes(OffsetAxes {
            main_axis: distance,
            ..OffsetAxes::default()
        })
    }

    /// Distances from a function of the placement.
    pub fn from_fn(f: impl Fn(Placement, &ElementRects) -> OffsetAxes + 'static) -> Self {
        Self::Fn(Rc::new(f))
    }

    fn axes(&self, placement: Placement, rects: &ElementRects) -> OffsetAxes {
        match self {
            Self::Axes(axes) => *axes,
            Self::Fn(f) => f(placement, rects),
        }
    }

    /// Translation in x/y for `placement`.
    pub fn delta(&self, placement: Placement, rects: &ElementRects, rtl: bool) -> Vec2 {
        let axes = self.axes(placement, rects);
        let is_vertical = placement.side_axis() == Axis::Y;
        let main_multi = if matches!(placement.side(), Side::Left | Side::Top) {
            -1.0
        } else {
            1.0
        };
        let cross_multi = if rtl && is_vertical { -1.0 } else { 1.0 };
        let cross = match (placement.alignment(), axes.alignment_axis) {
            (Some(Alignment::End), Some(a)) => -a,
            (Some(Alignment::Start), Some(a)) => a,
            _ => axes.cross_axis,
        };
        if is_vertical {
            Vec2::new(cross * cross_multi, axes.main_axis * main_multi)
        } else {
            Vec2::new(axes.main_axis * main_multi, cross * cross_multi)
        }
    }

    /// Run against `state`.
    pub fn compute<E: Clone + PartialEq + fmt::Debug>(
        &self,
        state: &MiddlewareState<'_, E>,
    ) -> MiddlewareReturn {
        let data = state.middleware_data;
        let arrow_aligned = data
            .arrow
            .as_ref()
            .is_some_and(|a| a.alignment_offset.is_some());
        if arrow_aligned && data.offset.as_ref().map(|o| o.placement) == Some(state.placement) {
            // Already applied on the pass the arrow re-ran.
            return MiddlewareReturn::default();
        }
        let delta = self.delta(state.placement, &state.rects, state.rtl());
        MiddlewareReturn::at(state.coords() + delta).with_data(OffsetData {
            x: delta.x,
            y: delta.y,
            placement: state.placement,
        })
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self::Axes(OffsetAxes::default())
    }
}

impl From<f64> for Offset {
    fn from(distance: f64) -> Self {
        Self::main_axis(distance)
    }
}

impl From<OffsetAxes> for Offset {
    fn from(axes: OffsetAxes) -> Self {
        Self::Axes(axes)
    }
}

impl PartialEq for Offset {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Axes(a), Self::Axes(b)) => a == b,
            (Self::Fn(a), Self::Fn(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Axes(axes) => f.debug_tuple("Axes").field(axes).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Translation applied by [`Offset`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OffsetData {
    /// Applied x delta.
    pub x: f64,
    /// Applied y delta.
    pub y: f64,
    /// Placement the delta was computed for.
    pub placement: Placement,
}
