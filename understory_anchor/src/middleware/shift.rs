// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use kurbo::Point;

use super::{MiddlewareReturn, MiddlewareState};
use crate::overflow::{DetectOverflowOptions, detect_overflow};
use crate::types::{Axis, clamp};

/// Slide the floating element along the reference edge to keep it inside the boundary.
///
/// The "main axis" here is the alignment axis (x for top and bottom placements); the cross
/// axis is the side axis. Checking the cross axis lets the floating element overlap the
/// reference when there is no room at all.
#[derive(Clone, PartialEq)]
pub struct Shift<E> {
    /// Shift along the alignment axis.
    pub main_axis: bool,
    /// Shift along the side axis.
    pub cross_axis: bool,
    /// Bound the shift so the floating element stays attached.
    pub limiter: Option<LimitShift>,
    /// Boundary and padding.
    pub overflow: DetectOverflowOptions<E>,
}

impl<E> Default for Shift<E> {
    fn default() -> Self {
        Self {
            main_axis: true,
            cross_axis: false,
            limiter: None,
            overflow: DetectOverflowOptions::default(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Shift<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shift")
            .field("main_axis", &self.main_axis)
            .field("cross_axis", &self.cross_axis)
            .field("limiter", &self.limiter)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> Shift<E> {
    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let overflow = detect_overflow(state, &self.overflow);
        let cross = state.placement.side_axis();
        let main = cross.opposite();
        let mut coords = state.coords();

        for (axis, enabled) in [(main, self.main_axis), (cross, self.cross_axis)] {
            if enabled {
                let current = axis.coord(coords);
                let min = current + overflow.get(axis.min_side());
                let max = current - overflow.get(axis.max_side());
                axis.set_coord(&mut coords, clamp(min, current, max));
            }
        }

        if let Some(limiter) = &self.limiter {
            coords = limiter.limit(state, coords);
        }

        let enabled = |axis: Axis| {
            (axis == main && self.main_axis) || (axis == cross && self.cross_axis)
        };
        MiddlewareReturn::at(coords).with_data(ShiftData {
            x: coords.x - state.x,
            y: coords.y - state.y,
            enabled: AxisFlags {
                x: enabled(Axis::X),
                y: enabled(Axis::Y),
            },
        })
    }
}

/// Limit how far [`Shift`] may move the floating element off its reference.
///
/// Along the alignment axis the floating element keeps at least touching the reference
/// (shrunk by `main_axis_offset`). Along the side axis it may not cross past the far edge
/// of the reference.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LimitShift {
    /// Limit along the alignment axis.
    pub main_axis: bool,
    /// Limit along the side axis.
    pub cross_axis: bool,
    /// Required overlap along the alignment axis; negative values allow a gap.
    pub main_axis_offset: f64,
    /// Extra room along the side axis.
    pub cross_axis_offset: f64,
}

impl Default for LimitShift {
    fn default() -> Self {
        Self {
            main_axis: true,
            cross_axis: true,
            main_axis_offset: 0.0,
            cross_axis_offset: 0.0,
        }
    }
}

impl LimitShift {
    /// Clamp `coords` (already shifted) into the allowed range.
    pub fn limit<E: Clone + PartialEq + fmt::Debug>(
        &self,
        state: &MiddlewareState<'_, E>,
        mut coords: Point,
    ) -> Point {
        let rects = &state.rects;
        let cross = state.placement.side_axis();
        let main = cross.opposite();

        if self.main_axis {
            let len_ref = main.length(rects.reference.size());
            let len_float = main.length(rects.floating.size());
            let start = main.start(rects.reference);
            let limit_min = start - len_float + self.main_axis_offset;
            let limit_max = start + len_ref - self.main_axis_offset;
            let current = main.coord(coords);
            main.set_coord(&mut coords, limit_range(current, limit_min, limit_max));
        }

        if self.cross_axis {
            let len_ref = cross.length(rects.reference.size());
            let len_float = cross.length(rects.floating.size());
            let start = cross.start(rects.reference);
            let is_origin = state.placement.side().is_origin();
            let applied = state
                .middleware_data
                .offset
                .as_ref()
                .map_or(0.0, |o| cross.coord(Point::new(o.x, o.y)));
            let (min_extra, max_extra) = if is_origin {
                (applied, -self.cross_axis_offset)
            } else {
                (self.cross_axis_offset, applied)
            };
            let limit_min = start - len_float + min_extra;
            let limit_max = start + len_ref + max_extra;
            let current = cross.coord(coords);
            cross.set_coord(&mut coords, limit_range(current, limit_min, limit_max));
        }
        coords
    }
}

fn limit_range(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Per-axis flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs, reason = "field names are self-describing")]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
}

/// Movement applied by [`Shift`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShiftData {
    /// X delta.
    pub x: f64,
    /// Y delta.
    pub y: f64,
    /// Which axes were checked.
    pub enabled: AxisFlags,
}
