// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::fmt;

use super::{MiddlewareReturn, MiddlewareState, Reset};
use crate::overflow::{DetectOverflowOptions, detect_overflow};
use crate::platform::opt_rc_eq;
use crate::types::{Alignment, Axis, Side};

/// Space the floating element may grow into without overflowing.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AvailableSpace {
    /// Maximum width.
    pub width: f64,
    /// Maximum height.
    pub height: f64,
}

/// Callback that resizes the floating element's content.
pub type ApplyFn<E> = Rc<dyn Fn(&MiddlewareState<'_, E>, AvailableSpace)>;

/// Report the space available to the floating element at its current placement.
///
/// `apply` receives the available width and height, typically to cap a list's height and
/// let it scroll. If the floating element's measured size changed afterwards, the pipeline
/// re-measures and re-runs. With `min_available`, a placement whose side offers less room
/// than that switches once to the opposite side when that side offers more.
#[derive(Clone)]
pub struct AvailableSize<E> {
    /// Resize callback.
    pub apply: Option<ApplyFn<E>>,
    /// Minimum room along the side axis before trying the opposite side.
    pub min_available: Option<f64>,
    /// Boundary and padding.
    pub overflow: DetectOverflowOptions<E>,
}

impl<E> Default for AvailableSize<E> {
    fn default() -> Self {
        Self {
            apply: None,
            min_available: None,
            overflow: DetectOverflowOptions::default(),
        }
    }
}

impl<E: PartialEq> PartialEq for AvailableSize<E> {
    fn eq(&self, other: &Self) -> bool {
        opt_rc_eq(&self.apply, &other.apply)
            && self.min_available == other.min_available
            && self.overflow == other.overflow
    }
}

impl<E: fmt::Debug> fmt::Debug for AvailableSize<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailableSize")
            .field("apply", &self.apply.is_some())
            .field("min_available", &self.min_available)
            .field("overflow", &self.overflow)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> AvailableSize<E> {
    /// A size step calling `apply`.
    pub fn new(apply: impl Fn(&MiddlewareState<'_, E>, AvailableSpace) + 'static) -> Self {
        Self {
            apply: Some(Rc::new(apply)),
            ..Self::default()
        }
    }

    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let overflow = detect_overflow(state, &self.overflow);
        let placement = state.placement;
        let side = placement.side();
        let alignment = placement.alignment();
        let size = state.rects.floating.size();
        let rtl = state.rtl();

        let (height_side, width_side) = match side {
            Side::Top | Side::Bottom => {
                let end = if rtl { Alignment::Start } else { Alignment::End };
                let width_side = if alignment == Some(end) {
                    Side::Left
                } else {
                    Side::Right
                };
                (side, width_side)
            }
            Side::Left | Side::Right => {
                let height_side = if alignment == Some(Alignment::End) {
                    Side::Top
                } else {
                    Side::Bottom
                };
                (height_side, side)
            }
        };

        let max_clip_height = size.height - overflow.top - overflow.bottom;
        let max_clip_width = size.width - overflow.left - overflow.right;
        let mut available = AvailableSpace {
            width: (size.width - overflow.get(width_side)).min(max_clip_width),
            height: (size.height - overflow.get(height_side)).min(max_clip_height),
        };

        let shift = state.middleware_data.shift.as_ref();
        if shift.is_some_and(|s| s.enabled.x) {
            available.width = max_clip_width;
        }
        if shift.is_some_and(|s| s.enabled.y) {
            available.height = max_clip_height;
        }
        if shift.is_none() && alignment.is_none() {
            // Centered without shift: the element grows symmetrically.
            let symmetric = |len: f64, a: f64, b: f64| {
                let (a_pos, b_pos) = (a.max(0.0), b.max(0.0));
                let lost = if a_pos != 0.0 || b_pos != 0.0 {
                    a_pos + b_pos
                } else {
                    a.max(b)
                };
                len - 2.0 * lost
            };
            if placement.side_axis() == Axis::Y {
                available.width = symmetric(size.width, overflow.left, overflow.right);
            } else {
                available.height = symmetric(size.height, overflow.top, overflow.bottom);
            }
        }

        let switched = state.middleware_data.size.is_some_and(|d| d.switched);
        if let Some(min) = self.min_available {
            let axis = placement.side_axis();
            let len = axis.length(size);
            let here = len - overflow.get(side);
            let there = len - overflow.get(side.opposite());
            if !switched && here < min && there > here {
                tracing::debug!(%placement, here, there, "size switching side");
                return MiddlewareReturn::default()
                    .with_data(SizeData {
                        available_width: available.width,
                        available_height: available.height,
                        switched: true,
                    })
                    .with_reset(Reset::placement(placement.opposite()));
            }
        }

        if let Some(apply) = &self.apply {
            apply(state, available);
        }
        let ret = MiddlewareReturn::default().with_data(SizeData {
            available_width: available.width,
            available_height: available.height,
            switched,
        });
        match state.platform.dimensions(state.elements.floating) {
            Some(next) if next != size => ret.with_reset(Reset::remeasure()),
            _ => ret,
        }
    }
}

/// Space reported by [`AvailableSize`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SizeData {
    /// Width available at the final placement.
    pub available_width: f64,
    /// Height available at the final placement.
    pub available_height: f64,
    /// Whether the step moved to the opposite side for room.
    pub switched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Flip;
    use crate::{ComputeConfig, Placement, Platform, RectPlatform, Reference, compute_position};
    use core::cell::Cell;
    use kurbo::Rect;

    fn platform() -> Rc<RectPlatform> {
        let p = Rc::new(RectPlatform::new(Rect::new(0.0, 0.0, 400.0, 300.0)));
        p.set_rect(1, Rect::new(100.0, 200.0, 150.0, 220.0));
        p.set_rect(2, Rect::new(0.0, 0.0, 60.0, 200.0));
        p
    }

    #[test]
    fn reports_room_below_and_resizes() {
        let p = platform();
        let seen = Rc::new(Cell::new(AvailableSpace::default()));
        let (host, sink) = (p.clone(), seen.clone());
        let config = ComputeConfig::new(Placement::BottomStart).with(AvailableSize::new(
            move |_, space| {
                sink.set(space);
                host.set_rect(2, Rect::new(0.0, 0.0, 60.0, space.height.min(200.0)));
            },
        ));
        let r = compute_position(&*p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(seen.get().height, 80.0);
        assert_eq!(seen.get().width, 300.0);
        assert_eq!(p.dimensions(&2).unwrap().height, 80.0);
        assert_eq!(r.middleware_data.size.unwrap().available_height, 80.0);
        assert_eq!(r.y, 220.0);
    }

    #[test]
    fn min_available_switches_to_the_roomier_side() {
        let p = platform();
        let config = ComputeConfig::new(Placement::Bottom).with(AvailableSize::<u32> {
            min_available: Some(120.0),
            ..AvailableSize::default()
        });
        let r = compute_position(&*p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::Top);
        let data = r.middleware_data.size.unwrap();
        assert!(data.switched);
        assert_eq!(data.available_height, 200.0);
    }

    #[test]
    fn flip_then_size_reports_space_on_the_flipped_side() {
        let p = platform();
        let config = ComputeConfig::new(Placement::Bottom)
            .with(Flip::default())
            .with(AvailableSize::<u32>::default());
        let r = compute_position(&*p, &Reference::Element(1), &2, &config).unwrap();
        assert_eq!(r.placement, Placement::Top);
        assert_eq!(r.middleware_data.size.unwrap().available_height, 200.0);
    }
}
