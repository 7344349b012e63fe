// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use kurbo::Insets;

use super::{MiddlewareReturn, MiddlewareState, Reset};
use crate::types::{Axis, clamp, inset};

/// Position an arrow element along the floating element's edge, pointing at the reference.
///
/// The arrow is centered on the reference where possible and kept inside the floating
/// element (minus `padding`). The floating element itself is only moved when an aligned
/// placement would leave the arrow off the reference entirely; that move is recorded as
/// `alignment_offset` and the pipeline re-runs once.
#[derive(Clone, PartialEq)]
pub struct Arrow<E> {
    /// The arrow element. Without one the step does nothing.
    pub element: Option<E>,
    /// Keep the arrow this far from the floating element's corners.
    pub padding: Insets,
}

impl<E> Default for Arrow<E> {
    fn default() -> Self {
        Self {
            element: None,
            padding: Insets::ZERO,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Arrow<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arrow")
            .field("element", &self.element)
            .field("padding", &self.padding)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> Arrow<E> {
    /// An arrow step for `element`.
    pub fn new(element: E) -> Self {
        Self {
            element: Some(element),
            padding: Insets::ZERO,
        }
    }

    /// Run against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        let Some(element) = &self.element else {
            return MiddlewareReturn::default();
        };
        let Some(arrow) = state.platform.dimensions(element) else {
            tracing::debug!("arrow element could not be measured");
            return MiddlewareReturn::default();
        };
        let rects = &state.rects;
        let placement = state.placement;
        let axis = placement.alignment_axis();
        let coords = state.coords();
        let coord = axis.coord(coords);
        let arrow_len = axis.length(arrow);
        let reference_len = axis.length(rects.reference.size());
        let floating_len = axis.length(rects.floating.size());
        let reference_start = axis.start(rects.reference);

        let end_diff = reference_len + reference_start - coord - floating_len;
        let start_diff = coord - reference_start;
        let center_to_reference = end_diff / 2.0 - start_diff / 2.0;

        let largest_padding = floating_len / 2.0 - arrow_len / 2.0 - 1.0;
        let min_padding = inset(self.padding, axis.min_side())
            .min(largest_padding)
            .max(0.0);
        let max_padding = inset(self.padding, axis.max_side())
            .min(largest_padding)
            .max(0.0);
        let min = min_padding;
        let max = floating_len - arrow_len - max_padding;
        let center = floating_len / 2.0 - arrow_len / 2.0 + center_to_reference;
        let offset = clamp(min, center, max);

        let edge_padding = if center < min { min_padding } else { max_padding };
        let should_add_offset = state.middleware_data.arrow.is_none()
            && !placement.is_centered()
            && center != offset
            && reference_len / 2.0 - edge_padding - arrow_len / 2.0 < 0.0;
        let alignment_offset = if !should_add_offset {
            0.0
        } else if center < min {
            center - min
        } else {
            center - max
        };

        let mut ret = MiddlewareReturn::default();
        let mut moved = coords;
        axis.set_coord(&mut moved, coord + alignment_offset);
        match axis {
            Axis::X => ret.x = Some(moved.x),
            Axis::Y => ret.y = Some(moved.y),
        }
        let data = ArrowData {
            x: (axis == Axis::X).then_some(offset),
            y: (axis == Axis::Y).then_some(offset),
            center_offset: offset,
            off_center: center - offset - alignment_offset,
            alignment_offset: should_add_offset.then_some(alignment_offset),
        };
        ret = ret.with_data(data);
        if should_add_offset {
            ret = ret.with_reset(Reset::Rerun);
        }
        ret
    }
}

/// Arrow placement within the floating element.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ArrowData {
    /// Offset from the floating element's left edge, for top and bottom placements.
    pub x: Option<f64>,
    /// Offset from the floating element's top edge, for left and right placements.
    pub y: Option<f64>,
    /// The arrow's offset along the floating element's edge, always within
    /// `[0, floating - arrow]`.
    pub center_offset: f64,
    /// Signed distance between `center_offset` and where the arrow would be centered on the
    /// reference. Zero when the clamp did not engage.
    pub off_center: f64,
    /// How far the floating element was moved to keep the arrow on the reference.
    pub alignment_offset: Option<f64>,
}

impl ArrowData {
    /// Merge a newer pass's data over this one.
    pub(crate) fn merge(&mut self, newer: Self) {
        self.x = newer.x.or(self.x);
        self.y = newer.y.or(self.y);
        self.center_offset = newer.center_offset;
        self.off_center = newer.off_center;
        self.alignment_offset = newer.alignment_offset.or(self.alignment_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Offset, Shift};
    use crate::{ComputeConfig, Placement, RectPlatform, Reference, compute_position};
    use kurbo::Rect;

    fn platform(reference: Rect) -> RectPlatform {
        let p = RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        p.set_rect(1, reference);
        p.set_rect(2, Rect::new(0.0, 0.0, 120.0, 40.0));
        p.set_rect(3, Rect::new(0.0, 0.0, 10.0, 10.0));
        p
    }

    #[test]
    fn arrow_centers_on_the_reference() {
        let p = platform(Rect::new(300.0, 100.0, 350.0, 120.0));
        let config = ComputeConfig::new(Placement::BottomStart).with(Arrow::new(3));
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        let arrow = r.middleware_data.arrow.unwrap();
        // Reference center 325, floating starts at 300: arrow at 25 - 5.
        assert_eq!(arrow.x, Some(20.0));
        assert_eq!(arrow.y, None);
        assert_eq!(arrow.center_offset, 20.0);
        assert_eq!(arrow.off_center, 0.0);
        assert_eq!(r.x, 300.0);
    }

    #[test]
    fn arrow_offset_stays_within_the_floating_element() {
        for step in 0..40 {
            let x = f64::from(step) * 20.0 - 40.0;
            let p = platform(Rect::new(x, 100.0, x + 30.0, 120.0));
            for placement in [Placement::Bottom, Placement::TopEnd, Placement::BottomStart] {
                let config = ComputeConfig::new(placement)
                    .with(Offset::main_axis(6.0))
                    .with(Shift::default())
                    .with(Arrow {
                        element: Some(3),
                        padding: Insets::uniform(4.0),
                    });
                let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
                let ax = r.middleware_data.arrow.unwrap().x.unwrap();
                assert!(
                    (0.0..=110.0).contains(&ax),
                    "arrow x {ax} outside floating at {placement} reference x {x}"
                );
            }
        }
    }

    #[test]
    fn center_offset_stays_in_range_when_clamped() {
        // A reference wider than the floating element pushes the centered arrow past the
        // far edge for start and end alignments.
        let p = platform(Rect::new(300.0, 100.0, 600.0, 120.0));
        for placement in Placement::ALL {
            let config = ComputeConfig::new(placement).with(Arrow::new(3));
            let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
            let arrow = r.middleware_data.arrow.unwrap();
            let extent = if placement.alignment_axis() == Axis::X {
                110.0
            } else {
                30.0
            };
            assert!(
                (0.0..=extent).contains(&arrow.center_offset),
                "{placement}: {arrow:?}"
            );
            assert_eq!(arrow.x.or(arrow.y), Some(arrow.center_offset), "{placement}");
        }

        let config = ComputeConfig::new(Placement::BottomStart).with(Arrow::new(3));
        let arrow = compute_position(&p, &Reference::Element(1), &2, &config)
            .unwrap()
            .middleware_data
            .arrow
            .unwrap();
        assert_eq!(arrow.center_offset, 110.0);
        assert_eq!(arrow.off_center, 35.0);

        let config = ComputeConfig::new(Placement::BottomEnd).with(Arrow::new(3));
        let arrow = compute_position(&p, &Reference::Element(1), &2, &config)
            .unwrap()
            .middleware_data
            .arrow
            .unwrap();
        assert_eq!(arrow.center_offset, 0.0);
        assert_eq!(arrow.off_center, -35.0);
    }

    #[test]
    fn tiny_reference_gets_an_alignment_offset() {
        // 4px reference with an end-aligned floating element: the arrow cannot reach
        // the reference without moving the floating element.
        let p = platform(Rect::new(300.0, 100.0, 304.0, 120.0));
        let config = ComputeConfig::new(Placement::BottomStart).with(Arrow {
            element: Some(3),
            padding: Insets::uniform(8.0),
        });
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        let arrow = r.middleware_data.arrow.unwrap();
        assert!(arrow.alignment_offset.is_some());
        assert_eq!(arrow.x, Some(8.0));
        // The floating element moved left so the arrow sits over the reference center.
        assert_eq!(r.x + 8.0 + 5.0, 302.0);
    }

    #[test]
    fn missing_element_is_a_no_op() {
        let p = platform(Rect::new(300.0, 100.0, 350.0, 120.0));
        let config = ComputeConfig::new(Placement::Bottom).with(Arrow::<u32>::default());
        let r = compute_position(&p, &Reference::Element(1), &2, &config).unwrap();
        assert!(r.middleware_data.arrow.is_none());
    }
}
