// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Insets, Point, Rect};

use super::{MiddlewareReturn, MiddlewareState, Reset, ResetRects};
use crate::platform::{Reference, VirtualElement};
use crate::types::{Axis, Side};

/// Anchor to a single line of a reference that wraps across several.
///
/// Per-line rectangles come from [`Platform::client_rects`](crate::Platform::client_rects).
/// With a pointer, the line under (or nearest to) the pointer is used. Without one, top
/// and bottom placements span the first and last lines and attach to the first line's
/// horizontal extent for `top` and the last line's for `bottom`; left and right placements
/// use the lines reaching furthest to that side.
#[derive(Copy, Clone, PartialEq)]
pub struct Inline {
    /// Pointer position in viewport space.
    pub pointer: Option<Point>,
    /// Slack around each line when hit-testing the pointer.
    pub padding: Insets,
}

impl Default for Inline {
    fn default() -> Self {
        Self {
            pointer: None,
            padding: Insets::uniform(2.0),
        }
    }
}

impl fmt::Debug for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inline")
            .field("pointer", &self.pointer)
            .field("padding", &self.padding)
            .finish()
    }
}

impl Inline {
    /// Anchor to the line nearest `pointer`.
    pub fn at_pointer(pointer: Point) -> Self {
        Self {
            pointer: Some(pointer),
            ..Self::default()
        }
    }

    /// The viewport-space rect to anchor to, given the reference's per-line rects.
    pub fn anchor_rect(&self, client_rects: &[Rect], side: Side) -> Option<Rect> {
        let fallback = client_rects.iter().copied().reduce(|a, b| a.union(b))?;
        let lines = group_by_line(client_rects);
        if lines.len() < 2 {
            return Some(fallback);
        }

        if let Some(p) = self.pointer {
            let pad = self.padding;
            let hit = lines.iter().find(|r| {
                p.x > r.x0 - pad.x0
                    && p.x < r.x1 + pad.x1
                    && p.y > r.y0 - pad.y0
                    && p.y < r.y1 + pad.y1
            });
            let nearest = || {
                lines
                    .iter()
                    .min_by(|a, b| distance(**a, p).total_cmp(&distance(**b, p)))
            };
            return hit.or_else(nearest).copied();
        }

        let first = lines[0];
        let last = lines[lines.len() - 1];
        Some(match side.axis() {
            Axis::Y => {
                let span = if side == Side::Top { first } else { last };
                Rect::new(span.x0, first.y0, span.x1, last.y1)
            }
            Axis::X => {
                let min_left = lines.iter().map(|r| r.x0).fold(f64::INFINITY, f64::min);
                let max_right = lines.iter().map(|r| r.x1).fold(f64::NEG_INFINITY, f64::max);
                let edge: Vec<&Rect> = lines
                    .iter()
                    .filter(|r| {
                        if side == Side::Left {
                            r.x0 == min_left
                        } else {
                            r.x1 == max_right
                        }
                    })
                    .collect();
                let top = edge.first().map_or(first.y0, |r| r.y0);
                let bottom = edge.last().map_or(last.y1, |r| r.y1);
                Rect::new(min_left, top, max_right, bottom)
            }
        })
    }

    /// Run against `state`.
    pub fn compute<E: Clone + PartialEq + fmt::Debug>(
        &self,
        state: &MiddlewareState<'_, E>,
    ) -> MiddlewareReturn {
        let platform = state.platform;
        let reference = state.elements.reference;
        let client_rects = platform.client_rects(reference);
        let Some(anchor) = self.anchor_rect(&client_rects, state.placement.side()) else {
            return MiddlewareReturn::default();
        };

        let mut line = VirtualElement::from_rect(anchor);
        if let Some(context) = reference.element() {
            line = line.with_context_element(context.clone());
        }
        let Some(rects) = platform.element_rects(
            &Reference::Virtual(line),
            state.elements.floating,
            state.strategy,
        ) else {
            return MiddlewareReturn::default();
        };
        if rects.reference == state.rects.reference {
            return MiddlewareReturn::default();
        }
        MiddlewareReturn::default().with_reset(Reset::Recompute {
            placement: None,
            rects: Some(ResetRects::Use(rects)),
        })
    }
}

/// Merge rects whose tops are within half a line of the previous rect into one rect per line.
fn group_by_line(rects: &[Rect]) -> Vec<Rect> {
    let mut sorted = rects.to_vec();
    sorted.sort_by(|a, b| a.y0.total_cmp(&b.y0));
    let mut lines: Vec<Rect> = Vec::new();
    let mut prev: Option<Rect> = None;
    for r in sorted {
        let same_line = prev.is_some_and(|p| r.y0 - p.y0 <= p.height() / 2.0);
        if same_line {
            if let Some(line) = lines.last_mut() {
                *line = line.union(r);
            }
        } else {
            lines.push(r);
        }
        prev = Some(r);
    }
    lines
}

/// Distance from `p` to the nearest point of `r`.
fn distance(r: Rect, p: Point) -> f64 {
    let dx = (r.x0 - p.x).max(0.0).max(p.x - r.x1);
    let dy = (r.y0 - p.y).max(0.0).max(p.y - r.y1);
    kurbo::Vec2::new(dx, dy).hypot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComputeConfig, Placement, RectPlatform, compute_position};
    use alloc::vec;

    fn lines() -> Vec<Rect> {
        vec![
            Rect::new(200.0, 100.0, 300.0, 120.0),
            Rect::new(0.0, 120.0, 300.0, 140.0),
            Rect::new(0.0, 140.0, 80.0, 160.0),
        ]
    }

    #[test]
    fn groups_fragments_on_the_same_line() {
        let grouped = group_by_line(&[
            Rect::new(0.0, 0.0, 40.0, 20.0),
            Rect::new(40.0, 2.0, 90.0, 20.0),
            Rect::new(0.0, 22.0, 30.0, 42.0),
        ]);
        assert_eq!(
            grouped,
            [
                Rect::new(0.0, 0.0, 90.0, 20.0),
                Rect::new(0.0, 22.0, 30.0, 42.0)
            ]
        );
    }

    #[test]
    fn vertical_sides_attach_to_the_near_line() {
        let inline = Inline::default();
        assert_eq!(
            inline.anchor_rect(&lines(), Side::Top),
            Some(Rect::new(200.0, 100.0, 300.0, 160.0))
        );
        assert_eq!(
            inline.anchor_rect(&lines(), Side::Bottom),
            Some(Rect::new(0.0, 100.0, 80.0, 160.0))
        );
        assert_eq!(
            inline.anchor_rect(&lines(), Side::Right),
            Some(Rect::new(0.0, 100.0, 300.0, 140.0))
        );
    }

    #[test]
    fn pointer_picks_its_line() {
        let inline = Inline::at_pointer(Point::new(40.0, 150.0));
        assert_eq!(
            inline.anchor_rect(&lines(), Side::Bottom),
            Some(Rect::new(0.0, 140.0, 80.0, 160.0))
        );
        let off_line = Inline::at_pointer(Point::new(250.0, 90.0));
        assert_eq!(
            off_line.anchor_rect(&lines(), Side::Top),
            Some(Rect::new(200.0, 100.0, 300.0, 120.0))
        );
    }

    #[test]
    fn single_line_uses_the_bounding_rect() {
        let one = [Rect::new(10.0, 10.0, 50.0, 30.0)];
        assert_eq!(Inline::default().anchor_rect(&one, Side::Top), Some(one[0]));
        assert_eq!(Inline::default().anchor_rect(&[], Side::Top), None);
    }

    #[test]
    fn floating_anchors_to_the_selected_line() {
        let platform = RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        platform.set_rect(2, Rect::new(0.0, 0.0, 40.0, 20.0));
        let selection = Reference::Virtual(VirtualElement::from_client_rects(lines));
        let config = ComputeConfig::new(Placement::Top).with(Inline::default());
        let r = compute_position(&platform, &selection, &2, &config).unwrap();
        // Centered over the first line, not over the whole selection.
        assert_eq!((r.x, r.y), (230.0, 80.0));
    }
}
