// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement vocabulary and the shared geometry value types.
//!
//! All rectangles are [`kurbo::Rect`] snapshots. A rectangle produced by a
//! [`Platform`](crate::Platform) is never mutated; every pass replaces it.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use kurbo::{Insets, Point, Rect, Size};

use crate::error::Error;

/// One of the four sides of a rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Side {
    /// Above the reference.
    Top,
    /// Right of the reference.
    Right,
    /// Below the reference.
    Bottom,
    /// Left of the reference.
    Left,
}

impl Side {
    /// All sides in priority order.
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// The side across the reference.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// The axis a floating element on this side is displaced along.
    pub const fn axis(self) -> Axis {
        match self {
            Self::Top | Self::Bottom => Axis::Y,
            Self::Left | Self::Right => Axis::X,
        }
    }

    /// Whether this side faces the coordinate origin (`top` or `left`).
    pub const fn is_origin(self) -> bool {
        matches!(self, Self::Top | Self::Left)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

/// Alignment of the floating element along the reference edge.
///
/// A placement without an alignment is centered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Alignment {
    /// Align the start edges (left or top in LTR).
    Start,
    /// Align the end edges.
    End,
}

impl Alignment {
    /// The other alignment.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

/// A coordinate axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

impl Axis {
    /// The perpendicular axis.
    pub const fn opposite(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }

    /// Component of `p` along this axis.
    pub const fn coord(self, p: Point) -> f64 {
        match self {
            Self::X => p.x,
            Self::Y => p.y,
        }
    }

    /// Replace the component of `p` along this axis.
    pub const fn set_coord(self, p: &mut Point, value: f64) {
        match self {
            Self::X => p.x = value,
            Self::Y => p.y = value,
        }
    }

    /// Extent of `size` along this axis.
    pub const fn length(self, size: Size) -> f64 {
        match self {
            Self::X => size.width,
            Self::Y => size.height,
        }
    }

    /// Start edge of `rect` along this axis.
    pub const fn start(self, rect: Rect) -> f64 {
        match self {
            Self::X => rect.x0,
            Self::Y => rect.y0,
        }
    }

    /// Side at the low end of this axis.
    pub const fn min_side(self) -> Side {
        match self {
            Self::X => Side::Left,
            Self::Y => Side::Top,
        }
    }

    /// Side at the high end of this axis.
    pub const fn max_side(self) -> Side {
        match self {
            Self::X => Side::Right,
            Self::Y => Side::Bottom,
        }
    }
}

/// Requested side and alignment of the floating element relative to the reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[allow(missing_docs, reason = "variant names are self-describing")]
pub enum Placement {
    Top,
    TopStart,
    TopEnd,
    Right,
    RightStart,
    RightEnd,
    #[default]
    Bottom,
    BottomStart,
    BottomEnd,
    Left,
    LeftStart,
    LeftEnd,
}

impl Placement {
    /// Every placement, in the fixed priority order used for deterministic ties.
    pub const ALL: [Self; 12] = [
        Self::Top,
        Self::TopStart,
        Self::TopEnd,
        Self::Right,
        Self::RightStart,
        Self::RightEnd,
        Self::Bottom,
        Self::BottomStart,
        Self::BottomEnd,
        Self::Left,
        Self::LeftStart,
        Self::LeftEnd,
    ];

    /// Compose a placement from a side and an optional alignment.
    pub const fn new(side: Side, alignment: Option<Alignment>) -> Self {
        use Alignment::{End, Start};
        match (side, alignment) {
            (Side::Top, None) => Self::Top,
            (Side::Top, Some(Start)) => Self::TopStart,
            (Side::Top, Some(End)) => Self::TopEnd,
            (Side::Right, None) => Self::Right,
            (Side::Right, Some(Start)) => Self::RightStart,
            (Side::Right, Some(End)) => Self::RightEnd,
            (Side::Bottom, None) => Self::Bottom,
            (Side::Bottom, Some(Start)) => Self::BottomStart,
            (Side::Bottom, Some(End)) => Self::BottomEnd,
            (Side::Left, None) => Self::Left,
            (Side::Left, Some(Start)) => Self::LeftStart,
            (Side::Left, Some(End)) => Self::LeftEnd,
        }
    }

    /// Side of the reference the floating element sits on.
    pub const fn side(self) -> Side {
        match self {
            Self::Top | Self::TopStart | Self::TopEnd => Side::Top,
            Self::Right | Self::RightStart | Self::RightEnd => Side::Right,
            Self::Bottom | Self::BottomStart | Self::BottomEnd => Side::Bottom,
            Self::Left | Self::LeftStart | Self::LeftEnd => Side::Left,
        }
    }

    /// Alignment along the reference edge; `None` means centered.
    pub const fn alignment(self) -> Option<Alignment> {
        match self {
            Self::TopStart | Self::RightStart | Self::BottomStart | Self::LeftStart => {
                Some(Alignment::Start)
            }
            Self::TopEnd | Self::RightEnd | Self::BottomEnd | Self::LeftEnd => Some(Alignment::End),
            _ => None,
        }
    }

    /// Axis the floating element is displaced along (away from the reference).
    pub const fn side_axis(self) -> Axis {
        self.side().axis()
    }

    /// Axis the alignment applies to.
    pub const fn alignment_axis(self) -> Axis {
        self.side_axis().opposite()
    }

    /// Same alignment on the opposite side.
    pub const fn opposite(self) -> Self {
        Self::new(self.side().opposite(), self.alignment())
    }

    /// Same side with `start` and `end` swapped.
    pub const fn opposite_alignment(self) -> Self {
        let alignment = match self.alignment() {
            Some(a) => Some(a.opposite()),
            None => None,
        };
        Self::new(self.side(), alignment)
    }

    /// Whether this placement is centered (a bare side).
    pub const fn is_centered(self) -> bool {
        self.alignment().is_none()
    }

    /// The placement, its opposite, and both with swapped alignment.
    pub(crate) fn expanded(self) -> [Self; 3] {
        let opposite = self.opposite();
        [
            self.opposite_alignment(),
            opposite,
            opposite.opposite_alignment(),
        ]
    }

    /// The two sides that bound the alignment axis, the one the floating
    /// element is most likely to overflow first.
    pub(crate) fn alignment_sides(self, rects: &ElementRects, rtl: bool) -> (Side, Side) {
        let axis = self.alignment_axis();
        let alignment = self.alignment();
        let mut main = match axis {
            Axis::X => {
                let start = if rtl { Alignment::End } else { Alignment::Start };
                if alignment == Some(start) {
                    Side::Right
                } else {
                    Side::Left
                }
            }
            Axis::Y => {
                if alignment == Some(Alignment::Start) {
                    Side::Bottom
                } else {
                    Side::Top
                }
            }
        };
        if axis.length(rects.reference.size()) > axis.length(rects.floating.size()) {
            main = main.opposite();
        }
        (main, main.opposite())
    }

    /// Placements on the perpendicular axis, in the requested direction.
    pub(crate) fn opposite_axis_placements(
        self,
        flip_alignment: bool,
        direction: Alignment,
        rtl: bool,
    ) -> Vec<Self> {
        let is_start = direction == Alignment::Start;
        let sides = match self.side() {
            Side::Top | Side::Bottom => {
                if is_start != rtl {
                    [Side::Left, Side::Right]
                } else {
                    [Side::Right, Side::Left]
                }
            }
            Side::Left | Side::Right => {
                if is_start {
                    [Side::Top, Side::Bottom]
                } else {
                    [Side::Bottom, Side::Top]
                }
            }
        };
        let mut list: Vec<Self> = sides
            .iter()
            .map(|s| Self::new(*s, self.alignment()))
            .collect();
        if self.alignment().is_some() && flip_alignment {
            let swapped: Vec<Self> = list.iter().map(|p| p.opposite_alignment()).collect();
            list.extend(swapped);
        }
        list
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.side().name())?;
        match self.alignment() {
            Some(Alignment::Start) => f.write_str("-start"),
            Some(Alignment::End) => f.write_str("-end"),
            None => Ok(()),
        }
    }
}

impl FromStr for Placement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, alignment) = match s.split_once('-') {
            Some((side, "start")) => (side, Some(Alignment::Start)),
            Some((side, "end")) => (side, Some(Alignment::End)),
            Some(_) => return Err(Error::InvalidPlacement(String::from(s))),
            None => (s, None),
        };
        let side = Side::ALL
            .into_iter()
            .find(|candidate| candidate.name() == side)
            .ok_or_else(|| Error::InvalidPlacement(String::from(s)))?;
        Ok(Self::new(side, alignment))
    }
}

/// Which coordinate space the final position is expressed in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Strategy {
    /// Relative to the floating element's containing block (offset parent).
    #[default]
    Absolute,
    /// Relative to the viewport.
    Fixed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absolute => "absolute",
            Self::Fixed => "fixed",
        })
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(Self::Absolute),
            "fixed" => Ok(Self::Fixed),
            _ => Err(Error::InvalidStrategy(String::from(s))),
        }
    }
}

/// Measured reference and floating rectangles for one pass.
///
/// The reference rect is expressed in the pass's strategy space. The floating
/// rect only carries a size; its origin is always zero.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ElementRects {
    /// The anchor.
    pub reference: Rect,
    /// The positioned element, at the origin.
    pub floating: Rect,
}

/// A value per side, used for overflow amounts.
///
/// Positive values mean the element crosses the boundary on that side by that many pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[allow(missing_docs, reason = "field names are self-describing")]
pub struct SideOffsets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl SideOffsets {
    /// Value for `side`.
    pub const fn get(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }
}

/// Padding value for `side` from a per-side [`Insets`].
pub(crate) const fn inset(padding: Insets, side: Side) -> f64 {
    match side {
        Side::Top => padding.y0,
        Side::Right => padding.x1,
        Side::Bottom => padding.y1,
        Side::Left => padding.x0,
    }
}

/// Clamp `value` into `[min, max]`, preferring `min` when the range is inverted.
pub(crate) fn clamp(min: f64, value: f64, max: f64) -> f64 {
    min.max(value.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_parts_round_trip() {
        for p in Placement::ALL {
            assert_eq!(Placement::new(p.side(), p.alignment()), p);
        }
        assert_eq!(Placement::BottomStart.opposite(), Placement::TopStart);
        assert_eq!(Placement::LeftEnd.opposite_alignment(), Placement::LeftStart);
        assert_eq!(Placement::Right.opposite_alignment(), Placement::Right);
        assert_eq!(Placement::Top.side_axis(), Axis::Y);
        assert_eq!(Placement::Top.alignment_axis(), Axis::X);
    }

    #[test]
    fn placement_strings() {
        assert_eq!("bottom-start".parse::<Placement>().unwrap(), Placement::BottomStart);
        assert_eq!("left".parse::<Placement>().unwrap(), Placement::Left);
        assert_eq!(alloc::format!("{}", Placement::RightEnd), "right-end");
        assert!("middle".parse::<Placement>().is_err());
        assert!("top-center".parse::<Placement>().is_err());
        assert_eq!("fixed".parse::<Strategy>().unwrap(), Strategy::Fixed);
    }

    #[test]
    fn expanded_placements() {
        assert_eq!(
            Placement::BottomStart.expanded(),
            [Placement::BottomEnd, Placement::TopStart, Placement::TopEnd]
        );
    }

    #[test]
    fn opposite_axis_placements_follow_direction() {
        assert_eq!(
            Placement::Top.opposite_axis_placements(true, Alignment::Start, false),
            [Placement::Left, Placement::Right]
        );
        assert_eq!(
            Placement::Top.opposite_axis_placements(true, Alignment::Start, true),
            [Placement::Right, Placement::Left]
        );
        assert_eq!(
            Placement::LeftStart.opposite_axis_placements(true, Alignment::End, false),
            [
                Placement::BottomStart,
                Placement::TopStart,
                Placement::BottomEnd,
                Placement::TopEnd
            ]
        );
    }

    #[test]
    fn clamp_prefers_min_when_inverted() {
        assert_eq!(clamp(0.0, 5.0, 10.0), 5.0);
        assert_eq!(clamp(0.0, -5.0, 10.0), 0.0);
        assert_eq!(clamp(0.0, 15.0, 10.0), 10.0);
        assert_eq!(clamp(10.0, 5.0, 0.0), 10.0);
    }
}
