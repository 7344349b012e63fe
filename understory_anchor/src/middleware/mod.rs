// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Middleware: composable transforms over an in-flight position.
//!
//! ## Protocol
//!
//! [`compute_position`](crate::compute_position) folds an ordered list of [`Middleware`] over a
//! [`MiddlewareState`]. Each step reads the state and returns a [`MiddlewareReturn`]: optional new
//! coordinates, optional data to merge into [`MiddlewareData`] under the step's name, and an
//! optional [`Reset`] asking the pipeline to start over from the first step.
//!
//! Steps never mutate the state they are given. The set is a closed enum so a configuration
//! can be inspected, compared and tested one step at a time; [`Custom`] covers the rest.
//!
//! ## Ordering
//!
//! The usual order is `offset`, then one of `flip`/`auto_placement`, then `shift`, `size`,
//! `arrow` and `hide`. `flip` and `auto_placement` both rewrite the placement; when both are
//! configured the one that resets last wins.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::fmt;

use kurbo::Point;

use crate::error::{Error, Result};
use crate::overflow::DetectOverflowOptions;
use crate::platform::{Elements, Platform};
use crate::types::{ElementRects, Placement, Strategy};

mod arrow;
mod auto_placement;
mod flip;
mod hide;
mod inline;
mod offset;
mod shift;
mod size;

pub use arrow::{Arrow, ArrowData};
pub use auto_placement::{AutoPlacement, AutoPlacementData};
pub use flip::{CrossAxisCheck, FallbackStrategy, Flip, FlipData, PlacementOverflow};
pub use hide::{Hide, HideData, HideStrategy};
pub use inline::Inline;
pub use offset::{Offset, OffsetAxes, OffsetData, OffsetFn};
pub use shift::{AxisFlags, LimitShift, Shift, ShiftData};
pub use size::{ApplyFn, AvailableSize, AvailableSpace, SizeData};

/// Everything a middleware step can read.
pub struct MiddlewareState<'a, E> {
    /// Current x coordinate in strategy space.
    pub x: f64,
    /// Current y coordinate in strategy space.
    pub y: f64,
    /// The placement the caller asked for.
    pub initial_placement: Placement,
    /// The placement in effect for this pass.
    pub placement: Placement,
    /// The coordinate space of this computation.
    pub strategy: Strategy,
    /// Measured rectangles for this pass.
    pub rects: ElementRects,
    /// Data written by earlier steps and earlier passes.
    pub middleware_data: &'a MiddlewareData,
    /// The elements being positioned.
    pub elements: Elements<'a, E>,
    /// The host measurement capability.
    pub platform: &'a dyn Platform<Element = E>,
}

impl<E: Clone + PartialEq + fmt::Debug> MiddlewareState<'_, E> {
    /// Current coordinates.
    pub fn coords(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether the floating element lays out right-to-left.
    pub fn rtl(&self) -> bool {
        self.platform.is_rtl(self.elements.floating)
    }
}

impl<E: fmt::Debug> fmt::Debug for MiddlewareState<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareState")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("placement", &self.placement)
            .field("strategy", &self.strategy)
            .field("rects", &self.rects)
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

/// How the pipeline should restart.
#[derive(Clone, Debug, PartialEq)]
pub enum Reset {
    /// Re-run every step from the first, keeping the current coordinates.
    Rerun,
    /// Re-run from the first step after recomputing coordinates from the (possibly new)
    /// placement and rects.
    Recompute {
        /// Switch to this placement.
        placement: Option<Placement>,
        /// Replace or re-measure the rects.
        rects: Option<ResetRects>,
    },
}

impl Reset {
    /// Recompute with a new placement.
    pub const fn placement(placement: Placement) -> Self {
        Self::Recompute {
            placement: Some(placement),
            rects: None,
        }
    }

    /// Recompute after re-measuring both elements.
    pub const fn remeasure() -> Self {
        Self::Recompute {
            placement: None,
            rects: Some(ResetRects::Remeasure),
        }
    }
}

/// Rect handling for [`Reset::Recompute`].
#[derive(Clone, Debug, PartialEq)]
pub enum ResetRects {
    /// Ask the platform again.
    Remeasure,
    /// Use these rects.
    Use(ElementRects),
}

/// The partial update a middleware step returns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MiddlewareReturn {
    /// New x coordinate.
    pub x: Option<f64>,
    /// New y coordinate.
    pub y: Option<f64>,
    /// Data to merge under the step's name.
    pub data: Option<DataUpdate>,
    /// Restart request.
    pub reset: Option<Reset>,
}

impl MiddlewareReturn {
    /// Move to `p`.
    pub fn at(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            ..Self::default()
        }
    }

    /// Attach data.
    pub fn with_data(mut self, data: impl Into<DataUpdate>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach a reset request.
    pub fn with_reset(mut self, reset: Reset) -> Self {
        self.reset = Some(reset);
        self
    }
}

/// Numeric entries written by a [`Custom`] step.
pub type CustomData = BTreeMap<&'static str, f64>;

/// One step's contribution to [`MiddlewareData`].
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs, reason = "variants mirror the MiddlewareData fields")]
pub enum DataUpdate {
    Offset(OffsetData),
    Shift(ShiftData),
    Flip(FlipData),
    AutoPlacement(AutoPlacementData),
    Arrow(ArrowData),
    Hide(HideData),
    Size(SizeData),
    Custom(CustomData),
}

macro_rules! data_update_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for DataUpdate {
            fn from(data: $ty) -> Self {
                Self::$variant(data)
            }
        })*
    };
}

data_update_from!(
    Offset(OffsetData),
    Shift(ShiftData),
    Flip(FlipData),
    AutoPlacement(AutoPlacementData),
    Arrow(ArrowData),
    Hide(HideData),
    Size(SizeData),
    Custom(CustomData),
);

/// Per-middleware output accumulated over a computation.
///
/// Data persists across resets within one computation, which is how `flip` and
/// `auto_placement` remember which candidates they have tried.
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(missing_docs, reason = "one field per built-in middleware")]
pub struct MiddlewareData {
    pub offset: Option<OffsetData>,
    pub shift: Option<ShiftData>,
    pub flip: Option<FlipData>,
    pub auto_placement: Option<AutoPlacementData>,
    pub arrow: Option<ArrowData>,
    pub hide: Option<HideData>,
    pub size: Option<SizeData>,
    /// Entries from [`Custom`] steps, keyed by step name.
    pub custom: BTreeMap<&'static str, CustomData>,
}

impl MiddlewareData {
    /// Merge `update` into the entry for `name`; fields absent from the update keep their values.
    pub(crate) fn merge(&mut self, name: &'static str, update: DataUpdate) {
        match update {
            DataUpdate::Offset(d) => self.offset = Some(d),
            DataUpdate::Shift(d) => self.shift = Some(d),
            DataUpdate::Flip(d) => self.flip = Some(d),
            DataUpdate::AutoPlacement(d) => self.auto_placement = Some(d),
            DataUpdate::Arrow(d) => match &mut self.arrow {
                Some(prev) => prev.merge(d),
                None => self.arrow = Some(d),
            },
            DataUpdate::Hide(d) => match &mut self.hide {
                Some(prev) => prev.merge(d),
                None => self.hide = Some(d),
            },
            DataUpdate::Size(d) => self.size = Some(d),
            DataUpdate::Custom(d) => self.custom.entry(name).or_default().extend(d),
        }
    }
}

/// Signature of a user-supplied step.
pub type CustomFn<E> = Rc<dyn Fn(&MiddlewareState<'_, E>) -> MiddlewareReturn>;

/// A user-supplied step.
pub struct Custom<E> {
    /// Key for this step's data in [`MiddlewareData::custom`].
    pub name: &'static str,
    /// The transform.
    pub run: CustomFn<E>,
}

impl<E> Custom<E> {
    /// Wrap a closure as a named step.
    pub fn new(
        name: &'static str,
        run: impl Fn(&MiddlewareState<'_, E>) -> MiddlewareReturn + 'static,
    ) -> Self {
        Self {
            name,
            run: Rc::new(run),
        }
    }
}

impl<E> Clone for Custom<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            run: self.run.clone(),
        }
    }
}

impl<E> PartialEq for Custom<E> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.run, &other.run)
    }
}

impl<E> fmt::Debug for Custom<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A pipeline step.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs, reason = "each variant wraps its options type")]
pub enum Middleware<E> {
    Offset(Offset),
    Shift(Shift<E>),
    Flip(Flip<E>),
    AutoPlacement(AutoPlacement<E>),
    Arrow(Arrow<E>),
    Size(AvailableSize<E>),
    Hide(Hide<E>),
    Inline(Inline),
    Custom(Custom<E>),
}

impl<E: Clone + PartialEq + fmt::Debug> Middleware<E> {
    /// Name this step's data is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offset(_) => "offset",
            Self::Shift(_) => "shift",
            Self::Flip(_) => "flip",
            Self::AutoPlacement(_) => "autoPlacement",
            Self::Arrow(_) => "arrow",
            Self::Size(_) => "size",
            Self::Hide(_) => "hide",
            Self::Inline(_) => "inline",
            Self::Custom(c) => c.name,
        }
    }

    /// Overflow options of the steps that measure against a boundary.
    pub fn overflow_options(&self) -> Option<&DetectOverflowOptions<E>> {
        match self {
            Self::Shift(m) => Some(&m.overflow),
            Self::Flip(m) => Some(&m.overflow),
            Self::AutoPlacement(m) => Some(&m.overflow),
            Self::Size(m) => Some(&m.overflow),
            Self::Hide(m) => Some(&m.overflow),
            Self::Offset(_) | Self::Arrow(_) | Self::Inline(_) | Self::Custom(_) => None,
        }
    }

    /// Check this step's configuration against a platform.
    pub fn validate<P>(&self, platform: &P) -> Result<()>
    where
        P: Platform<Element = E> + ?Sized,
    {
        if let Self::Arrow(Arrow {
            element: Some(element),
            ..
        }) = self
        {
            if !platform.contains(element) {
                return Err(Error::UnknownElement);
            }
        }
        if let Some(options) = self.overflow_options() {
            options.boundary.validate(platform)?;
            options.root_boundary.validate()?;
        }
        Ok(())
    }

    /// Run this step against `state`.
    pub fn compute(&self, state: &MiddlewareState<'_, E>) -> MiddlewareReturn {
        match self {
            Self::Offset(m) => m.compute(state),
            Self::Shift(m) => m.compute(state),
            Self::Flip(m) => m.compute(state),
            Self::AutoPlacement(m) => m.compute(state),
            Self::Arrow(m) => m.compute(state),
            Self::Size(m) => m.compute(state),
            Self::Hide(m) => m.compute(state),
            Self::Inline(m) => m.compute(state),
            Self::Custom(c) => (c.run)(state),
        }
    }
}

macro_rules! middleware_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl<E> From<$ty> for Middleware<E> {
            fn from(m: $ty) -> Self {
                Self::$variant(m)
            }
        })*
    };
}

middleware_from!(
    Shift(Shift<E>),
    Flip(Flip<E>),
    AutoPlacement(AutoPlacement<E>),
    Arrow(Arrow<E>),
    Size(AvailableSize<E>),
    Hide(Hide<E>),
    Custom(Custom<E>),
);

impl<E> From<Offset> for Middleware<E> {
    fn from(m: Offset) -> Self {
        Self::Offset(m)
    }
}

impl<E> From<Inline> for Middleware<E> {
    fn from(m: Inline) -> Self {
        Self::Inline(m)
    }
}
