// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compute-position fold.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Point;

use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareData, MiddlewareState, Reset, ResetRects};
use crate::platform::{Elements, Platform, Reference};
use crate::types::{Alignment, Axis, ElementRects, Placement, Side, Strategy};

/// Maximum number of resets honored in one computation.
///
/// Further reset requests are ignored and the fold runs to completion.
pub const RESET_LIMIT: usize = 50;

/// Placement, strategy and the ordered middleware list.
#[derive(Clone, PartialEq)]
pub struct ComputeConfig<E> {
    /// Requested placement.
    pub placement: Placement,
    /// Coordinate space of the result.
    pub strategy: Strategy,
    /// Steps, run in order.
    pub middleware: Vec<Middleware<E>>,
}

impl<E> Default for ComputeConfig<E> {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            strategy: Strategy::default(),
            middleware: Vec::new(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for ComputeConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeConfig")
            .field("placement", &self.placement)
            .field("strategy", &self.strategy)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl<E: Clone + PartialEq + fmt::Debug> ComputeConfig<E> {
    /// A config with `placement` and no middleware.
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Append a middleware step.
    pub fn with(mut self, middleware: impl Into<Middleware<E>>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Check the configuration against a platform.
    ///
    /// Fails on empty or unknown boundary elements, non-finite literal boundaries and
    /// unknown arrow elements. Configuring both `flip` and `auto_placement` is not an error,
    /// but is reported with a warning: whichever resets last decides the placement.
    pub fn validate<P>(&self, platform: &P) -> Result<()>
    where
        P: Platform<Element = E> + ?Sized,
    {
        for m in &self.middleware {
            m.validate(platform)?;
        }
        let has = |name: &str| self.middleware.iter().any(|m| m.name() == name);
        if has("flip") && has("autoPlacement") {
            tracing::warn!(
                "flip and autoPlacement are both configured; the last one to reset wins"
            );
        }
        Ok(())
    }
}

/// Final coordinates and everything the middleware recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputePositionResult {
    /// X in strategy space.
    pub x: f64,
    /// Y in strategy space.
    pub y: f64,
    /// Placement after any flip or auto placement.
    pub placement: Placement,
    /// Strategy the coordinates are expressed in.
    pub strategy: Strategy,
    /// Per-middleware output.
    pub middleware_data: MiddlewareData,
}

impl ComputePositionResult {
    /// Final coordinates.
    pub fn coords(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Coordinates that put `rects.floating` flush against `rects.reference` at `placement`.
///
/// The main axis places the near edge of the floating element on the reference edge; the
/// alignment axis centers, or aligns start or end edges. Under `rtl`, start and end swap
/// for top and bottom placements.
pub fn compute_coords_from_placement(
    rects: &ElementRects,
    placement: Placement,
    rtl: bool,
) -> Point {
    let reference = rects.reference;
    let floating = rects.floating.size();
    let alignment_axis = placement.alignment_axis();
    let is_vertical = placement.side_axis() == Axis::Y;

    let common_x = reference.x0 + reference.width() / 2.0 - floating.width / 2.0;
    let common_y = reference.y0 + reference.height() / 2.0 - floating.height / 2.0;
    let common_align =
        alignment_axis.length(reference.size()) / 2.0 - alignment_axis.length(floating) / 2.0;

    let mut coords = match placement.side() {
        Side::Top => Point::new(common_x, reference.y0 - floating.height),
        Side::Bottom => Point::new(common_x, reference.y1),
        Side::Right => Point::new(reference.x1, common_y),
        Side::Left => Point::new(reference.x0 - floating.width, common_y),
    };

    let direction = if rtl && is_vertical { -1.0 } else { 1.0 };
    let current = alignment_axis.coord(coords);
    match placement.alignment() {
        Some(Alignment::Start) => {
            alignment_axis.set_coord(&mut coords, current - common_align * direction);
        }
        Some(Alignment::End) => {
            alignment_axis.set_coord(&mut coords, current + common_align * direction);
        }
        None => {}
    }
    coords
}

/// Compute where `floating` belongs relative to `reference`.
///
/// Measures both elements, places the floating element at `config.placement`, then folds
/// `config.middleware` over the result. A step may request a reset; the fold then restarts
/// from the first step, at most [`RESET_LIMIT`] times.
///
/// The result is a pure function of the platform's measurements and the configuration.
/// Returns [`Error::Detached`] if either element cannot be measured and
/// [`Error::MissingRectAccessor`] for a virtual reference without accessors. Call
/// [`ComputeConfig::validate`] once at setup to catch configuration errors.
pub fn compute_position<P: Platform>(
    platform: &P,
    reference: &Reference<P::Element>,
    floating: &P::Element,
    config: &ComputeConfig<P::Element>,
) -> Result<ComputePositionResult> {
    reference.validate()?;
    let strategy = config.strategy;
    let rtl = platform.is_rtl(floating);
    let measure = || {
        platform
            .element_rects(reference, floating, strategy)
            .ok_or(Error::Detached)
    };

    let mut rects = measure()?;
    let mut placement = config.placement;
    let mut coords = compute_coords_from_placement(&rects, placement, rtl);
    let mut data = MiddlewareData::default();
    let mut resets = 0_usize;
    let elements = Elements {
        reference,
        floating,
    };

    let mut i = 0;
    while let Some(step) = config.middleware.get(i) {
        let ret = step.compute(&MiddlewareState {
            x: coords.x,
            y: coords.y,
            initial_placement: config.placement,
            placement,
            strategy,
            rects,
            middleware_data: &data,
            elements,
            platform,
        });
        tracing::trace!(step = step.name(), ?ret, "middleware");

        coords.x = ret.x.unwrap_or(coords.x);
        coords.y = ret.y.unwrap_or(coords.y);
        if let Some(update) = ret.data {
            data.merge(step.name(), update);
        }

        if let Some(reset) = ret.reset {
            if resets < RESET_LIMIT {
                resets += 1;
                if let Reset::Recompute {
                    placement: next,
                    rects: next_rects,
                } = reset
                {
                    if let Some(next) = next {
                        tracing::debug!(
                            step = step.name(),
                            from = %placement,
                            to = %next,
                            "placement reset"
                        );
                        placement = next;
                    }
                    match next_rects {
                        Some(ResetRects::Remeasure) => rects = measure()?,
                        Some(ResetRects::Use(r)) => rects = r,
                        None => {}
                    }
                    coords = compute_coords_from_placement(&rects, placement, rtl);
                }
                i = 0;
                continue;
            }
            tracing::warn!(step = step.name(), limit = RESET_LIMIT, "reset limit reached");
        }
        i += 1;
    }

    Ok(ComputePositionResult {
        x: coords.x,
        y: coords.y,
        placement,
        strategy,
        middleware_data: data,
    })
}
