// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device-pixel snapping.

use kurbo::{Point, Vec2};

/// Snap `p` to the device pixel grid for `dpr` device pixels per unit.
///
/// A non-finite or non-positive `dpr` is treated as 1.
pub fn round_by_dpr(p: Point, dpr: f64) -> Point {
    let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    ((p.to_vec2() * dpr).round() / dpr).to_point()
}

/// Snap a single value to the device pixel grid.
pub fn round_value_by_dpr(value: f64, dpr: f64) -> f64 {
    round_by_dpr(Point::new(value, 0.0), dpr).x
}

/// Translation that moves an element from its layout origin to `p`, snapped for `dpr`.
pub fn snapped_translation(p: Point, dpr: f64) -> Vec2 {
    round_by_dpr(p, dpr).to_vec2()
}
