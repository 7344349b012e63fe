// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_anchor --heading-base-level=0

//! Understory Anchor: deterministic anchored positioning for floating UI.
//!
//! ## Overview
//!
//! Tooltips, popovers, dropdowns and context menus all need the same thing: put a floating
//! element next to a reference element and keep it visible. This crate computes that position.
//!
//! [`compute_position`] measures both elements through a [`Platform`], places the floating
//! element at the requested [`Placement`] and then folds an ordered list of
//! [`middleware`] steps over the result. Each step may move the element, record data for
//! the caller, or ask the pipeline to start over with a different placement or fresh
//! measurements. The built-in steps cover the usual needs:
//!
//! - [`Offset`](middleware::Offset): a gap between reference and floating element.
//! - [`Shift`](middleware::Shift) and [`LimitShift`](middleware::LimitShift): slide along
//!   the reference to stay in view.
//! - [`Flip`](middleware::Flip) and [`AutoPlacement`](middleware::AutoPlacement): choose the
//!   side with room.
//! - [`AvailableSize`](middleware::AvailableSize): report (and react to) the room left.
//! - [`Arrow`](middleware::Arrow), [`Hide`](middleware::Hide) and [`Inline`](middleware::Inline).
//! - [`Custom`](middleware::Custom) steps of your own.
//!
//! ## Keeping it attached
//!
//! [`subscribe`] recomputes whenever the host reports a relevant [`Trigger`] (an ancestor
//! scrolled, something resized) and publishes only results that changed after device-pixel
//! rounding. [`Anchored`] wraps that in a stateful handle for UI code.
//!
//! ## Platforms
//!
//! [`RectPlatform`] treats every element as a literal viewport rectangle. With the
//! `scene_adapter` feature, `RefCell<understory_scene::Scene>` is a platform with scroll
//! containers, clipping, transforms and fixed elements.
//!
//! ## Example
//!
//! ```
//! use kurbo::Rect;
//! use understory_anchor::middleware::{Flip, Offset, Shift};
//! use understory_anchor::{ComputeConfig, Placement, RectPlatform, Reference, compute_position};
//!
//! // A button near the bottom of a short viewport and a 120x40 tooltip.
//! let platform = RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 140.0));
//! platform.set_rect(1, Rect::new(100.0, 100.0, 150.0, 120.0));
//! platform.set_rect(2, Rect::new(0.0, 0.0, 120.0, 40.0));
//!
//! let config = ComputeConfig::new(Placement::Bottom)
//!     .with(Offset::main_axis(4.0))
//!     .with(Flip::default())
//!     .with(Shift::default());
//! let result = compute_position(&platform, &Reference::Element(1), &2, &config).unwrap();
//!
//! // No room below, so the tooltip flipped above the button.
//! assert_eq!(result.placement, Placement::Top);
//! assert_eq!((result.x, result.y), (65.0, 56.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
mod auto_update;
mod binding;
mod compute;
mod error;
pub mod middleware;
mod overflow;
mod platform;
mod rect_platform;
mod round;
mod types;

pub use auto_update::{
    AutoUpdateOptions, Cleanup, ListenerId, Listeners, Subscription, Trigger, auto_update,
    subscribe,
};
pub use binding::{Anchored, AnchoredState, FloatingStyles};
pub use compute::{
    ComputeConfig, ComputePositionResult, RESET_LIMIT, compute_coords_from_placement,
    compute_position,
};
pub use error::{Error, Result};
pub use middleware::{Middleware, MiddlewareData};
pub use overflow::{DetectOverflowOptions, ElementContext, detect_overflow};
pub use platform::{
    Ancestor, Boundary, Elements, Platform, RectFn, RectsFn, Reference, RootBoundary,
    VirtualElement, clip_intersection,
};
pub use rect_platform::RectPlatform;
pub use round::{round_by_dpr, round_value_by_dpr, snapped_translation};
pub use types::{Alignment, Axis, ElementRects, Placement, Side, SideOffsets, Strategy};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{
        Arrow, AutoPlacement, AvailableSize, Flip, Hide, HideStrategy, Inline, LimitShift, Offset,
        Shift,
    };
    use alloc::string::ToString;
    use kurbo::Rect;

    fn everything(placement: Placement) -> ComputeConfig<u32> {
        ComputeConfig::new(placement)
            .with(Inline::default())
            .with(Offset::main_axis(8.0))
            .with(Flip::default())
            .with(Shift {
                limiter: Some(LimitShift::default()),
                ..Shift::default()
            })
            .with(AvailableSize::default())
            .with(Arrow::new(3))
            .with(Hide::new(HideStrategy::ReferenceHidden))
            .with(Hide::new(HideStrategy::Escaped))
    }

    #[test]
    fn degenerate_rects_give_finite_coordinates() {
        let platform = RectPlatform::new(Rect::new(0.0, 0.0, 300.0, 200.0));
        platform.set_rect(1, Rect::new(40.0, 40.0, 40.0, 40.0));
        platform.set_rect(2, Rect::ZERO);
        platform.set_rect(3, Rect::ZERO);
        for placement in Placement::ALL {
            let r = compute_position(&platform, &Reference::Element(1), &2, &everything(placement))
                .unwrap();
            assert!(r.x.is_finite() && r.y.is_finite(), "{placement}: {r:?}");
        }
        let auto = ComputeConfig::new(Placement::Top).with(AutoPlacement::default());
        let r = compute_position(&platform, &Reference::Element(1), &2, &auto).unwrap();
        assert!(r.x.is_finite() && r.y.is_finite(), "{r:?}");
    }

    #[test]
    fn computing_is_deterministic() {
        let platform = RectPlatform::new(Rect::new(0.0, 0.0, 300.0, 200.0));
        platform.set_rect(1, Rect::new(250.0, 170.0, 290.0, 190.0));
        platform.set_rect(2, Rect::new(0.0, 0.0, 100.0, 60.0));
        platform.set_rect(3, Rect::new(0.0, 0.0, 8.0, 8.0));
        for placement in Placement::ALL {
            let config = everything(placement);
            let a = compute_position(&platform, &Reference::Element(1), &2, &config).unwrap();
            let b = compute_position(&platform, &Reference::Element(1), &2, &config).unwrap();
            assert_eq!(a, b, "{placement}");
        }
    }

    #[test]
    fn placements_round_trip_through_strings() {
        for placement in Placement::ALL {
            assert_eq!(placement.to_string().parse::<Placement>(), Ok(placement));
        }
        assert_eq!(
            "sideways".parse::<Placement>(),
            Err(Error::InvalidPlacement("sideways".into()))
        );
        assert_eq!("fixed".parse::<Strategy>(), Ok(Strategy::Fixed));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Placement::BottomStart).unwrap();
        assert_eq!(json, "\"bottom-start\"");
        let options: AutoUpdateOptions =
            serde_json::from_str(r#"{"animation-frame": true}"#).unwrap();
        assert!(options.animation_frame);
        assert!(options.ancestor_scroll);
    }
}
