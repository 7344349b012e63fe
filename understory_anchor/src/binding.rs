// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A stateful handle for UI layers.
//!
//! [`Anchored`] owns the element handles, the configuration and an open flag, keeps a
//! [`subscribe`] subscription alive while all three allow it, and exposes the latest
//! position as an [`AnchoredState`]. Until the first successful measurement
//! [`AnchoredState::is_positioned`] is `false`, so callers can avoid drawing the floating
//! element at the origin.
//!
//! ```
//! use std::rc::Rc;
//! use kurbo::Rect;
//! use understory_anchor::{Anchored, Listeners, Placement, RectPlatform, Reference};
//!
//! let platform = Rc::new(RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 600.0)));
//! platform.set_rect(1, Rect::new(100.0, 100.0, 150.0, 120.0));
//! platform.set_rect(2, Rect::new(0.0, 0.0, 120.0, 40.0));
//!
//! let mut tooltip = Anchored::new(platform, Rc::new(Listeners::new()))
//!     .with_placement(Placement::Bottom);
//! assert!(!tooltip.is_positioned());
//! tooltip.set_reference(Some(Reference::Element(1))).unwrap();
//! tooltip.set_floating(Some(2)).unwrap();
//! assert!(tooltip.is_positioned());
//! assert_eq!((tooltip.state().x, tooltip.state().y), (65.0, 120.0));
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::auto_update::{AutoUpdateOptions, Listeners, Subscription, subscribe};
use crate::compute::{ComputeConfig, ComputePositionResult};
use crate::error::Result;
use crate::middleware::{Middleware, MiddlewareData};
use crate::platform::{Platform, Reference};
use crate::round::{round_by_dpr, snapped_translation};
use crate::types::{Placement, Strategy};

/// Latest published position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnchoredState {
    /// X in strategy space.
    pub x: f64,
    /// Y in strategy space.
    pub y: f64,
    /// Final placement.
    pub placement: Placement,
    /// Coordinate space of `x` and `y`.
    pub strategy: Strategy,
    /// Data recorded by the middleware.
    pub middleware_data: MiddlewareData,
    /// Whether at least one measurement succeeded since the element was last opened.
    pub is_positioned: bool,
}

impl AnchoredState {
    fn publish(&mut self, result: &ComputePositionResult) {
        self.x = result.x;
        self.y = result.y;
        self.placement = result.placement;
        self.strategy = result.strategy;
        self.middleware_data = result.middleware_data.clone();
        self.is_positioned = true;
    }
}

/// Ready-to-apply styles for the floating element.
///
/// With `translation` set, the element is laid out at `left`/`top` (the origin) and moved
/// by the translation. Otherwise `left`/`top` carry the position directly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FloatingStyles {
    /// Coordinate space.
    pub strategy: Strategy,
    /// Left offset.
    pub left: f64,
    /// Top offset.
    pub top: f64,
    /// Device-pixel-snapped translation, when positioning by transform.
    pub translation: Option<Vec2>,
    /// Hint that the translation changes often; set on high-density displays.
    pub will_change_transform: bool,
}

type ChangeFn = Box<dyn Fn(&AnchoredState)>;

/// Position one floating element against one reference, kept up to date.
pub struct Anchored<P: Platform> {
    platform: Rc<P>,
    listeners: Rc<Listeners<P::Element>>,
    config: ComputeConfig<P::Element>,
    auto_update: Option<AutoUpdateOptions>,
    transform: bool,
    reference: Option<Reference<P::Element>>,
    floating: Option<P::Element>,
    arrow: Option<P::Element>,
    open: bool,
    state: Rc<RefCell<AnchoredState>>,
    on_change: Rc<RefCell<Option<ChangeFn>>>,
    subscription: Option<Subscription<P>>,
}

impl<P: Platform> fmt::Debug for Anchored<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchored")
            .field("config", &self.config)
            .field("auto_update", &self.auto_update)
            .field("transform", &self.transform)
            .field("reference", &self.reference)
            .field("floating", &self.floating)
            .field("arrow", &self.arrow)
            .field("open", &self.open)
            .field("state", &self.state.borrow())
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<P> Anchored<P>
where
    P: Platform + 'static,
    P::Element: 'static,
{
    /// An open handle with the default configuration, no elements and default auto-update.
    pub fn new(platform: Rc<P>, listeners: Rc<Listeners<P::Element>>) -> Self {
        let config = ComputeConfig::default();
        let state = AnchoredState {
            placement: config.placement,
            strategy: config.strategy,
            ..AnchoredState::default()
        };
        Self {
            platform,
            listeners,
            config,
            auto_update: Some(AutoUpdateOptions::default()),
            transform: true,
            reference: None,
            floating: None,
            arrow: None,
            open: true,
            state: Rc::new(RefCell::new(state)),
            on_change: Rc::new(RefCell::new(None)),
            subscription: None,
        }
    }

    /// Builder form of [`set_config`](Self::set_config) for a handle with no elements yet.
    pub fn with_config(mut self, config: ComputeConfig<P::Element>) -> Self {
        self.reset_unpositioned(&config);
        self.config = config;
        self
    }

    /// Use `placement` with an otherwise unchanged configuration.
    pub fn with_placement(self, placement: Placement) -> Self {
        let config = ComputeConfig {
            placement,
            ..self.config.clone()
        };
        self.with_config(config)
    }

    /// Which triggers keep the position fresh; `None` updates only on [`update`](Self::update).
    pub fn with_auto_update(mut self, options: Option<AutoUpdateOptions>) -> Self {
        self.auto_update = options;
        self
    }

    /// Position by translation (the default) or by `left`/`top`.
    pub fn with_transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &ComputeConfig<P::Element> {
        &self.config
    }

    /// Whether the floating element is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Set or clear the reference.
    pub fn set_reference(&mut self, reference: Option<Reference<P::Element>>) -> Result<()> {
        self.reference = reference;
        self.resubscribe()
    }

    /// Set or clear the floating element.
    pub fn set_floating(&mut self, floating: Option<P::Element>) -> Result<()> {
        self.floating = floating;
        self.resubscribe()
    }

    /// Set or clear the arrow element.
    ///
    /// The element is used by every [`Arrow`](crate::middleware::Arrow) step that does not
    /// name its own.
    pub fn set_arrow(&mut self, arrow: Option<P::Element>) -> Result<()> {
        if self.arrow == arrow {
            return Ok(());
        }
        self.arrow = arrow;
        self.resubscribe()
    }

    /// Replace the configuration. An equal configuration is ignored.
    pub fn set_config(&mut self, config: ComputeConfig<P::Element>) -> Result<()> {
        if config == self.config {
            tracing::trace!("configuration unchanged");
            return Ok(());
        }
        self.reset_unpositioned(&config);
        self.config = config;
        self.resubscribe()
    }

    /// Open or close. Closing stops updates and clears `is_positioned`.
    pub fn set_open(&mut self, open: bool) -> Result<()> {
        if self.open == open {
            return Ok(());
        }
        self.open = open;
        if !open {
            self.subscription = None;
            self.state.borrow_mut().is_positioned = false;
            self.notify();
            return Ok(());
        }
        self.resubscribe()
    }

    /// Recompute now.
    pub fn update(&self) {
        if let Some(subscription) = &self.subscription {
            subscription.update();
        }
    }

    /// Latest state.
    pub fn state(&self) -> AnchoredState {
        self.state.borrow().clone()
    }

    /// Whether the current position comes from a measurement.
    pub fn is_positioned(&self) -> bool {
        self.state.borrow().is_positioned
    }

    /// Styles placing the floating element at the current position.
    pub fn floating_styles(&self) -> FloatingStyles {
        let state = self.state.borrow();
        let dpr = self
            .floating
            .as_ref()
            .map_or(1.0, |f| self.platform.device_pixel_ratio(f));
        let at = Point::new(state.x, state.y);
        if self.transform {
            FloatingStyles {
                strategy: state.strategy,
                left: 0.0,
                top: 0.0,
                translation: Some(snapped_translation(at, dpr)),
                will_change_transform: dpr >= 1.5,
            }
        } else {
            let at = round_by_dpr(at, dpr);
            FloatingStyles {
                strategy: state.strategy,
                left: at.x,
                top: at.y,
                translation: None,
                will_change_transform: false,
            }
        }
    }

    /// Call `f` with every new state. Replaces any earlier callback.
    pub fn on_change(&mut self, f: impl Fn(&AnchoredState) + 'static) {
        *self.on_change.borrow_mut() = Some(Box::new(f));
    }

    fn notify(&self) {
        let snapshot = self.state();
        if let Some(f) = self.on_change.borrow().as_ref() {
            f(&snapshot);
        }
    }

    fn reset_unpositioned(&self, config: &ComputeConfig<P::Element>) {
        let mut state = self.state.borrow_mut();
        if !state.is_positioned {
            state.placement = config.placement;
            state.strategy = config.strategy;
        }
    }

    /// The configuration with the arrow element filled in.
    fn effective_config(&self) -> ComputeConfig<P::Element> {
        let mut config = self.config.clone();
        if let Some(arrow) = &self.arrow {
            for m in &mut config.middleware {
                if let Middleware::Arrow(a) = m {
                    a.element.get_or_insert_with(|| arrow.clone());
                }
            }
        }
        config
    }

    fn resubscribe(&mut self) -> Result<()> {
        self.subscription = None;
        let (true, Some(reference), Some(floating)) =
            (self.open, self.reference.clone(), self.floating.clone())
        else {
            return Ok(());
        };
        let state = self.state.clone();
        let on_change = self.on_change.clone();
        let subscription = subscribe(
            self.platform.clone(),
            &self.listeners,
            reference,
            floating,
            self.effective_config(),
            self.auto_update.unwrap_or(AutoUpdateOptions::manual()),
            move |result| {
                state.borrow_mut().publish(result);
                let snapshot = state.borrow().clone();
                if let Some(f) = on_change.borrow().as_ref() {
                    f(&snapshot);
                }
            },
        )?;
        self.subscription = Some(subscription);
        Ok(())
    }
}
