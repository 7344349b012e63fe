// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keeping a computed position fresh.
//!
//! ## Listeners
//!
//! The host owns a [`Listeners`] registry and emits a [`Trigger`] into it whenever something
//! that can move an element happens: an ancestor scrolled, the viewport resized, an element
//! changed size, layout shifted, or a frame is about to be drawn. There is no global
//! registry; each host (window, scene, test) has its own.
//!
//! ## Auto-update
//!
//! [`auto_update`] arms listeners for one reference/floating pair and calls an update
//! closure when a relevant trigger fires. [`subscribe`] layers compute-position on top:
//! device-pixel rounding, exact change suppression and a reentrancy guard, publishing to
//! `on_update` only when the rounded result changed.
//!
//! Both return owned disposers. Disposing is synchronous and idempotent, happens on drop,
//! and no callback runs afterwards.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;

use crate::compute::{ComputeConfig, ComputePositionResult, compute_position};
use crate::error::{Error, Result};
use crate::platform::{Ancestor, Platform, Reference};
use crate::round::round_by_dpr;

/// Something that may have moved an element.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger<E> {
    /// An ancestor (or the viewport) scrolled.
    Scroll(Ancestor<E>),
    /// An ancestor (or the viewport) resized.
    Resize(Ancestor<E>),
    /// An element's own size changed.
    ElementResize(E),
    /// An element moved without any scroll or resize, for example after a sibling changed.
    LayoutShift(E),
    /// A frame is about to be drawn.
    Frame,
}

/// Handle to a registered listener.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32, u32);

impl ListenerId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

type Callback<E> = Rc<dyn Fn(&Trigger<E>)>;

struct Entry<E> {
    interests: Vec<Trigger<E>>,
    callback: Callback<E>,
}

struct Slot<E> {
    generation: u32,
    entry: Option<Entry<E>>,
}

/// A host-owned registry of trigger listeners.
///
/// Callbacks run outside the registry's borrow, so they may add or remove listeners.
pub struct Listeners<E> {
    slots: RefCell<Vec<Slot<E>>>,
    free_list: RefCell<Vec<usize>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            free_list: RefCell::new(Vec::new()),
        }
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<E> Listeners<E> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|s| s.entry.is_some())
            .count()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` refers to a live listener.
    pub fn is_alive(&self, id: ListenerId) -> bool {
        self.slots
            .borrow()
            .get(id.idx())
            .is_some_and(|s| s.generation == id.1 && s.entry.is_some())
    }

    /// Register `callback` for every trigger equal to one of `interests`.
    pub fn add(
        &self,
        interests: Vec<Trigger<E>>,
        callback: impl Fn(&Trigger<E>) + 'static,
    ) -> ListenerId {
        let entry = Entry {
            interests,
            callback: Rc::new(callback),
        };
        let mut slots = self.slots.borrow_mut();
        let idx = match self.free_list.borrow_mut().pop() {
            Some(idx) => {
                let slot = &mut slots[idx];
                slot.generation = slot.generation.wrapping_add(1);
                slot.entry = Some(entry);
                idx
            }
            None => {
                slots.push(Slot {
                    generation: 1,
                    entry: Some(entry),
                });
                slots.len() - 1
            }
        };
        let generation = slots[idx].generation;
        #[allow(clippy::cast_possible_truncation, reason = "slot count fits in u32")]
        let idx = idx as u32;
        ListenerId(idx, generation)
    }

    /// Unregister a listener. Returns `false` if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(id.idx()) else {
            return false;
        };
        if slot.generation != id.1 || slot.entry.is_none() {
            return false;
        }
        slot.entry = None;
        self.free_list.borrow_mut().push(id.idx());
        true
    }
}

impl<E: PartialEq> Listeners<E> {
    /// Deliver `trigger` to every interested listener. Returns how many were called.
    pub fn emit(&self, trigger: &Trigger<E>) -> usize {
        let callbacks: Vec<Callback<E>> = self
            .slots
            .borrow()
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .filter(|e| e.interests.contains(trigger))
            .map(|e| e.callback.clone())
            .collect();
        for callback in &callbacks {
            callback(trigger);
        }
        callbacks.len()
    }
}

/// Which triggers an auto-update listens to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct AutoUpdateOptions {
    /// Scrolling of any overflow ancestor of either element.
    pub ancestor_scroll: bool,
    /// Resizing of any overflow ancestor of either element.
    pub ancestor_resize: bool,
    /// Size changes of the reference or floating element.
    pub element_resize: bool,
    /// Layout shifts of the reference element.
    pub layout_shift: bool,
    /// Poll the reference rectangle every frame; catches moves nothing reports.
    pub animation_frame: bool,
    /// Coalesce triggers and update at most once per frame.
    pub batch_to_frame: bool,
}

impl Default for AutoUpdateOptions {
    fn default() -> Self {
        Self {
            ancestor_scroll: true,
            ancestor_resize: true,
            element_resize: true,
            layout_shift: true,
            animation_frame: false,
            batch_to_frame: false,
        }
    }
}

impl AutoUpdateOptions {
    /// Listen to nothing; updates happen only when requested.
    pub const fn manual() -> Self {
        Self {
            ancestor_scroll: false,
            ancestor_resize: false,
            element_resize: false,
            layout_shift: false,
            animation_frame: false,
            batch_to_frame: false,
        }
    }

    /// Triggers to listen for, given each element's overflow ancestors.
    fn interests<E: Clone + PartialEq>(
        &self,
        reference: Option<&E>,
        floating: &E,
        ancestors: &[Ancestor<E>],
    ) -> Vec<Trigger<E>> {
        let mut interests = Vec::new();
        for ancestor in ancestors {
            if self.ancestor_scroll {
                interests.push(Trigger::Scroll(ancestor.clone()));
            }
            if self.ancestor_resize {
                interests.push(Trigger::Resize(ancestor.clone()));
            }
        }
        if self.element_resize {
            interests.extend(reference.cloned().map(Trigger::ElementResize));
            interests.push(Trigger::ElementResize(floating.clone()));
        }
        if self.layout_shift {
            interests.extend(reference.cloned().map(Trigger::LayoutShift));
        }
        if self.animation_frame || self.batch_to_frame {
            interests.push(Trigger::Frame);
        }
        interests
    }
}

/// Disposer returned by [`auto_update`].
///
/// Dropping it disposes as well.
#[must_use = "dropping the cleanup disarms the listeners"]
pub struct Cleanup {
    disposed: Rc<Cell<bool>>,
    release: Option<Box<dyn FnOnce()>>,
}

impl Cleanup {
    /// Remove every armed listener. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.disposed.set(true);
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the listeners are still armed.
    pub fn is_active(&self) -> bool {
        !self.disposed.get()
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Call `update` whenever something that may move `floating` relative to `reference` happens.
///
/// Listens on `listeners` for the triggers `options` selects, across the overflow ancestors of
/// both elements. `update` runs once immediately. Fails if the reference cannot be measured or
/// the floating element is unknown to the platform.
pub fn auto_update<P>(
    platform: &Rc<P>,
    listeners: &Rc<Listeners<P::Element>>,
    reference: &Reference<P::Element>,
    floating: &P::Element,
    options: AutoUpdateOptions,
    update: impl Fn() + 'static,
) -> Result<Cleanup>
where
    P: Platform + 'static,
    P::Element: 'static,
{
    reference.validate()?;
    if !platform.contains(floating) {
        return Err(Error::UnknownElement);
    }

    let mut ancestors: Vec<Ancestor<P::Element>> = Vec::new();
    let sources = reference.element().into_iter().chain([floating]);
    for ancestor in sources.flat_map(|e| platform.overflow_ancestors(e)) {
        if !ancestors.contains(&ancestor) {
            ancestors.push(ancestor);
        }
    }
    let interests = options.interests(reference.element(), floating, &ancestors);
    tracing::debug!(
        ancestors = ancestors.len(),
        interests = interests.len(),
        "auto update armed"
    );

    let disposed = Rc::new(Cell::new(false));
    let update = Rc::new(update);
    let dirty = Cell::new(false);
    let last_rect: Cell<Option<Rect>> = Cell::new(reference.viewport_rect(&**platform));
    let callback = {
        let disposed = disposed.clone();
        let update = update.clone();
        let platform = platform.clone();
        let reference = reference.clone();
        move |trigger: &Trigger<P::Element>| {
            if disposed.get() {
                return;
            }
            match trigger {
                Trigger::Frame => {
                    let mut due = options.batch_to_frame && dirty.replace(false);
                    if options.animation_frame {
                        let rect = reference.viewport_rect(&*platform);
                        if rect != last_rect.get() {
                            last_rect.set(rect);
                            due = true;
                        }
                    }
                    if due {
                        update();
                    }
                }
                _ if options.batch_to_frame => dirty.set(true),
                _ => update(),
            }
        }
    };
    let id = listeners.add(interests, callback);
    let registry: Weak<Listeners<P::Element>> = Rc::downgrade(listeners);
    let cleanup = Cleanup {
        disposed,
        release: Some(Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })),
    };
    update();
    Ok(cleanup)
}

/// Owned state of one [`subscribe`] call.
struct Subscriber<P: Platform> {
    platform: Rc<P>,
    reference: Reference<P::Element>,
    floating: P::Element,
    config: ComputeConfig<P::Element>,
    last: RefCell<Option<ComputePositionResult>>,
    busy: Cell<bool>,
    pending: Cell<bool>,
    disposed: Cell<bool>,
    on_update: Box<dyn Fn(&ComputePositionResult)>,
}

impl<P: Platform> Subscriber<P> {
    /// Compute and publish if changed. Nested calls during a run coalesce into one follow-up.
    fn run(&self) {
        if self.disposed.get() {
            return;
        }
        if self.busy.replace(true) {
            self.pending.set(true);
            return;
        }
        for pass in 0..2 {
            self.pending.set(false);
            self.publish();
            if !self.pending.get() || self.disposed.get() {
                break;
            }
            if pass == 1 {
                tracing::debug!("dropping update requested during follow-up pass");
            }
        }
        self.pending.set(false);
        self.busy.set(false);
    }

    fn publish(&self) {
        let mut result = match compute_position(
            &*self.platform,
            &self.reference,
            &self.floating,
            &self.config,
        ) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(%err, "skipping position update");
                return;
            }
        };
        let dpr = self.platform.device_pixel_ratio(&self.floating);
        let snapped = round_by_dpr(result.coords(), dpr);
        result.x = snapped.x;
        result.y = snapped.y;

        if self.last.borrow().as_ref() == Some(&result) {
            tracing::trace!("position unchanged");
            return;
        }
        *self.last.borrow_mut() = Some(result.clone());
        if !self.disposed.get() {
            (self.on_update)(&result);
        }
    }
}

/// A live [`subscribe`] subscription.
///
/// Dropping it disposes as well.
#[must_use = "dropping the subscription stops updates"]
pub struct Subscription<P: Platform> {
    subscriber: Rc<Subscriber<P>>,
    cleanup: Cleanup,
}

impl<P: Platform> Subscription<P> {
    /// Recompute now, publishing if the result changed.
    pub fn update(&self) {
        self.subscriber.run();
    }

    /// The last published result.
    pub fn last(&self) -> Option<ComputePositionResult> {
        self.subscriber.last.borrow().clone()
    }

    /// Stop listening. Safe to call repeatedly; no update is published afterwards.
    pub fn dispose(&mut self) {
        self.subscriber.disposed.set(true);
        self.cleanup.dispose();
    }

    /// Whether the subscription is still live.
    pub fn is_active(&self) -> bool {
        !self.subscriber.disposed.get()
    }
}

impl<P: Platform> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: Platform> fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .field("last", &self.subscriber.last.borrow())
            .finish_non_exhaustive()
    }
}

/// Compute the position of `floating` now and whenever it may have changed.
///
/// `on_update` receives each result whose device-pixel-rounded form differs from the last
/// one published. Measurement failures during updates are logged and skipped. Configuration
/// errors are returned here.
pub fn subscribe<P>(
    platform: Rc<P>,
    listeners: &Rc<Listeners<P::Element>>,
    reference: Reference<P::Element>,
    floating: P::Element,
    config: ComputeConfig<P::Element>,
    options: AutoUpdateOptions,
    on_update: impl Fn(&ComputePositionResult) + 'static,
) -> Result<Subscription<P>>
where
    P: Platform + 'static,
    P::Element: 'static,
{
    config.validate(&*platform)?;
    let subscriber = Rc::new(Subscriber {
        platform: platform.clone(),
        reference: reference.clone(),
        floating: floating.clone(),
        config,
        last: RefCell::new(None),
        busy: Cell::new(false),
        pending: Cell::new(false),
        disposed: Cell::new(false),
        on_update: Box::new(on_update),
    });
    let cleanup = auto_update(&platform, listeners, &reference, &floating, options, {
        let subscriber = subscriber.clone();
        move || subscriber.run()
    })?;
    Ok(Subscription {
        subscriber,
        cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Custom, MiddlewareReturn};
    use crate::{Placement, RectPlatform};

    fn setup() -> (Rc<RectPlatform>, Rc<Listeners<u32>>) {
        let platform = Rc::new(RectPlatform::new(Rect::new(0.0, 0.0, 800.0, 600.0)));
        platform.set_rect(1, Rect::new(100.0, 100.0, 150.0, 120.0));
        platform.set_rect(2, Rect::new(0.0, 0.0, 30.0, 10.0));
        (platform, Rc::new(Listeners::new()))
    }

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn listener_ids_are_generational() {
        let listeners: Listeners<u32> = Listeners::new();
        let a = listeners.add(alloc::vec![Trigger::Frame], |_| {});
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        let b = listeners.add(alloc::vec![Trigger::Frame], |_| {});
        assert_ne!(a, b);
        assert!(!listeners.is_alive(a));
        assert!(listeners.is_alive(b));
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn callbacks_may_remove_listeners_while_emitting() {
        let listeners: Rc<Listeners<u32>> = Rc::new(Listeners::new());
        let victim = listeners.add(alloc::vec![Trigger::Frame], |_| {});
        let registry = listeners.clone();
        listeners.add(alloc::vec![Trigger::Frame], move |_| {
            registry.remove(victim);
        });
        assert_eq!(listeners.emit(&Trigger::Frame), 2);
        assert_eq!(listeners.emit(&Trigger::Frame), 1);
    }

    #[test]
    fn updates_on_relevant_triggers_only() {
        let (platform, listeners) = setup();
        let (count, update) = counter();
        let cleanup = auto_update(
            &platform,
            &listeners,
            &Reference::Element(1),
            &2,
            AutoUpdateOptions::default(),
            update,
        )
        .unwrap();
        assert_eq!(count.get(), 1, "runs once on setup");

        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        listeners.emit(&Trigger::ElementResize(2));
        listeners.emit(&Trigger::LayoutShift(1));
        assert_eq!(count.get(), 4);

        listeners.emit(&Trigger::ElementResize(99));
        listeners.emit(&Trigger::LayoutShift(2));
        assert_eq!(listeners.emit(&Trigger::Frame), 0);
        assert_eq!(count.get(), 4);
        drop(cleanup);
        assert!(listeners.is_empty());
    }

    #[test]
    fn disabled_options_arm_nothing() {
        let (platform, listeners) = setup();
        let (count, update) = counter();
        let options = AutoUpdateOptions::manual();
        let _cleanup =
            auto_update(&platform, &listeners, &Reference::Element(1), &2, options, update)
                .unwrap();
        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        listeners.emit(&Trigger::ElementResize(1));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn batching_waits_for_the_next_frame() {
        let (platform, listeners) = setup();
        let (count, update) = counter();
        let options = AutoUpdateOptions {
            batch_to_frame: true,
            ..AutoUpdateOptions::default()
        };
        let _cleanup =
            auto_update(&platform, &listeners, &Reference::Element(1), &2, options, update)
                .unwrap();
        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        listeners.emit(&Trigger::Resize(Ancestor::Viewport));
        assert_eq!(count.get(), 1);
        listeners.emit(&Trigger::Frame);
        assert_eq!(count.get(), 2);
        listeners.emit(&Trigger::Frame);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn frame_polling_catches_unreported_moves() {
        let (platform, listeners) = setup();
        let (count, update) = counter();
        let options = AutoUpdateOptions {
            animation_frame: true,
            ..AutoUpdateOptions::default()
        };
        let _cleanup =
            auto_update(&platform, &listeners, &Reference::Element(1), &2, options, update)
                .unwrap();
        listeners.emit(&Trigger::Frame);
        assert_eq!(count.get(), 1);
        platform.set_rect(1, Rect::new(110.0, 100.0, 160.0, 120.0));
        listeners.emit(&Trigger::Frame);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn unknown_floating_element_is_rejected() {
        let (platform, listeners) = setup();
        let err = auto_update(
            &platform,
            &listeners,
            &Reference::Element(1),
            &42,
            AutoUpdateOptions::default(),
            || {},
        )
        .unwrap_err();
        assert_eq!(err, Error::UnknownElement);
        assert!(listeners.is_empty());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let (platform, listeners) = setup();
        let (count, update) = counter();
        let mut cleanup = auto_update(
            &platform,
            &listeners,
            &Reference::Element(1),
            &2,
            AutoUpdateOptions::default(),
            update,
        )
        .unwrap();
        cleanup.dispose();
        cleanup.dispose();
        assert!(!cleanup.is_active());
        assert!(listeners.is_empty());
        assert_eq!(listeners.emit(&Trigger::Scroll(Ancestor::Viewport)), 0);
        assert_eq!(count.get(), 1);
    }

    fn published_subscription(
        platform: &Rc<RectPlatform>,
        listeners: &Rc<Listeners<u32>>,
    ) -> (Rc<RefCell<Vec<ComputePositionResult>>>, Subscription<RectPlatform>) {
        let published = Rc::new(RefCell::new(Vec::new()));
        let sink = published.clone();
        let sub = subscribe(
            platform.clone(),
            listeners,
            Reference::Element(1),
            2,
            ComputeConfig::new(Placement::Bottom),
            AutoUpdateOptions::default(),
            move |r| sink.borrow_mut().push(r.clone()),
        )
        .unwrap();
        (published, sub)
    }

    #[test]
    fn subscription_publishes_rounded_changes_only() {
        let (platform, listeners) = setup();
        platform.set_device_pixel_ratio(2.0);
        platform.set_rect(1, Rect::new(100.3, 100.0, 150.3, 120.0));
        let (published, sub) = published_subscription(&platform, &listeners);
        assert_eq!(published.borrow().len(), 1);
        assert_eq!(published.borrow()[0].coords(), kurbo::Point::new(110.5, 120.0));

        listeners.emit(&Trigger::Resize(Ancestor::Viewport));
        // 110.4 still snaps to 110.5.
        platform.set_rect(1, Rect::new(100.4, 100.0, 150.4, 120.0));
        listeners.emit(&Trigger::LayoutShift(1));
        assert_eq!(published.borrow().len(), 1);

        platform.set_rect(1, Rect::new(101.0, 100.0, 151.0, 120.0));
        listeners.emit(&Trigger::LayoutShift(1));
        assert_eq!(published.borrow().len(), 2);
        assert_eq!(sub.last().map(|r| r.x), Some(111.0));
    }

    #[test]
    fn nested_updates_coalesce_into_one_follow_up() {
        let (platform, listeners) = setup();
        let runs = Rc::new(Cell::new(0));
        let published = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let config =
            ComputeConfig::new(Placement::Bottom).with(Custom::<u32>::new("count", move |_| {
                counter.set(counter.get() + 1);
                MiddlewareReturn::default()
            }));
        let registry = listeners.clone();
        let sink = published.clone();
        let _sub = subscribe(
            platform.clone(),
            &listeners,
            Reference::Element(1),
            2,
            config,
            AutoUpdateOptions::default(),
            move |_| {
                sink.set(sink.get() + 1);
                registry.emit(&Trigger::Scroll(Ancestor::Viewport));
                registry.emit(&Trigger::Scroll(Ancestor::Viewport));
            },
        )
        .unwrap();
        assert_eq!(published.get(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn detached_elements_are_skipped() {
        let (platform, listeners) = setup();
        let (published, _sub) = published_subscription(&platform, &listeners);
        platform.remove(1);
        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        assert_eq!(published.borrow().len(), 1);

        platform.set_rect(1, Rect::new(300.0, 100.0, 350.0, 120.0));
        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        assert_eq!(published.borrow().len(), 2);
    }

    #[test]
    fn nothing_is_published_after_dispose() {
        let (platform, listeners) = setup();
        let (published, mut sub) = published_subscription(&platform, &listeners);
        sub.dispose();
        sub.dispose();
        assert!(!sub.is_active());
        assert!(listeners.is_empty());

        platform.set_rect(1, Rect::new(300.0, 100.0, 350.0, 120.0));
        sub.update();
        listeners.emit(&Trigger::Scroll(Ancestor::Viewport));
        assert_eq!(published.borrow().len(), 1);
    }
}
