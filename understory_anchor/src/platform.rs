// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The measurement contract between the engine and its host.
//!
//! ## Overview
//!
//! Everything geometric in this crate is platform-agnostic. A [`Platform`] turns
//! opaque element handles into rectangles, clipping rectangles and scroll
//! ancestors, and nothing else. Implementations must be pure measurement: no
//! method may change what another method returns.
//!
//! ## Coordinate spaces
//!
//! - Viewport space: what [`Platform::bounding_rect`] and [`Platform::clipping_rect`] return.
//! - Strategy space: what [`Platform::element_rects`] returns for the reference, relative to the
//!   floating element's offset parent for [`Strategy::Absolute`] or to the viewport for [`Strategy::Fixed`].
//!
//! [`Platform::to_viewport`] maps a strategy-space rect back so overflow can be measured against clips.
//!
//! ## Virtual references
//!
//! A [`Reference`] is either a platform element or a [`VirtualElement`]: anything that can report a
//! rectangle, such as a text selection or a pointer position. Virtual elements may carry a context
//! element whose clipping ancestors stand in for their own.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, Size, Vec2};

use crate::error::{Error, Result};
use crate::types::{ElementRects, Strategy};

/// Host measurement capability.
pub trait Platform {
    /// Opaque element handle.
    type Element: Clone + PartialEq + fmt::Debug;

    /// Measure the reference (in `strategy` space) and the floating element (size only).
    ///
    /// Returns `None` when either element is disconnected.
    fn element_rects(
        &self,
        reference: &Reference<Self::Element>,
        floating: &Self::Element,
        strategy: Strategy,
    ) -> Option<ElementRects>;

    /// Layout size of an element, before transforms.
    fn dimensions(&self, element: &Self::Element) -> Option<Size>;

    /// Viewport-space bounding box of an element.
    fn bounding_rect(&self, element: &Self::Element) -> Option<Rect>;

    /// Viewport-space rectangle an element may appear in without being clipped.
    ///
    /// This is the intersection of every rectangle the `boundary` names (for
    /// [`Boundary::ClippingAncestors`], the clipping ancestors of `element`) and the
    /// `root_boundary`. The intersection is not clamped; see [`clip_intersection`].
    /// `element` is `None` for a virtual reference without a context element.
    fn clipping_rect(
        &self,
        element: Option<&Self::Element>,
        boundary: &Boundary<Self::Element>,
        root_boundary: &RootBoundary,
        strategy: Strategy,
    ) -> Rect;

    /// Scrolling ancestors of an element, nearest first, always ending with [`Ancestor::Viewport`].
    fn overflow_ancestors(&self, element: &Self::Element) -> Vec<Ancestor<Self::Element>>;

    /// Whether the handle refers to a connected element.
    fn contains(&self, element: &Self::Element) -> bool;

    /// Per-line rectangles of a reference, in viewport space.
    fn client_rects(&self, reference: &Reference<Self::Element>) -> Vec<Rect> {
        match reference {
            Reference::Element(e) => self.bounding_rect(e).into_iter().collect(),
            Reference::Virtual(v) => v.client_rects(),
        }
    }

    /// Map a rect relative to the floating element's offset parent into viewport space.
    fn to_viewport(&self, floating: &Self::Element, rect: Rect, strategy: Strategy) -> Rect {
        let _ = (floating, strategy);
        rect
    }

    /// Scale of the floating element's offset parent relative to the viewport.
    fn offset_scale(&self, floating: &Self::Element) -> Vec2 {
        let _ = floating;
        Vec2::new(1.0, 1.0)
    }

    /// Whether an element lays out right-to-left.
    fn is_rtl(&self, element: &Self::Element) -> bool {
        let _ = element;
        false
    }

    /// Device pixel ratio of the surface an element is displayed on.
    fn device_pixel_ratio(&self, element: &Self::Element) -> f64 {
        let _ = element;
        1.0
    }
}

/// Accessor returning a viewport-space rectangle.
pub type RectFn = Rc<dyn Fn() -> Rect>;

/// Accessor returning per-line viewport-space rectangles.
pub type RectsFn = Rc<dyn Fn() -> Vec<Rect>>;

/// A reference that is not part of the element tree.
///
/// Accessors are re-queried on every pass, so a virtual element can follow a pointer.
pub struct VirtualElement<E> {
    bounding_rect: Option<RectFn>,
    client_rects: Option<RectsFn>,
    context_element: Option<E>,
}

impl<E> VirtualElement<E> {
    /// A virtual element whose rectangle is produced by `rect`.
    pub fn new(rect: impl Fn() -> Rect + 'static) -> Self {
        Self {
            bounding_rect: Some(Rc::new(rect)),
            client_rects: None,
            context_element: None,
        }
    }

    /// A virtual element pinned to a fixed rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(move || rect)
    }

    /// A virtual element made of per-line rectangles, such as a text selection.
    ///
    /// The bounding rectangle is the union of the lines.
    pub fn from_client_rects(rects: impl Fn() -> Vec<Rect> + 'static) -> Self {
        Self {
            bounding_rect: None,
            client_rects: Some(Rc::new(rects)),
            context_element: None,
        }
    }

    /// Attach per-line rectangles.
    pub fn with_client_rects(mut self, rects: impl Fn() -> Vec<Rect> + 'static) -> Self {
        self.client_rects = Some(Rc::new(rects));
        self
    }

    /// Attach a context element whose clipping ancestors apply to this reference.
    pub fn with_context_element(mut self, element: E) -> Self {
        self.context_element = Some(element);
        self
    }

    /// Current bounding rectangle.
    pub fn bounding_rect(&self) -> Option<Rect> {
        if let Some(rect) = &self.bounding_rect {
            return Some(rect());
        }
        let rects = (self.client_rects.as_ref()?)();
        rects.into_iter().reduce(|a, b| a.union(b))
    }

    /// Current per-line rectangles, falling back to the bounding rectangle.
    pub fn client_rects(&self) -> Vec<Rect> {
        match &self.client_rects {
            Some(rects) => rects(),
            None => self.bounding_rect().into_iter().collect(),
        }
    }

    /// The context element, if any.
    pub fn context_element(&self) -> Option<&E> {
        self.context_element.as_ref()
    }

    /// Check that at least one accessor is present.
    pub fn validate(&self) -> Result<()> {
        if self.bounding_rect.is_none() && self.client_rects.is_none() {
            return Err(Error::MissingRectAccessor);
        }
        Ok(())
    }
}

impl<E> Default for VirtualElement<E> {
    fn default() -> Self {
        Self {
            bounding_rect: None,
            client_rects: None,
            context_element: None,
        }
    }
}

impl<E: Clone> Clone for VirtualElement<E> {
    fn clone(&self) -> Self {
        Self {
            bounding_rect: self.bounding_rect.clone(),
            client_rects: self.client_rects.clone(),
            context_element: self.context_element.clone(),
        }
    }
}

impl<E: PartialEq> PartialEq for VirtualElement<E> {
    fn eq(&self, other: &Self) -> bool {
        opt_rc_eq(&self.bounding_rect, &other.bounding_rect)
            && opt_rc_eq(&self.client_rects, &other.client_rects)
            && self.context_element == other.context_element
    }
}

impl<E: fmt::Debug> fmt::Debug for VirtualElement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualElement")
            .field("bounding_rect", &self.bounding_rect.is_some())
            .field("client_rects", &self.client_rects.is_some())
            .field("context_element", &self.context_element)
            .finish()
    }
}

/// Closures compare by identity.
pub(crate) fn opt_rc_eq<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// The element a floating element is anchored to.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference<E> {
    /// A platform element.
    Element(E),
    /// A rect-only anchor.
    Virtual(VirtualElement<E>),
}

impl<E> Reference<E> {
    /// The platform element to use for clipping: the element itself, or a virtual context element.
    pub fn element(&self) -> Option<&E> {
        match self {
            Self::Element(e) => Some(e),
            Self::Virtual(v) => v.context_element(),
        }
    }

    /// Current viewport-space rectangle of the reference.
    pub fn viewport_rect<P>(&self, platform: &P) -> Option<Rect>
    where
        P: Platform<Element = E> + ?Sized,
    {
        match self {
            Self::Element(e) => platform.bounding_rect(e),
            Self::Virtual(v) => v.bounding_rect(),
        }
    }

    /// Check that the reference can be measured.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Element(_) => Ok(()),
            Self::Virtual(v) => v.validate(),
        }
    }
}

impl<E> From<VirtualElement<E>> for Reference<E> {
    fn from(v: VirtualElement<E>) -> Self {
        Self::Virtual(v)
    }
}

/// The pair of elements a pass positions.
#[derive(Debug)]
pub struct Elements<'a, E> {
    /// The anchor.
    pub reference: &'a Reference<E>,
    /// The positioned element.
    pub floating: &'a E,
}

impl<E> Clone for Elements<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Elements<'_, E> {}

/// Rectangles that constrain where the floating element may appear.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Boundary<E> {
    /// Every clipping ancestor of the measured element.
    #[default]
    ClippingAncestors,
    /// The intersection of these elements' boxes.
    Elements(Vec<E>),
    /// A literal viewport-space rectangle.
    Rect(Rect),
}

impl<E> Boundary<E> {
    /// Check the boundary for configuration errors.
    pub fn validate<P>(&self, platform: &P) -> Result<()>
    where
        P: Platform<Element = E> + ?Sized,
    {
        match self {
            Self::ClippingAncestors => Ok(()),
            Self::Elements(list) if list.is_empty() => Err(Error::EmptyBoundary),
            Self::Elements(list) => {
                if list.iter().all(|e| platform.contains(e)) {
                    Ok(())
                } else {
                    Err(Error::UnknownElement)
                }
            }
            Self::Rect(r) => check_finite(*r),
        }
    }
}

/// The outermost rectangle intersected with every boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum RootBoundary {
    /// The visible viewport.
    #[default]
    Viewport,
    /// The whole scrollable document.
    Document,
    /// A literal viewport-space rectangle.
    Rect(Rect),
}

impl RootBoundary {
    /// Check the root boundary for configuration errors.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Rect(r) => check_finite(*r),
            Self::Viewport | Self::Document => Ok(()),
        }
    }
}

fn check_finite(r: Rect) -> Result<()> {
    if r.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidBoundaryRect)
    }
}

/// A scroll or resize listener target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ancestor<E> {
    /// A scrolling element.
    Element(E),
    /// The window/viewport.
    Viewport,
}

/// Intersect clip rectangles without clamping.
///
/// When the rectangles are disjoint the result is inverted (negative width or
/// height). Overflow measured against it stays positive on every side, so an
/// element is reported as clipped rather than as fitting in a zero-sized slot.
pub fn clip_intersection(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| {
        Rect::new(
            acc.x0.max(r.x0),
            acc.y0.max(r.y0),
            acc.x1.min(r.x1),
            acc.y1.min(r.y1),
        )
    })
}
