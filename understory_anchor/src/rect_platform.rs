// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A coordinate-only [`Platform`]: every element is a literal viewport rectangle.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::{Rect, Size};

use crate::platform::{Ancestor, Boundary, Platform, Reference, RootBoundary, clip_intersection};
use crate::types::{ElementRects, Strategy};

/// A flat platform keyed by `u32` element ids.
///
/// Elements have no ancestors: the viewport is the only clip and the offset parent, so both
/// strategies share viewport space. Rectangles can be updated through a shared reference,
/// which lets callbacks (for example a size `apply`) resize elements mid-computation.
///
/// Useful for tests, for hosts that already know where everything is on screen, and for
/// positioning against pointer coordinates.
#[derive(Debug)]
pub struct RectPlatform {
    viewport: Cell<Rect>,
    document: Cell<Option<Rect>>,
    rects: RefCell<BTreeMap<u32, Rect>>,
    rtl: Cell<bool>,
    device_pixel_ratio: Cell<f64>,
}

impl RectPlatform {
    /// A platform with the given viewport and no elements.
    pub fn new(viewport: Rect) -> Self {
        Self {
            viewport: Cell::new(viewport),
            document: Cell::new(None),
            rects: RefCell::new(BTreeMap::new()),
            rtl: Cell::new(false),
            device_pixel_ratio: Cell::new(1.0),
        }
    }

    /// Insert or move an element.
    pub fn set_rect(&self, id: u32, rect: Rect) {
        self.rects.borrow_mut().insert(id, rect);
    }

    /// Remove an element; later measurements of it fail.
    pub fn remove(&self, id: u32) -> Option<Rect> {
        self.rects.borrow_mut().remove(&id)
    }

    /// Current rectangle of an element.
    pub fn rect(&self, id: u32) -> Option<Rect> {
        self.rects.borrow().get(&id).copied()
    }

    /// Replace the viewport.
    pub fn set_viewport(&self, viewport: Rect) {
        self.viewport.set(viewport);
    }

    /// Current viewport.
    pub fn viewport(&self) -> Rect {
        self.viewport.get()
    }

    /// Set the document rectangle used by [`RootBoundary::Document`]; `None` uses the viewport.
    pub fn set_document(&self, document: Option<Rect>) {
        self.document.set(document);
    }

    /// Lay every element out right-to-left.
    pub fn set_rtl(&self, rtl: bool) {
        self.rtl.set(rtl);
    }

    /// Set the device pixel ratio.
    pub fn set_device_pixel_ratio(&self, dpr: f64) {
        self.device_pixel_ratio.set(dpr);
    }

    fn root_rect(&self, root: &RootBoundary) -> Rect {
        match root {
            RootBoundary::Viewport => self.viewport.get(),
            RootBoundary::Document => self.document.get().unwrap_or(self.viewport.get()),
            RootBoundary::Rect(r) => *r,
        }
    }
}

impl Default for RectPlatform {
    fn default() -> Self {
        Self::new(Rect::ZERO)
    }
}

impl Platform for RectPlatform {
    type Element = u32;

    fn element_rects(
        &self,
        reference: &Reference<u32>,
        floating: &u32,
        _strategy: Strategy,
    ) -> Option<ElementRects> {
        let reference = reference.viewport_rect(self)?;
        let floating = self.rect(*floating)?;
        Some(ElementRects {
            reference,
            floating: Rect::from_origin_size((0.0, 0.0), floating.size()),
        })
    }

    fn dimensions(&self, element: &u32) -> Option<Size> {
        self.rect(*element).map(|r| r.size())
    }

    fn bounding_rect(&self, element: &u32) -> Option<Rect> {
        self.rect(*element)
    }

    fn clipping_rect(
        &self,
        _element: Option<&u32>,
        boundary: &Boundary<u32>,
        root_boundary: &RootBoundary,
        _strategy: Strategy,
    ) -> Rect {
        let root = self.root_rect(root_boundary);
        let clips: Vec<Rect> = match boundary {
            Boundary::ClippingAncestors => Vec::new(),
            Boundary::Elements(list) => list.iter().filter_map(|e| self.rect(*e)).collect(),
            Boundary::Rect(r) => vec![*r],
        };
        clip_intersection(clips.into_iter().chain([root])).unwrap_or(root)
    }

    fn overflow_ancestors(&self, _element: &u32) -> Vec<Ancestor<u32>> {
        vec![Ancestor::Viewport]
    }

    fn contains(&self, element: &u32) -> bool {
        self.rects.borrow().contains_key(element)
    }

    fn is_rtl(&self, _element: &u32) -> bool {
        self.rtl.get()
    }

    fn device_pixel_ratio(&self, _element: &u32) -> f64 {
        self.device_pixel_ratio.get()
    }
}
