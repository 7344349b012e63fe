// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: element identifiers, flags, and local geometry.

use kurbo::{Affine, Rect, Vec2};

/// Identifier for an element in the scene.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `ElementId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `ElementId`.
///
/// Use [`Scene::is_alive`](crate::Scene::is_alive) to check whether an `ElementId` still refers to a live element.
/// Stale ids never alias a different live element because the generation must match,
/// which is what lets a positioning engine detect disconnected handles.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Element flags controlling clipping, scrolling and positioning.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element clips its descendants to its own box (a clipping ancestor).
        const CLIP             = 0b0000_0001;
        /// Element is a scroll container. Implies clipping; its `scroll_offset` applies to children.
        const SCROLL           = 0b0000_0010;
        /// Element establishes a containing block (offset parent) for absolutely positioned descendants.
        const CONTAINING_BLOCK = 0b0000_0100;
        /// Element is positioned against the viewport and escapes ancestor transforms, scrolling and clips.
        const FIXED            = 0b0000_1000;
        /// Element lays out right-to-left.
        const RTL              = 0b0001_0000;
    }
}

impl ElementFlags {
    /// Whether an element with these flags clips its descendants.
    pub const fn clips(self) -> bool {
        self.intersects(Self::CLIP.union(Self::SCROLL))
    }
}

/// Local geometry for an element.
///
/// `local_bounds` is expressed in the parent's content space (after the parent's
/// scroll offset), before `local_transform` is applied.
#[derive(Clone, Debug)]
pub struct LocalElement {
    /// Local (untransformed) bounds. Its size is the element's layout size.
    pub local_bounds: Rect,
    /// Local transform relative to the parent's content space.
    pub local_transform: Affine,
    /// Scroll position of this element's content. Only meaningful with [`ElementFlags::SCROLL`].
    pub scroll_offset: Vec2,
    /// Clipping, scrolling and positioning flags.
    pub flags: ElementFlags,
}

impl Default for LocalElement {
    fn default() -> Self {
        Self {
            local_bounds: Rect::ZERO,
            local_transform: Affine::IDENTITY,
            scroll_offset: Vec2::ZERO,
            flags: ElementFlags::empty(),
        }
    }
}
