// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change summary produced by [`Scene::commit`](crate::Scene::commit).

use alloc::vec::Vec;

use crate::types::ElementId;

/// A batched set of geometry changes derived from [`Scene::commit`](crate::Scene::commit).
///
/// Elements inserted since the previous commit are not reported; they have no
/// earlier geometry to differ from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// Elements whose viewport-space origin changed while their size stayed the same.
    pub moved: Vec<ElementId>,
    /// Elements whose viewport-space size changed.
    pub resized: Vec<ElementId>,
    /// Scroll containers whose scroll offset changed.
    pub scrolled: Vec<ElementId>,
    /// The viewport size changed.
    pub viewport_resized: bool,
    /// The window (document) scroll position changed.
    pub window_scrolled: bool,
}

impl Changes {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
            && self.resized.is_empty()
            && self.scrolled.is_empty()
            && !self.viewport_resized
            && !self.window_scrolled
    }
}
