// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: a Kurbo-native element tree measured in viewport space.
//!
//! Understory Scene models the parts of a document that decide where things are on screen:
//!
//! - A hierarchy of elements with local bounds, local transforms and scroll offsets.
//! - Clipping ancestors (`CLIP`/`SCROLL`), containing blocks for absolute positioning, and fixed elements.
//! - A viewport, a scrollable document inside it, and a device pixel ratio.
//!
//! After a batch of edits, [`Scene::commit`] recomputes viewport-space rectangles and returns
//! [`Changes`]: which elements moved, resized or scrolled. Hosts feed those into whatever needs
//! to react to layout, for example an anchored-positioning engine keeping a popover attached
//! to its button.
//!
//! ## Not a layout engine
//!
//! This crate does not perform layout (measurement or arrangement).
//! Upstream code computes positions and sizes and writes the results here.
//!
//! ## Coordinate model
//!
//! - `local_bounds` is in the parent's content space, which is the parent's own space shifted by its scroll offset.
//! - Roots live in document space; the viewport sees the document shifted by the window scroll.
//! - [`ElementFlags::FIXED`] elements are placed directly in viewport space and escape every ancestor.
//!
//! ### Minimal usage
//!
//! ```
//! use understory_scene::{ElementFlags, LocalElement, Scene};
//! use kurbo::{Rect, Size, Vec2};
//!
//! let mut scene = Scene::new(Size::new(800.0, 600.0));
//! let list = scene.insert(
//!     None,
//!     LocalElement {
//!         local_bounds: Rect::new(0.0, 0.0, 200.0, 100.0),
//!         flags: ElementFlags::SCROLL,
//!         ..Default::default()
//!     },
//! );
//! let row = scene.insert(
//!     Some(list),
//!     LocalElement { local_bounds: Rect::new(0.0, 120.0, 200.0, 140.0), ..Default::default() },
//! );
//! let _ = scene.commit();
//!
//! scene.set_scroll_offset(list, Vec2::new(0.0, 60.0));
//! let changes = scene.commit();
//! assert_eq!(changes.scrolled, [list]);
//! assert_eq!(scene.viewport_rect(row), Some(Rect::new(0.0, 60.0, 200.0, 80.0)));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod changes;
mod scene;
mod types;

pub use changes::Changes;
pub use scene::Scene;
pub use types::{ElementFlags, ElementId, LocalElement};
