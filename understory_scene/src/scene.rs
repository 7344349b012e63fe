// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core scene implementation: structure, updates, measurement queries.

use alloc::vec::Vec;
use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::changes::Changes;
use crate::types::{ElementFlags, ElementId, LocalElement};

/// Top-level element tree measured in viewport space.
pub struct Scene {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    viewport: Size,
    document: Option<Size>,
    window_scroll: Vec2,
    device_pixel_ratio: f64,
    committed_viewport: Size,
    committed_window_scroll: Vec2,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("viewport", &self.viewport)
            .field("window_scroll", &self.window_scroll)
            .field("device_pixel_ratio", &self.device_pixel_ratio)
            .finish_non_exhaustive()
    }
}

/// Committed viewport-space data for an element.
#[derive(Clone, Debug, Default)]
struct WorldElement {
    world_transform: Affine,
    viewport_rect: Rect, // AABB of the transformed local bounds
    inherited_clip: Option<Rect>,
    scroll_offset: Vec2,
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    local: LocalElement,
    world: Option<WorldElement>,
}

impl Node {
    fn new(generation: u32, local: LocalElement) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            world: None,
        }
    }
}

impl Scene {
    /// Create an empty scene with the given viewport size.
    pub fn new(viewport: Size) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            viewport,
            document: None,
            window_scroll: Vec2::ZERO,
            device_pixel_ratio: 1.0,
            committed_viewport: viewport,
            committed_window_scroll: Vec2::ZERO,
        }
    }

    /// Insert a new element as a child of `parent` (or as a root if `None`).
    pub fn insert(&mut self, parent: Option<ElementId>, local: LocalElement) -> ElementId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = ElementId::new(idx, generation);
        if let Some(p) = parent
            && self.is_alive(p)
        {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove an element (and its subtree) from the scene.
    pub fn remove(&mut self, id: ElementId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        let children = self.node(id).children.clone();
        for child in children {
            self.remove(child);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Reparent `id` under `new_parent`.
    ///
    /// Moving an element under itself or one of its descendants is ignored.
    pub fn reparent(&mut self, id: ElementId, new_parent: Option<ElementId>) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(p) = new_parent
            && (p == id || self.ancestors(p).any(|a| a == id))
        {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent
            && self.is_alive(p)
        {
            self.link_parent(id, p);
        }
    }

    /// Update local bounds.
    pub fn set_local_bounds(&mut self, id: ElementId, bounds: Rect) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.local_bounds = bounds;
        }
    }

    /// Update local transform.
    pub fn set_local_transform(&mut self, id: ElementId, tf: Affine) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.local_transform = tf;
        }
    }

    /// Update the scroll offset of a scroll container.
    pub fn set_scroll_offset(&mut self, id: ElementId, offset: Vec2) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.scroll_offset = offset;
        }
    }

    /// Update element flags.
    pub fn set_flags(&mut self, id: ElementId, flags: ElementFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Local data of a live element.
    pub fn local(&self, id: ElementId) -> Option<&LocalElement> {
        self.node_opt(id).map(|n| &n.local)
    }

    /// Resize the viewport.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport = size;
    }

    /// The viewport in viewport space (always at the origin).
    pub fn viewport(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.viewport)
    }

    /// Set the scrollable document size. Defaults to the viewport size.
    pub fn set_document_size(&mut self, size: Option<Size>) {
        self.document = size;
    }

    /// The document in viewport space, offset by the window scroll.
    pub fn document(&self) -> Rect {
        let size = self.document.unwrap_or(self.viewport);
        Rect::from_origin_size(Point::ZERO - self.window_scroll, size)
    }

    /// Scroll the window (the document inside the viewport).
    pub fn set_window_scroll(&mut self, scroll: Vec2) {
        self.window_scroll = scroll;
    }

    /// Current window scroll.
    pub fn window_scroll(&self) -> Vec2 {
        self.window_scroll
    }

    /// Set the device pixel ratio used to snap positions.
    pub fn set_device_pixel_ratio(&mut self, dpr: f64) {
        self.device_pixel_ratio = dpr;
    }

    /// Device pixel ratio of the output surface.
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Recompute viewport-space geometry for every element and report what changed.
    pub fn commit(&mut self) -> Changes {
        let mut changes = Changes {
            viewport_resized: self.committed_viewport != self.viewport,
            window_scrolled: self.committed_window_scroll != self.window_scroll,
            ..Changes::default()
        };
        self.committed_viewport = self.viewport;
        self.committed_window_scroll = self.window_scroll;

        let roots: Vec<ElementId> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(n) if n.parent.is_none() =>
                {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "ElementId uses 32-bit indices by design."
                    )]
                    Some(ElementId::new(i as u32, n.generation))
                }
                _ => None,
            })
            .collect();

        let document_tf = Affine::translate(-self.window_scroll);
        for root in roots {
            self.update_world_recursive(root, document_tf, None, &mut changes);
        }
        changes
    }

    // --- measurement ---

    /// Returns true if `id` refers to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.node_opt(id).is_some()
    }

    /// Viewport-space bounding box of a committed element.
    pub fn viewport_rect(&self, id: ElementId) -> Option<Rect> {
        self.world(id).map(|w| w.viewport_rect)
    }

    /// Viewport-space bounding box clipped by every clipping ancestor.
    ///
    /// The result may be zero-sized when the element is scrolled out of view.
    pub fn visible_rect(&self, id: ElementId) -> Option<Rect> {
        let w = self.world(id)?;
        Some(match w.inherited_clip {
            Some(clip) => w.viewport_rect.intersect(clip),
            None => w.viewport_rect,
        })
    }

    /// Layout size (untransformed local bounds) of a live element.
    pub fn size(&self, id: ElementId) -> Option<Size> {
        self.node_opt(id).map(|n| n.local.local_bounds.size())
    }

    /// Committed scroll offset of a live element.
    pub fn scroll_offset(&self, id: ElementId) -> Option<Vec2> {
        self.world(id).map(|w| w.scroll_offset)
    }

    /// Effective scale of an element's local space relative to the viewport.
    ///
    /// Non-uniform scale and shear are reported per axis as the length of the
    /// transformed unit vectors.
    pub fn scale(&self, id: ElementId) -> Option<Vec2> {
        let [a, b, c, d, _, _] = self.world(id)?.world_transform.as_coeffs();
        Some(Vec2::new(Vec2::new(a, b).hypot(), Vec2::new(c, d).hypot()))
    }

    /// Transform from the space an element's `local_bounds` are written in to viewport space.
    ///
    /// That is the parent's scrolled content space, the document for roots, or the viewport
    /// itself for [`ElementFlags::FIXED`] elements. `None` until the element is committed.
    pub fn parent_space_transform(&self, id: ElementId) -> Option<Affine> {
        let node = self.node_opt(id)?;
        node.world.as_ref()?;
        if node.local.flags.contains(ElementFlags::FIXED) {
            return Some(Affine::IDENTITY);
        }
        Some(match node.parent {
            Some(p) => {
                let w = self.world(p)?;
                w.world_transform * Affine::translate(-w.scroll_offset)
            }
            None => Affine::translate(-self.committed_window_scroll),
        })
    }

    /// Parent of a live element.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node_opt(id)?.parent
    }

    /// Flags of a live element.
    pub fn flags(&self, id: ElementId) -> Option<ElementFlags> {
        self.node_opt(id).map(|n| n.local.flags)
    }

    /// Nearest ancestor establishing a containing block.
    ///
    /// Returns `None` when the element is positioned against the document
    /// (no such ancestor) or against the viewport ([`ElementFlags::FIXED`]).
    pub fn containing_block(&self, id: ElementId) -> Option<ElementId> {
        if self.flags(id)?.contains(ElementFlags::FIXED) {
            return None;
        }
        self.ancestors(id)
            .find(|a| self.flags(*a).is_some_and(|f| f.contains(ElementFlags::CONTAINING_BLOCK)))
    }

    /// Ancestors that clip `id`, nearest first.
    ///
    /// The walk stops at a fixed-position element, since nothing above it can clip it.
    pub fn clipping_ancestors(&self, id: ElementId) -> Vec<ElementId> {
        self.escapable_ancestors(id)
            .into_iter()
            .filter(|a| self.flags(*a).is_some_and(ElementFlags::clips))
            .collect()
    }

    /// Scroll containers above `id`, nearest first.
    pub fn scroll_ancestors(&self, id: ElementId) -> Vec<ElementId> {
        self.escapable_ancestors(id)
            .into_iter()
            .filter(|a| self.flags(*a).is_some_and(|f| f.contains(ElementFlags::SCROLL)))
            .collect()
    }

    // --- internals ---

    fn escapable_ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if self.flags(id).is_none_or(|f| f.contains(ElementFlags::FIXED)) {
            return out;
        }
        for a in self.ancestors(id) {
            out.push(a);
            if self.flags(a).is_some_and(|f| f.contains(ElementFlags::FIXED)) {
                break;
            }
        }
        out
    }

    fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        core::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    fn world(&self, id: ElementId) -> Option<&WorldElement> {
        self.node_opt(id)?.world.as_ref()
    }

    fn node(&self, id: ElementId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling ElementId")
    }

    fn node_mut(&mut self, id: ElementId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling ElementId")
    }

    fn node_opt(&self, id: ElementId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link_parent(&mut self, id: ElementId, parent: ElementId) {
        let parent_node = self.node_mut(parent);
        parent_node.children.push(id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: ElementId, parent: ElementId) {
        let p = self.node_mut(parent);
        p.children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }

    fn update_world_recursive(
        &mut self,
        id: ElementId,
        parent_tf: Affine,
        parent_clip: Option<Rect>,
        changes: &mut Changes,
    ) {
        let (child_ids, content_tf, child_clip) = {
            let node = self.node_mut(id);
            let flags = node.local.flags;
            let (parent_tf, parent_clip) = if flags.contains(ElementFlags::FIXED) {
                (Affine::IDENTITY, None)
            } else {
                (parent_tf, parent_clip)
            };
            let world_transform = parent_tf * node.local.local_transform;
            let viewport_rect = transform_rect_bbox(world_transform, node.local.local_bounds);
            let world = WorldElement {
                world_transform,
                viewport_rect,
                inherited_clip: parent_clip,
                scroll_offset: node.local.scroll_offset,
            };

            if let Some(old) = &node.world {
                if old.viewport_rect.size() != viewport_rect.size() {
                    changes.resized.push(id);
                } else if old.viewport_rect.origin() != viewport_rect.origin() {
                    changes.moved.push(id);
                }
                if old.scroll_offset != world.scroll_offset {
                    changes.scrolled.push(id);
                }
            }

            let content_tf = world_transform * Affine::translate(-node.local.scroll_offset);
            let child_clip = if flags.clips() {
                Some(match parent_clip {
                    Some(c) => viewport_rect.intersect(c),
                    None => viewport_rect,
                })
            } else {
                parent_clip
            };
            node.world = Some(world);
            (node.children.clone(), content_tf, child_clip)
        };

        for child in child_ids {
            self.update_world_recursive(child, content_tf, child_clip, changes);
        }
    }
}

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box in viewport space.
fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let p0 = affine * Point::new(rect.x0, rect.y0);
    let p1 = affine * Point::new(rect.x1, rect.y0);
    let p2 = affine * Point::new(rect.x0, rect.y1);
    let p3 = affine * Point::new(rect.x1, rect.y1);
    let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
    let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
    let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
    let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
    Rect::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_4;

    fn boxed(bounds: Rect, flags: ElementFlags) -> LocalElement {
        LocalElement {
            local_bounds: bounds,
            flags,
            ..Default::default()
        }
    }

    #[test]
    fn window_scroll_moves_document_content() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let button = scene.insert(
            None,
            boxed(Rect::new(100.0, 300.0, 150.0, 320.0), ElementFlags::empty()),
        );
        let _ = scene.commit();
        assert_eq!(
            scene.viewport_rect(button),
            Some(Rect::new(100.0, 300.0, 150.0, 320.0))
        );

        scene.set_window_scroll(Vec2::new(0.0, 250.0));
        let changes = scene.commit();
        assert!(changes.window_scrolled);
        assert_eq!(changes.moved, [button]);
        assert_eq!(
            scene.viewport_rect(button),
            Some(Rect::new(100.0, 50.0, 150.0, 70.0))
        );
    }

    #[test]
    fn scroll_container_offsets_and_clips_children() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let list = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 200.0, 100.0), ElementFlags::SCROLL),
        );
        let row = scene.insert(
            Some(list),
            boxed(Rect::new(0.0, 150.0, 200.0, 170.0), ElementFlags::empty()),
        );
        let _ = scene.commit();
        assert_eq!(scene.visible_rect(row).map(|r| r.area()), Some(0.0));

        scene.set_scroll_offset(list, Vec2::new(0.0, 100.0));
        let changes = scene.commit();
        assert_eq!(changes.scrolled, [list]);
        assert_eq!(changes.moved, [row]);
        assert_eq!(
            scene.viewport_rect(row),
            Some(Rect::new(0.0, 50.0, 200.0, 70.0))
        );
        assert_eq!(scene.clipping_ancestors(row), [list]);
        assert_eq!(scene.scroll_ancestors(row), [list]);
    }

    #[test]
    fn fixed_escapes_scroll_and_clip() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let clip = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 100.0, 100.0), ElementFlags::CLIP),
        );
        let fixed = scene.insert(
            Some(clip),
            boxed(Rect::new(300.0, 300.0, 400.0, 350.0), ElementFlags::FIXED),
        );
        scene.set_window_scroll(Vec2::new(0.0, 40.0));
        let _ = scene.commit();
        assert_eq!(
            scene.viewport_rect(fixed),
            Some(Rect::new(300.0, 300.0, 400.0, 350.0))
        );
        assert!(scene.clipping_ancestors(fixed).is_empty());
        assert_eq!(scene.containing_block(fixed), None);
    }

    #[test]
    fn containing_block_is_nearest_flagged_ancestor() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let outer = scene.insert(
            None,
            boxed(
                Rect::new(0.0, 0.0, 500.0, 500.0),
                ElementFlags::CONTAINING_BLOCK,
            ),
        );
        let mid = scene.insert(Some(outer), LocalElement::default());
        let leaf = scene.insert(Some(mid), LocalElement::default());
        assert_eq!(scene.containing_block(leaf), Some(outer));
        assert_eq!(scene.containing_block(outer), None);
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let outer = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 100.0, 100.0), ElementFlags::empty()),
        );
        let mid = scene.insert(Some(outer), LocalElement::default());
        let leaf = scene.insert(Some(mid), LocalElement::default());
        let other = scene.insert(None, LocalElement::default());

        scene.reparent(outer, Some(outer));
        scene.reparent(outer, Some(leaf));
        scene.reparent(mid, Some(leaf));
        assert_eq!(scene.parent(outer), None);
        assert_eq!(scene.parent(mid), Some(outer));
        assert_eq!(scene.parent(leaf), Some(mid));
        let _ = scene.commit();
        assert!(scene.viewport_rect(leaf).is_some());

        scene.reparent(leaf, Some(other));
        assert_eq!(scene.parent(leaf), Some(other));
        scene.reparent(mid, None);
        assert_eq!(scene.parent(mid), None);
    }

    #[test]
    fn scale_follows_transform() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let zoomed = scene.insert(
            None,
            LocalElement {
                local_bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
                local_transform: Affine::scale_non_uniform(2.0, 0.5),
                ..Default::default()
            },
        );
        let child = scene.insert(
            Some(zoomed),
            boxed(Rect::new(0.0, 0.0, 4.0, 4.0), ElementFlags::empty()),
        );
        let _ = scene.commit();
        assert_eq!(scene.scale(child), Some(Vec2::new(2.0, 0.5)));
        assert_eq!(scene.size(child), Some(Size::new(4.0, 4.0)));
        assert_eq!(
            scene.viewport_rect(child),
            Some(Rect::new(0.0, 0.0, 8.0, 2.0))
        );
    }

    #[test]
    fn parent_space_follows_scroll_and_window() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let list = scene.insert(
            None,
            boxed(Rect::new(0.0, 100.0, 200.0, 300.0), ElementFlags::SCROLL),
        );
        let popup = scene.insert(
            Some(list),
            boxed(Rect::new(0.0, 0.0, 50.0, 20.0), ElementFlags::empty()),
        );
        let pinned = scene.insert(
            Some(list),
            boxed(Rect::new(0.0, 0.0, 50.0, 20.0), ElementFlags::FIXED),
        );
        assert_eq!(scene.parent_space_transform(popup), None);

        scene.set_scroll_offset(list, Vec2::new(0.0, 30.0));
        scene.set_window_scroll(Vec2::new(0.0, 10.0));
        let _ = scene.commit();
        assert_eq!(
            scene.parent_space_transform(popup),
            Some(Affine::translate((0.0, -40.0)))
        );
        assert_eq!(
            scene.parent_space_transform(list),
            Some(Affine::translate((0.0, -10.0)))
        );
        assert_eq!(scene.parent_space_transform(pinned), Some(Affine::IDENTITY));
    }

    #[test]
    fn rotated_bbox_expands() {
        let r = transform_rect_bbox(Affine::rotate(FRAC_PI_4), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(r.width() > 10.0, "rotated box should be wider than the original");
        assert!(r.height() > 10.0, "rotated box should be taller than the original");
    }

    #[test]
    fn resize_is_reported_once() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let popup = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 10.0, 10.0), ElementFlags::empty()),
        );
        let first = scene.commit();
        assert!(first.is_empty(), "fresh elements are not reported");
        scene.set_local_bounds(popup, Rect::new(0.0, 0.0, 20.0, 10.0));
        let changes = scene.commit();
        assert_eq!(changes.resized, [popup]);
        assert!(changes.moved.is_empty());
        assert!(scene.commit().is_empty());
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut scene = Scene::default();
        let root = scene.insert(None, LocalElement::default());
        let a = scene.insert(Some(root), LocalElement::default());
        assert!(scene.is_alive(root));
        assert!(scene.is_alive(a));

        scene.remove(a);
        assert!(!scene.is_alive(a));
        assert_eq!(scene.viewport_rect(a), None);

        let b = scene.insert(Some(root), LocalElement::default());
        assert!(scene.is_alive(b));
        assert!(!scene.is_alive(a));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
    }
}
