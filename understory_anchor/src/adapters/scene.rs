// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Platform`] backed by Understory Scene.
//!
//! ## Feature
//!
//! Enable with `scene_adapter`.
//!
//! ## Notes
//!
//! The platform is a `RefCell<Scene>` so hosts can keep editing the scene while positioned
//! elements hold it through an `Rc`. Measurements read committed geometry only; call
//! [`Scene::commit`] after edits and feed the returned [`Changes`] to [`emit_changes`].
//! Never hold a mutable borrow of the scene while emitting.
//!
//! For [`Strategy::Absolute`] coordinates are in the space the floating element's
//! `local_bounds` are written in: its parent's scrolled content space, or the document for
//! roots. For [`Strategy::Fixed`] they are viewport coordinates.

use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, Rect, Size, Vec2};
use understory_scene::{Changes, ElementFlags, ElementId, Scene};

use crate::auto_update::{Listeners, Trigger};
use crate::platform::{Ancestor, Boundary, Platform, Reference, RootBoundary, clip_intersection};
use crate::types::{ElementRects, Strategy};

/// Transform from `floating`'s strategy space to viewport space.
fn frame(scene: &Scene, floating: ElementId, strategy: Strategy) -> Option<Affine> {
    match strategy {
        Strategy::Fixed => Some(Affine::IDENTITY),
        Strategy::Absolute => scene.parent_space_transform(floating),
    }
}

impl Platform for RefCell<Scene> {
    type Element = ElementId;

    fn element_rects(
        &self,
        reference: &Reference<ElementId>,
        floating: &ElementId,
        strategy: Strategy,
    ) -> Option<ElementRects> {
        let viewport_rect = reference.viewport_rect(self)?;
        let scene = self.borrow();
        let frame = frame(&scene, *floating, strategy)?;
        let size = scene.size(*floating)?;
        Some(ElementRects {
            reference: frame.inverse().transform_rect_bbox(viewport_rect),
            floating: Rect::from_origin_size((0.0, 0.0), size),
        })
    }

    fn dimensions(&self, element: &ElementId) -> Option<Size> {
        self.borrow().size(*element)
    }

    fn bounding_rect(&self, element: &ElementId) -> Option<Rect> {
        self.borrow().viewport_rect(*element)
    }

    fn clipping_rect(
        &self,
        element: Option<&ElementId>,
        boundary: &Boundary<ElementId>,
        root_boundary: &RootBoundary,
        _strategy: Strategy,
    ) -> Rect {
        let scene = self.borrow();
        let root = match root_boundary {
            RootBoundary::Viewport => scene.viewport(),
            RootBoundary::Document => scene.document(),
            RootBoundary::Rect(r) => *r,
        };
        let clips: Vec<Rect> = match boundary {
            Boundary::ClippingAncestors => element
                .map(|e| scene.clipping_ancestors(*e))
                .unwrap_or_default()
                .into_iter()
                .filter_map(|a| scene.viewport_rect(a))
                .collect(),
            Boundary::Elements(list) => list
                .iter()
                .filter_map(|e| scene.viewport_rect(*e))
                .collect(),
            Boundary::Rect(r) => alloc::vec![*r],
        };
        clip_intersection(clips.into_iter().chain([root])).unwrap_or(root)
    }

    fn overflow_ancestors(&self, element: &ElementId) -> Vec<Ancestor<ElementId>> {
        let scene = self.borrow();
        let mut ancestors: Vec<_> = scene
            .scroll_ancestors(*element)
            .into_iter()
            .map(Ancestor::Element)
            .collect();
        ancestors.push(Ancestor::Viewport);
        ancestors
    }

    fn contains(&self, element: &ElementId) -> bool {
        self.borrow().is_alive(*element)
    }

    fn to_viewport(&self, floating: &ElementId, rect: Rect, strategy: Strategy) -> Rect {
        match frame(&self.borrow(), *floating, strategy) {
            Some(frame) => frame.transform_rect_bbox(rect),
            None => rect,
        }
    }

    fn offset_scale(&self, floating: &ElementId) -> Vec2 {
        let scene = self.borrow();
        let Some(frame) = frame(&scene, *floating, Strategy::Absolute) else {
            return Vec2::new(1.0, 1.0);
        };
        let [a, b, c, d, _, _] = frame.as_coeffs();
        Vec2::new(Vec2::new(a, b).hypot(), Vec2::new(c, d).hypot())
    }

    fn is_rtl(&self, element: &ElementId) -> bool {
        self.borrow()
            .flags(*element)
            .is_some_and(|f| f.contains(ElementFlags::RTL))
    }

    fn device_pixel_ratio(&self, _element: &ElementId) -> f64 {
        self.borrow().device_pixel_ratio()
    }
}

/// Triggers describing a committed batch of scene changes.
pub fn triggers(changes: &Changes) -> Vec<Trigger<ElementId>> {
    let mut out = Vec::new();
    if changes.window_scrolled {
        out.push(Trigger::Scroll(Ancestor::Viewport));
    }
    if changes.viewport_resized {
        out.push(Trigger::Resize(Ancestor::Viewport));
    }
    for id in &changes.scrolled {
        out.push(Trigger::Scroll(Ancestor::Element(*id)));
    }
    for id in &changes.resized {
        out.push(Trigger::Resize(Ancestor::Element(*id)));
        out.push(Trigger::ElementResize(*id));
    }
    out.extend(changes.moved.iter().copied().map(Trigger::LayoutShift));
    out
}

/// Emit every trigger for `changes`. Returns how many callbacks ran.
pub fn emit_changes(listeners: &Listeners<ElementId>, changes: &Changes) -> usize {
    triggers(changes).iter().map(|t| listeners.emit(t)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_update::{AutoUpdateOptions, subscribe};
    use crate::middleware::{Flip, Hide, HideStrategy, Shift};
    use crate::{ComputeConfig, Placement, Side, compute_position};
    use alloc::rc::Rc;
    use understory_scene::LocalElement;

    fn boxed(bounds: Rect, flags: ElementFlags) -> LocalElement {
        LocalElement {
            local_bounds: bounds,
            flags,
            ..Default::default()
        }
    }

    struct Fixture {
        scene: Rc<RefCell<Scene>>,
        list: ElementId,
        button: ElementId,
        popup: ElementId,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let list = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 200.0, 100.0), ElementFlags::SCROLL),
        );
        let button = scene.insert(
            Some(list),
            boxed(Rect::new(10.0, 50.0, 60.0, 70.0), ElementFlags::empty()),
        );
        let popup = scene.insert(
            None,
            boxed(Rect::new(0.0, 0.0, 120.0, 40.0), ElementFlags::empty()),
        );
        let _ = scene.commit();
        Fixture {
            scene: Rc::new(RefCell::new(scene)),
            list,
            button,
            popup,
        }
    }

    #[test]
    fn absolute_coordinates_live_in_document_space() {
        let f = fixture();
        f.scene.borrow_mut().set_window_scroll(Vec2::new(0.0, 30.0));
        let _ = f.scene.borrow_mut().commit();
        let config = ComputeConfig::new(Placement::Bottom);
        let r = compute_position(&*f.scene, &Reference::Element(f.button), &f.popup, &config)
            .unwrap();
        assert_eq!((r.x, r.y), (-25.0, 70.0));

        let fixed = config.with_strategy(Strategy::Fixed);
        let r = compute_position(&*f.scene, &Reference::Element(f.button), &f.popup, &fixed)
            .unwrap();
        assert_eq!(r.y, 40.0);
    }

    #[test]
    fn popup_in_scaled_scroller_sits_flush_against_nested_reference() {
        let mut scene = Scene::new(Size::new(800.0, 600.0));
        let panel = scene.insert(
            None,
            LocalElement {
                local_bounds: Rect::new(0.0, 0.0, 300.0, 200.0),
                local_transform: Affine::translate((50.0, 20.0)) * Affine::scale(2.0),
                scroll_offset: Vec2::new(0.0, 15.0),
                flags: ElementFlags::SCROLL | ElementFlags::CONTAINING_BLOCK,
            },
        );
        let inner = scene.insert(
            Some(panel),
            LocalElement {
                local_bounds: Rect::new(20.0, 30.0, 220.0, 180.0),
                scroll_offset: Vec2::new(5.0, 7.0),
                flags: ElementFlags::SCROLL,
                ..Default::default()
            },
        );
        let button = scene.insert(
            Some(inner),
            boxed(Rect::new(60.0, 50.0, 100.0, 66.0), ElementFlags::empty()),
        );
        let popup = scene.insert(
            Some(panel),
            boxed(Rect::new(0.0, 0.0, 60.0, 20.0), ElementFlags::empty()),
        );
        let _ = scene.commit();
        let scene = RefCell::new(scene);
        let anchor = scene.borrow().viewport_rect(button).unwrap();
        assert_eq!(anchor, Rect::new(160.0, 76.0, 240.0, 108.0));

        for placement in Placement::ALL {
            let config = ComputeConfig::new(placement)
                .with(Flip::default())
                .with(Shift::default());
            let r = compute_position(&scene, &Reference::Element(button), &popup, &config)
                .unwrap();
            scene
                .borrow_mut()
                .set_local_bounds(popup, Rect::from_origin_size((r.x, r.y), (60.0, 20.0)));
            let _ = scene.borrow_mut().commit();
            let placed = scene.borrow().viewport_rect(popup).unwrap();
            assert_eq!(placed.size(), Size::new(120.0, 40.0), "{placement}");
            let (edge, target) = match r.placement.side() {
                Side::Top => (placed.y1, anchor.y0),
                Side::Bottom => (placed.y0, anchor.y1),
                Side::Left => (placed.x1, anchor.x0),
                Side::Right => (placed.x0, anchor.x1),
            };
            assert!(
                (edge - target).abs() < 1e-9,
                "{placement} -> {}: {placed:?} against {anchor:?}",
                r.placement
            );
        }
    }

    #[test]
    fn reference_scrolled_out_of_its_list_is_hidden() {
        let f = fixture();
        f.scene
            .borrow_mut()
            .set_scroll_offset(f.list, Vec2::new(0.0, 200.0));
        let _ = f.scene.borrow_mut().commit();
        let config =
            ComputeConfig::new(Placement::Bottom).with(Hide::new(HideStrategy::ReferenceHidden));
        let r = compute_position(&*f.scene, &Reference::Element(f.button), &f.popup, &config)
            .unwrap();
        assert_eq!(r.middleware_data.hide.unwrap().reference_hidden, Some(true));
    }

    #[test]
    fn overflow_ancestors_end_with_the_viewport() {
        let f = fixture();
        assert_eq!(
            f.scene.overflow_ancestors(&f.button),
            [Ancestor::Element(f.list), Ancestor::Viewport]
        );
        assert_eq!(f.scene.overflow_ancestors(&f.popup), [Ancestor::Viewport]);
    }

    #[test]
    fn changes_become_triggers() {
        let f = fixture();
        {
            let mut scene = f.scene.borrow_mut();
            scene.set_scroll_offset(f.list, Vec2::new(0.0, 10.0));
            scene.set_local_bounds(f.popup, Rect::new(0.0, 0.0, 100.0, 40.0));
            scene.set_viewport_size(Size::new(640.0, 480.0));
        }
        let changes = f.scene.borrow_mut().commit();
        assert_eq!(
            triggers(&changes),
            [
                Trigger::Resize(Ancestor::Viewport),
                Trigger::Scroll(Ancestor::Element(f.list)),
                Trigger::Resize(Ancestor::Element(f.popup)),
                Trigger::ElementResize(f.popup),
                Trigger::LayoutShift(f.button),
            ]
        );
    }

    #[test]
    fn scrolling_the_list_moves_the_popup() {
        let f = fixture();
        let listeners = Rc::new(Listeners::new());
        let subscription = subscribe(
            f.scene.clone(),
            &listeners,
            Reference::Element(f.button),
            f.popup,
            ComputeConfig::new(Placement::Bottom),
            AutoUpdateOptions::default(),
            |_| {},
        )
        .unwrap();
        assert_eq!(subscription.last().map(|r| r.y), Some(70.0));

        f.scene
            .borrow_mut()
            .set_scroll_offset(f.list, Vec2::new(0.0, 30.0));
        let changes = f.scene.borrow_mut().commit();
        assert!(emit_changes(&listeners, &changes) > 0);
        assert_eq!(subscription.last().map(|r| r.y), Some(40.0));
    }
}
