// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A popover that follows its button through a scrolling list.
//!
//! Builds a scene with a scroll container, binds a popover to a button inside it, then
//! scrolls. Each commit is turned into triggers; the binding republishes only when the
//! rounded position changed, and `hide` reports when the button leaves the list.
//!
//! Run:
//! - `RUST_LOG=understory_anchor=trace cargo run -p understory_anchor_demos --example scroll_auto_update`

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Rect, Size, Vec2};
use tracing_subscriber::EnvFilter;
use understory_anchor::adapters::scene::emit_changes;
use understory_anchor::middleware::{Hide, HideStrategy, Offset, Shift};
use understory_anchor::{Anchored, ComputeConfig, Listeners, Placement, Reference};
use understory_scene::{ElementFlags, LocalElement, Scene};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut scene = Scene::new(Size::new(640.0, 480.0));
    scene.set_device_pixel_ratio(2.0);
    let list = scene.insert(
        None,
        LocalElement {
            local_bounds: Rect::new(20.0, 20.0, 320.0, 220.0),
            flags: ElementFlags::SCROLL,
            ..Default::default()
        },
    );
    let button = scene.insert(
        Some(list),
        LocalElement {
            local_bounds: Rect::new(40.0, 150.5, 140.0, 176.5),
            ..Default::default()
        },
    );
    let popover = scene.insert(
        None,
        LocalElement {
            local_bounds: Rect::new(0.0, 0.0, 180.0, 60.0),
            ..Default::default()
        },
    );
    let _ = scene.commit();
    let scene = Rc::new(RefCell::new(scene));
    let listeners = Rc::new(Listeners::new());

    let mut anchored = Anchored::new(scene.clone(), listeners.clone()).with_config(
        ComputeConfig::new(Placement::RightStart)
            .with(Offset::main_axis(6.0))
            .with(Shift::default())
            .with(Hide::new(HideStrategy::ReferenceHidden)),
    );
    anchored.on_change(|state| {
        let hidden = state
            .middleware_data
            .hide
            .and_then(|h| h.reference_hidden)
            .unwrap_or(false);
        println!(
            "  update: {} at ({:.1}, {:.1}){}",
            state.placement,
            state.x,
            state.y,
            if hidden { " [reference hidden]" } else { "" },
        );
    });
    if let Err(err) = anchored
        .set_reference(Some(Reference::Element(button)))
        .and_then(|()| anchored.set_floating(Some(popover)))
    {
        eprintln!("setup failed: {err}");
        return;
    }

    for scroll in [0.0, 0.25, 0.5, 40.0, 120.0, 200.0] {
        println!("scroll list to {scroll}");
        scene
            .borrow_mut()
            .set_scroll_offset(list, Vec2::new(0.0, scroll));
        let changes = scene.borrow_mut().commit();
        emit_changes(&listeners, &changes);
    }

    println!("styles: {:?}", anchored.floating_styles());
    if let Err(err) = anchored.set_open(false) {
        eprintln!("close failed: {err}");
    }
    println!("closed, positioned = {}", anchored.is_positioned());
}
