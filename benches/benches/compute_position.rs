// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Size, Vec2};
use understory_anchor::middleware::{
    Arrow, AutoPlacement, AvailableSize, Flip, Hide, HideStrategy, LimitShift, Offset, Shift,
};
use understory_anchor::{ComputeConfig, Placement, RectPlatform, Reference, compute_position};
use understory_scene::{ElementFlags, ElementId, LocalElement, Scene};

fn tooltip_config<E: Clone + PartialEq + std::fmt::Debug>(arrow: E) -> ComputeConfig<E> {
    ComputeConfig::new(Placement::Bottom)
        .with(Offset::main_axis(6.0))
        .with(Flip::default())
        .with(Shift {
            limiter: Some(LimitShift::default()),
            ..Shift::default()
        })
        .with(Arrow::new(arrow))
        .with(Hide::new(HideStrategy::ReferenceHidden))
}

fn rect_platform() -> RectPlatform {
    // Reference hugging the bottom edge so flip has to run twice.
    let platform = RectPlatform::new(Rect::new(0.0, 0.0, 1280.0, 720.0));
    platform.set_rect(1, Rect::new(600.0, 690.0, 680.0, 714.0));
    platform.set_rect(2, Rect::new(0.0, 0.0, 240.0, 80.0));
    platform.set_rect(3, Rect::new(0.0, 0.0, 10.0, 10.0));
    platform
}

/// A reference buried in nested scroll containers.
fn nested_scene(depth: usize) -> (RefCell<Scene>, ElementId, ElementId, ElementId) {
    let mut scene = Scene::new(Size::new(1280.0, 720.0));
    let mut parent = None;
    for i in 0..depth {
        let inset = i as f64 * 4.0;
        let id = scene.insert(
            parent,
            LocalElement {
                local_bounds: Rect::new(inset, inset, 1000.0 - inset, 700.0 - inset),
                scroll_offset: Vec2::new(0.0, 3.0),
                flags: ElementFlags::SCROLL,
                ..Default::default()
            },
        );
        parent = Some(id);
    }
    let button = scene.insert(
        parent,
        LocalElement {
            local_bounds: Rect::new(400.0, 600.0, 480.0, 624.0),
            ..Default::default()
        },
    );
    let popup = scene.insert(
        None,
        LocalElement {
            local_bounds: Rect::new(0.0, 0.0, 240.0, 80.0),
            ..Default::default()
        },
    );
    let arrow = scene.insert(
        Some(popup),
        LocalElement {
            local_bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
            ..Default::default()
        },
    );
    let _ = scene.commit();
    (RefCell::new(scene), button, popup, arrow)
}

fn bench_rect_platform(c: &mut Criterion) {
    let mut group = c.benchmark_group("rect_platform");
    let platform = rect_platform();
    let reference = Reference::Element(1);

    let bare = ComputeConfig::new(Placement::Bottom);
    group.bench_function("no_middleware", |b| {
        b.iter(|| compute_position(black_box(&platform), &reference, &2, &bare));
    });

    let tooltip = tooltip_config(3);
    group.bench_function("tooltip_flip", |b| {
        b.iter(|| compute_position(black_box(&platform), &reference, &2, &tooltip));
    });

    let auto = ComputeConfig::new(Placement::Bottom)
        .with(AutoPlacement {
            alignment: Some(understory_anchor::Alignment::Start),
            ..AutoPlacement::default()
        })
        .with(AvailableSize::default());
    group.bench_function("auto_placement_aligned", |b| {
        b.iter(|| compute_position(black_box(&platform), &reference, &2, &auto));
    });
    group.finish();
}

fn bench_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene");
    for depth in [1_usize, 8, 32] {
        let (scene, button, popup, arrow) = nested_scene(depth);
        let reference = Reference::Element(button);
        let config = tooltip_config(arrow);
        group.bench_function(format!("tooltip_depth_{depth}"), |b| {
            b.iter(|| compute_position(black_box(&scene), &reference, &popup, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rect_platform, bench_scene);
criterion_main!(benches);
