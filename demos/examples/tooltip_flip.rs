// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tooltip with an arrow that flips and shifts to stay on screen.
//!
//! Walks a button across a small viewport and prints where the tooltip and its arrow land.
//!
//! Run:
//! - `RUST_LOG=understory_anchor=debug cargo run -p understory_anchor_demos --example tooltip_flip`

use kurbo::Rect;
use tracing_subscriber::EnvFilter;
use understory_anchor::middleware::{Arrow, Flip, Offset, Shift};
use understory_anchor::{ComputeConfig, Placement, RectPlatform, Reference, compute_position};

const BUTTON: u32 = 1;
const TOOLTIP: u32 = 2;
const ARROW: u32 = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let platform = RectPlatform::new(Rect::new(0.0, 0.0, 400.0, 200.0));
    platform.set_rect(TOOLTIP, Rect::new(0.0, 0.0, 160.0, 48.0));
    platform.set_rect(ARROW, Rect::new(0.0, 0.0, 8.0, 8.0));

    let config = ComputeConfig::new(Placement::Top)
        .with(Offset::main_axis(8.0))
        .with(Flip::default())
        .with(Shift::default())
        .with(Arrow::new(ARROW));

    println!("button (x, y)   -> placement     tooltip (x, y)    arrow x");
    for (x, y) in [(120.0, 80.0), (10.0, 80.0), (330.0, 80.0), (120.0, 20.0), (120.0, 170.0)] {
        let button = Rect::new(x, y, x + 60.0, y + 24.0);
        platform.set_rect(BUTTON, button);
        match compute_position(&platform, &Reference::Element(BUTTON), &TOOLTIP, &config) {
            Ok(r) => {
                let arrow_x = r.middleware_data.arrow.and_then(|a| a.x).unwrap_or_default();
                println!(
                    "({x:>5.1}, {y:>5.1}) -> {:<13} ({:>6.1}, {:>6.1})  {:>6.1}",
                    r.placement.to_string(),
                    r.x,
                    r.y,
                    arrow_x
                );
            }
            Err(err) => println!("{button:?}: {err}"),
        }
    }
}
