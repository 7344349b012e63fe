// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A select listbox that shrinks to the room it has.
//!
//! The `size` step reports the available height and the `apply` callback resizes the
//! listbox, which makes the pipeline measure again. With `min_available` set, the listbox
//! opens upwards when there is more room above.
//!
//! Run:
//! - `cargo run -p understory_anchor_demos --example select_size`

use std::rc::Rc;

use kurbo::Rect;
use tracing_subscriber::EnvFilter;
use understory_anchor::middleware::{AvailableSize, Flip, Offset};
use understory_anchor::{ComputeConfig, Placement, RectPlatform, Reference, compute_position};

const SELECT: u32 = 1;
const LISTBOX: u32 = 2;
const ITEM_HEIGHT: f64 = 24.0;
const ITEMS: f64 = 12.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let platform = Rc::new(RectPlatform::new(Rect::new(0.0, 0.0, 360.0, 480.0)));
    let listbox = platform.clone();
    let config = ComputeConfig::new(Placement::BottomStart)
        .with(Offset::main_axis(4.0))
        .with(Flip::default())
        .with(AvailableSize {
            min_available: Some(ITEM_HEIGHT * 5.0),
            ..AvailableSize::new(move |_, space| {
                // Never shorter than three rows; the list scrolls inside.
                let height = (ITEM_HEIGHT * ITEMS).min(space.height.max(ITEM_HEIGHT * 3.0));
                listbox.set_rect(LISTBOX, Rect::new(0.0, 0.0, 200.0, height));
            })
        });

    for top in [40.0, 200.0, 330.0, 420.0] {
        platform.set_rect(SELECT, Rect::new(80.0, top, 280.0, top + 32.0));
        platform.set_rect(LISTBOX, Rect::new(0.0, 0.0, 200.0, ITEM_HEIGHT * ITEMS));
        match compute_position(&*platform, &Reference::Element(SELECT), &LISTBOX, &config) {
            Ok(r) => {
                let size = r.middleware_data.size.unwrap_or_default();
                let height = platform.rect(LISTBOX).map_or(0.0, |r| r.height());
                println!(
                    "select at y={top:>5}: {:<12} listbox at ({:>5.1}, {:>5.1}) height {height:>5.1} (available {:>5.1}{})",
                    r.placement.to_string(),
                    r.x,
                    r.y,
                    size.available_height,
                    if size.switched { ", switched side" } else { "" },
                );
            }
            Err(err) => println!("select at y={top}: {err}"),
        }
    }
}
