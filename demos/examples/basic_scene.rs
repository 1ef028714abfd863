// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic scene: a physics space with a body and its hitbox, a sprite, and text.
//!
//! Walks one frame's worth of mutations, reads back the derived state, lets a
//! short-lived label expire, then deletes the space and reaps it.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p thicket_demos --example basic_scene`

use std::time::Duration;

use kurbo::{Point, Rect, Size, Vec2};
use log::info;
use thicket_scene::{
    Alignment, BodyState, NodeId, NodeType, Scene, SceneConfig, Shape, Simulation, Sprite,
    Texture, TextureHandle, TrackingSet,
};

/// Prints every call the scene makes into the simulation.
#[derive(Debug, Default)]
struct PrintingSimulation;

impl Simulation for PrintingSimulation {
    fn register_container(&mut self, space: NodeId) {
        info!("sim: register space {space:?}");
    }

    fn unregister_container(&mut self, space: NodeId) {
        info!("sim: unregister space {space:?}");
    }

    fn attach_body(&mut self, body: NodeId, space: NodeId, state: BodyState) {
        info!("sim: body {body:?} joins {space:?} at {:?}", state.position);
    }

    fn detach_body(&mut self, body: NodeId) {
        info!("sim: detach body {body:?}");
    }

    fn override_position(&mut self, body: NodeId, position: Point) {
        info!("sim: move body {body:?} to {position:?}");
    }

    fn override_rotation(&mut self, body: NodeId, rotation: f64) {
        info!("sim: rotate body {body:?} to {rotation:.3}");
    }

    fn update_hitbox_shape(&mut self, hitbox: NodeId, body: NodeId, points: &[Point]) {
        info!("sim: hitbox {hitbox:?} on {body:?} outline {points:?}");
    }

    fn detach_hitbox(&mut self, hitbox: NodeId) {
        info!("sim: detach hitbox {hitbox:?}");
    }
}

fn main() -> Result<(), thicket_scene::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut scene = Scene::with_collaborators(
        SceneConfig::default(),
        TrackingSet::new(),
        PrintingSimulation,
    );
    let root = scene.root();

    let mut owner = scene.create(NodeType::Space);
    let space = scene.add_child(root, &mut owner)?;

    let mut owner = scene.create(NodeType::Body);
    let body = owner.id().expect("fresh owner");
    scene.set_position(body, Point::new(100.0, 50.0));
    scene.set_scale(body, Vec2::new(2.0, 2.0));
    scene.add_child(space, &mut owner)?;

    let mut owner = scene.create(NodeType::Hitbox);
    let hitbox = owner.id().expect("fresh owner");
    scene.set_shape(hitbox, Some(Shape::circle(Point::ZERO, 4.0)));
    scene.set_origin_alignment(hitbox, Alignment::Center);
    scene.add_child(body, &mut owner)?;

    let texture = Texture {
        handle: TextureHandle(1),
        size: Size::new(64.0, 32.0),
    };
    let mut owner = scene.create(NodeType::Basic);
    let sprite = scene.add_child(body, &mut owner)?;
    scene.set_sprite(sprite, Sprite::new(texture).crop(Rect::new(0.0, 0.0, 32.0, 32.0)));
    scene.set_z_index(sprite, Some(3));

    let mut owner = scene.create(NodeType::Text);
    let label = scene.add_child(sprite, &mut owner)?;
    scene.set_text(label, "hello");
    scene.set_position(label, Point::new(0.0, -20.0));
    scene.set_lifetime(label, Some(Duration::from_millis(20)));

    scene.set_rotation(body, core::f64::consts::FRAC_PI_4);

    info!("label at {:?}", scene.absolute_position(label));
    info!("label ordering {:?}", scene.ordering(label));
    info!("sprite bounds {:?}", scene.bounding_box(sprite));
    if let Some(data) = scene.render_data(sprite) {
        info!(
            "sprite draws {} vertices with {:?}",
            data.vertices.len(),
            data.texture
        );
    }
    info!("tracked nodes: {}", scene.spatial_index().len());

    for frame in 0..2 {
        let expired = scene.update(Duration::from_millis(16));
        info!("frame {frame}: {expired} node(s) expired");
    }

    scene.delete(space);
    info!("tracked after delete: {}", scene.spatial_index().len());
    let freed = scene.reap();
    info!("reaped {freed} nodes; {} left", scene.len());
    Ok(())
}
