// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=thicket_scene --heading-base-level=0

//! Thicket Scene: the scene-graph core of a 2D real-time engine, built on Kurbo.
//!
//! - Represents a hierarchy of nodes with local position, rotation, scale, shape, sprite, and color.
//! - Derives world transforms, render geometry, draw ordering, and bounding boxes lazily, on read.
//! - Keeps a spatial index and a physics simulation in sync with the tree as nodes come and go.
//!
//! ## Ownership
//!
//! [`Scene::create`] returns a [`NodeOwner`], the only handle that owns a node. Attaching it with
//! [`Scene::add_child`] hands ownership to the parent and leaves the owner empty; from then on
//! the node is addressed by its [`NodeId`], a `Copy` generational handle that goes stale once the
//! node is freed. A node that is never attached is returned with [`Scene::destroy`]; if its
//! owner is dropped instead, the scene frees it on the next [`Scene::create`] or [`Scene::reap`].
//!
//! ## Caches
//!
//! Every node caches four derived values: its world transform, its render data (world-space
//! vertices and texture), its resolved ordering (z-index and views, inherited from the nearest
//! ancestor that sets them), and its world bounding box. Setters mark caches dirty and propagate
//! the mark down the subtree, stopping where a subtree is already dirty. Readers such as
//! [`Scene::absolute_transformation`], [`Scene::render_data`], [`Scene::ordering`], and
//! [`Scene::bounding_box`] recompute only the dirty part of the ancestor chain.
//!
//! ## Deletion
//!
//! [`Scene::delete`] marks a subtree. Marking is immediate as far as collaborators are concerned:
//! nodes stop being tracked by the [`SpatialIndex`], bodies and hitboxes leave the [`Simulation`],
//! and spaces unregister. Memory is reclaimed later, when [`Scene::reap`] runs, typically once per
//! frame after the update pass. [`Scene::update`] does both for nodes whose lifetime ran out.
//!
//! ## Collaborators
//!
//! - [`SpatialIndex`]: told when indexable nodes enter and leave the tree. [`TrackingSet`] is the default.
//! - [`Simulation`]: told about space containers, bodies, and hitbox outlines. [`NoSimulation`] is the default.
//! - [`NodeListener`]: per-node lifecycle hooks for embedding code.
//!
//! ## Features
//!
//! - `std` (enabled by default): use the standard library for float math and implement
//!   `std::error::Error` for [`Error`].
//! - `libm`: use `libm` for float math in `no_std` builds.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Size};
//! use thicket_scene::{NodeType, Scene, Shape};
//!
//! let mut scene = Scene::new();
//! let root = scene.root();
//!
//! let mut owner = scene.create(NodeType::Basic);
//! let parent = scene.add_child(root, &mut owner).unwrap();
//! scene.set_position(parent, Point::new(3.0, 3.0));
//!
//! let mut owner = scene.create(NodeType::Basic);
//! let child = scene.add_child(parent, &mut owner).unwrap();
//! scene.set_position(child, Point::new(1.0, 0.0));
//! scene.set_shape(child, Some(Shape::rect(Size::new(2.0, 2.0))));
//! scene.set_z_index(parent, Some(5));
//!
//! assert_eq!(scene.absolute_position(child), Some(Point::new(4.0, 3.0)));
//! assert_eq!(scene.ordering(child).unwrap().z_index, 5);
//! assert_eq!(scene.render_data(child).unwrap().vertices.len(), 4);
//!
//! scene.delete(parent);
//! assert_eq!(scene.reap(), 2);
//! assert!(!scene.is_alive(child));
//! ```

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod collab;
mod config;
mod error;
mod facet;
mod listener;
pub mod math;
mod node;
mod scene;
mod shape;
mod sprite;
mod types;

#[cfg(test)]
mod testing;

pub use collab::{BodyState, NoIndex, NoSimulation, Simulation, SpatialIndex, TrackingSet};
pub use config::SceneConfig;
pub use error::{Error, Result};
pub use facet::{BodyFacet, Facet, HitboxFacet, SpaceFacet, TextFacet};
pub use listener::NodeListener;
pub use node::{Dirty, Node, OrderingData, RenderData};
pub use scene::Scene;
pub use shape::{Shape, ShapeKind, Vertex};
pub use sprite::{Sprite, Texture, TextureHandle};
pub use types::{Alignment, Color, MAX_VIEWS, NodeFlags, NodeId, NodeOwner, NodeType, ViewIndexSet};
