// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: node arena, tree structure, and attribute updates.
//!
//! Lifecycle operations live in [`lifecycle`], cache invalidation and lazy
//! recomputation in [`cache`].

mod cache;
mod lifecycle;

use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::{Affine, Point, Vec2};

use crate::collab::{NoSimulation, Simulation, SpatialIndex, TrackingSet};
use crate::config::SceneConfig;
use crate::error::{Error, Result};
use crate::math::{decompose, normalize_angle, same_angle};
use crate::node::Node;
use crate::shape::Shape;
use crate::sprite::Sprite;
use crate::types::{
    Alignment, Color, NodeFlags, NodeId, NodeType, OrphanQueue, SceneId, State, ViewIndexSet,
};

/// A tree of nodes rooted at [`Scene::root`], plus the collaborators it drives.
///
/// The type parameters select the [`SpatialIndex`] and [`Simulation`]
/// implementations. They default to a [`TrackingSet`] and [`NoSimulation`], so
/// most callers can use [`Scene::new`] without naming them.
///
/// Attribute setters take effect immediately on the node's own inputs and only
/// mark derived state dirty. World transforms, render data, ordering, and
/// bounding boxes are recomputed on the next read.
///
/// ## Example
///
/// ```rust
/// use kurbo::Point;
/// use thicket_scene::{NodeType, Scene};
///
/// let mut scene = Scene::new();
/// let root = scene.root();
///
/// let mut owner = scene.create(NodeType::Basic);
/// let parent = scene.add_child(root, &mut owner).unwrap();
/// assert!(owner.is_empty());
/// scene.set_position(parent, Point::new(3.0, 3.0));
///
/// let mut owner = scene.create(NodeType::Basic);
/// let child = scene.add_child(parent, &mut owner).unwrap();
/// scene.set_position(child, Point::new(1.0, 0.0));
///
/// assert_eq!(scene.absolute_position(child), Some(Point::new(4.0, 3.0)));
/// ```
pub struct Scene<I: SpatialIndex = TrackingSet, P: Simulation = NoSimulation> {
    id: SceneId,
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
    config: SceneConfig,
    /// subtree tops marked for deletion, waiting for [`Scene::reap`]
    pending_reap: Vec<NodeId>,
    /// nodes of owners dropped without being attached or destroyed
    orphans: OrphanQueue,
    simulations: Vec<NodeId>,
    spatial_index: I,
    simulation: P,
}

impl<I, P> core::fmt::Debug for Scene<I, P>
where
    I: SpatialIndex + core::fmt::Debug,
    P: Simulation + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Scene")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("pending_reap", &self.pending_reap)
            .field("orphans", &self.orphans.borrow().len())
            .field("simulations", &self.simulations)
            .field("spatial_index", &self.spatial_index)
            .field("simulation", &self.simulation)
            .finish_non_exhaustive()
    }
}

impl<I, P> Default for Scene<I, P>
where
    I: SpatialIndex + Default,
    P: Simulation + Default,
{
    fn default() -> Self {
        Self::with_collaborators(SceneConfig::default(), I::default(), P::default())
    }
}

impl Scene {
    /// Create a scene with default settings, a [`TrackingSet`] index, and no simulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene with custom settings and the default collaborators.
    pub fn with_config(config: SceneConfig) -> Self {
        Self::with_collaborators(config, TrackingSet::new(), NoSimulation)
    }
}

impl<I: SpatialIndex, P: Simulation> Scene<I, P> {
    /// Create a scene driving the given collaborators.
    pub fn with_collaborators(config: SceneConfig, spatial_index: I, simulation: P) -> Self {
        let mut root = Node::new(1, NodeType::Basic);
        root.state.insert(State::IN_TREE);
        Self {
            id: SceneId::next(),
            nodes: vec![Some(root)],
            generations: vec![1],
            free_list: Vec::new(),
            root: NodeId::new(0, 1),
            config,
            pending_reap: Vec::new(),
            orphans: OrphanQueue::default(),
            simulations: Vec::new(),
            spatial_index,
            simulation,
        }
    }

    /// The root node. It is always in the tree and cannot be deleted.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Scene-wide settings.
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The spatial index collaborator.
    pub fn spatial_index(&self) -> &I {
        &self.spatial_index
    }

    /// The simulation collaborator.
    pub fn simulation(&self) -> &P {
        &self.simulation
    }

    /// Mutable access to the simulation, for stepping it between frames.
    pub fn simulation_mut(&mut self) -> &mut P {
        &mut self.simulation
    }

    /// Space nodes currently registered as simulation roots, in registration order.
    pub fn simulations(&self) -> &[NodeId] {
        &self.simulations
    }

    /// Returns true if `id` refers to a live node.
    ///
    /// Detached nodes and nodes marked for deletion are live until they are freed.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Read access to a live node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    /// Returns the parent of a node if live, or `None` for parentless or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get the children of a node, or empty slice if node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| &n.children)
    }

    /// Whether `id` is the scene root.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Number of live nodes, including the root and detached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Always false: the root is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `id` and all its descendants, parents before children, siblings in order.
    ///
    /// Empty for stale ids.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        self.preorder(id)
    }

    // --- attribute setters ---

    /// Set the position relative to the parent.
    ///
    /// Bodies push the new position into the simulation; hitboxes refresh their
    /// collision shape.
    pub fn set_position(&mut self, id: NodeId, position: Point) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        if node.position != position {
            node.position = position;
            self.mark_transform_dirty(id);
        }
        self.after_transform_write(id, TransformWrite::Position);
    }

    /// Set the rotation relative to the parent, in radians.
    ///
    /// The angle is stored normalized to `(-π, π]`. Setting an angle congruent to
    /// the current one modulo `2π` leaves every cache untouched.
    pub fn set_rotation(&mut self, id: NodeId, rotation: f64) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        if !same_angle(node.rotation, rotation) {
            node.rotation = normalize_angle(rotation);
            self.mark_transform_dirty(id);
        }
        self.after_transform_write(id, TransformWrite::Rotation);
    }

    /// Set the scale relative to the parent.
    ///
    /// Bodies refresh the collision shapes of their hitbox children.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec2) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        if node.scale != scale {
            node.scale = scale;
            self.mark_transform_dirty(id);
        }
        self.after_transform_write(id, TransformWrite::Scale);
    }

    /// Set position, rotation, and scale from a full local transform.
    ///
    /// Shear is discarded; see [`decompose`](crate::math::decompose).
    pub fn set_transformation(&mut self, id: NodeId, transformation: Affine) {
        let parts = decompose(transformation);
        self.set_position(id, parts.translation.to_point());
        self.set_rotation(id, parts.rotation);
        self.set_scale(id, parts.scale);
    }

    /// Set or clear the local geometry.
    ///
    /// An explicit shape turns auto-shape off; clearing the shape turns it back on.
    pub fn set_shape(&mut self, id: NodeId, shape: Option<Shape>) {
        let auto = shape.is_none();
        self.assign_shape(id, shape, auto);
    }

    /// Set the sprite.
    ///
    /// With auto-shape on, the shape becomes a box of the sprite's frame size, or
    /// is cleared when the sprite has no texture.
    pub fn set_sprite(&mut self, id: NodeId, sprite: Sprite) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        node.sprite = sprite;
        node.render.dirty = true;
        if node.state.contains(State::AUTO_SHAPE) {
            let shape = sprite.has_texture().then(|| Shape::rect(sprite.size()));
            self.assign_shape(id, shape, true);
        }
    }

    /// Set the color multiplier.
    pub fn set_color(&mut self, id: NodeId, color: Color) {
        if let Some(n) = self.node_opt_mut(id)
            && n.color != color
        {
            n.color = color;
            n.render.dirty = true;
        }
    }

    /// Set which point of the shape's bounding box sits on the node origin.
    pub fn set_origin_alignment(&mut self, id: NodeId, alignment: Alignment) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        if node.alignment == alignment {
            return;
        }
        node.alignment = alignment;
        node.render.dirty = true;
        node.spatial.dirty = true;
        if node.node_type() == NodeType::Hitbox {
            self.refresh_hitbox(id);
        }
    }

    /// Show or hide the node.
    ///
    /// Becoming visible again invalidates the world transform so any refresh
    /// skipped while hidden happens on the next read.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        let was_visible = node.flags.contains(NodeFlags::VISIBLE);
        node.flags.set(NodeFlags::VISIBLE, visible);
        if visible && !was_visible {
            self.mark_transform_dirty(id);
        }
    }

    /// Include or exclude the node from spatial indexing.
    pub fn set_indexable(&mut self, id: NodeId, indexable: bool) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        if node.flags.contains(NodeFlags::INDEXABLE) == indexable {
            return;
        }
        node.flags.set(NodeFlags::INDEXABLE, indexable);
        node.spatial.dirty = true;
        let active = node.state.contains(State::IN_TREE) && !node.state.contains(State::MARKED);
        if !active {
            return;
        }
        if indexable {
            node.state.insert(State::TRACKED);
            self.spatial_index.start_tracking(id);
        } else if node.state.contains(State::TRACKED) {
            node.state.remove(State::TRACKED);
            self.spatial_index.stop_tracking(id);
        }
    }

    /// Set or clear the z-index override. Descendants without their own
    /// override inherit it.
    pub fn set_z_index(&mut self, id: NodeId, z_index: Option<i16>) {
        if let Some(n) = self.node_opt_mut(id)
            && n.z_index != z_index
        {
            n.z_index = z_index;
            self.mark_ordering_dirty(id);
        }
    }

    /// Set or clear the views override. Descendants without their own
    /// override inherit it.
    ///
    /// Fails with [`Error::InvalidOperation`] when a view index lies outside
    /// `0..MAX_VIEWS`, and with [`Error::StaleNode`] for freed nodes.
    pub fn set_views(&mut self, id: NodeId, views: Option<&[i16]>) -> Result<()> {
        let views = views
            .map(|v| ViewIndexSet::new(v.iter().copied()))
            .transpose()?;
        let node = self.node_opt_mut(id).ok_or(Error::StaleNode(id))?;
        if node.views != views {
            node.views = views;
            self.mark_ordering_dirty(id);
        }
        Ok(())
    }

    /// Replace the text of a text node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Text`] node.
    pub fn set_text(&mut self, id: NodeId, content: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            let text = n.text_mut();
            if text.content != content {
                text.content.clear();
                text.content.push_str(content);
                n.render.dirty = true;
            }
        }
    }

    /// Set the font size of a text node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Text`] node.
    pub fn set_font_size(&mut self, id: NodeId, font_size: f64) {
        if let Some(n) = self.node_opt_mut(id) {
            let text = n.text_mut();
            if text.font_size != font_size {
                text.font_size = font_size;
                n.render.dirty = true;
            }
        }
    }

    /// Set or clear the time left before [`Scene::update`] deletes the node.
    ///
    /// A zero lifetime expires on the next update.
    pub fn set_lifetime(&mut self, id: NodeId, lifetime: Option<Duration>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.lifetime = lifetime;
        }
    }

    // --- internals ---

    fn assign_shape(&mut self, id: NodeId, shape: Option<Shape>, auto: bool) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        node.shape = shape;
        node.state.set(State::AUTO_SHAPE, auto);
        node.render.dirty = true;
        node.spatial.dirty = true;
        if node.node_type() == NodeType::Hitbox {
            self.refresh_hitbox(id);
        }
    }

    fn after_transform_write(&mut self, id: NodeId, write: TransformWrite) {
        let node = self.node(id);
        let is_body = node.node_type() == NodeType::Body;
        if is_body && node.body().space().is_some() {
            let (position, rotation) = (node.position, node.rotation);
            match write {
                TransformWrite::Position => self.simulation.override_position(id, position),
                TransformWrite::Rotation => self.simulation.override_rotation(id, rotation),
                TransformWrite::Scale => {}
            }
        }
        match write {
            // Hitbox outlines are relative to their body.
            TransformWrite::Position | TransformWrite::Rotation if is_body => {}
            TransformWrite::Position | TransformWrite::Rotation => self.refresh_hitboxes(id, false),
            TransformWrite::Scale => self.refresh_hitboxes(id, true),
        }
    }

    /// Refresh the collision outline of every hitbox in `top`'s subtree.
    ///
    /// Hitboxes below a nested body only see `top` through that body's world
    /// scale, so they are visited only when `through_bodies` is set.
    fn refresh_hitboxes(&mut self, top: NodeId, through_bodies: bool) {
        if self.simulations.is_empty() {
            return;
        }
        let node = self.node(top);
        if !node.in_tree() || node.is_marked_to_delete() {
            return;
        }
        let mut hitboxes = Vec::new();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            match node.node_type() {
                NodeType::Hitbox => hitboxes.push(id),
                NodeType::Body if id != top && !through_bodies => continue,
                _ => {}
            }
            stack.extend(node.children.iter().rev().copied());
        }
        for hitbox in hitboxes {
            self.refresh_hitbox(hitbox);
        }
    }

    /// Allocate a detached node in a free or new slot.
    fn alloc(&mut self, node_type: NodeType) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, node_type));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, node_type)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new((self.nodes.len() - 1) as u32, generation)
        }
    }

    /// Access a node; panics if `id` is stale.
    #[track_caller]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.get(id).expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    #[track_caller]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.node_opt_mut(id).expect("dangling NodeId")
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        self.node_mut(parent).children.push(id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        self.node_mut(id).parent = None;
    }

    /// Nearest proper ancestor of type `node_type`.
    fn nearest_ancestor(&self, id: NodeId, node_type: NodeType) -> Option<NodeId> {
        let mut current = self.node(id).parent;
        while let Some(ancestor) = current {
            let node = self.node(ancestor);
            if node.node_type() == node_type {
                return Some(ancestor);
            }
            current = node.parent;
        }
        None
    }

    fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Reversed so siblings come out in child order.
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }
}

#[derive(Clone, Copy, Debug)]
enum TransformWrite {
    Position,
    Rotation,
    Scale,
}
