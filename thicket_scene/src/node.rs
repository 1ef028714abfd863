// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node entity: local inputs, cached derived state, and tree linkage.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::{Affine, Point, Rect, Vec2};

use crate::facet::{BodyFacet, Facet, HitboxFacet, SpaceFacet, TextFacet};
use crate::listener::NodeListener;
use crate::shape::{Shape, Vertex};
use crate::sprite::{Sprite, TextureHandle};
use crate::types::{Alignment, Color, NodeFlags, NodeId, NodeType, State, ViewIndexSet};

/// A computed value together with its invalidation flag.
#[derive(Clone, Debug)]
pub(crate) struct Cached<T> {
    pub(crate) value: T,
    pub(crate) dirty: bool,
}

impl<T: Default> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            dirty: true,
        }
    }
}

/// Render geometry of a node: world-space vertices and the texture to draw them with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderData {
    /// Vertices after realignment, world transform, sprite UV remapping, and color.
    pub vertices: Vec<Vertex>,
    /// Sprite texture, or the scene's default texture.
    pub texture: TextureHandle,
}

/// Draw ordering after inheritance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderingData {
    /// Resolved z-index.
    pub z_index: i16,
    /// Resolved views.
    pub views: ViewIndexSet,
}

/// Snapshot of a node's invalidation flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dirty {
    /// World transform needs recomputing.
    pub transform: bool,
    /// Render geometry needs recomputing.
    pub render: bool,
    /// Resolved ordering needs recomputing.
    pub ordering: bool,
    /// World bounding box needs recomputing.
    pub spatial: bool,
}

impl Dirty {
    /// Whether every cache is fresh.
    pub fn is_clean(self) -> bool {
        !(self.transform || self.render || self.ordering || self.spatial)
    }
}

/// A scene node.
///
/// Read access goes through [`Scene::get`](crate::Scene::get); every mutation
/// goes through the [`Scene`](crate::Scene) so caches and collaborators stay in sync.
pub struct Node {
    pub(crate) generation: u32,
    node_type: NodeType,

    pub(crate) position: Point,
    pub(crate) rotation: f64,
    pub(crate) scale: Vec2,

    pub(crate) shape: Option<Shape>,
    pub(crate) sprite: Sprite,
    pub(crate) color: Color,
    pub(crate) alignment: Alignment,
    pub(crate) flags: NodeFlags,

    pub(crate) z_index: Option<i16>,
    pub(crate) views: Option<ViewIndexSet>,
    pub(crate) lifetime: Option<Duration>,

    pub(crate) state: State,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    pub(crate) facet: Facet,
    pub(crate) listener: Option<Box<dyn NodeListener>>,

    pub(crate) world: Cached<Affine>,
    pub(crate) render: Cached<RenderData>,
    pub(crate) ordering: Cached<OrderingData>,
    pub(crate) spatial: Cached<Rect>,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.node_type)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("state", &self.state)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl Node {
    pub(crate) fn new(generation: u32, node_type: NodeType) -> Self {
        let color = match node_type {
            NodeType::Hitbox => Color::new(1.0, 0.0, 0.0, 0.0),
            _ => Color::WHITE,
        };
        let alignment = match node_type {
            NodeType::Text => Alignment::Center,
            _ => Alignment::TopLeft,
        };
        Self {
            generation,
            node_type,
            position: Point::ZERO,
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            shape: None,
            sprite: Sprite::default(),
            color,
            alignment,
            flags: NodeFlags::default(),
            z_index: None,
            views: None,
            lifetime: None,
            state: State::AUTO_SHAPE,
            parent: None,
            children: Vec::new(),
            facet: Facet::new(node_type),
            listener: None,
            world: Cached {
                value: Affine::IDENTITY,
                dirty: true,
            },
            render: Cached::default(),
            ordering: Cached::default(),
            spatial: Cached::default(),
        }
    }

    /// Type tag fixed at construction.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Position relative to the parent.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Rotation relative to the parent, in `(-π, π]`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Scale relative to the parent.
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Local geometry, if any.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Displayed sprite.
    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    /// Color multiplier.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Origin alignment of the shape.
    pub fn origin_alignment(&self) -> Alignment {
        self.alignment
    }

    /// Visibility and indexing flags.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node is drawn.
    pub fn visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// Whether the node participates in spatial queries.
    pub fn indexable(&self) -> bool {
        self.flags.contains(NodeFlags::INDEXABLE)
    }

    /// Whether the shape follows the sprite's frame size.
    pub fn auto_shape(&self) -> bool {
        self.state.contains(State::AUTO_SHAPE)
    }

    /// Own z-index override.
    pub fn z_index(&self) -> Option<i16> {
        self.z_index
    }

    /// Own views override.
    pub fn views(&self) -> Option<&ViewIndexSet> {
        self.views.as_ref()
    }

    /// Time left before [`Scene::update`](crate::Scene::update) deletes the node.
    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    /// Parent, or `None` for the root and for detached subtree tops.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw/update order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the topmost ancestor is the scene root.
    pub fn in_tree(&self) -> bool {
        self.state.contains(State::IN_TREE)
    }

    /// Whether the node was deleted and waits to be reaped.
    pub fn is_marked_to_delete(&self) -> bool {
        self.state.contains(State::MARKED)
    }

    /// Whether a listener is installed.
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Current invalidation flags.
    pub fn dirty(&self) -> Dirty {
        Dirty {
            transform: self.world.dirty,
            render: self.render.dirty,
            ordering: self.ordering.dirty,
            spatial: self.spatial.dirty,
        }
    }

    /// Behavioral facet.
    pub fn facet(&self) -> &Facet {
        &self.facet
    }

    /// Space facet.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Space`] node.
    pub fn space(&self) -> &SpaceFacet {
        match &self.facet {
            Facet::Space(space) => space,
            _ => facet_mismatch(self.node_type, NodeType::Space),
        }
    }

    /// Body facet.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Body`] node.
    pub fn body(&self) -> &BodyFacet {
        match &self.facet {
            Facet::Body(body) => body,
            _ => facet_mismatch(self.node_type, NodeType::Body),
        }
    }

    /// Hitbox facet.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Hitbox`] node.
    pub fn hitbox(&self) -> &HitboxFacet {
        match &self.facet {
            Facet::Hitbox(hitbox) => hitbox,
            _ => facet_mismatch(self.node_type, NodeType::Hitbox),
        }
    }

    /// Text facet.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a [`NodeType::Text`] node.
    pub fn text(&self) -> &TextFacet {
        match &self.facet {
            Facet::Text(text) => text,
            _ => facet_mismatch(self.node_type, NodeType::Text),
        }
    }

    pub(crate) fn space_mut(&mut self) -> &mut SpaceFacet {
        match &mut self.facet {
            Facet::Space(space) => space,
            _ => facet_mismatch(self.node_type, NodeType::Space),
        }
    }

    pub(crate) fn body_mut(&mut self) -> &mut BodyFacet {
        match &mut self.facet {
            Facet::Body(body) => body,
            _ => facet_mismatch(self.node_type, NodeType::Body),
        }
    }

    pub(crate) fn hitbox_mut(&mut self) -> &mut HitboxFacet {
        match &mut self.facet {
            Facet::Hitbox(hitbox) => hitbox,
            _ => facet_mismatch(self.node_type, NodeType::Hitbox),
        }
    }

    pub(crate) fn text_mut(&mut self) -> &mut TextFacet {
        match &mut self.facet {
            Facet::Text(text) => text,
            _ => facet_mismatch(self.node_type, NodeType::Text),
        }
    }

    /// Offset applied to the shape before the world transform.
    pub(crate) fn realignment(&self) -> Vec2 {
        self.shape
            .as_ref()
            .map_or(Vec2::ZERO, |shape| self.alignment.realignment(shape.vertices_bbox()))
    }
}

#[track_caller]
fn facet_mismatch(found: NodeType, expected: NodeType) -> ! {
    panic!("facet mismatch: expected a {expected:?} node, found {found:?}")
}
