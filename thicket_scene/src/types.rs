// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: node handles, type tags, flags, and appearance values.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ops::Mul;
use core::sync::atomic::{AtomicU32, Ordering};

use kurbo::{Rect, Vec2};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Maximum number of views a node can be drawn into.
pub const MAX_VIEWS: usize = 32;

/// Non-owning handle of a node (generational).
///
/// A `NodeId` stays valid until the node is freed, either by [`Scene::reap`] or
/// [`Scene::destroy`]. Afterwards the slot may be reused with a bumped generation,
/// so a stale handle never aliases a newer node.
///
/// [`Scene::reap`]: crate::Scene::reap
/// [`Scene::destroy`]: crate::Scene::destroy
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a [`Scene`](crate::Scene), used to reject owners handed to the wrong scene.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct SceneId(u32);

impl SceneId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Nodes whose owner was dropped while still holding them.
pub(crate) type OrphanQueue = Rc<RefCell<Vec<NodeId>>>;

/// Owning handle of a detached node.
///
/// Returned by [`Scene::create`](crate::Scene::create). It is the only way to
/// attach a node: [`Scene::add_child`](crate::Scene::add_child) moves ownership
/// to the new parent and leaves this handle empty. A detached node should be
/// handed back to [`Scene::destroy`](crate::Scene::destroy). Dropping a non-empty
/// owner queues its node, and the scene frees it with its subtree on the next
/// [`Scene::create`](crate::Scene::create) or [`Scene::reap`](crate::Scene::reap).
#[must_use = "a detached node is freed once its owner is destroyed or dropped"]
pub struct NodeOwner {
    pub(crate) scene: SceneId,
    pub(crate) node: Option<NodeId>,
    orphans: OrphanQueue,
}

impl core::fmt::Debug for NodeOwner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeOwner")
            .field("scene", &self.scene)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl NodeOwner {
    pub(crate) fn new(scene: SceneId, node: NodeId, orphans: OrphanQueue) -> Self {
        Self {
            scene,
            node: Some(node),
            orphans,
        }
    }

    /// The owned node, or `None` once ownership was transferred.
    pub fn id(&self) -> Option<NodeId> {
        self.node
    }

    /// Whether ownership was already transferred.
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }
}

impl Drop for NodeOwner {
    fn drop(&mut self) {
        if let Some(id) = self.node.take() {
            self.orphans.borrow_mut().push(id);
        }
    }
}

/// Type tag of a node, fixed at construction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum NodeType {
    /// Plain node with no behavioral facet.
    #[default]
    Basic,
    /// Simulation container (physics space).
    Space,
    /// Physics body living inside a space.
    Body,
    /// Collision shape attached to an ancestor body.
    Hitbox,
    /// Text node.
    Text,
}

bitflags::bitflags! {
    /// Node flags controlling visibility and spatial indexing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is drawn.
        const VISIBLE   = 0b0000_0001;
        /// Node participates in spatial queries while it is in the tree.
        const INDEXABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::INDEXABLE
    }
}

bitflags::bitflags! {
    /// Bookkeeping flags the scene maintains on its own.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub(crate) struct State: u8 {
        /// Topmost ancestor is the scene root.
        const IN_TREE  = 0b0000_0001;
        /// `start_tracking` was issued and not yet matched by `stop_tracking`.
        const TRACKED  = 0b0000_0010;
        /// Mark phase ran; waiting to be reaped.
        const MARKED   = 0b0000_0100;
        /// Shape follows the sprite's frame size.
        const AUTO_SHAPE = 0b0000_1000;
    }
}

/// RGBA color multiplier.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Color {
    /// Opaque white, the neutral multiplier.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a color from its components.
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Mul for Color {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.r * rhs.r,
            self.g * rhs.g,
            self.b * rhs.b,
            self.a * rhs.a,
        )
    }
}

/// Which point of a shape's bounding box lands on the node's origin.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Alignment {
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Middle of the top edge.
    Top,
    /// Top-right corner.
    TopRight,
    /// Middle of the left edge.
    Left,
    /// Center of the box.
    Center,
    /// Middle of the right edge.
    Right,
    /// Bottom-left corner.
    BottomLeft,
    /// Middle of the bottom edge.
    Bottom,
    /// Bottom-right corner.
    BottomRight,
}

impl Alignment {
    /// Offset that moves the aligned point of `bbox` onto the origin.
    ///
    /// The y axis points down, so "top" is `bbox.y0`.
    pub fn realignment(self, bbox: Rect) -> Vec2 {
        let x = match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => -bbox.x0,
            Self::TopRight | Self::Right | Self::BottomRight => -bbox.x1,
            Self::Top | Self::Center | Self::Bottom => -(bbox.x0 + bbox.x1) * 0.5,
        };
        let y = match self {
            Self::TopLeft | Self::Top | Self::TopRight => -bbox.y0,
            Self::BottomLeft | Self::Bottom | Self::BottomRight => -bbox.y1,
            Self::Left | Self::Center | Self::Right => -(bbox.y0 + bbox.y1) * 0.5,
        };
        Vec2::new(x, y)
    }
}

/// Set of view indices a node is drawn into, each in `0..MAX_VIEWS`.
///
/// Indices are kept sorted and deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ViewIndexSet(SmallVec<[i16; 4]>);

impl ViewIndexSet {
    /// Build a set from arbitrary indices.
    ///
    /// Fails with [`Error::InvalidOperation`] if any index lies outside
    /// `0..MAX_VIEWS`.
    pub fn new<I: IntoIterator<Item = i16>>(indices: I) -> Result<Self> {
        let mut views = SmallVec::<[i16; 4]>::new();
        for view in indices {
            if !usize::try_from(view).is_ok_and(|v| v < MAX_VIEWS) {
                return Err(Error::InvalidOperation("view index out of range"));
            }
            views.push(view);
        }
        views.sort_unstable();
        views.dedup();
        Ok(Self(views))
    }

    /// A set holding exactly one view.
    pub fn single(view: i16) -> Self {
        let mut views = SmallVec::new();
        views.push(view);
        Self(views)
    }

    /// Whether `view` is part of the set.
    pub fn contains(&self, view: i16) -> bool {
        self.0.binary_search(&view).is_ok()
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate views in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i16> + '_ {
        self.0.iter().copied()
    }

    /// Views as a sorted slice.
    pub fn as_slice(&self) -> &[i16] {
        &self.0
    }
}
