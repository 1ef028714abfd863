// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts of the subsystems the scene drives: spatial indexing and physics.
//!
//! The scene owns one instance of each and only ever touches the registration of
//! the node being processed. What the collaborators do with those calls (building
//! an acceleration structure, stepping a solver) is up to them.

use hashbrown::HashSet;
use kurbo::Point;

use crate::types::NodeId;

/// Spatial index fed with the indexable nodes of the tree.
pub trait SpatialIndex {
    /// An indexable node entered the tree.
    fn start_tracking(&mut self, node: NodeId);

    /// A tracked node left the tree or stopped being indexable.
    ///
    /// Must tolerate nodes that are not tracked.
    fn stop_tracking(&mut self, node: NodeId);
}

/// Index that ignores every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIndex;

impl SpatialIndex for NoIndex {
    fn start_tracking(&mut self, _node: NodeId) {}

    fn stop_tracking(&mut self, _node: NodeId) {}
}

/// Set of currently tracked nodes.
///
/// Higher layers query it for candidates and ask the scene for their
/// [`bounding_box`](crate::Scene::bounding_box).
#[derive(Clone, Debug, Default)]
pub struct TrackingSet {
    tracked: HashSet<NodeId>,
}

impl TrackingSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `node` is tracked.
    pub fn is_tracked(&self, node: NodeId) -> bool {
        self.tracked.contains(&node)
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Iterate tracked nodes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tracked.iter().copied()
    }
}

impl SpatialIndex for TrackingSet {
    fn start_tracking(&mut self, node: NodeId) {
        self.tracked.insert(node);
    }

    fn stop_tracking(&mut self, node: NodeId) {
        self.tracked.remove(&node);
    }
}

/// Initial state handed to the simulation when a body joins it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState {
    /// Position relative to the body's parent.
    pub position: Point,
    /// Rotation relative to the body's parent, normalized to `(-π, π]`.
    pub rotation: f64,
}

/// Physics simulation driven by space, body, and hitbox nodes.
///
/// State only flows from the scene into the simulation through this trait.
pub trait Simulation {
    /// A space node entered the tree and becomes a simulation root.
    fn register_container(&mut self, space: NodeId);

    /// A space node is being deleted.
    fn unregister_container(&mut self, space: NodeId);

    /// A body joins the simulation owned by `space`.
    fn attach_body(&mut self, body: NodeId, space: NodeId, state: BodyState);

    /// A body is being deleted. Called before the scene frees it.
    fn detach_body(&mut self, body: NodeId);

    /// The scene moved an attached body.
    fn override_position(&mut self, body: NodeId, position: Point);

    /// The scene rotated an attached body.
    fn override_rotation(&mut self, body: NodeId, rotation: f64);

    /// A hitbox's collision outline changed.
    ///
    /// `points` are expressed in `body`'s local space, scaled by the body's world scale.
    fn update_hitbox_shape(&mut self, hitbox: NodeId, body: NodeId, points: &[Point]);

    /// A hitbox is being deleted. Called before the scene frees it.
    fn detach_hitbox(&mut self, hitbox: NodeId);
}

/// Simulation that ignores every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSimulation;

impl Simulation for NoSimulation {
    fn register_container(&mut self, _space: NodeId) {}

    fn unregister_container(&mut self, _space: NodeId) {}

    fn attach_body(&mut self, _body: NodeId, _space: NodeId, _state: BodyState) {}

    fn detach_body(&mut self, _body: NodeId) {}

    fn override_position(&mut self, _body: NodeId, _position: Point) {}

    fn override_rotation(&mut self, _body: NodeId, _rotation: f64) {}

    fn update_hitbox_shape(&mut self, _hitbox: NodeId, _body: NodeId, _points: &[Point]) {}

    fn detach_hitbox(&mut self, _hitbox: NodeId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_tracking_is_idempotent() {
        let mut set = TrackingSet::new();
        let a = NodeId::new(1, 1);
        set.stop_tracking(a);
        assert!(set.is_empty(), "stopping an untracked node is a no-op");
        set.start_tracking(a);
        assert!(set.is_tracked(a), "tracked after start");
        set.stop_tracking(a);
        set.stop_tracking(a);
        assert_eq!(set.len(), 0);
    }
}
