// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node lifecycle: creation, attachment, two-phase deletion, and the
//! collaborator registrations that go with them.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::{Affine, Point};
use log::{debug, trace, warn};

use super::Scene;
use crate::collab::{BodyState, Simulation, SpatialIndex};
use crate::error::{Error, Result};
use crate::listener::NodeListener;
use crate::math::decompose;
use crate::types::{NodeFlags, NodeId, NodeOwner, NodeType, State};

#[derive(Clone, Copy, Debug)]
enum Hook {
    Attach,
    Detach,
    AddToParent,
}

impl<I: SpatialIndex, P: Simulation> Scene<I, P> {
    /// Create a detached node.
    ///
    /// The returned owner must be attached with [`Scene::add_child`] or handed
    /// back to [`Scene::destroy`].
    pub fn create(&mut self, node_type: NodeType) -> NodeOwner {
        self.free_orphans();
        let id = self.alloc(node_type);
        trace!("created {node_type:?} node {id:?}");
        NodeOwner::new(self.id, id, self.orphans.clone())
    }

    /// Attach the node held by `owner` as the last child of `parent`.
    ///
    /// Ownership moves to `parent` and `owner` is left empty. If `parent` is in
    /// the tree, the attached subtree is registered with the collaborators,
    /// parents before children.
    ///
    /// Fails with [`Error::InvalidOperation`] if `owner` is empty or comes from
    /// another scene, if `parent` is marked for deletion, or if `parent` lies
    /// inside the attached subtree; with [`Error::StaleNode`] if `parent` was freed.
    pub fn add_child(&mut self, parent: NodeId, owner: &mut NodeOwner) -> Result<NodeId> {
        let Some(child) = owner.node else {
            return Err(Error::InvalidOperation("owner is empty"));
        };
        if owner.scene != self.id {
            return Err(Error::InvalidOperation("node belongs to another scene"));
        }
        let parent_node = self.get(parent).ok_or(Error::StaleNode(parent))?;
        if parent_node.is_marked_to_delete() {
            return Err(Error::InvalidOperation("parent is marked for deletion"));
        }
        let child_node = self.get(child).ok_or(Error::StaleNode(child))?;
        if child_node.parent.is_some() {
            return Err(Error::InvalidOperation("node already has a parent"));
        }
        // A detached node cannot be an ancestor of a node in the tree.
        let mut current = (!parent_node.in_tree()).then_some(parent);
        while let Some(ancestor) = current {
            if ancestor == child {
                return Err(Error::InvalidOperation("parent lies inside the attached subtree"));
            }
            current = self.node(ancestor).parent;
        }

        owner.node = None;
        self.link_parent(child, parent);
        self.notify(child, Hook::AddToParent);
        self.mark_transform_dirty(child);
        self.mark_ordering_dirty(child);
        if self.node(parent).in_tree() {
            self.enter_tree(child);
        }
        debug!("attached {child:?} under {parent:?}");
        Ok(child)
    }

    /// Mark `id` and its subtree for deletion.
    ///
    /// Every marked node immediately stops being tracked by the spatial index
    /// and leaves the simulation. The memory is released later by [`Scene::reap`];
    /// until then the ids stay valid. Deleting a marked node again does nothing,
    /// and stale ids are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the node is not in the tree, or is the root.
    pub fn delete(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_marked_to_delete() {
            return;
        }
        assert!(node.in_tree(), "deleted node must be in the tree");
        assert!(!self.is_root(id), "the scene root cannot be deleted");

        let mut marked = Vec::new();
        for n in self.preorder(id) {
            let node = self.node_mut(n);
            if node.state.contains(State::MARKED) {
                continue;
            }
            node.state.insert(State::MARKED);
            self.notify(n, Hook::Detach);
            let node = self.node_mut(n);
            if node.state.contains(State::TRACKED) {
                node.state.remove(State::TRACKED);
                self.spatial_index.stop_tracking(n);
                trace!("stopped tracking {n:?}");
            }
            marked.push(n);
        }
        // Children leave the simulation before their containers.
        for &n in marked.iter().rev() {
            self.release_facet(n);
        }
        self.pending_reap.push(id);
        debug!("marked {} node(s) under {id:?} for deletion", marked.len());
    }

    /// Free every subtree marked by [`Scene::delete`] since the last call.
    ///
    /// Each subtree is unlinked from its parent and freed children first.
    /// Nodes of dropped, non-empty owners are freed too. Returns the number of
    /// nodes freed.
    pub fn reap(&mut self) -> usize {
        let pending = core::mem::take(&mut self.pending_reap);
        let mut freed = self.free_orphans();
        for top in pending {
            // Already freed along with a marked ancestor.
            if !self.is_alive(top) {
                continue;
            }
            if let Some(parent) = self.node(top).parent {
                self.unlink_parent(top, parent);
            }
            freed += self.free_subtree(top);
        }
        if freed > 0 {
            debug!("reaped {freed} node(s)");
        }
        freed
    }

    /// Destroy a node that was never attached, together with its subtree.
    ///
    /// Detached nodes are never registered with the collaborators, so none are
    /// called. An empty owner is accepted and ignored.
    pub fn destroy(&mut self, mut owner: NodeOwner) -> Result<()> {
        let Some(id) = owner.node else {
            return Ok(());
        };
        if owner.scene != self.id {
            return Err(Error::InvalidOperation("node belongs to another scene"));
        }
        owner.node = None;
        if !self.is_alive(id) {
            return Err(Error::StaleNode(id));
        }
        let freed = self.free_subtree(id);
        debug!("destroyed {freed} detached node(s) under {id:?}");
        Ok(())
    }

    /// Advance node lifetimes by `dt`, delete the nodes whose lifetime ran out,
    /// and reap.
    ///
    /// Only nodes in the tree age, and the root never expires. Returns the
    /// number of nodes freed.
    pub fn update(&mut self, dt: Duration) -> usize {
        let mut expired = Vec::new();
        // The root comes first and never expires.
        for id in self.preorder(self.root).into_iter().skip(1) {
            let node = self.node_mut(id);
            if node.is_marked_to_delete() {
                continue;
            }
            let Some(lifetime) = node.lifetime.as_mut() else {
                continue;
            };
            *lifetime = lifetime.saturating_sub(dt);
            if lifetime.is_zero() {
                expired.push(id);
            }
        }
        if !expired.is_empty() {
            debug!("{} node(s) expired", expired.len());
        }
        for id in expired {
            self.delete(id);
        }
        self.reap()
    }

    /// Install the listener notified about `id`'s lifecycle.
    ///
    /// Fails with [`Error::InvalidOperation`] if one is already installed.
    pub fn set_listener(&mut self, id: NodeId, listener: Box<dyn NodeListener>) -> Result<()> {
        let node = self.node_opt_mut(id).ok_or(Error::StaleNode(id))?;
        if node.listener.is_some() {
            return Err(Error::InvalidOperation("node already has a listener"));
        }
        node.listener = Some(listener);
        Ok(())
    }

    /// Remove and return the listener of `id`.
    pub fn take_listener(&mut self, id: NodeId) -> Option<Box<dyn NodeListener>> {
        self.node_opt_mut(id)?.listener.take()
    }

    /// Recompute a hitbox's collision outline and push it to the simulation.
    ///
    /// Only hitboxes in the tree with an ancestor body that joined the simulation
    /// are updated.
    pub(crate) fn refresh_hitbox(&mut self, id: NodeId) {
        let node = self.node(id);
        if !node.in_tree() || node.is_marked_to_delete() {
            return;
        }
        let Some(body) = self.nearest_ancestor(id, NodeType::Body) else {
            return;
        };
        if self.node(body).body().space().is_none() {
            return;
        }
        let Ok(relative) = self.chain_transform(id, body) else {
            return;
        };
        let body_scale = decompose(self.refresh_world_transform(body)).scale;
        let to_body = Affine::scale_non_uniform(body_scale.x, body_scale.y) * relative;

        let node = self.node(id);
        let realignment = node.realignment();
        let points: Vec<Point> = node.shape.as_ref().map_or_else(Vec::new, |shape| {
            shape
                .points()
                .iter()
                .map(|&p| to_body * (p + realignment))
                .collect()
        });
        self.simulation.update_hitbox_shape(id, body, &points);
        trace!("hitbox {id:?} pushed {} point(s) to body {body:?}", points.len());
        let hitbox = self.node_mut(id).hitbox_mut();
        hitbox.body = Some(body);
        hitbox.collision_points = points;
    }

    /// Register a freshly attached subtree with the collaborators, parents first.
    fn enter_tree(&mut self, top: NodeId) {
        for id in self.preorder(top) {
            let node = self.node_mut(id);
            if node.state.contains(State::IN_TREE) {
                continue;
            }
            node.state.insert(State::IN_TREE);
            if node.flags.contains(NodeFlags::INDEXABLE) {
                node.state.insert(State::TRACKED);
                self.spatial_index.start_tracking(id);
                trace!("started tracking {id:?}");
            }
            self.notify(id, Hook::Attach);
            match self.node(id).node_type() {
                NodeType::Space => {
                    self.node_mut(id).space_mut().registered = true;
                    self.simulations.push(id);
                    self.simulation.register_container(id);
                    trace!("registered space {id:?}");
                }
                NodeType::Body => self.join_simulation(id),
                NodeType::Hitbox => self.refresh_hitbox(id),
                NodeType::Basic | NodeType::Text => {}
            }
        }
    }

    fn join_simulation(&mut self, body: NodeId) {
        let space = self.nearest_ancestor(body, NodeType::Space);
        let Some(space) = space.filter(|&s| self.node(s).space().is_registered()) else {
            warn!("body {body:?} has no space ancestor; it stays out of the simulation");
            return;
        };
        let node = self.node(body);
        let state = BodyState {
            position: node.position,
            rotation: node.rotation,
        };
        self.node_mut(body).body_mut().space = Some(space);
        self.simulation.attach_body(body, space, state);
        trace!("body {body:?} joined space {space:?}");
    }

    /// Sever a node's simulation registration, if any.
    fn release_facet(&mut self, id: NodeId) {
        match self.node(id).node_type() {
            NodeType::Body => {
                if self.node_mut(id).body_mut().space.take().is_some() {
                    self.simulation.detach_body(id);
                    trace!("detached body {id:?}");
                }
            }
            NodeType::Hitbox => {
                if self.node_mut(id).hitbox_mut().body.take().is_some() {
                    self.simulation.detach_hitbox(id);
                    trace!("detached hitbox {id:?}");
                }
            }
            NodeType::Space => {
                let space = self.node_mut(id).space_mut();
                if space.registered {
                    space.registered = false;
                    self.simulations.retain(|s| *s != id);
                    self.simulation.unregister_container(id);
                    trace!("unregistered space {id:?}");
                }
            }
            NodeType::Basic | NodeType::Text => {}
        }
    }

    /// Free the nodes of owners dropped while still holding them.
    fn free_orphans(&mut self) -> usize {
        let orphans = core::mem::take(&mut *self.orphans.borrow_mut());
        let mut freed = 0;
        for id in orphans {
            if self.is_alive(id) {
                freed += self.free_subtree(id);
            }
        }
        if freed > 0 {
            debug!("freed {freed} node(s) of dropped owners");
        }
        freed
    }

    /// Free `top` and its descendants, children first. Returns the number freed.
    fn free_subtree(&mut self, top: NodeId) -> usize {
        let order = self.preorder(top);
        for &id in order.iter().rev() {
            self.release_facet(id);
            self.nodes[id.idx()] = None;
            self.free_list.push(id.idx());
        }
        order.len()
    }

    fn notify(&mut self, id: NodeId, hook: Hook) {
        let Some(listener) = self.node_mut(id).listener.as_mut() else {
            return;
        };
        match hook {
            Hook::Attach => listener.on_attach(id),
            Hook::Detach => listener.on_detach(id),
            Hook::AddToParent => listener.on_add_to_parent(id),
        }
    }
}
