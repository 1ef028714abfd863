// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty marking and lazy recomputation of derived node state.
//!
//! Marks walk down the tree and stop at nodes that are already dirty: a dirty
//! node's descendants are dirty too. Reads walk up only as far as the first
//! clean ancestor and recompute on the way back down.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect, Vec2};

use super::Scene;
use crate::collab::{Simulation, SpatialIndex};
use crate::error::{Error, Result};
use crate::math::{compose_local, decompose};
use crate::node::{Cached, OrderingData, RenderData};
use crate::shape::bounding_rect;
use crate::sprite::Sprite;
use crate::types::NodeId;

impl<I: SpatialIndex, P: Simulation> Scene<I, P> {
    /// Invalidate world transform, render, and spatial caches of `id` and its descendants.
    pub(crate) fn mark_transform_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            node.world.dirty = true;
            node.render.dirty = true;
            node.spatial.dirty = true;
            for i in 0..self.node(id).children.len() {
                let child = self.node(id).children[i];
                if !self.node(child).world.dirty {
                    stack.push(child);
                }
            }
        }
    }

    /// Invalidate resolved ordering of `id` and its descendants.
    pub(crate) fn mark_ordering_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            self.node_mut(id).ordering.dirty = true;
            for i in 0..self.node(id).children.len() {
                let child = self.node(id).children[i];
                if !self.node(child).ordering.dirty {
                    stack.push(child);
                }
            }
        }
    }

    /// Bring the world transform of `id` up to date and return it.
    pub(crate) fn refresh_world_transform(&mut self, id: NodeId) -> Affine {
        let mut chain = Vec::new();
        let mut base = Affine::IDENTITY;
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if !node.world.dirty {
                base = node.world.value;
                break;
            }
            chain.push(c);
            current = node.parent;
        }
        for c in chain.into_iter().rev() {
            let node = self.node_mut(c);
            base = compose_local(base, node.position, node.rotation, node.scale);
            node.world = Cached {
                value: base,
                dirty: false,
            };
        }
        base
    }

    /// Transform of `id` relative to `ancestor`, composed along the chain between
    /// them without touching any cache.
    pub(crate) fn chain_transform(&self, id: NodeId, ancestor: NodeId) -> Result<Affine> {
        let mut chain = Vec::new();
        let mut current = id;
        while current != ancestor {
            chain.push(current);
            current = self.node(current).parent.ok_or(Error::InvalidRelation)?;
        }
        Ok(chain.into_iter().rev().fold(Affine::IDENTITY, |acc, c| {
            let node = self.node(c);
            compose_local(acc, node.position, node.rotation, node.scale)
        }))
    }

    fn refresh_ordering(&mut self, id: NodeId) {
        let mut chain = Vec::new();
        let mut inherited = None;
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if !node.ordering.dirty {
                inherited = Some(node.ordering.value.clone());
                break;
            }
            chain.push(c);
            if node.z_index.is_some() && node.views.is_some() {
                break;
            }
            current = node.parent;
        }
        let mut inherited = inherited.unwrap_or_else(|| OrderingData {
            z_index: self.config.default_z_index,
            views: self.config.default_views.clone(),
        });
        for c in chain.into_iter().rev() {
            let node = self.node_mut(c);
            let resolved = OrderingData {
                z_index: node.z_index.unwrap_or(inherited.z_index),
                views: node.views.clone().unwrap_or(inherited.views),
            };
            node.ordering = Cached {
                value: resolved.clone(),
                dirty: false,
            };
            inherited = resolved;
        }
    }

    /// World transform of a node, or `None` for stale ids.
    ///
    /// Parentless nodes (the root and detached subtree tops) compose onto the identity.
    pub fn absolute_transformation(&mut self, id: NodeId) -> Option<Affine> {
        self.is_alive(id).then(|| self.refresh_world_transform(id))
    }

    /// World position of a node's origin.
    pub fn absolute_position(&mut self, id: NodeId) -> Option<Point> {
        self.absolute_transformation(id).map(|m| m.translation().to_point())
    }

    /// World rotation of a node, in `(-π, π]`.
    pub fn absolute_rotation(&mut self, id: NodeId) -> Option<f64> {
        self.absolute_transformation(id).map(|m| decompose(m).rotation)
    }

    /// World scale of a node.
    pub fn absolute_scale(&mut self, id: NodeId) -> Option<Vec2> {
        self.absolute_transformation(id).map(|m| decompose(m).scale)
    }

    /// Local transform of a node: its position, rotation, and scale relative to the parent.
    pub fn transformation(&self, id: NodeId) -> Option<Affine> {
        self.get(id)
            .map(|n| compose_local(Affine::IDENTITY, n.position, n.rotation, n.scale))
    }

    /// Transform of `id` relative to `ancestor`.
    ///
    /// `None` gives the world transform, `id` itself the identity, and the parent
    /// the local transform. Fails with [`Error::InvalidRelation`] if `ancestor`
    /// is not on the ancestor chain of `id`.
    pub fn relative_transformation(
        &mut self,
        id: NodeId,
        ancestor: Option<NodeId>,
    ) -> Result<Affine> {
        if !self.is_alive(id) {
            return Err(Error::StaleNode(id));
        }
        match ancestor {
            None => Ok(self.refresh_world_transform(id)),
            Some(a) if !self.is_alive(a) => Err(Error::StaleNode(a)),
            Some(a) => self.chain_transform(id, a),
        }
    }

    /// Position of `id` relative to `ancestor`. See [`Scene::relative_transformation`].
    pub fn relative_position(&mut self, id: NodeId, ancestor: Option<NodeId>) -> Result<Point> {
        self.relative_transformation(id, ancestor)
            .map(|m| m.translation().to_point())
    }

    /// Resolved z-index and views of a node, or `None` for stale ids.
    pub fn ordering(&mut self, id: NodeId) -> Option<&OrderingData> {
        if !self.is_alive(id) {
            return None;
        }
        if self.node(id).ordering.dirty {
            self.refresh_ordering(id);
        }
        Some(&self.node(id).ordering.value)
    }

    /// World-space render geometry of a node, or `None` for stale ids.
    ///
    /// Nodes without a shape produce no vertices.
    pub fn render_data(&mut self, id: NodeId) -> Option<&RenderData> {
        if !self.is_alive(id) {
            return None;
        }
        if self.node(id).render.dirty {
            let world = self.refresh_world_transform(id);
            let default_texture = self.config.default_texture;
            let node = self.node_mut(id);
            let realignment = node.realignment();
            let frame = node.sprite.display_rect();
            let color = node.color;
            let vertices = node.shape.as_ref().map_or_else(Vec::new, |shape| {
                shape
                    .vertices()
                    .iter()
                    .map(|v| {
                        let mut out = *v;
                        out.position = world * (v.position + realignment);
                        if let Some((top_left, bottom_right)) = frame {
                            out.uv = Sprite::remap_uv(top_left, bottom_right, v.uv);
                        }
                        out.color = v.color * color;
                        out
                    })
                    .collect()
            });
            let texture = node
                .sprite
                .texture()
                .map_or(default_texture, |t| t.handle);
            node.render = Cached {
                value: RenderData { vertices, texture },
                dirty: false,
            };
        }
        Some(&self.node(id).render.value)
    }

    /// World-space axis-aligned bounding box of a node's shape.
    ///
    /// A node without a shape reports a zero-sized box at its absolute position.
    pub fn bounding_box(&mut self, id: NodeId) -> Option<Rect> {
        if !self.is_alive(id) {
            return None;
        }
        if self.node(id).spatial.dirty {
            let world = self.refresh_world_transform(id);
            let node = self.node_mut(id);
            let bbox = match &node.shape {
                Some(shape) if !shape.points().is_empty() => {
                    let realignment = node.realignment();
                    let points: Vec<Point> = shape
                        .points()
                        .iter()
                        .map(|&p| world * (p + realignment))
                        .collect();
                    bounding_rect(&points)
                }
                _ => {
                    let origin = world.translation().to_point();
                    Rect::from_points(origin, origin)
                }
            };
            node.spatial = Cached {
                value: bbox,
                dirty: false,
            };
        }
        Some(self.node(id).spatial.value)
    }

    /// Recompute every cache of every node in the tree, parents first.
    ///
    /// Running it twice in a row does no work the second time.
    pub fn refresh_all(&mut self) {
        for id in self.preorder(self.root) {
            self.refresh_world_transform(id);
            let _ = self.ordering(id);
            let _ = self.render_data(id);
            let _ = self.bounding_box(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::FRAC_PI_2;

    use kurbo::Size;

    use super::*;
    use crate::config::SceneConfig;
    use crate::math::assert_affine_close;
    use crate::shape::Shape;
    use crate::sprite::{Texture, TextureHandle};
    use crate::testing::assert_point_close;
    use crate::types::{Alignment, Color, NodeType, ViewIndexSet};

    fn attach(scene: &mut Scene, parent: NodeId) -> NodeId {
        let mut owner = scene.create(NodeType::Basic);
        scene.add_child(parent, &mut owner).unwrap()
    }

    #[test]
    fn child_position_composes_with_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let p = attach(&mut scene, root);
        let c = attach(&mut scene, p);
        scene.set_position(p, Point::new(3.0, 3.0));
        scene.set_position(c, Point::new(1.0, 0.0));
        assert_eq!(scene.absolute_position(c), Some(Point::new(4.0, 3.0)));
    }

    #[test]
    fn world_transform_follows_composition_law() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        let c = attach(&mut scene, b);
        scene.set_position(a, Point::new(10.0, -4.0));
        scene.set_rotation(a, 0.7);
        scene.set_scale(a, Vec2::new(2.0, 0.5));
        scene.set_position(b, Point::new(1.0, 2.0));
        scene.set_rotation(b, -1.2);
        scene.set_position(c, Point::new(-3.0, 0.25));
        scene.set_scale(c, Vec2::new(1.5, 1.5));

        for (parent, child) in [(root, a), (a, b), (b, c)] {
            let parent_world = scene.absolute_transformation(parent).unwrap();
            let n = scene.get(child).unwrap();
            let expected = compose_local(parent_world, n.position(), n.rotation(), n.scale());
            assert_affine_close(scene.absolute_transformation(child).unwrap(), expected);
        }
    }

    #[test]
    fn parent_move_invalidates_descendants_only_once() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        let c = attach(&mut scene, b);
        let _ = scene.absolute_transformation(c);
        assert!(!scene.get(c).unwrap().dirty().transform, "fresh after read");

        scene.set_position(a, Point::new(1.0, 0.0));
        for n in [a, b, c] {
            assert!(scene.get(n).unwrap().dirty().transform, "{n:?} must be invalidated");
        }
        // Reading the middle node refreshes it and its ancestors, not its child.
        let _ = scene.absolute_transformation(b);
        assert!(!scene.get(a).unwrap().dirty().transform, "ancestor refreshed");
        assert!(scene.get(c).unwrap().dirty().transform, "descendant left dirty");
        assert_eq!(scene.absolute_position(c), Some(Point::new(1.0, 0.0)));
    }

    #[test]
    fn rotated_parent_moves_child() {
        let mut scene = Scene::new();
        let root = scene.root();
        let p = attach(&mut scene, root);
        let c = attach(&mut scene, p);
        scene.set_rotation(p, FRAC_PI_2);
        scene.set_position(c, Point::new(2.0, 0.0));
        assert_point_close(scene.absolute_position(c).unwrap(), Point::new(0.0, 2.0));
        assert!((scene.absolute_rotation(c).unwrap() - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn relative_transformation_checks_ancestry() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        let sibling = attach(&mut scene, root);
        scene.set_position(a, Point::new(5.0, 0.0));
        scene.set_position(b, Point::new(0.0, 2.0));

        assert_eq!(scene.relative_transformation(b, Some(b)), Ok(Affine::IDENTITY));
        assert_eq!(scene.relative_position(b, Some(a)), Ok(Point::new(0.0, 2.0)));
        assert_eq!(scene.relative_position(b, Some(root)), Ok(Point::new(5.0, 2.0)));
        assert_eq!(scene.relative_position(b, None), Ok(Point::new(5.0, 2.0)));
        assert_eq!(
            scene.relative_transformation(b, Some(sibling)),
            Err(Error::InvalidRelation)
        );
        assert_eq!(
            scene.relative_transformation(a, Some(b)),
            Err(Error::InvalidRelation),
            "a descendant is not an ancestor"
        );
    }

    #[test]
    fn relative_transformation_leaves_caches_alone() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        scene.set_position(a, Point::new(1.0, 1.0));
        let _ = scene.relative_transformation(a, Some(root));
        assert!(scene.get(a).unwrap().dirty().transform, "chain mode does not cache");
    }

    #[test]
    fn z_index_is_inherited_until_cleared() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        scene.set_z_index(a, Some(5));
        assert_eq!(scene.ordering(b).unwrap().z_index, 5);
        scene.set_z_index(a, None);
        assert_eq!(scene.ordering(b).unwrap().z_index, 0);
    }

    #[test]
    fn views_and_z_resolve_independently() {
        let config = SceneConfig {
            default_z_index: -1,
            default_views: ViewIndexSet::single(3),
            ..SceneConfig::default()
        };
        let mut scene = Scene::with_config(config);
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        let c = attach(&mut scene, b);
        scene.set_views(a, Some(&[1, 2])).unwrap();
        scene.set_z_index(b, Some(7));

        let resolved = scene.ordering(c).unwrap().clone();
        assert_eq!(resolved.z_index, 7);
        assert_eq!(resolved.views.as_slice(), &[1, 2]);
        let resolved = scene.ordering(a).unwrap().clone();
        assert_eq!(resolved.z_index, -1, "root default");
        assert_eq!(resolved.views.as_slice(), &[1, 2]);

        scene.set_views(a, None).unwrap();
        assert_eq!(scene.ordering(c).unwrap().views.as_slice(), &[3]);
    }

    #[test]
    fn recompute_pass_is_idempotent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        scene.set_shape(b, Some(Shape::rect(Size::new(2.0, 2.0))));
        scene.set_rotation(a, 0.4);
        scene.set_z_index(a, Some(2));
        scene.refresh_all();

        let snapshot = |scene: &mut Scene| {
            (
                scene.absolute_transformation(b),
                scene.render_data(b).cloned(),
                scene.ordering(b).cloned(),
                scene.bounding_box(b),
            )
        };
        let before = snapshot(&mut scene);
        for n in [root, a, b] {
            assert!(scene.get(n).unwrap().dirty().is_clean(), "{n:?} clean after refresh");
        }
        scene.refresh_all();
        for n in [root, a, b] {
            assert!(scene.get(n).unwrap().dirty().is_clean(), "{n:?} still clean");
        }
        assert_eq!(snapshot(&mut scene), before);
    }

    #[test]
    fn appearance_changes_do_not_propagate() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        let b = attach(&mut scene, a);
        scene.refresh_all();
        scene.set_color(a, Color::new(0.5, 0.5, 0.5, 1.0));
        scene.set_shape(a, Some(Shape::rect(Size::new(1.0, 1.0))));
        assert!(scene.get(a).unwrap().dirty().render, "own render invalidated");
        assert!(
            scene.get(b).unwrap().dirty().is_clean(),
            "children keep their caches"
        );
    }

    #[test]
    fn showing_a_node_invalidates_its_transform() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attach(&mut scene, root);
        scene.refresh_all();
        scene.set_visible(a, false);
        assert!(!scene.get(a).unwrap().dirty().transform, "hiding is free");
        scene.set_visible(a, true);
        assert!(scene.get(a).unwrap().dirty().transform, "showing refreshes");
    }

    #[test]
    fn render_data_applies_transform_uv_and_color() {
        let mut scene = Scene::new();
        let root = scene.root();
        let n = attach(&mut scene, root);
        let texture = Texture {
            handle: TextureHandle(9),
            size: Size::new(4.0, 4.0),
        };
        scene.set_sprite(n, Sprite::new(texture).crop(Rect::new(0.0, 0.0, 2.0, 4.0)));
        scene.set_position(n, Point::new(10.0, 20.0));
        scene.set_color(n, Color::new(0.5, 1.0, 1.0, 0.25));

        let data = scene.render_data(n).unwrap().clone();
        assert_eq!(data.texture, TextureHandle(9));
        // Auto-shape box of 2x4, aligned top-left onto the origin.
        let first = data.vertices[0];
        assert_eq!(first.position, Point::new(10.0, 20.0));
        assert_eq!(data.vertices[2].position, Point::new(12.0, 24.0));
        assert_eq!(data.vertices[2].uv, Point::new(0.5, 1.0));
        assert_eq!(first.color, Color::new(0.5, 1.0, 1.0, 0.25));
    }

    #[test]
    fn untextured_render_data_binds_default_texture() {
        let config = SceneConfig {
            default_texture: TextureHandle(42),
            ..SceneConfig::default()
        };
        let mut scene = Scene::with_config(config);
        let root = scene.root();
        let n = attach(&mut scene, root);
        assert!(scene.render_data(n).unwrap().vertices.is_empty(), "no shape");

        scene.set_shape(n, Some(Shape::rect(Size::new(2.0, 2.0))));
        scene.set_origin_alignment(n, Alignment::Center);
        let data = scene.render_data(n).unwrap();
        assert_eq!(data.texture, TextureHandle(42));
        assert_eq!(data.vertices[0].position, Point::new(-1.0, -1.0));
        assert_eq!(data.vertices[0].uv, Point::new(0.0, 0.0), "uv unchanged");
    }

    #[test]
    fn bounding_box_tracks_shape_and_transform() {
        let mut scene = Scene::new();
        let root = scene.root();
        let n = attach(&mut scene, root);
        scene.set_position(n, Point::new(3.0, 4.0));
        assert_eq!(
            scene.bounding_box(n),
            Some(Rect::new(3.0, 4.0, 3.0, 4.0)),
            "no shape: degenerate box at the origin"
        );

        scene.set_shape(n, Some(Shape::rect(Size::new(2.0, 6.0))));
        assert_eq!(scene.bounding_box(n), Some(Rect::new(3.0, 4.0, 5.0, 10.0)));

        scene.set_scale(n, Vec2::new(2.0, 1.0));
        assert_eq!(scene.bounding_box(n), Some(Rect::new(3.0, 4.0, 7.0, 10.0)));
    }

    #[test]
    fn detached_nodes_compose_onto_identity() {
        let mut scene = Scene::new();
        let owner = scene.create(NodeType::Basic);
        let id = owner.id().unwrap();
        scene.set_position(id, Point::new(2.0, 1.0));
        assert_eq!(scene.absolute_position(id), Some(Point::new(2.0, 1.0)));
        assert_eq!(scene.ordering(id).unwrap().z_index, 0);
        scene.destroy(owner).unwrap();
        assert_eq!(scene.absolute_position(id), None);
    }
}
