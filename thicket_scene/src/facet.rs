// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-specific behavioral payloads of nodes.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;

use crate::types::{NodeId, NodeType};

/// Behavioral facet of a node. The active variant always matches the node's [`NodeType`].
#[derive(Clone, Debug, PartialEq)]
pub enum Facet {
    /// No facet.
    Basic,
    /// Simulation container.
    Space(SpaceFacet),
    /// Physics body.
    Body(BodyFacet),
    /// Collision hitbox.
    Hitbox(HitboxFacet),
    /// Text attributes.
    Text(TextFacet),
}

impl Facet {
    pub(crate) fn new(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Basic => Self::Basic,
            NodeType::Space => Self::Space(SpaceFacet::default()),
            NodeType::Body => Self::Body(BodyFacet::default()),
            NodeType::Hitbox => Self::Hitbox(HitboxFacet::default()),
            NodeType::Text => Self::Text(TextFacet::default()),
        }
    }

    /// Type tag matching the active variant.
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Basic => NodeType::Basic,
            Self::Space(_) => NodeType::Space,
            Self::Body(_) => NodeType::Body,
            Self::Hitbox(_) => NodeType::Hitbox,
            Self::Text(_) => NodeType::Text,
        }
    }
}

/// Simulation container state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpaceFacet {
    pub(crate) registered: bool,
}

impl SpaceFacet {
    /// Whether the container is registered with the scene and the simulation.
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

/// Physics body state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BodyFacet {
    pub(crate) space: Option<NodeId>,
}

impl BodyFacet {
    /// Container the body was attached to, while it is part of a simulation.
    pub fn space(&self) -> Option<NodeId> {
        self.space
    }
}

/// Collision hitbox state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitboxFacet {
    pub(crate) body: Option<NodeId>,
    pub(crate) collision_points: Vec<Point>,
}

impl HitboxFacet {
    /// Body the collision shape was last pushed to, while attached.
    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    /// Collision outline in the body's unscaled local space, scaled by the body's world scale.
    pub fn collision_points(&self) -> &[Point] {
        &self.collision_points
    }
}

/// Text attributes. Layout and glyph rendering belong to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct TextFacet {
    /// Displayed string.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
}

impl Default for TextFacet {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_size: 28.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_matches_type_tag() {
        for ty in [
            NodeType::Basic,
            NodeType::Space,
            NodeType::Body,
            NodeType::Hitbox,
            NodeType::Text,
        ] {
            assert_eq!(Facet::new(ty).node_type(), ty);
        }
    }
}
