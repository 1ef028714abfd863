// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-wide settings.

use crate::sprite::TextureHandle;
use crate::types::ViewIndexSet;

/// Scene-wide defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Z-index of nodes that inherit ordering all the way up to a parentless node.
    pub default_z_index: i16,
    /// Views of nodes that inherit ordering all the way up to a parentless node.
    pub default_views: ViewIndexSet,
    /// Texture bound when a node has no sprite texture.
    pub default_texture: TextureHandle,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_z_index: 0,
            default_views: ViewIndexSet::single(0),
            default_texture: TextureHandle(0),
        }
    }
}
