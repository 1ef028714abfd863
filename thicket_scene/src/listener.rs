// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle hooks for code embedding the scene.

use crate::types::NodeId;

/// Listener owned by a node and notified about its tree lifecycle.
///
/// Bridges to scripting layers or other extension code without the scene
/// knowing the concrete type. Each hook fires at most once per event and
/// only for nodes that have a listener installed.
pub trait NodeListener {
    /// The node entered the tree.
    fn on_attach(&mut self, node: NodeId) {
        let _ = node;
    }

    /// The node was marked for deletion and left the tree.
    fn on_detach(&mut self, node: NodeId) {
        let _ = node;
    }

    /// The node was given a parent.
    fn on_add_to_parent(&mut self, node: NodeId) {
        let _ = node;
    }
}
