// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported to callers of the scene API.

use crate::types::NodeId;

/// Caller misuse detected by the scene.
///
/// Broken internal invariants (deleting a node outside the tree, reading a facet
/// that does not match the node type) are not represented here; they panic.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Error {
    /// The operation is not allowed in the current state.
    #[cfg_attr(feature = "std", error("invalid operation: {0}"))]
    InvalidOperation(&'static str),
    /// The given node is not an ancestor of the target node.
    #[cfg_attr(feature = "std", error("node is not an ancestor of the target node"))]
    InvalidRelation,
    /// The handle refers to a node that was already freed.
    #[cfg_attr(feature = "std", error("stale node handle {0:?}"))]
    StaleNode(NodeId),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
