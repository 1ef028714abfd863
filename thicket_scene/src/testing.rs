// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording collaborators for unit tests.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Point;

use crate::collab::{BodyState, Simulation, SpatialIndex};
use crate::config::SceneConfig;
use crate::listener::NodeListener;
use crate::scene::Scene;
use crate::types::NodeId;

/// One call made by the scene into a collaborator or listener.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Event {
    StartTracking(NodeId),
    StopTracking(NodeId),
    RegisterContainer(NodeId),
    UnregisterContainer(NodeId),
    AttachBody {
        body: NodeId,
        space: NodeId,
        state: BodyState,
    },
    DetachBody(NodeId),
    OverridePosition(NodeId, Point),
    OverrideRotation(NodeId, f64),
    UpdateHitboxShape {
        hitbox: NodeId,
        body: NodeId,
        points: Vec<Point>,
    },
    DetachHitbox(NodeId),
    Attach(NodeId),
    Detach(NodeId),
    AddToParent(NodeId),
}

/// Shared, ordered record of every call.
pub(crate) type Log = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Default)]
pub(crate) struct RecordingIndex(pub(crate) Log);

impl SpatialIndex for RecordingIndex {
    fn start_tracking(&mut self, node: NodeId) {
        self.0.borrow_mut().push(Event::StartTracking(node));
    }

    fn stop_tracking(&mut self, node: NodeId) {
        self.0.borrow_mut().push(Event::StopTracking(node));
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSimulation(pub(crate) Log);

impl Simulation for RecordingSimulation {
    fn register_container(&mut self, space: NodeId) {
        self.0.borrow_mut().push(Event::RegisterContainer(space));
    }

    fn unregister_container(&mut self, space: NodeId) {
        self.0.borrow_mut().push(Event::UnregisterContainer(space));
    }

    fn attach_body(&mut self, body: NodeId, space: NodeId, state: BodyState) {
        self.0
            .borrow_mut()
            .push(Event::AttachBody { body, space, state });
    }

    fn detach_body(&mut self, body: NodeId) {
        self.0.borrow_mut().push(Event::DetachBody(body));
    }

    fn override_position(&mut self, body: NodeId, position: Point) {
        self.0
            .borrow_mut()
            .push(Event::OverridePosition(body, position));
    }

    fn override_rotation(&mut self, body: NodeId, rotation: f64) {
        self.0
            .borrow_mut()
            .push(Event::OverrideRotation(body, rotation));
    }

    fn update_hitbox_shape(&mut self, hitbox: NodeId, body: NodeId, points: &[Point]) {
        self.0.borrow_mut().push(Event::UpdateHitboxShape {
            hitbox,
            body,
            points: points.to_vec(),
        });
    }

    fn detach_hitbox(&mut self, hitbox: NodeId) {
        self.0.borrow_mut().push(Event::DetachHitbox(hitbox));
    }
}

pub(crate) struct RecordingListener(pub(crate) Log);

impl NodeListener for RecordingListener {
    fn on_attach(&mut self, node: NodeId) {
        self.0.borrow_mut().push(Event::Attach(node));
    }

    fn on_detach(&mut self, node: NodeId) {
        self.0.borrow_mut().push(Event::Detach(node));
    }

    fn on_add_to_parent(&mut self, node: NodeId) {
        self.0.borrow_mut().push(Event::AddToParent(node));
    }
}

pub(crate) type RecordingScene = Scene<RecordingIndex, RecordingSimulation>;

/// A scene whose index and simulation write into the returned log.
pub(crate) fn recording_scene() -> (RecordingScene, Log) {
    let log = Log::default();
    let scene = Scene::with_collaborators(
        SceneConfig::default(),
        RecordingIndex(log.clone()),
        RecordingSimulation(log.clone()),
    );
    (scene, log)
}

#[track_caller]
pub(crate) fn assert_point_close(actual: Point, expected: Point) {
    assert!(
        (actual - expected).hypot() < 1e-9,
        "expected {expected:?}, got {actual:?}"
    );
}
