//! Host boundary: the scene graph, ray casting and the highlight layer
//! are supplied by the embedding application through the [`Scene`] trait.
//!
//! The core never owns nodes. It refers to them through [`NodeId`] and
//! assumes ids stay valid while attached: a host that destroys a node by
//! any path other than
//! [`DeleteObjectCommand`](crate::command::DeleteObjectCommand) must call
//! [`GizmoManager::remove_node`](crate::gizmo::GizmoManager::remove_node)
//! first, as the manager cannot detect a dangling id on its own.

use crate::math::{BoundingBox, DMat4, DQuat, DVec3};

/// Stable identity of a scene-graph node, assigned by the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Nearest intersection found by [`Scene::pick_with_ray`].
#[derive(Debug, Copy, Clone)]
pub struct RayHit {
    /// The intersected renderable.
    pub node: NodeId,
    /// World-space intersection point.
    pub point: DVec3,
}

/// Scene-graph primitives the core consumes.
///
/// All methods are synchronous and are expected to be called from the
/// host's single event-loop thread.
pub trait Scene {
    /// Current world matrix of the node.
    fn world_matrix(&self, node: NodeId) -> DMat4;

    /// Directly overrides the node's world matrix, independent of its
    /// local position/rotation/scale.
    fn freeze_world_matrix(&mut self, node: NodeId, matrix: DMat4);

    /// The node's intrinsic orientation, if it has one. Nodes are not
    /// guaranteed to carry an orientation quaternion; the manager
    /// backfills one from the world matrix on attach.
    fn orientation(&self, node: NodeId) -> Option<DQuat>;

    /// Sets the node's intrinsic orientation.
    fn set_orientation(&mut self, node: NodeId, orientation: DQuat);

    /// Direct children of the node.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// World-space min/max corners of the node and all descendant
    /// renderable geometry.
    fn hierarchy_bounds(&self, node: NodeId) -> BoundingBox;

    /// Casts a ray and returns the nearest intersected renderable within
    /// `max_length`, considering only candidates for which `filter`
    /// returns true.
    fn pick_with_ray(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_length: f64,
        filter: &dyn Fn(NodeId) -> bool,
    ) -> Option<RayHit>;

    /// Registers the node with the set of actively rendered/updated
    /// objects. Does not recurse; commands walk the subtree themselves.
    fn add_to_scene(&mut self, node: NodeId);

    /// Removes the node from the set of actively rendered/updated objects.
    fn remove_from_scene(&mut self, node: NodeId);

    /// Adds the node to the selection highlight layer. Purely cosmetic.
    fn highlight(&mut self, node: NodeId);

    /// Removes the node from the selection highlight layer.
    fn remove_highlight(&mut self, node: NodeId);
}

/// A node's last committed world transform.
///
/// Refreshed at the start and end of every drag gesture and whenever a
/// command affecting the node runs; never holds a mid-drag intermediate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformSnapshot {
    /// Committed world matrix.
    pub matrix: DMat4,
    /// Committed intrinsic orientation.
    pub orientation: DQuat,
}

impl TransformSnapshot {
    /// Captures the node's current transform.
    pub fn capture(scene: &dyn Scene, node: NodeId) -> Self {
        Self {
            matrix: scene.world_matrix(node),
            orientation: orientation_of(scene, node),
        }
    }
}

/// The node's intrinsic orientation, derived from the world matrix when
/// the host does not track one.
pub(crate) fn orientation_of(scene: &dyn Scene, node: NodeId) -> DQuat {
    scene
        .orientation(node)
        .unwrap_or_else(|| rotation_from_matrix(scene.world_matrix(node)))
}

pub(crate) fn rotation_from_matrix(matrix: DMat4) -> DQuat {
    let (_, rotation, _) = matrix.to_scale_rotation_translation();
    rotation
}

/// Runs `f` with the node's world matrix temporarily multiplied by the
/// inverse of `rotation`, restoring the exact original matrix on exit.
///
/// This is the scoped form of the freeze/query/unfreeze pattern used for
/// orientation-aligned bounding queries. The mutation is transient and
/// fully reverted; callers must treat the whole call as a read and must
/// not touch the same node's world matrix concurrently.
pub(crate) fn with_derotated_matrix<R>(
    scene: &mut dyn Scene,
    node: NodeId,
    rotation: DMat4,
    f: impl FnOnce(&mut dyn Scene) -> R,
) -> R {
    let original = scene.world_matrix(node);
    scene.freeze_world_matrix(node, rotation.inverse() * original);
    let result = f(scene);
    scene.freeze_world_matrix(node, original);
    result
}
