//! Selection aggregation and drag-gesture orchestration.
//!
//! [`GizmoManager`] gathers any number of independently-transformed nodes
//! under a single root proxy, dispatches translate/rotate/scale drag
//! deltas to all of them, and commits every finished gesture as one
//! [`GroupCommand`] on the host's [`CommandStack`].

use ahash::{AHashMap, AHashSet};

use crate::GizmoError;
use crate::command::{CommandStack, EditCommand, GroupCommand, TransformCommand};
use crate::config::{GizmoAxis, GizmoConfig, GizmoMode, GizmoSpace};
use crate::math::{
    BoundingBox, DMat4, DQuat, DVec3, Pos2, axis_to_proportions, scale_ratio_matrix,
    translation_matrix, world_to_screen,
};
use crate::scene::{
    NodeId, Scene, TransformSnapshot, rotation_from_matrix, with_derotated_matrix,
};

/// Push-style notifications from the gizmo to the host.
///
/// All methods default to no-ops; hosts implement only what they need.
pub trait GizmoListener {
    /// A drag gesture (or a grouped snap move) started or ended. Hosts
    /// typically suppress other UI while this is true.
    fn dragging_changed(&mut self, _dragging: bool) {}

    /// The root proxy moved and projects to a new screen position. Only
    /// emitted while a camera is configured.
    fn root_screen_position_changed(&mut self, _position: Pos2) {}

    /// Multi-select mode was toggled.
    fn multi_select_changed(&mut self, _enabled: bool) {}
}

/// Listener that ignores every notification.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullListener;

impl GizmoListener for NullListener {}

/// Synthetic aggregate transform representing the whole selection.
///
/// Not bound to any renderable. Scale is unit outside of active scale
/// drags; rotation is identity unless exactly one node is attached and
/// the gizmo operates in local space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RootProxy {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for RootProxy {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

/// A scale handle on the selection bounding box.
///
/// `position` is in world space; `axis` is the handle's drag axis in the
/// box's own (de-rotated) frame: a single principal direction for face
/// handles, a signed diagonal for corner handles.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleHandle {
    pub position: DVec3,
    pub axis: DVec3,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct TranslateDrag {
    start_position: DVec3,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct RotateDrag {
    start_rotation: DQuat,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct ScaleDrag {
    /// World-space scaling pivot: the bounding-box center.
    pivot: DVec3,
    /// Offset from the pivot to the dragged handle. Anchors the opposite
    /// face when not scaling from the center.
    handle_offset: DVec3,
    /// Pivot-to-pointer distance at drag start, componentwise divisor for
    /// the scale ratio.
    initial_dist: DVec3,
    /// Unit-max-component drag axis proportions.
    proportions: DVec3,
    /// Accumulated drag distance along the handle axis.
    drag_factor: f64,
}

/// Per-gesture state, constructed at drag start and dropped at drag end.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) enum DragState {
    #[default]
    Idle,
    Translate(TranslateDrag),
    Rotate(RotateDrag),
    Scale(ScaleDrag),
}

/// Orchestrates selection membership, mode/space switching and drag
/// dispatch for a multi-object transform gizmo.
///
/// The manager holds non-owning [`NodeId`]s. A host that destroys a node
/// outside of [`DeleteObjectCommand`](crate::command::DeleteObjectCommand)
/// must call [`GizmoManager::remove_node`] first.
pub struct GizmoManager {
    pub(crate) config: GizmoConfig,
    pub(crate) mode: GizmoMode,
    pub(crate) space: GizmoSpace,
    pub(crate) scale_from_center: bool,
    pub(crate) multi_select: bool,
    pub(crate) root: RootProxy,
    /// One entry per attached node, keyed by stable identity.
    pub(crate) attached: AHashMap<NodeId, TransformSnapshot>,
    /// Selection box in the root's de-rotated frame. Maintained while
    /// scale mode is active.
    pub(crate) bounds: BoundingBox,
    pub(crate) drag: DragState,
    /// Whether the active handle set has a bound target.
    pub(crate) target_bound: bool,
    pub(crate) listener: Box<dyn GizmoListener>,
}

impl Default for GizmoManager {
    fn default() -> Self {
        Self::new(GizmoConfig::default(), Box::new(NullListener))
    }
}

impl GizmoManager {
    pub fn new(config: GizmoConfig, listener: Box<dyn GizmoListener>) -> Self {
        Self {
            config,
            mode: GizmoMode::default(),
            space: GizmoSpace::default(),
            scale_from_center: true,
            multi_select: false,
            root: RootProxy::default(),
            attached: AHashMap::new(),
            bounds: BoundingBox::ZERO,
            drag: DragState::default(),
            target_bound: false,
            listener,
        }
    }

    /// Current camera configuration.
    pub fn config(&self) -> &GizmoConfig {
        &self.config
    }

    /// Updates the camera configuration.
    pub fn update_config(&mut self, config: GizmoConfig) {
        self.config = config;
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    pub fn space(&self) -> GizmoSpace {
        self.space
    }

    /// The synthetic transform the active handle set is bound to.
    pub fn root(&self) -> RootProxy {
        self.root
    }

    /// Selection box in the root's de-rotated frame, as of the last
    /// recompute.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Whether scale drags anchor at the box center (opposite face moves
    /// too) or at the face opposite the dragged handle.
    pub fn scale_from_center(&self) -> bool {
        self.scale_from_center
    }

    pub fn set_scale_from_center(&mut self, from_center: bool) {
        self.scale_from_center = from_center;
    }

    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    /// Toggles multi-select mode and notifies the listener.
    pub fn set_multi_select(&mut self, enabled: bool) {
        self.multi_select = enabled;
        self.listener.multi_select_changed(enabled);
    }

    /// True iff the active handle set currently has a bound target, i.e.
    /// the attachment set is non-empty. The host hides the gizmo when
    /// this is false.
    pub fn is_active(&self) -> bool {
        self.target_bound
    }

    /// Ids of all attached nodes, in stable order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.attached.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// The last committed snapshot of an attached node.
    pub fn snapshot(&self, node: NodeId) -> Option<&TransformSnapshot> {
        self.attached.get(&node)
    }

    /// Whether handle visuals should follow the root proxy's orientation
    /// rather than staying world-aligned.
    pub fn rotation_follows_selection(&self) -> bool {
        self.space == GizmoSpace::Local
    }

    /// Attaches a node to the selection. No-op when already attached.
    ///
    /// Nodes without an intrinsic orientation get one backfilled from
    /// their world matrix so rotation gestures have a well-defined
    /// starting state.
    pub fn add_node(&mut self, scene: &mut dyn Scene, node: NodeId) {
        if !self.attached.contains_key(&node) {
            if scene.orientation(node).is_none() {
                scene.set_orientation(node, rotation_from_matrix(scene.world_matrix(node)));
            }
            self.attached
                .insert(node, TransformSnapshot::capture(scene, node));
            scene.highlight(node);

            self.update_root(scene);
            self.target_bound = true;
        }
        // Attaching must not wait for the next drag to show a correctly
        // sized box.
        if self.mode == GizmoMode::Scale {
            self.update_bounds(scene);
        }
    }

    /// Detaches a node. Benign no-op when the node is not attached.
    pub fn remove_node(&mut self, scene: &mut dyn Scene, node: NodeId) {
        if self.attached.remove(&node).is_none() {
            return;
        }
        scene.remove_highlight(node);
        if self.attached.is_empty() {
            self.target_bound = false;
        }
        self.update_root(scene);
    }

    /// Clears the whole selection and unbinds the gizmo.
    pub fn remove_all_nodes(&mut self, scene: &mut dyn Scene) {
        for node in self.attached.keys() {
            scene.remove_highlight(*node);
        }
        self.attached.clear();
        self.target_bound = false;
    }

    /// Switches the active handle set.
    ///
    /// Cancels any in-flight gesture, resets the root proxy scale to unit
    /// and, when entering scale mode, recomputes the bounding box.
    pub fn change_mode(&mut self, scene: &mut dyn Scene, mode: GizmoMode) {
        log::debug!("gizmo mode -> {:?}", mode);
        self.cancel_drag();
        self.mode = mode;
        self.root.scale = DVec3::ONE;
        self.target_bound = !self.attached.is_empty();
        if mode == GizmoMode::Scale {
            self.update_bounds(scene);
        }
    }

    /// Toggles between world and local handle orientation.
    pub fn change_space(&mut self, scene: &mut dyn Scene, space: GizmoSpace) {
        log::debug!("gizmo space -> {:?}", space);
        self.space = space;
        self.update_root(scene);
        self.update_bounds(scene);
    }

    /// Re-snapshots every attached node from committed scene state and
    /// recomputes the root proxy.
    ///
    /// The host calls this after [`CommandStack::undo`] /
    /// [`CommandStack::redo`] and after any transform edit that bypassed
    /// the gizmo.
    pub fn refresh_from_scene(&mut self, scene: &mut dyn Scene) {
        self.refresh_snapshots(scene);
        self.update_root(scene);
        if self.mode == GizmoMode::Scale {
            self.update_bounds(scene);
        }
    }

    /// Projects the root proxy into normalized viewport coordinates.
    ///
    /// Fails with [`GizmoError::NoActiveCamera`] when no camera is
    /// configured or the root projects behind it.
    pub fn root_screen_position(&self) -> Result<Pos2, GizmoError> {
        if !self.config.has_camera() {
            return Err(GizmoError::NoActiveCamera);
        }
        world_to_screen(
            self.config.viewport,
            self.config.view_projection(),
            self.root.position,
        )
        .ok_or(GizmoError::NoActiveCamera)
    }

    /// Screen-space angle of one root axis, in degrees, with 0° pointing
    /// up on screen. Used to orient directional snap controls so they
    /// line up with the rendered 3d axes.
    pub fn axis_screen_angle(&self, axis: GizmoAxis) -> Result<f64, GizmoError> {
        let root_pos = self.root_screen_position()?;
        let tip = self.root.position + self.root.rotation * axis.unit();
        let tip_pos = world_to_screen(self.config.viewport, self.config.view_projection(), tip)
            .ok_or(GizmoError::NoActiveCamera)?;

        let p = tip_pos - root_pos;
        // Swapped and negated so that 0° points up along the negative
        // screen y-axis.
        Ok(-f64::atan2(-p.x as f64, -p.y as f64).to_degrees())
    }

    /// Screen-space angles of all three root axes, in degrees.
    pub fn axes_screen_angles(&self) -> Result<DVec3, GizmoError> {
        Ok(DVec3::new(
            self.axis_screen_angle(GizmoAxis::X)?,
            self.axis_screen_angle(GizmoAxis::Y)?,
            self.axis_screen_angle(GizmoAxis::Z)?,
        ))
    }

    /// Union bounding box of the selection, computed with each node's
    /// world matrix temporarily de-rotated by the inverse of
    /// `orientation` (the root proxy's orientation by default).
    ///
    /// For a single node this is a true object-aligned box. For several
    /// it is the union of independently de-rotated boxes, exact only when
    /// all nodes share the orientation. The per-node matrix override is
    /// transient and fully restored; treat the call as a read.
    ///
    /// Returns a degenerate box at the origin for an empty selection.
    pub fn bounding_min_max(
        &self,
        scene: &mut dyn Scene,
        orientation: Option<DMat4>,
    ) -> BoundingBox {
        let rotation = orientation.unwrap_or_else(|| DMat4::from_quat(self.root.rotation));

        let mut result: Option<BoundingBox> = None;
        for node in self.attached.keys() {
            let bounds = with_derotated_matrix(scene, *node, rotation, |scene| {
                scene.hierarchy_bounds(*node)
            });
            result = Some(match result {
                Some(current) => current.union(&bounds),
                None => bounds,
            });
        }
        result.unwrap_or(BoundingBox::ZERO)
    }

    /// Face and corner scale handles of the current bounding box, for
    /// host-side rendering and hit-testing.
    pub fn scale_handles(&self) -> Vec<ScaleHandle> {
        let center = self.bounds.center();
        let half = self.bounds.size() * 0.5;
        let mut handles = Vec::with_capacity(14);

        for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
            for sign in [1.0, -1.0] {
                let axis = axis * sign;
                handles.push(ScaleHandle {
                    position: self.root.rotation * (center + axis * half),
                    axis,
                });
            }
        }
        for sx in [1.0, -1.0] {
            for sy in [1.0, -1.0] {
                for sz in [1.0, -1.0] {
                    let axis = DVec3::new(sx, sy, sz);
                    handles.push(ScaleHandle {
                        position: self.root.rotation * (center + axis * half),
                        axis,
                    });
                }
            }
        }
        handles
    }

    // ------------------------------------------------------------------
    // Translation gesture
    // ------------------------------------------------------------------

    /// Starts a translation gesture from the root's current position.
    pub fn begin_translation(&mut self) -> Result<(), GizmoError> {
        if !self.target_bound {
            return Err(GizmoError::NothingAttached);
        }
        self.drag = DragState::Translate(TranslateDrag {
            start_position: self.root.position,
        });
        self.listener.dragging_changed(true);
        Ok(())
    }

    /// Applies the total translation accumulated since gesture start.
    ///
    /// The delta is applied relative to each node's pre-drag snapshot,
    /// not incrementally, so repeated updates within one gesture cannot
    /// accumulate floating-point drift.
    pub fn update_translation(&mut self, scene: &mut dyn Scene, total_delta: DVec3) {
        let DragState::Translate(drag) = self.drag else {
            return;
        };
        if !self.target_bound {
            // The host detached the gizmo mid-drag; release the gesture.
            self.cancel_drag();
            return;
        }

        self.root.position = drag.start_position + total_delta;
        let translation = translation_matrix(total_delta);
        for (node, snapshot) in &self.attached {
            scene.freeze_world_matrix(*node, translation * snapshot.matrix);
        }
    }

    /// Commits the translation gesture as one grouped command.
    pub fn end_translation(&mut self, scene: &mut dyn Scene, stack: &mut CommandStack) {
        if !matches!(self.drag, DragState::Translate(_)) {
            return;
        }
        self.commit_gesture(scene, stack);
        self.drag = DragState::Idle;
        self.listener.dragging_changed(false);
    }

    // ------------------------------------------------------------------
    // Rotation gesture
    // ------------------------------------------------------------------

    /// Starts a rotation gesture from the root's current orientation.
    pub fn begin_rotation(&mut self) -> Result<(), GizmoError> {
        if !self.target_bound {
            return Err(GizmoError::NothingAttached);
        }
        self.drag = DragState::Rotate(RotateDrag {
            start_rotation: self.root.rotation,
        });
        self.listener.dragging_changed(true);
        Ok(())
    }

    /// Applies the total rotation accumulated since gesture start, around
    /// the root proxy's position.
    ///
    /// Every update resets each node to its snapshot and reapplies the
    /// whole rotation; incremental quaternion accumulation would compound
    /// composition errors across updates. Each node's intrinsic
    /// orientation is kept in sync with the world-matrix override so that
    /// single-object local-space alignment stays correct.
    pub fn update_rotation(&mut self, scene: &mut dyn Scene, total_delta: DQuat) {
        let DragState::Rotate(drag) = self.drag else {
            return;
        };
        if !self.target_bound {
            self.cancel_drag();
            return;
        }

        self.root.rotation = total_delta * drag.start_rotation;

        let pivot = self.root.position;
        let rotation = translation_matrix(pivot)
            * DMat4::from_quat(total_delta)
            * translation_matrix(-pivot);
        for (node, snapshot) in &self.attached {
            scene.set_orientation(*node, total_delta * snapshot.orientation);
            scene.freeze_world_matrix(*node, rotation * snapshot.matrix);
        }
    }

    /// Commits the rotation gesture and resets the root proxy to the
    /// space-appropriate neutral orientation.
    pub fn end_rotation(&mut self, scene: &mut dyn Scene, stack: &mut CommandStack) {
        if !matches!(self.drag, DragState::Rotate(_)) {
            return;
        }
        self.commit_gesture(scene, stack);
        self.set_root_rotation();
        self.drag = DragState::Idle;
        self.listener.dragging_changed(false);
    }

    // ------------------------------------------------------------------
    // Scale gesture
    // ------------------------------------------------------------------

    /// Starts a scale gesture on the given handle.
    ///
    /// `drag_point` is the world-space point where the pointer grabbed the
    /// handle's drag plane; its offset from the box center is the divisor
    /// for the scale ratio, so it should be the actual pointer hit point
    /// rather than an idealized handle position.
    pub fn begin_scale(
        &mut self,
        scene: &mut dyn Scene,
        handle: ScaleHandle,
        drag_point: DVec3,
    ) -> Result<(), GizmoError> {
        if !self.target_bound {
            return Err(GizmoError::NothingAttached);
        }
        self.update_bounds(scene);

        let pivot = self.root.rotation * self.bounds.center();
        self.drag = DragState::Scale(ScaleDrag {
            pivot,
            handle_offset: handle.position - pivot,
            initial_dist: drag_point - pivot,
            proportions: axis_to_proportions(handle.axis),
            drag_factor: 0.0,
        });
        self.listener.dragging_changed(true);
        Ok(())
    }

    /// Accumulates drag distance along the handle axis and reapplies the
    /// resulting scale to every node, from its snapshot.
    ///
    /// Sensitivity is halved when anchoring at the opposite face: a
    /// near-corner drag changes the apparent size twice as fast as a
    /// center-anchored one.
    pub fn update_scale(&mut self, scene: &mut dyn Scene, drag_delta: f64) {
        let DragState::Scale(mut drag) = self.drag else {
            return;
        };
        if !self.target_bound {
            self.cancel_drag();
            return;
        }

        drag.drag_factor += if self.scale_from_center {
            drag_delta
        } else {
            drag_delta * 0.5
        };
        self.drag = DragState::Scale(drag);

        let direction = drag.initial_dist.normalize_or_zero();
        let amount = drag.proportions * drag.drag_factor;
        let new_dist = drag.initial_dist + direction * amount;

        // Componentwise ratio against the initial pivot distance. A ~zero
        // initial component cannot scale its axis; ratio 1 instead of a
        // division blowing up.
        let ratio = DVec3::new(
            ratio_component(new_dist.x, drag.initial_dist.x),
            ratio_component(new_dist.y, drag.initial_dist.y),
            ratio_component(new_dist.z, drag.initial_dist.z),
        );
        self.root.scale = ratio.abs();

        let scale = scale_ratio_matrix(ratio);
        let rotation = DMat4::from_quat(self.root.rotation);
        let rotation_inv = rotation.inverse();

        for (node, snapshot) in &self.attached {
            // Into the pivot frame, de-rotate into the box frame, scale,
            // and invert every step on the way back out.
            let mut matrix = translation_matrix(-drag.pivot) * snapshot.matrix;
            if !self.scale_from_center {
                matrix = translation_matrix(drag.handle_offset) * matrix;
            }
            matrix = rotation * scale * rotation_inv * matrix;
            if !self.scale_from_center {
                matrix = translation_matrix(-drag.handle_offset) * matrix;
            }
            matrix = translation_matrix(drag.pivot) * matrix;

            scene.freeze_world_matrix(*node, matrix);
        }

        self.update_bounds(scene);
        self.update_root(scene);
    }

    /// Commits the scale gesture and recomputes the bounding box.
    pub fn end_scale(&mut self, scene: &mut dyn Scene, stack: &mut CommandStack) {
        if !matches!(self.drag, DragState::Scale(_)) {
            return;
        }
        self.commit_gesture(scene, stack);
        self.root.scale = DVec3::ONE;
        self.update_bounds(scene);
        self.update_root(scene);
        self.drag = DragState::Idle;
        self.listener.dragging_changed(false);
    }

    /// Releases any in-flight gesture without committing a command.
    ///
    /// Node transforms keep whatever the last update applied; the next
    /// committed gesture still measures against the pre-drag snapshots.
    pub fn cancel_drag(&mut self) {
        if !matches!(self.drag, DragState::Idle) {
            self.drag = DragState::Idle;
            self.listener.dragging_changed(false);
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// One TransformCommand per attached node, wrapped in a GroupCommand
    /// and pushed through the stack. Execution re-applies the final state
    /// the nodes already have, which is idempotent. Snapshots are
    /// refreshed to the committed state afterwards.
    pub(crate) fn commit_gesture(&mut self, scene: &mut dyn Scene, stack: &mut CommandStack) {
        if self.attached.is_empty() {
            return;
        }
        let commands: Vec<EditCommand> = self
            .attached
            .iter()
            .map(|(node, snapshot)| TransformCommand::new(scene, *node, snapshot).into())
            .collect();
        stack.execute(GroupCommand::new(commands).into(), scene);
        self.refresh_snapshots(scene);
    }

    pub(crate) fn refresh_snapshots(&mut self, scene: &dyn Scene) {
        for (node, snapshot) in &mut self.attached {
            *snapshot = TransformSnapshot::capture(scene, *node);
        }
    }

    /// Recomputes the root proxy position and rotation from the current
    /// selection. Called synchronously on every membership, mode or space
    /// change so the proxy is never observably stale.
    pub(crate) fn update_root(&mut self, scene: &dyn Scene) {
        self.set_root_position(scene);
        self.set_root_rotation();
    }

    pub(crate) fn set_root_position(&mut self, scene: &dyn Scene) {
        if self.attached.is_empty() {
            return;
        }
        let mut bounds: Option<BoundingBox> = None;
        for node in self.attached.keys() {
            let node_bounds = scene.hierarchy_bounds(*node);
            bounds = Some(match bounds {
                Some(current) => current.union(&node_bounds),
                None => node_bounds,
            });
        }
        if let Some(bounds) = bounds {
            self.root.position = bounds.center();
        }
        if let Ok(position) = self.root_screen_position() {
            self.listener.root_screen_position_changed(position);
        }
    }

    pub(crate) fn set_root_rotation(&mut self) {
        self.root.rotation = match self.sole_attached() {
            Some(snapshot) if self.space == GizmoSpace::Local => snapshot.orientation,
            _ => DQuat::IDENTITY,
        };
    }

    fn sole_attached(&self) -> Option<TransformSnapshot> {
        if self.attached.len() == 1 {
            self.attached.values().next().copied()
        } else {
            None
        }
    }

    pub(crate) fn update_bounds(&mut self, scene: &mut dyn Scene) {
        self.bounds = self.bounding_min_max(scene, None);
    }

    /// The attachment set plus every descendant, for snap-ray filtering.
    pub(crate) fn selection_with_descendants(&self, scene: &dyn Scene) -> AHashSet<NodeId> {
        let mut selection = AHashSet::new();
        let mut pending: Vec<NodeId> = self.attached.keys().copied().collect();
        while let Some(node) = pending.pop() {
            if selection.insert(node) {
                pending.extend(scene.children(node));
            }
        }
        selection
    }
}

fn ratio_component(new_dist: f64, initial_dist: f64) -> f64 {
    if initial_dist.abs() > 1e-9 {
        new_dist / initial_dist
    } else {
        1.0
    }
}
