//! Axis snapping: slide the selection along one root axis until it rests
//! against the nearest other object.
//!
//! The solver is stochastic. It samples random points on the selection
//! bounding-box face that leads in the movement direction, verifies each
//! sample actually lies over selection geometry with a short backwards
//! ray, then casts forward past the selection and keeps the shortest hit
//! distance over all samples. Non-convex silhouettes make an analytic
//! solution impractical; enough rays make a miss unlikely in practice.

use crate::command::CommandStack;
use crate::config::GizmoAxis;
use crate::gizmo::GizmoManager;
use crate::math::{DMat4, DVec3, translation_matrix};
use crate::scene::Scene;

/// Tuning knobs for [`GizmoManager::snap_along_axis`].
#[derive(Debug, Copy, Clone)]
pub struct SnapOptions {
    /// Maximum snap distance. Nothing within this range means no move.
    pub ray_length: f64,
    /// Number of face samples. More rays, fewer misses on concave or
    /// perforated obstacle silhouettes.
    pub number_of_rays: usize,
    /// Re-samples allowed per ray when the back-check finds no selection
    /// geometry under the sample point.
    pub retries: usize,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            ray_length: 50.0,
            number_of_rays: 100,
            retries: 3,
        }
    }
}

impl GizmoManager {
    /// Moves the whole selection along `axis` of the root proxy until it
    /// touches the nearest non-selected object, and commits the move as
    /// one grouped, undoable command.
    ///
    /// `move_opposite` flips the direction to the negative axis. When no
    /// obstacle lies within [`SnapOptions::ray_length`], the selection
    /// stays put and nothing is pushed onto the stack.
    ///
    /// Degenerate (zero-area) leading faces skip the back-check and cast
    /// directly from the sampled point, so flat selections can still snap
    /// along their thin axis.
    pub fn snap_along_axis(
        &mut self,
        scene: &mut dyn Scene,
        stack: &mut CommandStack,
        axis: GizmoAxis,
        move_opposite: bool,
        options: &SnapOptions,
    ) {
        if self.attached.is_empty() {
            return;
        }
        let move_forward = !move_opposite;
        let quat = self.root.rotation;
        let direction = quat * axis.unit();

        let bounds = self.bounding_min_max(scene, Some(DMat4::from_quat(quat)));
        let size = bounds.size();

        // Two edge vectors spanning the leading face, and the offset from
        // the box minimum to that face.
        let (edge_a, edge_b, to_face) = match axis {
            GizmoAxis::X => (
                DVec3::new(0.0, size.y, 0.0),
                DVec3::new(0.0, 0.0, size.z),
                DVec3::new(size.x, 0.0, 0.0),
            ),
            GizmoAxis::Y => (
                DVec3::new(size.x, 0.0, 0.0),
                DVec3::new(0.0, 0.0, size.z),
                DVec3::new(0.0, size.y, 0.0),
            ),
            GizmoAxis::Z => (
                DVec3::new(size.x, 0.0, 0.0),
                DVec3::new(0.0, size.y, 0.0),
                DVec3::new(0.0, 0.0, size.z),
            ),
        };
        let min = quat * bounds.min;
        let edge_a = quat * edge_a;
        let edge_b = quat * edge_b;
        let to_face = quat * to_face;
        let flat_face = edge_a.length_squared() < 1e-12 || edge_b.length_squared() < 1e-12;

        // Nudge ray origins off the face so they start just outside the
        // selection surface.
        let offset = direction * 1e-4;
        let selection = self.selection_with_descendants(scene);
        let in_selection = |node| selection.contains(&node);
        let outside_selection = |node| !selection.contains(&node);

        let mut shortest: Option<DVec3> = None;
        for _ in 0..options.number_of_rays {
            let mut origin = DVec3::ZERO;
            let mut over_selection = false;
            let mut tries = 0;
            while tries <= options.retries {
                origin = min + edge_a * rand::random::<f64>() + edge_b * rand::random::<f64>();
                origin += if move_forward { to_face + offset } else { -offset };

                if flat_face {
                    over_selection = true;
                    break;
                }
                // Confirm the sample sits over actual selection geometry,
                // not a gap in the silhouette.
                let back = if move_forward { -direction } else { direction };
                if let Some(hit) =
                    scene.pick_with_ray(origin, back, options.ray_length, &in_selection)
                {
                    origin = hit.point + if move_forward { offset } else { -offset };
                    over_selection = true;
                    break;
                }
                tries += 1;
            }
            if !over_selection {
                continue;
            }

            let forward = if move_forward { direction } else { -direction };
            if let Some(hit) =
                scene.pick_with_ray(origin, forward, options.ray_length, &outside_selection)
            {
                let distance = hit.point - origin;
                if shortest.is_none_or(|s| distance.length_squared() < s.length_squared()) {
                    shortest = Some(distance);
                }
            }
        }

        let Some(distance) = shortest else {
            log::debug!(
                "axis snap: no obstacle within {} along {:?}",
                options.ray_length,
                axis
            );
            return;
        };
        log::trace!("axis snap: moving selection by {distance}");

        self.listener.dragging_changed(true);
        let translation = translation_matrix(distance);
        for (node, snapshot) in &self.attached {
            scene.freeze_world_matrix(*node, translation * snapshot.matrix);
        }
        self.commit_gesture(scene, stack);
        self.update_root(scene);
        self.listener.dragging_changed(false);
    }
}
