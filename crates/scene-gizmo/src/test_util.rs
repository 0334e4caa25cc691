//! In-memory [`Scene`] implementation for unit tests: axis-aligned boxes
//! with exact slab ray intersection.

use std::cell::Cell;
use std::rc::Rc;

use crate::gizmo::GizmoListener;
use crate::math::{BoundingBox, DMat4, DQuat, DVec3, Pos2};
use crate::scene::{NodeId, RayHit, Scene};

struct TestNode {
    world: DMat4,
    orientation: Option<DQuat>,
    half_extents: DVec3,
    children: Vec<NodeId>,
    in_scene: bool,
    highlighted: bool,
}

/// Flat scene of box-shaped nodes. Ids index into the node list.
#[derive(Default)]
pub(crate) struct TestScene {
    nodes: Vec<TestNode>,
}

impl TestScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a world-axis-aligned box centered at `center`.
    pub fn add_box(&mut self, center: DVec3, half_extents: DVec3) -> NodeId {
        self.nodes.push(TestNode {
            world: DMat4::from_translation(center),
            orientation: Some(DQuat::IDENTITY),
            half_extents,
            children: Vec::new(),
            in_scene: true,
            highlighted: false,
        });
        NodeId(self.nodes.len() as u64 - 1)
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.node_mut(parent).children.push(child);
    }

    /// Simulates a host node without an intrinsic orientation.
    pub fn clear_orientation(&mut self, node: NodeId) {
        self.node_mut(node).orientation = None;
    }

    pub fn is_in_scene(&self, node: NodeId) -> bool {
        self.node(node).in_scene
    }

    pub fn highlighted(&self, node: NodeId) -> bool {
        self.node(node).highlighted
    }

    fn node(&self, node: NodeId) -> &TestNode {
        &self.nodes[node.0 as usize]
    }

    fn node_mut(&mut self, node: NodeId) -> &mut TestNode {
        &mut self.nodes[node.0 as usize]
    }

    /// World-space box of the node alone: local corners pushed through the
    /// world matrix and re-boxed.
    fn world_aabb(&self, node: NodeId) -> BoundingBox {
        let data = self.node(node);
        let h = data.half_extents;
        let mut min = DVec3::INFINITY;
        let mut max = DVec3::NEG_INFINITY;
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    let corner = data
                        .world
                        .transform_point3(DVec3::new(sx * h.x, sy * h.y, sz * h.z));
                    min = min.min(corner);
                    max = max.max(corner);
                }
            }
        }
        BoundingBox::new(min, max)
    }
}

impl Scene for TestScene {
    fn world_matrix(&self, node: NodeId) -> DMat4 {
        self.node(node).world
    }

    fn freeze_world_matrix(&mut self, node: NodeId, matrix: DMat4) {
        self.node_mut(node).world = matrix;
    }

    fn orientation(&self, node: NodeId) -> Option<DQuat> {
        self.node(node).orientation
    }

    fn set_orientation(&mut self, node: NodeId, orientation: DQuat) {
        self.node_mut(node).orientation = Some(orientation);
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn hierarchy_bounds(&self, node: NodeId) -> BoundingBox {
        let mut bounds = self.world_aabb(node);
        for child in &self.node(node).children {
            bounds = bounds.union(&self.hierarchy_bounds(*child));
        }
        bounds
    }

    fn pick_with_ray(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_length: f64,
        filter: &dyn Fn(NodeId) -> bool,
    ) -> Option<RayHit> {
        let mut nearest: Option<(f64, NodeId)> = None;
        for index in 0..self.nodes.len() {
            let node = NodeId(index as u64);
            if !self.node(node).in_scene || !filter(node) {
                continue;
            }
            let Some(t) = ray_aabb_entry(origin, direction, &self.world_aabb(node)) else {
                continue;
            };
            if t > max_length {
                continue;
            }
            if nearest.is_none_or(|(best, _)| t < best) {
                nearest = Some((t, node));
            }
        }
        nearest.map(|(t, node)| RayHit {
            node,
            point: origin + direction * t,
        })
    }

    fn add_to_scene(&mut self, node: NodeId) {
        self.node_mut(node).in_scene = true;
    }

    fn remove_from_scene(&mut self, node: NodeId) {
        self.node_mut(node).in_scene = false;
    }

    fn highlight(&mut self, node: NodeId) {
        self.node_mut(node).highlighted = true;
    }

    fn remove_highlight(&mut self, node: NodeId) {
        self.node_mut(node).highlighted = false;
    }
}

/// Slab test. Returns the entry distance along the ray, zero when the
/// origin is inside the box.
fn ray_aabb_entry(origin: DVec3, direction: DVec3, bounds: &BoundingBox) -> Option<f64> {
    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-12 {
            if o < bounds.min[axis] || o > bounds.max[axis] {
                return None;
            }
        } else {
            let mut t1 = (bounds.min[axis] - o) / d;
            let mut t2 = (bounds.max[axis] - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    Some(t_min)
}

/// Shared observation flags for listener tests.
#[derive(Default, Clone)]
pub(crate) struct SharedFlags {
    dragging: Rc<Cell<bool>>,
    multi_select: Rc<Cell<bool>>,
    root_screen_position: Rc<Cell<Option<Pos2>>>,
}

impl SharedFlags {
    pub fn listener(&self) -> FlagListener {
        FlagListener(self.clone())
    }

    pub fn dragging(&self) -> bool {
        self.dragging.get()
    }

    pub fn multi_select(&self) -> bool {
        self.multi_select.get()
    }

    pub fn root_screen_position(&self) -> Option<Pos2> {
        self.root_screen_position.get()
    }
}

pub(crate) struct FlagListener(SharedFlags);

impl GizmoListener for FlagListener {
    fn dragging_changed(&mut self, dragging: bool) {
        self.0.dragging.set(dragging);
    }

    fn root_screen_position_changed(&mut self, position: Pos2) {
        self.0.root_screen_position.set(Some(position));
    }

    fn multi_select_changed(&mut self, enabled: bool) {
        self.0.multi_select.set(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_enters_box_at_nearest_face() {
        let bounds = BoundingBox::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let t = ray_aabb_entry(DVec3::new(-5.0, 0.0, 0.0), DVec3::X, &bounds).unwrap();
        assert_eq!(t, 4.0);
    }

    #[test]
    fn ray_from_inside_reports_zero_distance() {
        let bounds = BoundingBox::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let t = ray_aabb_entry(DVec3::ZERO, DVec3::X, &bounds).unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let bounds = BoundingBox::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        assert!(ray_aabb_entry(DVec3::new(-5.0, 3.0, 0.0), DVec3::X, &bounds).is_none());
    }

    #[test]
    fn pick_respects_filter() {
        let mut scene = TestScene::new();
        let near = scene.add_box(DVec3::new(3.0, 0.0, 0.0), DVec3::ONE);
        let far = scene.add_box(DVec3::new(8.0, 0.0, 0.0), DVec3::ONE);

        let hit = scene
            .pick_with_ray(DVec3::ZERO, DVec3::X, 50.0, &|n| n != near)
            .unwrap();
        assert_eq!(hit.node, far);
        assert_eq!(hit.point, DVec3::new(7.0, 0.0, 0.0));
    }
}
