use emath::Rect;

use crate::math::DMat4;

/// Which gizmo handle set is active. Exactly one mode is active at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum GizmoMode {
    /// Arrow handles that translate the selection.
    #[default]
    Translate,
    /// Ring handles that rotate the selection.
    Rotate,
    /// Bounding-box corner and face handles that scale the selection.
    Scale,
}

/// Whether gizmo and bounding-box orientation follows world axes or the
/// selected object's own orientation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum GizmoSpace {
    /// Handle axes are aligned to global space.
    World,
    /// Handle axes follow the (single) selected node's orientation.
    #[default]
    Local,
}

/// One of the three principal axes of the root proxy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
}

impl GizmoAxis {
    /// Unit vector along the axis, before any orientation is applied.
    pub fn unit(&self) -> crate::math::DVec3 {
        match self {
            Self::X => crate::math::DVec3::X,
            Self::Y => crate::math::DVec3::Y,
            Self::Z => crate::math::DVec3::Z,
        }
    }
}

/// Camera configuration of the gizmo.
///
/// Screen-space queries ([`GizmoManager::root_screen_position`],
/// [`GizmoManager::axes_screen_angles`]) require a camera; by default none
/// is configured and those queries fail with
/// [`GizmoError::NoActiveCamera`](crate::GizmoError::NoActiveCamera).
///
/// [`GizmoManager::root_screen_position`]: crate::gizmo::GizmoManager::root_screen_position
/// [`GizmoManager::axes_screen_angles`]: crate::gizmo::GizmoManager::axes_screen_angles
#[derive(Debug, Copy, Clone)]
pub struct GizmoConfig {
    /// View matrix of the active camera.
    pub view_matrix: mint::RowMatrix4<f64>,
    /// Projection matrix of the active camera.
    pub projection_matrix: mint::RowMatrix4<f64>,
    /// Screen area the camera renders to.
    pub viewport: Rect,
}

impl Default for GizmoConfig {
    fn default() -> Self {
        Self {
            view_matrix: DMat4::IDENTITY.into(),
            projection_matrix: DMat4::IDENTITY.into(),
            viewport: Rect::NOTHING,
        }
    }
}

impl GizmoConfig {
    /// Whether an active camera has been configured.
    pub(crate) fn has_camera(&self) -> bool {
        self.viewport.is_finite() && self.viewport.area() > 0.0
    }

    /// Combined view-projection matrix.
    pub(crate) fn view_projection(&self) -> DMat4 {
        DMat4::from(self.projection_matrix) * DMat4::from(self.view_matrix)
    }
}
