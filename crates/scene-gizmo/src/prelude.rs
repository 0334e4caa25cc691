pub use crate::GizmoError;
pub use crate::command::{
    Command, CommandStack, CreateObjectCommand, DeleteObjectCommand, EditCommand, GroupCommand,
    TransformCommand,
};
pub use crate::config::{GizmoAxis, GizmoConfig, GizmoMode, GizmoSpace};
pub use crate::gizmo::{GizmoListener, GizmoManager, NullListener, RootProxy, ScaleHandle};
pub use crate::math::BoundingBox;
pub use crate::scene::{NodeId, RayHit, Scene, TransformSnapshot};
pub use crate::snap::SnapOptions;

pub use emath::{Pos2, Rect, Vec2};
pub use mint;
