pub use emath::{Pos2, Rect, Vec2};
pub use glam::{DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, Vec4Swizzles};

/// Axis-aligned min/max extents in some reference frame.
///
/// Which frame the corners live in depends on the query that produced the
/// box: plain hierarchy bounds are world-space, while the boxes returned by
/// [`GizmoManager::bounding_min_max`](crate::gizmo::GizmoManager::bounding_min_max)
/// are expressed in the de-rotated frame of the given orientation.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    /// Degenerate box at the origin. Returned for empty selections.
    pub const ZERO: Self = Self {
        min: DVec3::ZERO,
        max: DVec3::ZERO,
    };

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Midpoint of the box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Builds a pure translation matrix from a delta vector.
pub(crate) fn translation_matrix(delta: DVec3) -> DMat4 {
    DMat4::from_translation(delta)
}

/// Builds a diagonal scale matrix from componentwise ratios.
///
/// Absolute values are used so that a drag crossing the pivot cannot flip
/// the selection inside out.
pub(crate) fn scale_ratio_matrix(ratio: DVec3) -> DMat4 {
    DMat4::from_scale(ratio.abs())
}

/// Normalizes a handle drag axis to unit-max-component proportions.
///
/// A face handle axis maps to a single principal direction, a corner handle
/// axis to the proportional mix of directions its diagonal covers.
pub(crate) fn axis_to_proportions(axis: DVec3) -> DVec3 {
    let max = axis.x.abs().max(axis.y.abs()).max(axis.z.abs());
    if max > 0.0 { axis.abs() / max } else { axis }
}

/// Calculates 2d screen coordinates from 3d world coordinates
pub(crate) fn world_to_screen(viewport: Rect, mvp: DMat4, pos: DVec3) -> Option<Pos2> {
    let mut pos = mvp * DVec4::from((pos, 1.0));

    if pos.w < 1e-10 {
        return None;
    }

    pos /= pos.w;
    pos.y *= -1.0;

    let center = viewport.center();

    Some(Pos2::new(
        (center.x as f64 + pos.x * viewport.width() as f64 / 2.0) as f32,
        (center.y as f64 + pos.y * viewport.height() as f64 / 2.0) as f32,
    ))
}
