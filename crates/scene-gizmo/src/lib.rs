//! Core of an interactive 3d scene editor: multi-object selection,
//! transform gizmos and a paired undo/redo command stack.
//!
//! The crate does not render anything and does not own a scene graph.
//! The host supplies both through the [`Scene`] trait: scene-graph nodes
//! with a world transform, hierarchy bounding queries, ray casting and a
//! selection highlight layer. On top of that boundary, [`GizmoManager`]
//! aggregates any number of independently-transformed nodes under a single
//! manipulable root proxy, applies translate/rotate/scale drag gestures to
//! all of them at once, and commits every finished gesture as one grouped,
//! reversible entry on a [`CommandStack`].
//!
//! # Usage
//!
//! The host drives the manager from its input events:
//!
//! 1. Notify it of picked nodes with [`GizmoManager::add_node`] and
//!    [`GizmoManager::remove_node`].
//! 2. Stream handle-drag events into the matching gesture methods
//!    (`begin_*`, `update_*`, `end_*`).
//! 3. Call [`CommandStack::undo`] / [`CommandStack::redo`] from the edit
//!    menu, followed by [`GizmoManager::refresh_from_scene`].

mod snap;

pub mod command;
pub mod config;
pub mod gizmo;
pub mod math;
pub mod scene;

#[cfg(test)]
pub(crate) mod test_util;

pub mod prelude;

pub use prelude::*;

use thiserror::Error;

/// Failures of camera- or selection-dependent operations.
///
/// Everything listed here is a violated precondition. Benign situations,
/// such as undoing with an empty history or removing a node that was never
/// attached, are plain no-ops and do not surface as errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GizmoError {
    /// A screen-space query was made without a configured camera.
    #[error("no active camera: view/projection matrices and viewport are not set")]
    NoActiveCamera,
    /// A drag gesture was started while no nodes were attached.
    #[error("no nodes are attached to the gizmo")]
    NothingAttached,
}
