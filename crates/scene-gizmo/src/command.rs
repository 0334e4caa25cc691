//! Reversible edits and the two-stack undo/redo log.
//!
//! Every committed mutation is an [`EditCommand`] whose `execute` is an
//! idempotent forward mutation and whose `undo` is its exact inverse.
//! [`CommandStack`] keeps standard linear history: executing a new command
//! while undone commands exist discards the redo branch.
//!
//! The stack is an explicitly constructed context object. The host creates
//! one and passes it wherever edits are committed; nothing here is global.

use enum_dispatch::enum_dispatch;

use crate::math::{DMat4, DQuat};
use crate::scene::{NodeId, Scene, TransformSnapshot, orientation_of};

/// A reversible edit.
#[enum_dispatch]
pub trait Command {
    /// Display name for undo/redo menus. Not used for any logic.
    fn name(&self) -> &str;

    /// Applies the edit. Must be idempotent: re-executing an already
    /// applied command (as `redo` does) yields the same scene state.
    fn execute(&self, scene: &mut dyn Scene);

    /// Exactly inverts [`Command::execute`].
    fn undo(&self, scene: &mut dyn Scene);
}

/// Every command kind the editor can put on the stack.
#[enum_dispatch(Command)]
#[derive(Debug, Clone)]
pub enum EditCommand {
    Transform(TransformCommand),
    CreateObject(CreateObjectCommand),
    DeleteObject(DeleteObjectCommand),
    Group(GroupCommand),
}

/// Two-stack undo/redo log.
///
/// All calls are synchronous and single-threaded. Re-entering the stack
/// from inside a command's `execute`/`undo` is undefined behavior and must
/// be avoided by construction; a command that panics mid-flight leaves the
/// stack inconsistent and is treated as fatal.
#[derive(Debug, Default)]
pub struct CommandStack {
    history: Vec<EditCommand>,
    redo: Vec<EditCommand>,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the command and appends it to the history.
    ///
    /// Any previously undone commands become unreachable: linear undo,
    /// not a history tree.
    pub fn execute(&mut self, command: EditCommand, scene: &mut dyn Scene) {
        log::debug!("execute command: {}", command.name());
        command.execute(scene);
        self.history.push(command);
        self.redo.clear();
    }

    /// Reverts the most recent command. No-op when the history is empty.
    pub fn undo(&mut self, scene: &mut dyn Scene) {
        if let Some(command) = self.history.pop() {
            log::debug!("undo command: {}", command.name());
            command.undo(scene);
            self.redo.push(command);
        }
    }

    /// Re-applies the most recently undone command. No-op when nothing
    /// has been undone.
    pub fn redo(&mut self, scene: &mut dyn Scene) {
        if let Some(command) = self.redo.pop() {
            log::debug!("redo command: {}", command.name());
            command.execute(scene);
            self.history.push(command);
        }
    }

    /// True when there is nothing to undo. For UI enablement.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// True when there is nothing to redo. For UI enablement.
    pub fn is_redo_empty(&self) -> bool {
        self.redo.is_empty()
    }
}

/// Captures a single node's transform change.
///
/// Constructed at gesture end from the node's current (post-drag) state
/// and the pre-drag [`TransformSnapshot`].
#[derive(Debug, Clone)]
pub struct TransformCommand {
    node: NodeId,
    old_matrix: DMat4,
    new_matrix: DMat4,
    old_orientation: DQuat,
    new_orientation: DQuat,
}

impl TransformCommand {
    /// Creates a command from the node's current transform and its
    /// pre-edit snapshot.
    pub fn new(scene: &dyn Scene, node: NodeId, before: &TransformSnapshot) -> Self {
        Self {
            node,
            old_matrix: before.matrix,
            new_matrix: scene.world_matrix(node),
            old_orientation: before.orientation,
            new_orientation: orientation_of(scene, node),
        }
    }
}

impl Command for TransformCommand {
    fn name(&self) -> &str {
        "Move Object"
    }

    fn execute(&self, scene: &mut dyn Scene) {
        // Orientation first: hosts that derive the world matrix lazily from
        // local TRS would otherwise overwrite the frozen matrix.
        scene.set_orientation(self.node, self.new_orientation);
        scene.freeze_world_matrix(self.node, self.new_matrix);
    }

    fn undo(&self, scene: &mut dyn Scene) {
        scene.set_orientation(self.node, self.old_orientation);
        scene.freeze_world_matrix(self.node, self.old_matrix);
    }
}

/// Registers or unregisters a node and its full subtree with the scene.
fn visit_subtree(scene: &mut dyn Scene, node: NodeId, remove: bool) {
    if remove {
        scene.remove_from_scene(node);
    } else {
        scene.add_to_scene(node);
    }
    for child in scene.children(node) {
        visit_subtree(scene, child, remove);
    }
}

/// The reversible act of adding a node (and its subtree) to the scene.
///
/// Placement of the new object happens once, before this command is
/// constructed. Execute/redo only re-register the subtree; they never
/// re-run placement ray casts against a possibly-changed scene.
#[derive(Debug, Clone)]
pub struct CreateObjectCommand {
    node: NodeId,
}

impl CreateObjectCommand {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl Command for CreateObjectCommand {
    fn name(&self) -> &str {
        "Create Object"
    }

    fn execute(&self, scene: &mut dyn Scene) {
        visit_subtree(scene, self.node, false);
    }

    fn undo(&self, scene: &mut dyn Scene) {
        visit_subtree(scene, self.node, true);
    }
}

/// The reversible act of removing a node (and its subtree) from the scene.
#[derive(Debug, Clone)]
pub struct DeleteObjectCommand {
    node: NodeId,
}

impl DeleteObjectCommand {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl Command for DeleteObjectCommand {
    fn name(&self) -> &str {
        "Delete Object"
    }

    fn execute(&self, scene: &mut dyn Scene) {
        visit_subtree(scene, self.node, true);
    }

    fn undo(&self, scene: &mut dyn Scene) {
        visit_subtree(scene, self.node, false);
    }
}

/// Several commands treated as one atomic undo-stack entry.
///
/// Used for multi-object edits: one sub-command per selected node. Undo
/// iterates the same forward order as execute; sub-commands operate on
/// disjoint nodes, so their relative order does not matter.
#[derive(Debug, Clone, Default)]
pub struct GroupCommand {
    commands: Vec<EditCommand>,
}

impl GroupCommand {
    pub fn new(commands: Vec<EditCommand>) -> Self {
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

impl Command for GroupCommand {
    fn name(&self) -> &str {
        "Group Action"
    }

    fn execute(&self, scene: &mut dyn Scene) {
        for command in &self.commands {
            command.execute(scene);
        }
    }

    fn undo(&self, scene: &mut dyn Scene) {
        for command in &self.commands {
            command.undo(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{DVec3, translation_matrix};
    use crate::test_util::TestScene;

    fn translate(scene: &mut TestScene, node: NodeId, delta: DVec3) -> TransformCommand {
        let before = TransformSnapshot::capture(scene, node);
        let moved = translation_matrix(delta) * scene.world_matrix(node);
        scene.freeze_world_matrix(node, moved);
        TransformCommand::new(scene, node, &before)
    }

    #[test]
    fn undo_then_redo_restores_executed_state() {
        let mut scene = TestScene::new();
        let node = scene.add_box(DVec3::ZERO, DVec3::ONE);
        let mut stack = CommandStack::new();

        for step in 0..3 {
            let command = translate(&mut scene, node, DVec3::new(1.0 + step as f64, 0.0, 0.0));
            stack.execute(command.into(), &mut scene);
        }
        let executed = scene.world_matrix(node);

        for _ in 0..3 {
            stack.undo(&mut scene);
        }
        assert_eq!(scene.world_matrix(node), DMat4::IDENTITY);

        for _ in 0..3 {
            stack.redo(&mut scene);
        }
        assert_eq!(scene.world_matrix(node), executed);
    }

    #[test]
    fn execute_clears_redo_stack() {
        let mut scene = TestScene::new();
        let node = scene.add_box(DVec3::ZERO, DVec3::ONE);
        let mut stack = CommandStack::new();

        let command = translate(&mut scene, node, DVec3::X);
        stack.execute(command.into(), &mut scene);
        stack.undo(&mut scene);
        assert!(!stack.is_redo_empty());

        let command = translate(&mut scene, node, DVec3::Y);
        stack.execute(command.into(), &mut scene);
        assert!(stack.is_redo_empty());
    }

    #[test]
    fn undo_and_redo_on_empty_stacks_are_no_ops() {
        let mut scene = TestScene::new();
        let node = scene.add_box(DVec3::new(4.0, 0.0, 0.0), DVec3::ONE);
        let before = scene.world_matrix(node);

        let mut stack = CommandStack::new();
        stack.undo(&mut scene);
        stack.redo(&mut scene);

        assert!(stack.is_empty());
        assert!(stack.is_redo_empty());
        assert_eq!(scene.world_matrix(node), before);
    }

    #[test]
    fn group_command_reverts_all_members() {
        let mut scene = TestScene::new();
        let nodes = [
            scene.add_box(DVec3::ZERO, DVec3::ONE),
            scene.add_box(DVec3::new(3.0, 0.0, 0.0), DVec3::ONE),
            scene.add_box(DVec3::new(6.0, 0.0, 0.0), DVec3::ONE),
        ];
        let originals: Vec<DMat4> = nodes.iter().map(|n| scene.world_matrix(*n)).collect();

        let mut stack = CommandStack::new();
        let commands = nodes
            .iter()
            .map(|node| translate(&mut scene, *node, DVec3::new(0.0, 2.0, 0.0)).into())
            .collect();
        stack.execute(GroupCommand::new(commands).into(), &mut scene);

        stack.undo(&mut scene);
        for (node, original) in nodes.iter().zip(&originals) {
            assert_eq!(scene.world_matrix(*node), *original);
        }
    }

    #[test]
    fn transform_command_restores_orientation() {
        let mut scene = TestScene::new();
        let node = scene.add_box(DVec3::ZERO, DVec3::ONE);
        let mut stack = CommandStack::new();

        let before = TransformSnapshot::capture(&scene, node);
        let rotation = DQuat::from_rotation_y(0.7);
        scene.set_orientation(node, rotation);
        scene.freeze_world_matrix(node, DMat4::from_quat(rotation));
        stack.execute(
            TransformCommand::new(&scene, node, &before).into(),
            &mut scene,
        );

        stack.undo(&mut scene);
        assert_eq!(scene.orientation(node), Some(DQuat::IDENTITY));
        assert_eq!(scene.world_matrix(node), DMat4::IDENTITY);

        stack.redo(&mut scene);
        assert_eq!(scene.orientation(node), Some(rotation));
    }

    #[test]
    fn create_and_delete_walk_the_subtree() {
        let mut scene = TestScene::new();
        let parent = scene.add_box(DVec3::ZERO, DVec3::ONE);
        let child = scene.add_box(DVec3::new(0.0, 2.0, 0.0), DVec3::ONE);
        scene.set_parent(child, parent);

        let mut stack = CommandStack::new();
        stack.execute(DeleteObjectCommand::new(parent).into(), &mut scene);
        assert!(!scene.is_in_scene(parent));
        assert!(!scene.is_in_scene(child));

        stack.undo(&mut scene);
        assert!(scene.is_in_scene(parent));
        assert!(scene.is_in_scene(child));

        let mut stack = CommandStack::new();
        stack.execute(CreateObjectCommand::new(parent).into(), &mut scene);
        assert!(scene.is_in_scene(parent));
        stack.undo(&mut scene);
        assert!(!scene.is_in_scene(parent));
    }
}
