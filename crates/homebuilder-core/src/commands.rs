use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edit_log::EditError;
use crate::fixed::{Fixed, FixedPoint};
use crate::geometry::Point;
use crate::id::{ComponentId, LevelId};
use crate::plan::{Plan, PlanError};

// ══════════════════════════════════════════════════════════════════════
// Command records
// ══════════════════════════════════════════════════════════════════════

/// Every edit that can be journaled. Plain data: handlers give them meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    CreateLevel(CreateLevel),
    CreateWall(CreateWall),
    SplitWall(SplitWall),
    MoveWall(MoveWall),
    DestroyWall(DestroyWall),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateLevel(_) => CommandKind::CreateLevel,
            Command::CreateWall(_) => CommandKind::CreateWall,
            Command::SplitWall(_) => CommandKind::SplitWall,
            Command::MoveWall(_) => CommandKind::MoveWall,
            Command::DestroyWall(_) => CommandKind::DestroyWall,
        }
    }

    /// Every raw id the command names, for replaying into an allocator.
    pub fn ids(&self) -> Vec<u64> {
        match self {
            Command::CreateLevel(c) => vec![c.id.raw()],
            Command::CreateWall(c) => vec![c.id.raw(), c.level.raw()],
            Command::SplitWall(c) => vec![c.id.raw(), c.new_id.raw()],
            Command::MoveWall(c) => vec![c.id.raw(), c.level.raw()],
            Command::DestroyWall(c) => vec![c.id.raw(), c.level.raw()],
        }
    }
}

/// Names the handler responsible for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    CreateLevel,
    CreateWall,
    SplitWall,
    MoveWall,
    DestroyWall,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::CreateLevel => "CreateLevel",
            CommandKind::CreateWall => "CreateWall",
            CommandKind::SplitWall => "SplitWall",
            CommandKind::MoveWall => "MoveWall",
            CommandKind::DestroyWall => "DestroyWall",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLevel {
    pub id: LevelId,
    pub y: Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWall {
    pub id: ComponentId,
    pub level: LevelId,
    pub start: FixedPoint,
    pub end: FixedPoint,
    /// `None` derives the angle from the two points.
    pub angle: Option<u16>,
    pub width: Fixed,
    pub height: Fixed,
}

impl CreateWall {
    pub fn new(
        id: ComponentId,
        level: LevelId,
        start: Point,
        end: Point,
        angle: Option<u16>,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id,
            level,
            start: start.into(),
            end: end.into(),
            angle,
            width: width.into(),
            height: height.into(),
        }
    }
}

/// `id` keeps `start → at`, `new_id` takes `at → end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitWall {
    pub id: ComponentId,
    pub new_id: ComponentId,
    pub at: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveWall {
    pub id: ComponentId,
    pub level: LevelId,
    pub from_start: FixedPoint,
    pub from_end: FixedPoint,
    pub start: FixedPoint,
    pub end: FixedPoint,
}

/// Carries everything needed to recreate the wall on undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyWall {
    pub id: ComponentId,
    pub level: LevelId,
    pub start: FixedPoint,
    pub end: FixedPoint,
    pub angle: u16,
    pub width: Fixed,
    pub height: Fixed,
}

// ══════════════════════════════════════════════════════════════════════
// Handlers
// ══════════════════════════════════════════════════════════════════════

/// What executing a command did to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    LevelCreated(LevelId),
    WallCreated(ComponentId),
    WallSplit { kept: ComponentId, created: ComponentId },
    WallMoved(ComponentId),
    WallDestroyed(ComponentId),
}

/// Applies and reverses one kind of command.
///
/// Handlers must leave the plan untouched when they return an error.
pub trait CommandHandler: fmt::Debug {
    fn kind(&self) -> CommandKind;

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError>;

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError>;

    /// Handlers whose consecutive commands can coalesce into one step.
    fn as_mergeable(&self) -> Option<&dyn Mergeable> {
        None
    }
}

pub trait Mergeable {
    /// Fold `next` into `previous`, or `None` when they must stay separate.
    fn merge(&self, previous: &Command, next: &Command) -> Option<Command>;
}

fn wrong_command(handler: CommandKind, command: &Command) -> EditError {
    EditError::WrongCommand {
        handler,
        command: command.kind(),
    }
}

#[derive(Debug, Default)]
pub struct CreateLevelHandler;

impl CommandHandler for CreateLevelHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateLevel
    }

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError> {
        let Command::CreateLevel(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.create_level(c.id, c.y.to_f64())?;
        Ok(Effect::LevelCreated(c.id))
    }

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError> {
        let Command::CreateLevel(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.remove_level(c.id)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CreateWallHandler;

impl CommandHandler for CreateWallHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateWall
    }

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError> {
        let Command::CreateWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.create_wall(
            c.id,
            c.level,
            c.start.to_point(),
            c.end.to_point(),
            c.angle,
            c.width.to_f64(),
            c.height.to_f64(),
        )?;
        Ok(Effect::WallCreated(c.id))
    }

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError> {
        let Command::CreateWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.destroy_wall(c.id)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SplitWallHandler;

impl CommandHandler for SplitWallHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::SplitWall
    }

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError> {
        let Command::SplitWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        let at = c.at.to_point();
        let wall = plan.wall(c.id).ok_or(PlanError::UnknownWall(c.id))?;
        wall.check_split(&at).map_err(PlanError::from)?;
        if plan.wall(c.new_id).is_some() || plan.level(LevelId::from_raw(c.new_id.raw())).is_some() {
            return Err(PlanError::DuplicateId(c.new_id.raw()).into());
        }
        let (level, start, end) = (wall.level(), wall.start(), wall.end());
        let (angle, width, height) = (wall.angle(), wall.width(), wall.height());

        plan.set_wall(c.id, start, at)?;
        if let Err(err) = plan
            .create_wall(c.new_id, level, at, end, Some(angle), width, height)
            .map(|_| ())
        {
            plan.set_wall(c.id, start, end)?;
            return Err(err.into());
        }
        Ok(Effect::WallSplit {
            kept: c.id,
            created: c.new_id,
        })
    }

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError> {
        let Command::SplitWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        let start = plan.wall(c.id).ok_or(PlanError::UnknownWall(c.id))?.start();
        let removed = plan.destroy_wall(c.new_id)?;
        plan.set_wall(c.id, start, removed.end())?;
        Ok(())
    }
}

/// Moves are mergeable: a drag becomes a single undo step.
#[derive(Debug, Default)]
pub struct MoveWallHandler;

impl CommandHandler for MoveWallHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveWall
    }

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError> {
        let Command::MoveWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.set_wall(c.id, c.start.to_point(), c.end.to_point())?;
        Ok(Effect::WallMoved(c.id))
    }

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError> {
        let Command::MoveWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.set_wall(c.id, c.from_start.to_point(), c.from_end.to_point())?;
        Ok(())
    }

    fn as_mergeable(&self) -> Option<&dyn Mergeable> {
        Some(self)
    }
}

impl Mergeable for MoveWallHandler {
    fn merge(&self, previous: &Command, next: &Command) -> Option<Command> {
        match (previous, next) {
            (Command::MoveWall(first), Command::MoveWall(last)) if first.id == last.id => {
                Some(Command::MoveWall(MoveWall {
                    id: first.id,
                    level: first.level,
                    from_start: first.from_start,
                    from_end: first.from_end,
                    start: last.start,
                    end: last.end,
                }))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DestroyWallHandler;

impl CommandHandler for DestroyWallHandler {
    fn kind(&self) -> CommandKind {
        CommandKind::DestroyWall
    }

    fn execute(&self, plan: &mut Plan, command: &Command) -> Result<Effect, EditError> {
        let Command::DestroyWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.destroy_wall(c.id)?;
        Ok(Effect::WallDestroyed(c.id))
    }

    fn undo(&self, plan: &mut Plan, command: &Command) -> Result<(), EditError> {
        let Command::DestroyWall(c) = command else {
            return Err(wrong_command(self.kind(), command));
        };
        plan.create_wall(
            c.id,
            c.level,
            c.start.to_point(),
            c.end.to_point(),
            Some(c.angle),
            c.width.to_f64(),
            c.height.to_f64(),
        )?;
        Ok(())
    }
}

/// One handler per command kind, in registration order.
pub fn default_handlers() -> Vec<Box<dyn CommandHandler>> {
    vec![
        Box::new(CreateLevelHandler),
        Box::new(CreateWallHandler),
        Box::new(SplitWallHandler),
        Box::new(MoveWallHandler),
        Box::new(DestroyWallHandler),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: f64, z: f64) -> Point {
        Point::new(x, 0.0, z)
    }

    fn create(id: u64, start: Point, end: Point) -> Command {
        Command::CreateWall(CreateWall::new(
            ComponentId::from_raw(id),
            LevelId::from_raw(1),
            start,
            end,
            None,
            0.4,
            2.4,
        ))
    }

    #[test]
    fn test_command_json_shape() {
        let split = Command::SplitWall(SplitWall {
            id: ComponentId::from_raw(2),
            new_id: ComponentId::from_raw(3),
            at: p(2.0, 0.0).into(),
        });
        let json = serde_json::to_value(&split).unwrap();
        assert_eq!(json["type"], "SplitWall");
        assert_eq!(json["newId"], 3);
        assert_eq!(json["at"]["x"], 200_000_000);

        let created = serde_json::to_value(create(2, p(0.0, 0.0), p(4.0, 0.0))).unwrap();
        assert!(created["angle"].is_null());
        assert_eq!(created["level"], 1);
    }

    #[test]
    fn test_create_wall_execute_and_undo() {
        let mut plan = Plan::new();
        let command = create(2, p(0.0, 0.0), p(4.0, 0.0));
        let effect = CreateWallHandler.execute(&mut plan, &command).unwrap();
        assert_eq!(effect, Effect::WallCreated(ComponentId::from_raw(2)));
        assert_eq!(plan.wall_count(), 1);
        CreateWallHandler.undo(&mut plan, &command).unwrap();
        assert_eq!(plan.wall_count(), 0);
    }

    #[test]
    fn test_wrong_command_rejected() {
        let mut plan = Plan::new();
        let command = create(2, p(0.0, 0.0), p(4.0, 0.0));
        let err = SplitWallHandler.execute(&mut plan, &command).unwrap_err();
        assert!(matches!(
            err,
            EditError::WrongCommand {
                handler: CommandKind::SplitWall,
                command: CommandKind::CreateWall
            }
        ));
    }

    #[test]
    fn test_split_then_undo() {
        let mut plan = Plan::new();
        CreateWallHandler
            .execute(&mut plan, &create(2, p(0.0, 0.0), p(4.0, 0.0)))
            .unwrap();
        let split = Command::SplitWall(SplitWall {
            id: ComponentId::from_raw(2),
            new_id: ComponentId::from_raw(3),
            at: p(2.0, 0.0).into(),
        });
        SplitWallHandler.execute(&mut plan, &split).unwrap();
        let kept = plan.wall(ComponentId::from_raw(2)).unwrap();
        let created = plan.wall(ComponentId::from_raw(3)).unwrap();
        assert_eq!(kept.end(), p(2.0, 0.0));
        assert_eq!(created.start(), p(2.0, 0.0));
        assert_eq!(created.end(), p(4.0, 0.0));
        assert_eq!(created.angle(), kept.angle());

        SplitWallHandler.undo(&mut plan, &split).unwrap();
        assert_eq!(plan.wall_count(), 1);
        assert_eq!(plan.wall(ComponentId::from_raw(2)).unwrap().end(), p(4.0, 0.0));
    }

    #[test]
    fn test_split_off_the_wall_leaves_plan_untouched() {
        let mut plan = Plan::new();
        CreateWallHandler
            .execute(&mut plan, &create(2, p(0.0, 0.0), p(4.0, 0.0)))
            .unwrap();
        let split = Command::SplitWall(SplitWall {
            id: ComponentId::from_raw(2),
            new_id: ComponentId::from_raw(3),
            at: p(2.0, 1.0).into(),
        });
        assert!(SplitWallHandler.execute(&mut plan, &split).is_err());
        assert_eq!(plan.wall_count(), 1);
        assert_eq!(plan.wall(ComponentId::from_raw(2)).unwrap().end(), p(4.0, 0.0));
    }

    #[test]
    fn test_moves_of_same_wall_merge() {
        let id = ComponentId::from_raw(2);
        let step = |from: (Point, Point), to: (Point, Point)| {
            Command::MoveWall(MoveWall {
                id,
                level: LevelId::from_raw(1),
                from_start: from.0.into(),
                from_end: from.1.into(),
                start: to.0.into(),
                end: to.1.into(),
            })
        };
        let first = step((p(0.0, 0.0), p(4.0, 0.0)), (p(0.0, 1.0), p(4.0, 1.0)));
        let second = step((p(0.0, 1.0), p(4.0, 1.0)), (p(0.0, 2.0), p(4.0, 2.0)));
        let merged = MoveWallHandler.merge(&first, &second).unwrap();
        let Command::MoveWall(merged) = merged else {
            panic!("merge changed the command kind");
        };
        assert_eq!(merged.from_start.to_point(), p(0.0, 0.0));
        assert_eq!(merged.end.to_point(), p(4.0, 2.0));

        assert!(MoveWallHandler.merge(&first, &create(3, p(0.0, 0.0), p(1.0, 0.0))).is_none());
        assert!(CreateWallHandler.as_mergeable().is_none());
        assert!(MoveWallHandler.as_mergeable().is_some());
    }

    #[test]
    fn test_destroy_undo_recreates_same_wall() {
        let mut plan = Plan::new();
        CreateWallHandler
            .execute(&mut plan, &create(2, p(0.0, 0.0), p(3.0, 3.0)))
            .unwrap();
        let destroy = Command::DestroyWall(DestroyWall {
            id: ComponentId::from_raw(2),
            level: LevelId::from_raw(1),
            start: p(0.0, 0.0).into(),
            end: p(3.0, 3.0).into(),
            angle: 45,
            width: Fixed::from_f64(0.4),
            height: Fixed::from_f64(2.4),
        });
        DestroyWallHandler.execute(&mut plan, &destroy).unwrap();
        assert!(plan.wall(ComponentId::from_raw(2)).is_none());
        DestroyWallHandler.undo(&mut plan, &destroy).unwrap();
        let wall = plan.wall(ComponentId::from_raw(2)).unwrap();
        assert_eq!(wall.angle(), 45);
        assert_eq!(wall.end(), p(3.0, 3.0));
    }

    fn fixed_point() -> impl Strategy<Value = FixedPoint> {
        (any::<i32>(), any::<i32>(), any::<i32>()).prop_map(|(x, y, z)| FixedPoint {
            x: Fixed::from_raw(x.into()),
            y: Fixed::from_raw(y.into()),
            z: Fixed::from_raw(z.into()),
        })
    }

    fn command() -> impl Strategy<Value = Command> {
        let id = (1u64..1_000_000).prop_map(ComponentId::from_raw);
        let level = (1u64..1_000_000).prop_map(LevelId::from_raw);
        prop_oneof![
            (level.clone(), any::<i32>()).prop_map(|(id, y)| Command::CreateLevel(CreateLevel {
                id,
                y: Fixed::from_raw(y.into()),
            })),
            (id.clone(), level.clone(), fixed_point(), fixed_point(), proptest::option::of(0u16..360))
                .prop_map(|(id, level, start, end, angle)| Command::CreateWall(CreateWall {
                    id,
                    level,
                    start,
                    end,
                    angle,
                    width: Fixed::from_raw(40_000_000),
                    height: Fixed::from_raw(240_000_000),
                })),
            (id.clone(), id.clone(), fixed_point())
                .prop_map(|(id, new_id, at)| Command::SplitWall(SplitWall { id, new_id, at })),
            (id.clone(), level.clone(), fixed_point(), fixed_point(), fixed_point(), fixed_point()).prop_map(
                |(id, level, from_start, from_end, start, end)| Command::MoveWall(MoveWall {
                    id,
                    level,
                    from_start,
                    from_end,
                    start,
                    end,
                })
            ),
            (id, level, fixed_point(), fixed_point(), 0u16..360).prop_map(|(id, level, start, end, angle)| {
                Command::DestroyWall(DestroyWall {
                    id,
                    level,
                    start,
                    end,
                    angle,
                    width: Fixed::from_raw(40_000_000),
                    height: Fixed::from_raw(240_000_000),
                })
            }),
        ]
    }

    proptest! {
        #[test]
        fn commands_survive_json(command in command()) {
            let json = serde_json::to_string(&command).unwrap();
            let back: Command = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(&back, &command);
            prop_assert_eq!(serde_json::to_string(&back).unwrap(), json);
        }
    }
}
