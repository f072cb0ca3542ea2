use uuid::Uuid;

use crate::commands::{
    default_handlers, Command, CreateLevel, CreateWall, DestroyWall, Effect, MoveWall, SplitWall,
};
use crate::edit_log::{EditError, EditLog, TransactionId, TransactionRecord};
use crate::fixed::Fixed;
use crate::geometry::Point;
use crate::id::{ComponentId, LevelId};
use crate::plan::{Plan, PlanError};
use crate::settings::EditorSettings;
use crate::wall::{Wall, WallSummary};

/// The editing session: the plan, its edit log and the editor settings.
#[derive(Debug)]
pub struct World {
    /// Session identifier.
    pub id: Uuid,
    /// Project name.
    pub name: String,
    plan: Plan,
    edit_log: EditLog,
    settings: EditorSettings,
}

impl World {
    pub fn new(name: &str) -> Self {
        Self::with_settings(name, EditorSettings::default())
    }

    pub fn with_settings(name: &str, settings: EditorSettings) -> Self {
        let mut edit_log = EditLog::new();
        for handler in default_handlers() {
            let registered = edit_log.register(handler);
            debug_assert!(registered.is_ok(), "default handlers overlap: {:?}", registered);
        }
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            plan: Plan::new(),
            edit_log,
            settings,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn edit_log(&self) -> &EditLog {
        &self.edit_log
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EditorSettings {
        &mut self.settings
    }

    pub fn active_level(&self) -> LevelId {
        self.plan.active_level()
    }

    pub fn set_active_level(&mut self, level: LevelId) -> Result<(), PlanError> {
        self.plan.set_active_level(level)
    }

    pub fn wall(&self, id: ComponentId) -> Option<&Wall> {
        self.plan.wall(id)
    }

    pub fn walls(&self) -> impl Iterator<Item = &Wall> {
        self.plan.walls()
    }

    pub fn summaries(&self) -> Vec<WallSummary> {
        self.plan.walls().map(WallSummary::from).collect()
    }

    // ── Edit log ─────────────────────────────────────────────────────

    pub fn begin(&mut self, name: &str) -> Result<TransactionId, EditError> {
        self.edit_log.begin(name)
    }

    pub fn add(&mut self, command: Command) -> Result<Effect, EditError> {
        self.edit_log.add(&mut self.plan, command)
    }

    pub fn commit(&mut self, id: TransactionId) -> Result<(), EditError> {
        self.edit_log.commit(id)
    }

    pub fn rollback(&mut self, id: TransactionId) -> Result<(), EditError> {
        self.edit_log.rollback(&mut self.plan, id)
    }

    pub fn can_undo(&self) -> bool {
        self.edit_log.can_undo()
    }

    pub fn undo(&mut self) -> Result<(), EditError> {
        self.edit_log.undo(&mut self.plan)
    }

    pub fn can_redo(&self) -> bool {
        self.edit_log.can_redo()
    }

    pub fn redo(&mut self) -> Result<(), EditError> {
        self.edit_log.redo(&mut self.plan)
    }

    pub fn history(&self) -> Vec<TransactionRecord> {
        self.edit_log.history()
    }

    /// Run every command of a recorded transaction as one new transaction.
    pub fn apply(&mut self, record: &TransactionRecord) -> Result<(), EditError> {
        for command in &record.commands {
            for raw in command.ids() {
                self.plan.observe_id(raw)?;
            }
        }
        let id = self.begin(&record.name)?;
        for command in &record.commands {
            if let Err(err) = self.add(command.clone()) {
                self.rollback(id)?;
                return Err(err);
            }
        }
        self.commit(id)
    }

    /// Rebuild all pending footprints; call once per display tick.
    pub fn flush(&mut self) -> usize {
        self.plan.flush()
    }

    // ── One-transaction helpers ──────────────────────────────────────

    fn transact(&mut self, name: &str, command: Command) -> Result<Effect, EditError> {
        let id = self.begin(name)?;
        match self.add(command) {
            Ok(effect) => {
                self.commit(id)?;
                Ok(effect)
            }
            Err(err) => {
                self.rollback(id)?;
                Err(err)
            }
        }
    }

    pub fn create_level(&mut self, y: f64) -> Result<LevelId, EditError> {
        let id = self.plan.allocate_level_id()?;
        let command = Command::CreateLevel(CreateLevel {
            id,
            y: Fixed::from_f64(y),
        });
        self.transact("Create level", command)?;
        Ok(id)
    }

    /// Draw a wall on the active level with the default width and height.
    pub fn create_wall(&mut self, start: Point, end: Point) -> Result<ComponentId, EditError> {
        let (width, height) = (self.settings.wall_width, self.settings.wall_height);
        let level = self.active_level();
        self.create_wall_with(level, start, end, None, width, height)
    }

    pub fn create_wall_with(
        &mut self,
        level: LevelId,
        start: Point,
        end: Point,
        angle: Option<u16>,
        width: f64,
        height: f64,
    ) -> Result<ComponentId, EditError> {
        let id = self.plan.allocate_component_id()?;
        let command = Command::CreateWall(CreateWall::new(id, level, start, end, angle, width, height));
        self.transact("Create wall", command)?;
        Ok(id)
    }

    /// Split a wall at `at`; returns the id of the new second half.
    pub fn split_wall(&mut self, id: ComponentId, at: Point) -> Result<ComponentId, EditError> {
        let new_id = self.plan.allocate_component_id()?;
        let command = Command::SplitWall(SplitWall {
            id,
            new_id,
            at: at.into(),
        });
        self.transact("Split wall", command)?;
        Ok(new_id)
    }

    /// Build a move command for the open transaction; successive moves of
    /// the same wall merge into one undo step.
    pub fn move_command(&self, id: ComponentId, start: Point, end: Point) -> Result<Command, PlanError> {
        let wall = self.plan.wall(id).ok_or(PlanError::UnknownWall(id))?;
        Ok(Command::MoveWall(MoveWall {
            id,
            level: wall.level(),
            from_start: wall.start().into(),
            from_end: wall.end().into(),
            start: start.into(),
            end: end.into(),
        }))
    }

    pub fn move_wall(&mut self, id: ComponentId, start: Point, end: Point) -> Result<(), EditError> {
        let command = self.move_command(id, start, end)?;
        self.transact("Move wall", command)?;
        Ok(())
    }

    pub fn destroy_wall(&mut self, id: ComponentId) -> Result<(), EditError> {
        let wall = self.plan.wall(id).ok_or(PlanError::UnknownWall(id))?;
        let command = Command::DestroyWall(DestroyWall {
            id,
            level: wall.level(),
            start: wall.start().into(),
            end: wall.end().into(),
            angle: wall.angle(),
            width: Fixed::from_f64(wall.width()),
            height: Fixed::from_f64(wall.height()),
        });
        self.transact("Destroy wall", command)?;
        Ok(())
    }
}
