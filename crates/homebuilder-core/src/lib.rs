//! # HomeBuilder Core
//!
//! Parametric wall geometry for a floor-plan editor: walls on levels,
//! mitred footprints, snap directions and alignment guides, an R-tree over
//! footprint bounds, and a transactional undo/redo edit log driven by
//! serializable commands.
//!
//! Every change to the plan is a [`Command`] run through the [`EditLog`];
//! footprints are rebuilt lazily at [`Plan::flush`].

pub mod commands;
pub mod edit_log;
pub mod fixed;
pub mod footprint;
pub mod geometry;
pub mod id;
pub mod level;
pub mod plan;
pub mod settings;
pub mod shapes;
pub mod snap;
pub mod spatial;
pub mod wall;
pub mod world;

pub use commands::{Command, CommandHandler, CommandKind, Effect, Mergeable};
pub use edit_log::{EditError, EditLog, TransactionId, TransactionRecord};
pub use footprint::WallFootprint;
pub use geometry::{BoundingRect, Direction, LineIntersection, Point, Point2, Polygon};
pub use id::{ComponentId, IdAllocator, IdExhausted, LevelId};
pub use level::Level;
pub use plan::{Plan, PlanError};
pub use settings::EditorSettings;
pub use wall::{Wall, WallEnd, WallError, WallSummary};
pub use world::World;
