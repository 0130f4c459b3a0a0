#![forbid(unsafe_code)]
//! Shiftplan — moteur de proposition de plannings d'équipes.
//!
//! - Fenêtre bornée découpée en slots réguliers (UTC), heures calmes locales.
//! - Contraintes par rôle : effectif exact, heures max, repos minimal.
//! - Propagation + branch-and-bound déterministe sous budget de temps.
//! - Réponse JSON/CSV ; diagnostic des contraintes insatisfaites.

pub mod calendar;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;
pub mod pool;
pub mod roster;
pub mod solver;

pub use calendar::{parse_timezone, CalendarLimits, IntervalCalendar, Timeline, TimelineSlot};
pub use config::{EngineConfig, ObjectiveWeights, SolverConfig};
pub use constraints::{ConstraintModel, ModelBuilder};
pub use engine::Engine;
pub use error::{ConfigurationError, ModelBuildError, ScheduleError};
pub use model::{
    ConstraintKind, ProposalRequest, ProposalResponse, QuietHours, RoleConstraint, ScheduleWindow,
    SolvedAssignment, SolverOutcome, SolverStatus, UnmetConstraint,
};
pub use pool::SolverPool;
pub use solver::{CancelFlag, Solution, Solver};
