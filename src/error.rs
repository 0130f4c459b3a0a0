use crate::model::UnmetConstraint;
use thiserror::Error;

/// Entrée mal formée ou trop grande : non rejouable sans modifier la requête.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid window: end must be after start")]
    InvalidWindow,
    #[error("window spans {days} day(s), limit is {max_days}")]
    HorizonTooLong { days: i64, max_days: u32 },
    #[error("granularity must be a positive number of minutes")]
    InvalidGranularity,
    #[error("granularity of {granularity} min does not evenly divide a window of {window_minutes} min")]
    UnevenGranularity { granularity: u32, window_minutes: i64 },
    #[error("timeline would contain {slots} slots, limit is {max_slots}")]
    TooManySlots { slots: i64, max_slots: usize },
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    #[error("quiet hours range is empty: {0}")]
    EmptyQuietHours(String),
    #[error("time budget must be a finite, non-negative number of seconds")]
    InvalidTimeBudget,
    #[error("model would hold {variables} worker-slot variables, limit is {max_variables}")]
    TooManyVariables { variables: u64, max_variables: u64 },
}

/// Contraintes impossibles à satisfaire, détectées avant la recherche.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelBuildError {
    #[error("duplicate role: {0}")]
    DuplicateRole(String),
    #[error("invalid constraint for role {role}: {reason}")]
    InvalidConstraint { role: String, reason: &'static str },
    #[error("constraints cannot be met: {}", summarize(.0))]
    Unsatisfiable(Vec<UnmetConstraint>),
    /// Modèle trop grand pour être construit ; remonté comme erreur de configuration.
    #[error(transparent)]
    Oversized(#[from] ConfigurationError),
}

fn summarize(unmet: &[UnmetConstraint]) -> String {
    unmet
        .iter()
        .map(|u| format!("{} ({}): {}", u.role, u.kind, u.detail))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    ModelBuild(#[from] ModelBuildError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
