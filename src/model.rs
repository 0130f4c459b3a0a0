use crate::error::ConfigurationError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fenêtre de planification, horodatages avec offset (RFC3339).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ScheduleWindow {
    /// Crée une fenêtre en validant que `end > start`.
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, ConfigurationError> {
        if end <= start {
            return Err(ConfigurationError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Vrai si `[start, end)` (UTC) recoupe la fenêtre.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end.with_timezone(&Utc) && self.start.with_timezone(&Utc) < end
    }
}

/// Plage calme quotidienne (heure locale). `end < start` traverse minuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ConfigurationError> {
        let q = Self { start, end };
        q.validate()?;
        Ok(q)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.start == self.end {
            return Err(ConfigurationError::EmptyQuietHours(self.to_string()));
        }
        Ok(())
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Projection de la plage sur un jour calendaire local.
    pub fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start);
        let mut end = date.and_time(self.end);
        if self.wraps_midnight() {
            end += Duration::days(1);
        }
        (start, end)
    }
}

impl fmt::Display for QuietHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|_| de::Error::custom(format!("invalid time of day: {raw}")))
    }
}

/// Besoin en personnel d'un rôle sur la fenêtre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConstraint {
    pub role: String,
    pub headcount: u32,
    #[serde(default, alias = "maxHours", skip_serializing_if = "Option::is_none")]
    pub max_hours: Option<f64>,
    #[serde(default, alias = "minRestHours", skip_serializing_if = "Option::is_none")]
    pub min_rest_hours: Option<f64>,
    /// Nombre de personnes anonymes mobilisables ; dérivé si absent.
    #[serde(default, alias = "poolSize", skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,
    /// Sous-fenêtre à couvrir ; tout l'horizon non calme si absente.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ScheduleWindow>,
}

impl RoleConstraint {
    pub fn new<R: Into<String>>(role: R, headcount: u32) -> Self {
        Self {
            role: role.into(),
            headcount,
            max_hours: None,
            min_rest_hours: None,
            pool_size: None,
            active: None,
        }
    }

    pub fn with_max_hours(mut self, hours: f64) -> Self {
        self.max_hours = Some(hours);
        self
    }

    pub fn with_min_rest_hours(mut self, hours: f64) -> Self {
        self.min_rest_hours = Some(hours);
        self
    }

    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    pub fn with_active(mut self, window: ScheduleWindow) -> Self {
        self.active = Some(window);
        self
    }
}

/// Requête de proposition de planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub window: ScheduleWindow,
    #[serde(default)]
    pub constraints: Vec<RoleConstraint>,
    #[serde(default, alias = "quietHours")]
    pub quiet_hours: Vec<QuietHours>,
    /// Nom IANA ; le fuseau par défaut de la configuration sinon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, alias = "timeBudgetSeconds", skip_serializing_if = "Option::is_none")]
    pub time_budget_seconds: Option<f64>,
    #[serde(default, alias = "granularityMinutes", skip_serializing_if = "Option::is_none")]
    pub granularity_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProposalRequest {
    pub fn new(window: ScheduleWindow, constraints: Vec<RoleConstraint>) -> Self {
        Self {
            window,
            constraints,
            quiet_hours: Vec::new(),
            timezone: None,
            time_budget_seconds: None,
            granularity_minutes: None,
            notes: None,
        }
    }
}

/// Famille de contrainte dure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Headcount,
    MaxHours,
    MinRest,
    Capacity,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintKind::Headcount => "headcount",
            ConstraintKind::MaxHours => "max_hours",
            ConstraintKind::MinRest => "min_rest",
            ConstraintKind::Capacity => "capacity",
        })
    }
}

/// Diagnostic : un couple rôle/contrainte qui n'a pas pu être satisfait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetConstraint {
    pub role: String,
    pub kind: ConstraintKind,
    pub detail: String,
}

impl UnmetConstraint {
    pub fn new<R: Into<String>, D: Into<String>>(role: R, kind: ConstraintKind, detail: D) -> Self {
        Self {
            role: role.into(),
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    TimedOut,
}

impl SolverStatus {
    /// Le roster renvoyé satisfait toutes les contraintes dures.
    pub fn is_satisfying(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Feasible => "feasible",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::TimedOut => "timed_out",
        })
    }
}

/// Résultat d'une résolution, produit une seule fois puis figé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub status: SolverStatus,
    pub objective_value: Option<i64>,
    #[serde(default)]
    pub unmet_constraints: Vec<UnmetConstraint>,
    pub elapsed_seconds: f64,
    #[serde(default)]
    pub decisions: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl SolverOutcome {
    pub fn infeasible(unmet: Vec<UnmetConstraint>) -> Self {
        Self {
            status: SolverStatus::Infeasible,
            objective_value: None,
            unmet_constraints: unmet,
            elapsed_seconds: 0.0,
            decisions: 0,
            notes: Vec::new(),
        }
    }
}

/// Créneau d'équipe résolu : plage contiguë couverte par `headcount` personnes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedAssignment {
    pub role: String,
    /// Indices des personnes anonymes (groupe de créneaux) du rôle.
    pub workers: Vec<u32>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub first_slot: usize,
    pub slot_count: usize,
    pub headcount: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quiet_bounds: Vec<QuietHours>,
}

impl SolvedAssignment {
    /// Indice du dernier slot couvert (inclus).
    pub fn last_slot(&self) -> usize {
        self.first_slot + self.slot_count - 1
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Réponse complète : écho de la requête, roster et métadonnées du solveur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub window: ScheduleWindow,
    pub timezone: String,
    pub constraints: Vec<RoleConstraint>,
    pub quiet_hours: Vec<QuietHours>,
    pub roster: Vec<SolvedAssignment>,
    pub solver: SolverOutcome,
}

impl ProposalResponse {
    pub fn assignments_for<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a SolvedAssignment> {
        self.roster.iter().filter(move |a| a.role == role)
    }
}
