use crate::calendar::{parse_timezone, IntervalCalendar, Timeline};
use crate::config::EngineConfig;
use crate::constraints::ModelBuilder;
use crate::error::{ConfigurationError, ModelBuildError, ScheduleError};
use crate::model::{ProposalRequest, ProposalResponse, SolverOutcome};
use crate::roster;
use crate::solver::{CancelFlag, Solver};
use std::time::{Duration, Instant};
use tracing::{info, info_span};

/// Chaîne complète : calendrier → modèle → solveur → roster.
///
/// Sans état mutable partagé : un même `Engine` peut servir des requêtes
/// concurrentes.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    calendar: IntervalCalendar,
    builder: ModelBuilder,
    solver: Solver,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            calendar: IntervalCalendar::new(config.calendar_limits()),
            builder: ModelBuilder::new(config.solver.weights)
                .with_max_variables(config.max_variables),
            solver: Solver::new(config.solver),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fuseau effectif : celui de la requête, sinon celui de la configuration.
    pub fn timezone_name<'a>(&'a self, request: &'a ProposalRequest) -> &'a str {
        request
            .timezone
            .as_deref()
            .unwrap_or(&self.config.default_timezone)
    }

    pub fn timeline(&self, request: &ProposalRequest) -> Result<Timeline, ConfigurationError> {
        let tz = parse_timezone(self.timezone_name(request))?;
        let granularity = request
            .granularity_minutes
            .unwrap_or(self.config.granularity_minutes);
        self.calendar
            .build(&request.window, &request.quiet_hours, tz, granularity)
    }

    pub fn time_budget(&self, request: &ProposalRequest) -> Result<Duration, ConfigurationError> {
        match request.time_budget_seconds {
            None => Ok(self.config.solver.time_budget),
            Some(secs) => {
                Duration::try_from_secs_f64(secs).map_err(|_| ConfigurationError::InvalidTimeBudget)
            }
        }
    }

    pub fn propose(&self, request: &ProposalRequest) -> Result<ProposalResponse, ScheduleError> {
        self.propose_with_cancel(request, &CancelFlag::default())
    }

    pub fn propose_with_cancel(
        &self,
        request: &ProposalRequest,
        cancel: &CancelFlag,
    ) -> Result<ProposalResponse, ScheduleError> {
        let started = Instant::now();
        let timezone = self.timezone_name(request).to_string();
        let span = info_span!("propose", %timezone, roles = request.constraints.len());
        let _enter = span.enter();

        let budget = self.time_budget(request)?;
        let timeline = self.timeline(request)?;

        let (roster, solver) = match self.builder.build(&request.constraints, &timeline) {
            Ok(model) => {
                let solution = self.solver.solve_with(&model, budget, cancel);
                roster::assemble(&model, solution.outcome, &solution.assignment)
            }
            // détection structurelle : réponse normale, sans passer par la recherche
            Err(ModelBuildError::Unsatisfiable(unmet)) => {
                let mut outcome = SolverOutcome::infeasible(unmet);
                outcome.elapsed_seconds = started.elapsed().as_secs_f64();
                outcome
                    .notes
                    .push("detected while building the model; relax the listed constraints".to_string());
                (Vec::new(), outcome)
            }
            Err(ModelBuildError::Oversized(err)) => return Err(err.into()),
            Err(err) => return Err(err.into()),
        };

        info!(
            status = %solver.status,
            spans = roster.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proposal ready"
        );

        Ok(ProposalResponse {
            window: request.window.clone(),
            timezone,
            constraints: request.constraints.clone(),
            quiet_hours: request.quiet_hours.clone(),
            roster,
            solver,
        })
    }
}
