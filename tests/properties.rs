#![forbid(unsafe_code)]
use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use shiftplan::{
    Engine, EngineConfig, ProposalRequest, ProposalResponse, QuietHours, RoleConstraint,
    ScheduleWindow, SolverStatus,
};
use std::collections::BTreeMap;

fn window(hours: i64) -> ScheduleWindow {
    let start: DateTime<FixedOffset> = "2025-10-06T00:00:00+00:00".parse().unwrap();
    ScheduleWindow::new(start, start + Duration::hours(hours)).unwrap()
}

fn quiet(from: u32, to: u32) -> QuietHours {
    QuietHours::new(
        NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
    )
    .unwrap()
}

fn two_day_request() -> ProposalRequest {
    let mut request = ProposalRequest::new(
        window(48),
        vec![
            RoleConstraint::new("guard", 1)
                .with_max_hours(8.0)
                .with_min_rest_hours(11.0),
            RoleConstraint::new("nurse", 2).with_max_hours(12.0),
        ],
    );
    request.quiet_hours = vec![quiet(1, 5)];
    request.time_budget_seconds = Some(0.2);
    request
}

/// Même requête, budget laissé à la configuration (plafond de décisions seul).
fn capped_request() -> ProposalRequest {
    let mut request = two_day_request();
    request.time_budget_seconds = None;
    request
}

fn capped_engine(max_decisions: u64) -> Engine {
    let mut config = EngineConfig::default();
    config.solver.max_decisions = Some(max_decisions);
    config.solver.time_budget = std::time::Duration::from_secs(60);
    Engine::new(config)
}

/// slot -> (rôle -> effectif) d'après le roster
fn coverage(response: &ProposalResponse) -> BTreeMap<usize, BTreeMap<String, u32>> {
    let mut out: BTreeMap<usize, BTreeMap<String, u32>> = BTreeMap::new();
    for a in &response.roster {
        for slot in a.first_slot..=a.last_slot() {
            *out.entry(slot)
                .or_default()
                .entry(a.role.clone())
                .or_default() += a.headcount;
        }
    }
    out
}

#[test]
fn staffed_roster_respects_every_hard_constraint() {
    let engine = Engine::default();
    let request = two_day_request();
    let response = engine.propose(&request).unwrap();
    assert_ne!(response.solver.status, SolverStatus::Infeasible);
    // une solution est trouvée dès la première descente pour chaque rôle
    assert!(!response
        .solver
        .notes
        .iter()
        .any(|n| n.contains("no feasible assignment")));

    let timeline = engine.timeline(&request).unwrap();
    let cover = coverage(&response);

    for slot in timeline.slots() {
        let staffed = cover.get(&slot.index);
        if slot.quiet {
            assert!(staffed.is_none(), "quiet slot {} is staffed", slot.index);
            continue;
        }
        for rc in &request.constraints {
            let n = staffed.and_then(|m| m.get(&rc.role)).copied().unwrap_or(0);
            assert_eq!(n, rc.headcount, "slot {} role {}", slot.index, rc.role);
        }
    }

    // par personne : heures max et repos entre deux plages
    let mut per_worker: BTreeMap<(String, u32), Vec<(usize, usize)>> = BTreeMap::new();
    for a in &response.roster {
        for w in &a.workers {
            per_worker
                .entry((a.role.clone(), *w))
                .or_default()
                .push((a.first_slot, a.last_slot()));
        }
    }
    for ((role, worker), mut spans) in per_worker {
        spans.sort();
        let total: usize = spans.iter().map(|(f, l)| l - f + 1).sum();
        let (max, rest) = if role == "guard" { (8, 11) } else { (12, 0) };
        assert!(total <= max, "{role}/{worker} works {total} slots");
        for pair in spans.windows(2) {
            let gap = pair[1].0 - pair[0].1 - 1;
            assert!(gap >= rest.max(1), "{role}/{worker} rests {gap} slots");
        }
    }
}

#[test]
fn same_request_same_answer() {
    let request = capped_request();
    let a = capped_engine(3_000).propose(&request).unwrap();
    let b = capped_engine(3_000).propose(&request).unwrap();
    assert_eq!(a.roster, b.roster);
    assert_eq!(a.solver.status, b.solver.status);
    assert_eq!(a.solver.objective_value, b.solver.objective_value);
    assert_eq!(a.solver.decisions, b.solver.decisions);
}

#[test]
fn decision_cap_reports_timed_out() {
    let response = capped_engine(500).propose(&capped_request()).unwrap();
    assert_eq!(response.solver.status, SolverStatus::TimedOut);
    assert!(response
        .solver
        .notes
        .iter()
        .any(|n| n.contains("decision limit reached")));
    assert!(!response.roster.is_empty());
}

#[test]
fn dropping_max_hours_relaxes_an_infeasible_request() {
    let strict = ProposalRequest::new(
        window(12),
        vec![RoleConstraint::new("guard", 2)
            .with_pool_size(2)
            .with_max_hours(4.0)],
    );
    let engine = Engine::default();
    assert_eq!(
        engine.propose(&strict).unwrap().solver.status,
        SolverStatus::Infeasible
    );

    let mut relaxed = strict.clone();
    relaxed.constraints[0].max_hours = None;
    assert!(engine.propose(&relaxed).unwrap().solver.status.is_satisfying());
}

#[test]
fn dropping_min_rest_relaxes_a_search_proven_infeasibility() {
    let mut strict = ProposalRequest::new(
        window(5),
        vec![RoleConstraint::new("guard", 2)
            .with_pool_size(3)
            .with_min_rest_hours(2.0)],
    );
    strict.quiet_hours = vec![quiet(2, 3)];
    let engine = Engine::default();
    assert_eq!(
        engine.propose(&strict).unwrap().solver.status,
        SolverStatus::Infeasible
    );

    let mut relaxed = strict.clone();
    relaxed.constraints[0].min_rest_hours = None;
    assert!(engine.propose(&relaxed).unwrap().solver.status.is_satisfying());
}
