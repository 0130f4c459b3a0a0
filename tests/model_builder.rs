#![forbid(unsafe_code)]
use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use shiftplan::constraints::Constraint;
use shiftplan::{
    CalendarLimits, ConfigurationError, ConstraintKind, IntervalCalendar, ModelBuildError, ModelBuilder, QuietHours,
    RoleConstraint, ScheduleWindow, Timeline,
};

fn timeline(hours: i64, quiet: &[QuietHours]) -> Timeline {
    let start: DateTime<FixedOffset> = "2025-10-01T00:00:00+00:00".parse().unwrap();
    let window = ScheduleWindow::new(start, start + Duration::hours(hours)).unwrap();
    IntervalCalendar::new(CalendarLimits {
        max_horizon_days: 28,
        max_slots: 2688,
    })
    .build(&window, quiet, chrono_tz::UTC, 60)
    .unwrap()
}

fn quiet(from: u32, to: u32) -> QuietHours {
    QuietHours::new(
        NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
    )
    .unwrap()
}

fn unmet_kinds(err: ModelBuildError) -> Vec<(String, ConstraintKind)> {
    match err {
        ModelBuildError::Unsatisfiable(unmet) => unmet.into_iter().map(|u| (u.role, u.kind)).collect(),
        other => panic!("expected unsatisfiable, got {other:?}"),
    }
}

#[test]
fn variables_only_for_non_quiet_slots() {
    let tl = timeline(24, &[quiet(0, 6)]);
    let model = ModelBuilder::default()
        .build(&[RoleConstraint::new("guard", 1)], &tl)
        .unwrap();
    let role = &model.roles()[0];
    assert_eq!(role.pool_size, 1);
    assert_eq!(role.active_slots, (6..24).collect::<Vec<_>>());
    assert_eq!(model.variables().len(), 18);
    assert!(model.variables().iter().all(|v| !tl.slots()[v.slot].quiet));
    let coverage = model
        .constraints()
        .iter()
        .filter(|c| c.kind() == ConstraintKind::Headcount)
        .count();
    assert_eq!(coverage, 18);
}

#[test]
fn roles_are_sorted_by_name() {
    let tl = timeline(4, &[]);
    let model = ModelBuilder::default()
        .build(
            &[RoleConstraint::new("nurse", 1), RoleConstraint::new("guard", 1)],
            &tl,
        )
        .unwrap();
    let names: Vec<&str> = model.roles().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["guard", "nurse"]);
    assert_eq!(model.role_index("nurse"), Some(1));
}

#[test]
fn pool_is_derived_from_max_hours_and_rest() {
    let tl = timeline(24, &[]);
    let rc = RoleConstraint::new("guard", 2)
        .with_max_hours(8.0)
        .with_min_rest_hours(11.0);
    let model = ModelBuilder::default().build(&[rc], &tl).unwrap();
    let role = &model.roles()[0];
    // 2 * (ceil(24 / 8) + 1 relève)
    assert_eq!(role.pool_size, 8);
    assert_eq!(role.max_slots, Some(8));
    assert_eq!(role.rest_slots, Some(11));
    let per_lane = model
        .constraints()
        .iter()
        .filter(|c| matches!(c, Constraint::MaxHours { .. } | Constraint::MinRest { .. }))
        .count();
    assert_eq!(per_lane, 16);
}

#[test]
fn rest_shorter_than_two_slots_adds_no_constraint() {
    let tl = timeline(6, &[]);
    let rc = RoleConstraint::new("guard", 1).with_min_rest_hours(1.0);
    let model = ModelBuilder::default().build(&[rc], &tl).unwrap();
    assert_eq!(model.roles()[0].rest_slots, None);
    assert!(model
        .constraints()
        .iter()
        .all(|c| c.kind() == ConstraintKind::Headcount));
}

#[test]
fn active_window_restricts_coverage() {
    let tl = timeline(12, &[]);
    let start: DateTime<FixedOffset> = "2025-10-01T08:00:00+00:00".parse().unwrap();
    let active = ScheduleWindow::new(start, start + Duration::hours(2)).unwrap();
    let model = ModelBuilder::default()
        .build(&[RoleConstraint::new("desk", 1).with_active(active)], &tl)
        .unwrap();
    assert_eq!(model.roles()[0].active_slots, vec![8, 9]);
}

#[test]
fn headcount_above_pool_is_unsatisfiable() {
    let tl = timeline(24, &[]);
    let err = ModelBuilder::default()
        .build(&[RoleConstraint::new("guard", 5).with_pool_size(3)], &tl)
        .unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("guard".to_string(), ConstraintKind::Headcount)]);
}

#[test]
fn max_hours_capacity_is_checked() {
    let tl = timeline(12, &[]);
    let rc = RoleConstraint::new("guard", 2)
        .with_pool_size(2)
        .with_max_hours(4.0);
    let err = ModelBuilder::default().build(&[rc], &tl).unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("guard".to_string(), ConstraintKind::MaxHours)]);
}

#[test]
fn max_hours_below_one_slot_is_unsatisfiable() {
    let tl = timeline(4, &[]);
    let rc = RoleConstraint::new("guard", 1).with_max_hours(0.5);
    let err = ModelBuilder::default().build(&[rc], &tl).unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("guard".to_string(), ConstraintKind::MaxHours)]);
}

#[test]
fn short_quiet_break_without_relief_breaks_rest() {
    let tl = timeline(12, &[quiet(4, 5)]);
    let rc = RoleConstraint::new("guard", 1)
        .with_pool_size(1)
        .with_min_rest_hours(3.0);
    let err = ModelBuilder::default().build(&[rc], &tl).unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("guard".to_string(), ConstraintKind::MinRest)]);
}

#[test]
fn entirely_quiet_role_has_no_capacity() {
    let tl = timeline(12, &[quiet(0, 6)]);
    let start: DateTime<FixedOffset> = "2025-10-01T01:00:00+00:00".parse().unwrap();
    let active = ScheduleWindow::new(start, start + Duration::hours(2)).unwrap();
    let err = ModelBuilder::default()
        .build(&[RoleConstraint::new("night", 1).with_active(active)], &tl)
        .unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("night".to_string(), ConstraintKind::Capacity)]);
}

#[test]
fn invalid_input_is_rejected_before_modelling() {
    let tl = timeline(4, &[]);
    let builder = ModelBuilder::default();
    assert!(matches!(
        builder.build(&[RoleConstraint::new("guard", 0)], &tl),
        Err(ModelBuildError::InvalidConstraint { .. })
    ));
    assert!(matches!(
        builder.build(&[RoleConstraint::new("guard", 1).with_max_hours(-1.0)], &tl),
        Err(ModelBuildError::InvalidConstraint { .. })
    ));
    assert!(matches!(
        builder.build(&[RoleConstraint::new("guard", 1), RoleConstraint::new("guard", 2)], &tl),
        Err(ModelBuildError::DuplicateRole(role)) if role == "guard"
    ));
}

#[test]
fn lower_bound_never_exceeds_a_feasible_objective() {
    let tl = timeline(6, &[]);
    let rc = RoleConstraint::new("guard", 1)
        .with_pool_size(2)
        .with_max_hours(3.0);
    let model = ModelBuilder::default().build(&[rc], &tl).unwrap();
    // personne 0 sur 0..3, personne 1 sur 3..6
    let values: Vec<bool> = model
        .variables()
        .iter()
        .map(|v| (v.worker == 0) == (v.slot < 3))
        .collect();
    assert!(shiftplan::constraints::violations(&model, &values).is_empty());
    let objective = model.objective(&values);
    // 6 slots + 10 * 2 plages + 9 + 9
    assert_eq!(objective, 44);
    assert_eq!(model.role_lower_bound(0, 0), 44);
}

#[test]
fn headcount_above_schedulable_slots_is_unsatisfiable_without_pool_size() {
    let tl = timeline(3, &[]);
    let err = ModelBuilder::default()
        .build(&[RoleConstraint::new("guard", 5)], &tl)
        .unwrap_err();
    assert_eq!(unmet_kinds(err), vec![("guard".to_string(), ConstraintKind::Headcount)]);
}

#[test]
fn derived_pool_overflow_is_rejected_as_oversized() {
    let tl = timeline(3, &[]);
    let rc = RoleConstraint::new("guard", 1 << 31).with_min_rest_hours(2.0);
    let err = ModelBuilder::default().build(&[rc], &tl).unwrap_err();
    assert!(matches!(
        err,
        ModelBuildError::Oversized(ConfigurationError::TooManyVariables { .. })
    ));
}

#[test]
fn explicit_pool_beyond_the_variable_limit_is_rejected() {
    let tl = timeline(24, &[]);
    let rc = RoleConstraint::new("guard", 1).with_pool_size(1_000_000);
    assert!(matches!(
        ModelBuilder::default().build(&[rc], &tl),
        Err(ModelBuildError::Oversized(ConfigurationError::TooManyVariables {
            variables: 24_000_000,
            max_variables: 500_000,
        }))
    ));
}

#[test]
fn variable_limit_is_configurable() {
    let tl = timeline(24, &[]);
    let builder = ModelBuilder::default().with_max_variables(10);
    assert_eq!(
        builder.build(&[RoleConstraint::new("guard", 1)], &tl).unwrap_err(),
        ModelBuildError::Oversized(ConfigurationError::TooManyVariables {
            variables: 24,
            max_variables: 10,
        })
    );
    let roomy = ModelBuilder::default().with_max_variables(24);
    assert!(roomy.build(&[RoleConstraint::new("guard", 1)], &tl).is_ok());
}
