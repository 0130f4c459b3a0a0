use crate::constraints::{violations, ConstraintModel};
use crate::model::{QuietHours, SolvedAssignment, SolverOutcome, SolverStatus};
use crate::solver::RawAssignment;
use std::collections::BTreeMap;

/// Convertit l'affectation brute en plages par rôle.
///
/// Chaque lane est découpée en suites maximales de slots consécutifs ; les
/// plages identiques d'un même rôle sont fusionnées et leur effectif cumulé.
/// Post-traitement pur : une affectation mal formée est une erreur de
/// programmation (panic), jamais une erreur métier.
pub fn assemble(
    model: &ConstraintModel,
    outcome: SolverOutcome,
    raw: &RawAssignment,
) -> (Vec<SolvedAssignment>, SolverOutcome) {
    assert_eq!(
        raw.len(),
        model.variables().len(),
        "raw assignment does not match the model"
    );
    if outcome.status == SolverStatus::Infeasible {
        return (Vec::new(), outcome);
    }
    if outcome.status.is_satisfying() {
        debug_assert!(
            violations(model, raw.values()).is_empty(),
            "satisfying outcome carries a violating assignment"
        );
    }

    let timeline = model.timeline();
    let slots = timeline.slots();
    let mut drafts = Vec::new();

    for (r, role) in model.roles().iter().enumerate() {
        // (premier slot, dernier slot) -> personnes
        let mut spans: BTreeMap<(usize, usize), Vec<u32>> = BTreeMap::new();
        for lane in &model.lanes()[role.lanes.clone()] {
            let mut open: Option<usize> = None;
            for (i, cell) in lane.cells.iter().enumerate() {
                let on = cell.map_or(false, |v| raw.get(v));
                match (on, open) {
                    (true, None) => open = Some(i),
                    (false, Some(first)) => {
                        spans.entry((first, i - 1)).or_default().push(lane.worker);
                        open = None;
                    }
                    _ => {}
                }
            }
            if let Some(first) = open {
                spans
                    .entry((first, lane.cells.len() - 1))
                    .or_default()
                    .push(lane.worker);
            }
        }

        for ((first, last), workers) in spans {
            assert!(
                slots[first..=last].iter().all(|s| !s.quiet),
                "role {} staffed during a quiet slot",
                role.name
            );
            drafts.push((
                r,
                SolvedAssignment {
                    role: role.name.clone(),
                    headcount: workers.len() as u32,
                    workers,
                    start: timeline.local(slots[first].start),
                    end: timeline.local(slots[last].end),
                    first_slot: first,
                    slot_count: last - first + 1,
                    quiet_bounds: quiet_bounds(model, first, last),
                },
            ));
        }
    }

    // début le plus tôt, puis nom de rôle (rôles déjà triés par nom)
    drafts.sort_by(|(ra, a), (rb, b)| {
        a.first_slot
            .cmp(&b.first_slot)
            .then(ra.cmp(rb))
            .then(a.slot_count.cmp(&b.slot_count))
    });
    (drafts.into_iter().map(|(_, a)| a).collect(), outcome)
}

/// Plages calmes qui bordent directement la plage `[first, last]`.
fn quiet_bounds(model: &ConstraintModel, first: usize, last: usize) -> Vec<QuietHours> {
    let timeline = model.timeline();
    let slots = timeline.slots();
    let mut out: Vec<QuietHours> = Vec::new();
    let before = first.checked_sub(1);
    let after = Some(last + 1).filter(|i| *i < slots.len());
    for idx in [before, after].into_iter().flatten() {
        if !slots[idx].quiet {
            continue;
        }
        for q in timeline.quiet_ranges_at(idx) {
            if !out.contains(&q) {
                out.push(q);
            }
        }
    }
    out
}
