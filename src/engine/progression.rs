//! Chain assignment engine: the ordered-workflow state machine binding a
//! ChainAssignment to its chain's steps.
//!
//! All mutating entry points expect to run inside the caller's transaction
//! (`BEGIN IMMEDIATE` at the CLI layer), which serializes concurrent
//! completion attempts per assignment. A retried completion after a
//! successful prior one fails the current-step check with CONFLICT instead
//! of double-advancing.

use rusqlite::Connection;

use crate::db::{assignment_repo, chain_repo, plant_repo, task_repo};
use crate::error::SproutError;
use crate::models::{AssignmentStatus, CareTask, ChainAssignment, ChainStep, StepApproval};

use super::materializer;

/// An approval supplied inline with a completion attempt.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalGrant<'a> {
    pub approved_by: &'a str,
    pub role: &'a str,
    pub notes: Option<&'a str>,
}

#[derive(Debug)]
pub struct AssignOutcome {
    pub assignment: ChainAssignment,
    pub first_task: CareTask,
}

#[derive(Debug)]
pub struct StepOutcome {
    pub assignment: ChainAssignment,
    pub next_task: Option<CareTask>,
}

/// Bind a chain to a plant: create the assignment at the first step (by
/// ascending step_order) and materialize its task, due immediately.
pub fn assign(conn: &Connection, chain_id: &str, plant_id: &str) -> Result<AssignOutcome, SproutError> {
    let plant = plant_repo::get_plant_by_id(conn, plant_id)?;
    let chain = chain_repo::get_chain_by_id(conn, chain_id)?;
    if !chain.is_active {
        return Err(SproutError::invalid_state(format!(
            "Chain '{}' is inactive and cannot be assigned",
            chain.name
        )));
    }
    let steps = ordered_steps(conn, &chain.id)?;
    let Some(first) = steps.first() else {
        return Err(SproutError::invalid_state(format!(
            "Chain '{}' has no steps",
            chain.name
        )));
    };

    let assignment_id = ulid::Ulid::new().to_string();
    let assignment =
        assignment_repo::create_assignment(conn, &assignment_id, &chain.id, &plant.id, &first.id)?;

    // The first step carries no wait: due now.
    let first_task = materializer::materialize(
        conn,
        &plant.id,
        &first.template_id,
        &materializer::now_str(),
        Some(materializer::ChainLink {
            assignment_id: &assignment.id,
            step_id: &first.id,
            step_order: first.step_order,
        }),
    )?;

    Ok(AssignOutcome {
        assignment,
        first_task,
    })
}

/// Complete the assignment's current step and advance the state machine.
///
/// Fails without touching any state when the assignment is terminal, the
/// step is stale (not current), or an approval gate is unsatisfied. On
/// success the completion is recorded, progress recomputed, and either the
/// assignment finishes or the next step's task is materialized with
/// `due = now + wait_hours`.
pub fn complete_step(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
    approval: Option<&ApprovalGrant>,
) -> Result<StepOutcome, SproutError> {
    let assignment = assignment_repo::get_assignment_by_id(conn, assignment_id)?;
    if assignment.status != AssignmentStatus::Active {
        return Err(SproutError::conflict(format!(
            "Assignment {} is {}",
            assignment.id,
            assignment.status.as_str()
        )));
    }
    let step = chain_repo::get_step_by_id(conn, step_id)?;
    match assignment.current_step_id.as_deref() {
        Some(current) if current == step.id => {}
        _ => {
            return Err(SproutError::conflict(format!(
                "Step {} is not the current step of assignment {}",
                step_id, assignment.id
            )))
        }
    }

    let steps = ordered_steps(conn, &assignment.chain_id)?;

    if step.requires_approval {
        if let Some(grant) = approval {
            record_grant(conn, &assignment, &step, grant)?;
        }
        if !assignment_repo::step_has_approval(conn, &assignment.id, &step.id)? {
            return Err(SproutError::approval_required(&step.id));
        }
    }

    let position = assignment_repo::get_completions(conn, &assignment.id)?.len() as i64;
    assignment_repo::add_completion(conn, &assignment.id, &step.id, position)?;

    // The step's materialized task, if still pending, completes with it.
    if let Some(task) = task_repo::find_pending_chain_task(conn, &assignment.id, &step.id)? {
        task_repo::mark_complete(conn, &task.id)?;
    }

    let done = position + 1;
    let total = steps.len() as i64;
    let next_task = if done >= total {
        assignment_repo::complete_assignment(conn, &assignment.id)?;
        None
    } else {
        let next = steps
            .iter()
            .find(|s| s.step_order > step.step_order)
            .ok_or_else(|| {
                SproutError::invalid_state(format!(
                    "Assignment {} has uncompleted steps but none ordered after {}",
                    assignment.id, step.step_order
                ))
            })?;
        assignment_repo::advance_to_step(conn, &assignment.id, &next.id, progress_pct(done, total))?;
        let due = materializer::due_in_hours(next.wait_hours);
        let task = materializer::materialize(
            conn,
            &assignment.plant_id,
            &next.template_id,
            &due,
            Some(materializer::ChainLink {
                assignment_id: &assignment.id,
                step_id: &next.id,
                step_order: next.step_order,
            }),
        )?;
        Some(task)
    };

    let assignment = assignment_repo::get_assignment_by_id(conn, assignment_id)?;
    Ok(StepOutcome {
        assignment,
        next_task,
    })
}

/// Record an approval for the assignment's current step. Does not advance
/// the assignment; a subsequent completion finds the approval present.
/// Approving the same step twice as the same approver is a no-op returning
/// the existing record.
pub fn approve(
    conn: &Connection,
    assignment_id: &str,
    step_id: &str,
    approved_by: &str,
    role: &str,
    notes: Option<&str>,
) -> Result<StepApproval, SproutError> {
    let assignment = assignment_repo::get_assignment_by_id(conn, assignment_id)?;
    if assignment.status != AssignmentStatus::Active {
        return Err(SproutError::conflict(format!(
            "Assignment {} is {}",
            assignment.id,
            assignment.status.as_str()
        )));
    }
    let step = chain_repo::get_step_by_id(conn, step_id)?;
    if step.chain_id != assignment.chain_id {
        return Err(SproutError::step_not_found(step_id));
    }
    match assignment.current_step_id.as_deref() {
        Some(current) if current == step.id => {}
        _ => {
            return Err(SproutError::conflict(format!(
                "Step {} is not the current step of assignment {}",
                step_id, assignment.id
            )))
        }
    }
    if !step.approval_roles.iter().any(|r| r == role) {
        return Err(SproutError::forbidden(format!(
            "Role '{}' is not allowed to approve step {}",
            role, step.id
        )));
    }

    if let Some(existing) =
        assignment_repo::find_approval_by(conn, &assignment.id, &step.id, approved_by)?
    {
        return Ok(existing);
    }

    let approval_id = ulid::Ulid::new().to_string();
    let approval = assignment_repo::record_approval(
        conn,
        &approval_id,
        &assignment.id,
        &step.id,
        approved_by,
        role,
        notes,
    )?;
    assignment_repo::touch_assignment(conn, &assignment.id)?;
    Ok(approval)
}

/// Cancel an active assignment. Step completions are kept and existing care
/// tasks are left untouched; the assignment accepts no further mutation.
pub fn cancel(conn: &Connection, assignment_id: &str) -> Result<ChainAssignment, SproutError> {
    let assignment = assignment_repo::get_assignment_by_id(conn, assignment_id)?;
    if assignment.status.is_terminal() {
        return Err(SproutError::conflict(format!(
            "Assignment {} is already {}",
            assignment.id,
            assignment.status.as_str()
        )));
    }
    assignment_repo::cancel_assignment(conn, &assignment.id)?;
    assignment_repo::get_assignment_by_id(conn, assignment_id)
}

/// A chain's steps in traversal sequence. Duplicate step_order values are a
/// data-integrity violation: refuse rather than guess a traversal.
fn ordered_steps(conn: &Connection, chain_id: &str) -> Result<Vec<ChainStep>, SproutError> {
    let steps = chain_repo::get_steps(conn, chain_id)?;
    for pair in steps.windows(2) {
        if pair[0].step_order == pair[1].step_order {
            return Err(SproutError::invalid_state(format!(
                "Chain {} has duplicate step order {}",
                chain_id, pair[0].step_order
            )));
        }
    }
    Ok(steps)
}

fn record_grant(
    conn: &Connection,
    assignment: &ChainAssignment,
    step: &ChainStep,
    grant: &ApprovalGrant,
) -> Result<(), SproutError> {
    if !step.approval_roles.iter().any(|r| r == grant.role) {
        return Err(SproutError::forbidden(format!(
            "Role '{}' is not allowed to approve step {}",
            grant.role, step.id
        )));
    }
    if assignment_repo::find_approval_by(conn, &assignment.id, &step.id, grant.approved_by)?
        .is_none()
    {
        let approval_id = ulid::Ulid::new().to_string();
        assignment_repo::record_approval(
            conn,
            &approval_id,
            &assignment.id,
            &step.id,
            grant.approved_by,
            grant.role,
            grant.notes,
        )?;
    }
    Ok(())
}

fn progress_pct(done: i64, total: i64) -> i64 {
    ((done as f64 / total as f64) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrations, plant_repo, template_repo};
    use crate::error::ErrorCode;
    use crate::models::{Priority, TaskCategory};
    use chrono::NaiveDateTime;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn seed_plant(conn: &Connection) -> String {
        let id = ulid::Ulid::new().to_string();
        plant_repo::create_plant(conn, &id, "Monstera", Some("Monstera deliciosa"), None, None)
            .unwrap();
        id
    }

    fn seed_template(conn: &Connection, name: &str) -> String {
        let id = ulid::Ulid::new().to_string();
        template_repo::create_template(
            conn,
            &id,
            name,
            TaskCategory::Water,
            7,
            Priority::Medium,
            false,
        )
        .unwrap();
        id
    }

    /// Steps given as (order, wait_hours, requires_approval, roles).
    fn seed_chain(conn: &Connection, steps: &[(i64, i64, bool, &[&str])]) -> String {
        let chain_id = ulid::Ulid::new().to_string();
        chain_repo::create_chain(conn, &chain_id, &format!("chain-{chain_id}"), TaskCategory::Repot)
            .unwrap();
        for (order, wait, approval, roles) in steps {
            let template_id = seed_template(conn, &format!("tpl-{}", ulid::Ulid::new()));
            let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
            chain_repo::add_step(
                conn,
                &ulid::Ulid::new().to_string(),
                &chain_id,
                &template_id,
                *order,
                true,
                *wait,
                None,
                *approval,
                &roles,
            )
            .unwrap();
        }
        chain_id
    }

    fn step_at(conn: &Connection, chain_id: &str, order: i64) -> ChainStep {
        chain_repo::get_steps(conn, chain_id)
            .unwrap()
            .into_iter()
            .find(|s| s.step_order == order)
            .unwrap()
    }

    fn minutes_from_now(timestamp: &str) -> i64 {
        let parsed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").unwrap();
        (parsed - chrono::Utc::now().naive_utc()).num_minutes()
    }

    #[test]
    fn fresh_assignment_starts_at_smallest_order() {
        let conn = setup();
        let plant = seed_plant(&conn);
        // Inserted out of order on purpose.
        let chain = seed_chain(&conn, &[(2, 0, false, &[]), (0, 0, false, &[]), (1, 0, false, &[])]);

        let outcome = assign(&conn, &chain, &plant).unwrap();
        let first = step_at(&conn, &chain, 0);
        assert_eq!(outcome.assignment.status, AssignmentStatus::Active);
        assert_eq!(outcome.assignment.progress, 0);
        assert_eq!(outcome.assignment.current_step_id.as_deref(), Some(first.id.as_str()));
        assert_eq!(outcome.first_task.chain_step_id.as_deref(), Some(first.id.as_str()));
        assert_eq!(outcome.first_task.step_order, Some(0));
        // First step is due immediately.
        assert!(minutes_from_now(&outcome.first_task.due_date).abs() <= 1);
    }

    #[test]
    fn assign_rejects_inactive_chain() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[])]);
        chain_repo::set_chain_active(&conn, &chain, false).unwrap();

        let err = assign(&conn, &chain, &plant).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn assign_rejects_chain_without_steps() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[]);

        let err = assign(&conn, &chain, &plant).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn assign_rejects_duplicate_step_order() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (0, 0, false, &[])]);

        let err = assign(&conn, &chain, &plant).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn assign_rejects_missing_plant() {
        let conn = setup();
        let chain = seed_chain(&conn, &[(0, 0, false, &[])]);

        let err = assign(&conn, &chain, &ulid::Ulid::new().to_string()).unwrap_err();
        assert_eq!(err.code, ErrorCode::PlantNotFound);
    }

    #[test]
    fn completing_steps_in_order_reaches_completed() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[]), (2, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;

        let s0 = step_at(&conn, &chain, 0);
        let s1 = step_at(&conn, &chain, 1);
        let s2 = step_at(&conn, &chain, 2);

        let o1 = complete_step(&conn, &aid, &s0.id, None).unwrap();
        assert_eq!(o1.assignment.progress, 33);
        assert_eq!(o1.assignment.current_step_id.as_deref(), Some(s1.id.as_str()));
        assert!(o1.next_task.is_some());

        let o2 = complete_step(&conn, &aid, &s1.id, None).unwrap();
        assert_eq!(o2.assignment.progress, 67);

        let o3 = complete_step(&conn, &aid, &s2.id, None).unwrap();
        assert_eq!(o3.assignment.status, AssignmentStatus::Completed);
        assert_eq!(o3.assignment.progress, 100);
        assert_eq!(o3.assignment.current_step_id, None);
        assert!(o3.assignment.completed_at.is_some());
        assert!(o3.next_task.is_none());

        let completions = assignment_repo::get_completions(&conn, &aid).unwrap();
        assert_eq!(
            completions.iter().map(|c| c.step_id.as_str()).collect::<Vec<_>>(),
            vec![s0.id.as_str(), s1.id.as_str(), s2.id.as_str()]
        );
    }

    #[test]
    fn wait_hours_sets_next_due_date() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 24, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();

        let s0 = step_at(&conn, &chain, 0);
        let o = complete_step(&conn, &outcome.assignment.id, &s0.id, None).unwrap();
        let next = o.next_task.unwrap();
        let minutes = minutes_from_now(&next.due_date);
        assert!((1438..=1441).contains(&minutes), "due in {minutes} minutes");
    }

    #[test]
    fn replayed_completion_fails_with_conflict() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;
        let s0 = step_at(&conn, &chain, 0);

        complete_step(&conn, &aid, &s0.id, None).unwrap();
        let err = complete_step(&conn, &aid, &s0.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(assignment_repo::get_completions(&conn, &aid).unwrap().len(), 1);
    }

    #[test]
    fn completing_non_current_step_fails() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let s1 = step_at(&conn, &chain, 1);

        let err = complete_step(&conn, &outcome.assignment.id, &s1.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn completing_unknown_step_fails() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();

        let err = complete_step(
            &conn,
            &outcome.assignment.id,
            &ulid::Ulid::new().to_string(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::StepNotFound);
    }

    #[test]
    fn approval_gates_step_completion() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, true, &["botanist"])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;
        let s0 = step_at(&conn, &chain, 0);

        let err = complete_step(&conn, &aid, &s0.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ApprovalRequired);

        let err = approve(&conn, &aid, &s0.id, "ines", "intern", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        approve(&conn, &aid, &s0.id, "ines", "botanist", Some("roots look fine")).unwrap();
        let o = complete_step(&conn, &aid, &s0.id, None).unwrap();
        assert_eq!(o.assignment.status, AssignmentStatus::Completed);
    }

    #[test]
    fn inline_approval_completes_in_one_call() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, true, &["botanist"])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let s0 = step_at(&conn, &chain, 0);

        let bad = ApprovalGrant { approved_by: "ines", role: "intern", notes: None };
        let err = complete_step(&conn, &outcome.assignment.id, &s0.id, Some(&bad)).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let good = ApprovalGrant { approved_by: "ines", role: "botanist", notes: None };
        let o = complete_step(&conn, &outcome.assignment.id, &s0.id, Some(&good)).unwrap();
        assert_eq!(o.assignment.status, AssignmentStatus::Completed);
    }

    #[test]
    fn approve_twice_by_same_approver_is_noop() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, true, &["botanist"])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;
        let s0 = step_at(&conn, &chain, 0);

        let first = approve(&conn, &aid, &s0.id, "ines", "botanist", None).unwrap();
        let second = approve(&conn, &aid, &s0.id, "ines", "botanist", None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            assignment_repo::get_step_approvals(&conn, &aid, &s0.id).unwrap().len(),
            1
        );
    }

    #[test]
    fn approve_non_current_step_fails() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, true, &["botanist"])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let s1 = step_at(&conn, &chain, 1);

        let err = approve(&conn, &outcome.assignment.id, &s1.id, "ines", "botanist", None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn cancel_keeps_completed_steps() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[]), (2, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;
        let s0 = step_at(&conn, &chain, 0);
        complete_step(&conn, &aid, &s0.id, None).unwrap();

        let cancelled = cancel(&conn, &aid).unwrap();
        assert_eq!(cancelled.status, AssignmentStatus::Cancelled);
        assert_eq!(cancelled.current_step_id, None);
        assert_eq!(cancelled.progress, 33);
        assert_eq!(assignment_repo::get_completions(&conn, &aid).unwrap().len(), 1);
    }

    #[test]
    fn terminal_assignments_reject_mutation() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let aid = outcome.assignment.id;
        let s1 = step_at(&conn, &chain, 1);

        cancel(&conn, &aid).unwrap();
        assert_eq!(cancel(&conn, &aid).unwrap_err().code, ErrorCode::Conflict);
        assert_eq!(
            complete_step(&conn, &aid, &s1.id, None).unwrap_err().code,
            ErrorCode::Conflict
        );

        let chain2 = seed_chain(&conn, &[(0, 0, false, &[])]);
        let outcome2 = assign(&conn, &chain2, &plant).unwrap();
        let t0 = step_at(&conn, &chain2, 0);
        complete_step(&conn, &outcome2.assignment.id, &t0.id, None).unwrap();
        assert_eq!(
            cancel(&conn, &outcome2.assignment.id).unwrap_err().code,
            ErrorCode::Conflict
        );
    }

    #[test]
    fn duplicate_order_introduced_later_blocks_advancement() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[]), (2, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let s0 = step_at(&conn, &chain, 0);
        let s2 = step_at(&conn, &chain, 2);

        conn.execute(
            "UPDATE chain_steps SET step_order = 1 WHERE id = ?1",
            rusqlite::params![s2.id],
        )
        .unwrap();

        let err = complete_step(&conn, &outcome.assignment.id, &s0.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(assignment_repo::get_completions(&conn, &outcome.assignment.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn step_task_row_completes_with_the_step() {
        let conn = setup();
        let plant = seed_plant(&conn);
        let chain = seed_chain(&conn, &[(0, 0, false, &[]), (1, 0, false, &[])]);
        let outcome = assign(&conn, &chain, &plant).unwrap();
        let s0 = step_at(&conn, &chain, 0);

        complete_step(&conn, &outcome.assignment.id, &s0.id, None).unwrap();
        let task = task_repo::get_task_by_id(&conn, &outcome.first_task.id).unwrap();
        assert!(task.completed);
        assert!(task.completed_at.is_some());
    }
}
