use serde_json::json;

use crate::cli::commands::AssignmentCommands;
use crate::db::{assignment_repo, chain_repo, connection, plant_repo};
use crate::engine::progression;
use crate::error::SproutError;
use crate::output;

pub fn run(cmd: AssignmentCommands, json_output: bool) -> i32 {
    let result = match cmd {
        AssignmentCommands::Create { chain, plant } => run_create(&chain, &plant, json_output),
        AssignmentCommands::List { plant } => run_list(plant.as_deref(), json_output),
        AssignmentCommands::Show { reference } => run_show(&reference, json_output),
        AssignmentCommands::Approve { reference, by, role, notes } => {
            run_approve(&reference, &by, &role, notes.as_deref(), json_output)
        }
        AssignmentCommands::Cancel { reference } => run_cancel(&reference, json_output),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&output::json::error(&e)).unwrap());
            } else {
                eprintln!("Error: {}", e.message);
            }
            1
        }
    }
}

fn run_create(chain_ref: &str, plant_ref: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let chain = chain_repo::resolve_chain(&conn, chain_ref)?;
    let plant = plant_repo::resolve_plant(&conn, plant_ref)?;

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = progression::assign(&conn, &chain.id, &plant.id);
    let outcome = match result {
        Ok(outcome) => {
            conn.execute_batch("COMMIT")?;
            outcome
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "assignment": output::json::assignment_json(&outcome.assignment, &[]),
                "first_task": output::json::task_json(&outcome.first_task)
            })))
            .unwrap()
        );
    } else {
        println!(
            "Assigned chain '{}' to {} ({})",
            chain.name, plant.name, outcome.assignment.id
        );
        println!(
            "First task due {} ({})",
            outcome.first_task.due_date, outcome.first_task.id
        );
    }
    Ok(0)
}

fn run_list(plant_ref: Option<&str>, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plant_id = match plant_ref {
        Some(reference) => Some(plant_repo::resolve_plant(&conn, reference)?.id),
        None => None,
    };
    let assignments = assignment_repo::list_assignments(&conn, plant_id.as_deref())?;

    if json_output {
        let assignments_json: Vec<_> =
            assignments.iter().map(output::json::assignment_summary).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(
                json!({ "assignments": assignments_json })
            ))
            .unwrap()
        );
    } else {
        let mut named = Vec::new();
        for a in assignments {
            let chain_name = chain_repo::get_chain_by_id(&conn, &a.chain_id)
                .map(|c| c.name)
                .unwrap_or_else(|_| a.chain_id.clone());
            let plant_name = plant_repo::get_plant_by_id(&conn, &a.plant_id)
                .map(|p| p.name)
                .unwrap_or_else(|_| a.plant_id.clone());
            named.push((a, chain_name, plant_name));
        }
        output::text::print_assignment_list(&named);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let assignment = assignment_repo::resolve_assignment(&conn, reference)?;
    let completions = assignment_repo::get_completions(&conn, &assignment.id)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::assignment_json(
                &assignment,
                &completions
            )))
            .unwrap()
        );
    } else {
        let chain_name = chain_repo::get_chain_by_id(&conn, &assignment.chain_id)
            .map(|c| c.name)
            .unwrap_or_else(|_| assignment.chain_id.clone());
        let plant_name = plant_repo::get_plant_by_id(&conn, &assignment.plant_id)
            .map(|p| p.name)
            .unwrap_or_else(|_| assignment.plant_id.clone());
        output::text::print_assignment(&assignment, &chain_name, &plant_name, &completions);
    }
    Ok(0)
}

fn run_approve(
    reference: &str,
    by: &str,
    role: &str,
    notes: Option<&str>,
    json_output: bool,
) -> Result<i32, SproutError> {
    if by.trim().is_empty() {
        return Err(SproutError::validation("Approver identity is required"));
    }
    let conn = connection::open_db()?;
    let assignment = assignment_repo::resolve_assignment(&conn, reference)?;
    let step_id = assignment
        .current_step_id
        .clone()
        .ok_or_else(|| {
            SproutError::conflict(format!(
                "Assignment {} has no current step to approve",
                assignment.id
            ))
        })?;

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = progression::approve(&conn, &assignment.id, &step_id, by, role, notes);
    let approval = match result {
        Ok(approval) => {
            conn.execute_batch("COMMIT")?;
            approval
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::approval_json(
                &approval
            )))
            .unwrap()
        );
    } else {
        println!(
            "Approved step {} of assignment {} as {} ({})",
            approval.step_id, approval.assignment_id, approval.approved_by, approval.role
        );
    }
    Ok(0)
}

fn run_cancel(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let assignment = assignment_repo::resolve_assignment(&conn, reference)?;

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = progression::cancel(&conn, &assignment.id);
    let cancelled = match result {
        Ok(cancelled) => {
            conn.execute_batch("COMMIT")?;
            cancelled
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    if json_output {
        let completions = assignment_repo::get_completions(&conn, &cancelled.id)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::assignment_json(
                &cancelled,
                &completions
            )))
            .unwrap()
        );
    } else {
        println!("Cancelled assignment {}", cancelled.id);
    }
    Ok(0)
}
