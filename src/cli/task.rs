use serde_json::json;

use crate::cli::commands::TaskCommands;
use crate::db::{connection, plant_repo, task_repo, template_repo};
use crate::engine::materializer;
use crate::engine::progression::ApprovalGrant;
use crate::error::SproutError;
use crate::output;

pub fn run(cmd: TaskCommands, json_output: bool) -> i32 {
    let result = match cmd {
        TaskCommands::Schedule { plant, template, in_days } => {
            run_schedule(&plant, &template, in_days, json_output)
        }
        TaskCommands::List { plant, all } => run_list(plant.as_deref(), all, json_output),
        TaskCommands::Show { reference } => run_show(&reference, json_output),
        TaskCommands::Done { reference, check, approved_by, role, notes } => run_done(
            &reference,
            &check,
            approved_by.as_deref(),
            role.as_deref(),
            notes.as_deref(),
            json_output,
        ),
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

fn run_schedule(
    plant_ref: &str,
    template_ref: &str,
    in_days: Option<i64>,
    json_output: bool,
) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plant = plant_repo::resolve_plant(&conn, plant_ref)?;
    let template = template_repo::resolve_template(&conn, template_ref)?;

    let due = match in_days {
        Some(days) => materializer::due_in_days(days),
        None => materializer::now_str(),
    };
    let task = materializer::materialize(&conn, &plant.id, &template.id, &due, None)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::task_json(&task)))
                .unwrap()
        );
    } else {
        println!(
            "Scheduled {} for {} due {} ({})",
            template.name, plant.name, task.due_date, task.id
        );
    }
    Ok(0)
}

fn run_list(plant_ref: Option<&str>, all: bool, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plant_id = match plant_ref {
        Some(reference) => Some(plant_repo::resolve_plant(&conn, reference)?.id),
        None => None,
    };
    let tasks = task_repo::list_tasks(&conn, plant_id.as_deref(), all)?;

    if json_output {
        let tasks_json: Vec<_> = tasks.iter().map(output::json::task_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({ "tasks": tasks_json })))
                .unwrap()
        );
    } else {
        let named = with_names(&conn, tasks)?;
        output::text::print_task_list(&named);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let task = task_repo::resolve_task(&conn, reference)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::task_json(&task)))
                .unwrap()
        );
    } else {
        let plant_name = plant_repo::get_plant_by_id(&conn, &task.plant_id)
            .map(|p| p.name)
            .unwrap_or_else(|_| task.plant_id.clone());
        let template_name = template_repo::get_template_by_id(&conn, &task.template_id)
            .map(|t| t.name)
            .unwrap_or_else(|_| task.template_id.clone());
        output::text::print_task(&task, &plant_name, &template_name);
    }
    Ok(0)
}

fn run_done(
    reference: &str,
    checks: &[String],
    approved_by: Option<&str>,
    role: Option<&str>,
    notes: Option<&str>,
    json_output: bool,
) -> Result<i32, SproutError> {
    let approval = match (approved_by, role) {
        (Some(by), Some(role)) => Some(ApprovalGrant { approved_by: by, role, notes }),
        (None, None) => None,
        _ => {
            return Err(SproutError::validation(
                "--approved-by and --role must be supplied together",
            ))
        }
    };

    let conn = connection::open_db()?;
    let task = task_repo::resolve_task(&conn, reference)?;

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = materializer::complete_task(&conn, &task.id, checks, approval.as_ref());
    let completion = match result {
        Ok(completion) => {
            conn.execute_batch("COMMIT")?;
            completion
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    if json_output {
        let mut data = json!({
            "task": output::json::task_json(&completion.task)
        });
        if let Some(ref outcome) = completion.step_outcome {
            let completed_steps =
                crate::db::assignment_repo::get_completions(&conn, &outcome.assignment.id)?;
            data["assignment"] =
                output::json::assignment_json(&outcome.assignment, &completed_steps);
            if let Some(ref next) = outcome.next_task {
                data["next_task"] = output::json::task_json(next);
            }
        }
        if let Some(ref next) = completion.next_occurrence {
            data["next_occurrence"] = output::json::task_json(next);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(data)).unwrap()
        );
    } else {
        println!("Completed task {}", completion.task.id);
        if let Some(ref outcome) = completion.step_outcome {
            println!(
                "Assignment {} now {} ({}%)",
                outcome.assignment.id,
                outcome.assignment.status.as_str(),
                outcome.assignment.progress
            );
            if let Some(ref next) = outcome.next_task {
                println!("Next step task due {} ({})", next.due_date, next.id);
            }
        }
        if let Some(ref next) = completion.next_occurrence {
            println!("Next occurrence due {} ({})", next.due_date, next.id);
        }
    }
    Ok(0)
}

fn with_names(
    conn: &rusqlite::Connection,
    tasks: Vec<crate::models::CareTask>,
) -> Result<Vec<(crate::models::CareTask, String, String)>, SproutError> {
    let mut named = Vec::new();
    for task in tasks {
        let plant_name = plant_repo::get_plant_by_id(conn, &task.plant_id)
            .map(|p| p.name)
            .unwrap_or_else(|_| task.plant_id.clone());
        let template_name = template_repo::get_template_by_id(conn, &task.template_id)
            .map(|t| t.name)
            .unwrap_or_else(|_| task.template_id.clone());
        named.push((task, plant_name, template_name));
    }
    Ok(named)
}
