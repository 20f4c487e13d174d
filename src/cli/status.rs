use serde_json::json;

use crate::db::{assignment_repo, connection, plant_repo, task_repo};
use crate::engine::materializer;
use crate::error::SproutError;
use crate::models::AssignmentStatus;
use crate::output;

pub fn run(json_output: bool) -> i32 {
    let result = run_inner(json_output);
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

fn run_inner(json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plants = plant_repo::list_plants(&conn)?;
    let pending = task_repo::pending_count(&conn)?;
    let overdue = task_repo::overdue_count(&conn, &materializer::now_str())?;
    let assignments = assignment_repo::list_assignments(&conn, None)?;
    let active = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Active)
        .count();

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "plants": plants.len(),
                "pending_tasks": pending,
                "overdue_tasks": overdue,
                "active_assignments": active
            })))
            .unwrap()
        );
    } else {
        println!("Plants: {}", plants.len());
        println!("Pending tasks: {pending} ({overdue} overdue)");
        println!("Active assignments: {active}");
    }
    Ok(0)
}
