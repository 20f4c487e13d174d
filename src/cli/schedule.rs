use serde_json::json;

use crate::db::{connection, plant_repo, task_repo, template_repo};
use crate::engine::materializer;
use crate::error::SproutError;
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
    let tasks = task_repo::list_tasks(&conn, None, false)?;
    let now = materializer::now_str();

    let mut entries = Vec::new();
    for task in tasks {
        let plant_name = plant_repo::get_plant_by_id(&conn, &task.plant_id)
            .map(|p| p.name)
            .unwrap_or_else(|_| task.plant_id.clone());
        let template_name = template_repo::get_template_by_id(&conn, &task.template_id)
            .map(|t| t.name)
            .unwrap_or_else(|_| task.template_id.clone());
        let overdue = task.due_date.as_str() < now.as_str();
        entries.push((task, plant_name, template_name, overdue));
    }

    if json_output {
        let entries_json: Vec<_> = entries
            .iter()
            .map(|(task, plant, template, overdue)| {
                output::json::schedule_entry(task, plant, template, *overdue)
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(
                json!({ "schedule": entries_json })
            ))
            .unwrap()
        );
    } else {
        output::text::print_schedule(&entries);
    }
    Ok(0)
}
