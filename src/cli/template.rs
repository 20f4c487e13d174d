use serde_json::json;

use crate::cli::commands::TemplateCommands;
use crate::db::{connection, template_repo};
use crate::error::SproutError;
use crate::models::{Priority, TaskCategory};
use crate::output;

pub fn run(cmd: TemplateCommands, json_output: bool) -> i32 {
    let result = match cmd {
        TemplateCommands::Add {
            name,
            category,
            interval_days,
            priority,
            one_time,
            checklist,
        } => run_add(&name, &category, interval_days, &priority, one_time, &checklist, json_output),
        TemplateCommands::List => run_list(json_output),
        TemplateCommands::Show { reference } => run_show(&reference, json_output),
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

pub fn parse_category(s: &str) -> Result<TaskCategory, SproutError> {
    TaskCategory::from_str(s).ok_or_else(|| {
        SproutError::validation(format!(
            "Unknown category '{s}'. Expected one of: water, fertilize, prune, check, repot, clean"
        ))
    })
}

fn parse_priority(s: &str) -> Result<Priority, SproutError> {
    Priority::from_str(s).ok_or_else(|| {
        SproutError::validation(format!("Unknown priority '{s}'. Expected high, medium or low"))
    })
}

/// Parse a checklist flag value: "text" or "text:required".
fn parse_checklist_item(s: &str) -> (String, bool) {
    match s.strip_suffix(":required") {
        Some(text) => (text.to_string(), true),
        None => (s.to_string(), false),
    }
}

fn run_add(
    name: &str,
    category: &str,
    interval_days: i64,
    priority: &str,
    one_time: bool,
    checklist: &[String],
    json_output: bool,
) -> Result<i32, SproutError> {
    if name.trim().is_empty() {
        return Err(SproutError::validation("Template name is required"));
    }
    let category = parse_category(category)?;
    let priority = parse_priority(priority)?;
    if interval_days < 1 {
        return Err(SproutError::validation("Interval must be at least 1 day"));
    }

    let conn = connection::open_db()?;
    let id = ulid::Ulid::new().to_string();

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = (|| -> Result<_, SproutError> {
        let template = template_repo::create_template(
            &conn, &id, name, category, interval_days, priority, one_time,
        )?;
        for (position, raw) in checklist.iter().enumerate() {
            let (text, required) = parse_checklist_item(raw);
            if text.trim().is_empty() {
                return Err(SproutError::validation("Checklist item text is required"));
            }
            template_repo::add_checklist_item(
                &conn,
                &ulid::Ulid::new().to_string(),
                &template.id,
                position as i64,
                &text,
                required,
            )?;
        }
        Ok(template)
    })();

    let template = match result {
        Ok(template) => {
            conn.execute_batch("COMMIT")?;
            template
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    let items = template_repo::get_checklist(&conn, &template.id)?;
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::template_json(
                &template, &items
            )))
            .unwrap()
        );
    } else {
        println!("Added template: {} ({})", template.name, template.id);
    }
    Ok(0)
}

fn run_list(json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let templates = template_repo::list_templates(&conn)?;

    if json_output {
        let templates_json: Vec<_> = templates.iter().map(output::json::template_summary).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(
                json!({ "templates": templates_json })
            ))
            .unwrap()
        );
    } else {
        output::text::print_template_list(&templates);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let template = template_repo::resolve_template(&conn, reference)?;
    let items = template_repo::get_checklist(&conn, &template.id)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::template_json(
                &template, &items
            )))
            .unwrap()
        );
    } else {
        output::text::print_template(&template, &items);
    }
    Ok(0)
}
