use std::collections::HashSet;
use std::io::{self, Read};

use serde::Deserialize;
use serde_json::json;

use crate::cli::commands::ChainCommands;
use crate::cli::template::parse_category;
use crate::db::{chain_repo, connection, template_repo};
use crate::error::SproutError;
use crate::output;

pub fn run(cmd: ChainCommands, json_output: bool) -> i32 {
    let result = match cmd {
        ChainCommands::Create { name, category } => run_create(&name, &category, json_output),
        ChainCommands::AddStep {
            chain,
            template,
            order,
            wait_hours,
            optional,
            requires_approval,
            approval_role,
            condition,
        } => run_add_step(
            &chain,
            &template,
            order,
            wait_hours,
            optional,
            requires_approval,
            &approval_role,
            condition.as_deref(),
            json_output,
        ),
        ChainCommands::List => run_list(json_output),
        ChainCommands::Show { reference } => run_show(&reference, json_output),
        ChainCommands::Activate { reference } => run_set_active(&reference, true, json_output),
        ChainCommands::Deactivate { reference } => run_set_active(&reference, false, json_output),
        ChainCommands::Load => run_load(json_output),
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

fn run_create(name: &str, category: &str, json_output: bool) -> Result<i32, SproutError> {
    if name.trim().is_empty() {
        return Err(SproutError::validation("Chain name is required"));
    }
    let category = parse_category(category)?;
    let conn = connection::open_db()?;
    let id = ulid::Ulid::new().to_string();
    let chain = chain_repo::create_chain(&conn, &id, name, category)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::chain_json(&chain, &[])))
                .unwrap()
        );
    } else {
        println!("Created chain: {} ({})", chain.name, chain.id);
    }
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
fn run_add_step(
    chain_ref: &str,
    template_ref: &str,
    order: Option<i64>,
    wait_hours: i64,
    optional: bool,
    requires_approval: bool,
    approval_roles: &[String],
    condition: Option<&str>,
    json_output: bool,
) -> Result<i32, SproutError> {
    if wait_hours < 0 {
        return Err(SproutError::validation("Wait hours cannot be negative"));
    }
    if requires_approval && approval_roles.is_empty() {
        return Err(SproutError::validation(
            "A step requiring approval needs at least one --approval-role",
        ));
    }
    if let Some(raw) = condition {
        serde_json::from_str::<serde_json::Value>(raw)
            .map_err(|e| SproutError::validation(format!("Condition is not valid JSON: {e}")))?;
    }

    let conn = connection::open_db()?;
    let chain = chain_repo::resolve_chain(&conn, chain_ref)?;
    let template = template_repo::resolve_template(&conn, template_ref)?;

    let existing = chain_repo::get_steps(&conn, &chain.id)?;
    let step_order = match order {
        Some(o) => {
            if o < 0 {
                return Err(SproutError::validation("Step order cannot be negative"));
            }
            if existing.iter().any(|s| s.step_order == o) {
                return Err(SproutError::validation(format!(
                    "Chain '{}' already has a step at order {o}",
                    chain.name
                )));
            }
            o
        }
        None => chain_repo::max_step_order(&conn, &chain.id)?.map_or(0, |max| max + 1),
    };

    let step = chain_repo::add_step(
        &conn,
        &ulid::Ulid::new().to_string(),
        &chain.id,
        &template.id,
        step_order,
        !optional,
        wait_hours,
        condition,
        requires_approval,
        approval_roles,
    )?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "chain": { "id": chain.id, "name": chain.name },
                "step": output::json::step_json(&step)
            })))
            .unwrap()
        );
    } else {
        println!(
            "Added step {} to chain '{}': {} ({})",
            step.step_order, chain.name, template.name, step.id
        );
    }
    Ok(0)
}

fn run_list(json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let chains = chain_repo::list_chains(&conn)?;
    let mut with_counts = Vec::new();
    for chain in chains {
        let steps = chain_repo::get_steps(&conn, &chain.id)?;
        with_counts.push((chain, steps.len()));
    }

    if json_output {
        let chains_json: Vec<_> = with_counts
            .iter()
            .map(|(c, count)| output::json::chain_summary(c, *count))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({ "chains": chains_json })))
                .unwrap()
        );
    } else {
        output::text::print_chain_list(&with_counts);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let chain = chain_repo::resolve_chain(&conn, reference)?;
    let steps = chain_repo::get_steps(&conn, &chain.id)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::chain_json(
                &chain, &steps
            )))
            .unwrap()
        );
    } else {
        let mut named = Vec::new();
        for step in steps {
            let template_name = template_repo::get_template_by_id(&conn, &step.template_id)
                .map(|t| t.name)
                .unwrap_or_else(|_| step.template_id.clone());
            named.push((step, template_name));
        }
        output::text::print_chain(&chain, &named);
    }
    Ok(0)
}

fn run_set_active(reference: &str, active: bool, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let chain = chain_repo::resolve_chain(&conn, reference)?;
    chain_repo::set_chain_active(&conn, &chain.id, active)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "chain": { "id": chain.id, "name": chain.name, "is_active": active }
            })))
            .unwrap()
        );
    } else {
        let verb = if active { "Activated" } else { "Deactivated" };
        println!("{} chain: {} ({})", verb, chain.name, chain.id);
    }
    Ok(0)
}

// --- chain load ---

#[derive(Deserialize)]
struct ChainLoadInput {
    name: String,
    category: String,
    steps: Vec<StepInput>,
}

#[derive(Deserialize)]
struct StepInput {
    template: String,
    order: i64,
    #[serde(default)]
    wait_hours: i64,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    requires_approval: bool,
    #[serde(default)]
    approval_roles: Vec<String>,
    condition: Option<serde_json::Value>,
}

fn run_load(json_output: bool) -> Result<i32, SproutError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| SproutError::validation(e.to_string()))?;

    let chain_input: ChainLoadInput = serde_json::from_str(&input)
        .map_err(|e| SproutError::validation(format!("Invalid JSON: {e}")))?;

    validate_load_input(&chain_input)?;
    let category = parse_category(&chain_input.category)?;

    let conn = connection::open_db()?;
    if chain_repo::find_chain_by_name(&conn, &chain_input.name)?.is_some() {
        return Err(SproutError::chain_name_conflict(&chain_input.name));
    }

    // Resolve template refs before any writes to fail fast.
    let mut resolved = Vec::new();
    for step in &chain_input.steps {
        resolved.push(template_repo::resolve_template(&conn, &step.template)?);
    }

    let chain_id = ulid::Ulid::new().to_string();
    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = (|| -> Result<_, SproutError> {
        let chain = chain_repo::create_chain(&conn, &chain_id, &chain_input.name, category)?;
        for (step, template) in chain_input.steps.iter().zip(&resolved) {
            let condition = step
                .condition
                .as_ref()
                .map(|v| serde_json::to_string(v).unwrap_or_default());
            chain_repo::add_step(
                &conn,
                &ulid::Ulid::new().to_string(),
                &chain.id,
                &template.id,
                step.order,
                !step.optional,
                step.wait_hours,
                condition.as_deref(),
                step.requires_approval,
                &step.approval_roles,
            )?;
        }
        Ok(chain)
    })();

    let chain = match result {
        Ok(chain) => {
            conn.execute_batch("COMMIT")?;
            chain
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    };

    let steps = chain_repo::get_steps(&conn, &chain.id)?;
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::chain_json(
                &chain, &steps
            )))
            .unwrap()
        );
    } else {
        println!(
            "Loaded chain '{}' with {} steps.",
            chain.name,
            steps.len()
        );
    }
    Ok(0)
}

fn validate_load_input(input: &ChainLoadInput) -> Result<(), SproutError> {
    if input.name.trim().is_empty() {
        return Err(SproutError::validation("Chain name is required"));
    }
    if input.steps.is_empty() {
        return Err(SproutError::validation("At least one step is required"));
    }
    let mut seen_orders = HashSet::new();
    for step in &input.steps {
        if step.order < 0 {
            return Err(SproutError::validation("Step order cannot be negative"));
        }
        if step.wait_hours < 0 {
            return Err(SproutError::validation("Wait hours cannot be negative"));
        }
        if !seen_orders.insert(step.order) {
            return Err(SproutError::validation(format!(
                "Duplicate step order: {}",
                step.order
            )));
        }
        if step.requires_approval && step.approval_roles.is_empty() {
            return Err(SproutError::validation(format!(
                "Step {} requires approval but lists no approval roles",
                step.order
            )));
        }
    }
    Ok(())
}
