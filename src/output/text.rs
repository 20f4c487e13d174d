use crate::models::{
    CareTask, ChainAssignment, ChainStep, ChecklistItem, Plant, StepCompletion, TaskChain,
    TaskTemplate,
};

fn short_id(id: &str) -> &str {
    &id[..std::cmp::min(8, id.len())]
}

pub fn print_plant(p: &Plant) {
    println!("Plant: {} ({})", p.name, p.id);
    if let Some(ref species) = p.species {
        println!("  Species: {species}");
    }
    if let Some(ref location) = p.location {
        println!("  Location: {location}");
    }
    if let Some(ref notes) = p.notes {
        println!("  Notes: {notes}");
    }
    println!("  Added: {}", p.created_at);
}

pub fn print_plant_list(plants: &[Plant]) {
    if plants.is_empty() {
        println!("No plants found.");
        return;
    }
    for p in plants {
        let species = p.species.as_deref().unwrap_or("");
        println!(
            "  {} ({}){}",
            p.name,
            short_id(&p.id),
            if species.is_empty() { String::new() } else { format!(" - {species}") }
        );
    }
}

pub fn print_template(t: &TaskTemplate, checklist: &[ChecklistItem]) {
    println!("Template: {} ({})", t.name, t.id);
    println!("  Category: {}", t.category.as_str());
    println!("  Priority: {}", t.priority.as_str());
    if t.is_one_time {
        println!("  One-time");
    } else {
        println!("  Every {} days", t.default_interval_days);
    }
    if !checklist.is_empty() {
        println!("  Checklist:");
        for item in checklist {
            let marker = if item.required { "*" } else { " " };
            println!("   {marker} {} ({})", item.text, short_id(&item.id));
        }
    }
}

pub fn print_template_list(templates: &[TaskTemplate]) {
    if templates.is_empty() {
        println!("No templates found.");
        return;
    }
    for t in templates {
        let cadence = if t.is_one_time {
            "one-time".to_string()
        } else {
            format!("every {}d", t.default_interval_days)
        };
        println!(
            "  [{}] {} ({}) {} {}",
            t.category.as_str(),
            t.name,
            short_id(&t.id),
            cadence,
            t.priority.as_str()
        );
    }
}

pub fn print_chain(c: &TaskChain, steps: &[(ChainStep, String)]) {
    println!("Chain: {} ({})", c.name, c.id);
    println!("  Category: {}", c.category.as_str());
    println!("  Active: {}", if c.is_active { "yes" } else { "no" });
    if steps.is_empty() {
        println!("  No steps.");
        return;
    }
    println!("  Steps:");
    for (step, template_name) in steps {
        let mut flags = Vec::new();
        if !step.is_required {
            flags.push("optional".to_string());
        }
        if step.wait_hours > 0 {
            flags.push(format!("wait {}h", step.wait_hours));
        }
        if step.requires_approval {
            flags.push(format!("approval: {}", step.approval_roles.join("/")));
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("    {}. {} ({}){}", step.step_order, template_name, short_id(&step.id), suffix);
    }
}

pub fn print_chain_list(chains: &[(TaskChain, usize)]) {
    if chains.is_empty() {
        println!("No chains found.");
        return;
    }
    for (c, step_count) in chains {
        let active = if c.is_active { "" } else { " (inactive)" };
        println!(
            "  {} ({}) [{}] {} steps{}",
            c.name,
            short_id(&c.id),
            c.category.as_str(),
            step_count,
            active
        );
    }
}

pub fn print_assignment(
    a: &ChainAssignment,
    chain_name: &str,
    plant_name: &str,
    completed: &[StepCompletion],
) {
    println!("Assignment: {} on {} ({})", chain_name, plant_name, a.id);
    println!("  Status: {}", a.status.as_str());
    println!("  Progress: {}%", a.progress);
    if let Some(ref current) = a.current_step_id {
        println!("  Current step: {current}");
    }
    if !completed.is_empty() {
        println!("  Completed steps:");
        for c in completed {
            println!("    {} at {}", short_id(&c.step_id), c.completed_at);
        }
    }
    println!("  Started: {}", a.started_at);
    if let Some(ref done) = a.completed_at {
        println!("  Completed: {done}");
    }
}

pub fn print_assignment_list(assignments: &[(ChainAssignment, String, String)]) {
    if assignments.is_empty() {
        println!("No assignments found.");
        return;
    }
    for (a, chain_name, plant_name) in assignments {
        println!(
            "  [{}] {} on {} ({}) {}%",
            a.status.as_str(),
            chain_name,
            plant_name,
            short_id(&a.id),
            a.progress
        );
    }
}

pub fn print_task(t: &CareTask, plant_name: &str, template_name: &str) {
    println!("Task: {} for {} ({})", template_name, plant_name, t.id);
    println!("  Due: {}", t.due_date);
    println!("  Completed: {}", if t.completed { "yes" } else { "no" });
    if let Some(ref done) = t.completed_at {
        println!("  Completed at: {done}");
    }
    if let Some(order) = t.step_order {
        println!("  Chain step order: {order}");
    }
    if !t.checklist_progress.is_empty() {
        let done = t.checklist_progress.values().filter(|c| **c).count();
        println!("  Checklist: {}/{} checked", done, t.checklist_progress.len());
    }
}

pub fn print_task_list(tasks: &[(CareTask, String, String)]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    for (t, plant_name, template_name) in tasks {
        let state = if t.completed { "done" } else { "pending" };
        let origin = if t.chain_assignment_id.is_some() { " (chain)" } else { "" };
        println!(
            "  [{}] {} for {} ({}) due {}{}",
            state,
            template_name,
            plant_name,
            short_id(&t.id),
            t.due_date,
            origin
        );
    }
}

pub fn print_schedule(entries: &[(CareTask, String, String, bool)]) {
    if entries.is_empty() {
        println!("Nothing scheduled.");
        return;
    }
    for (t, plant_name, template_name, overdue) in entries {
        let marker = if *overdue { " OVERDUE" } else { "" };
        println!(
            "  {} - {} for {} ({}){}",
            t.due_date,
            template_name,
            plant_name,
            short_id(&t.id),
            marker
        );
    }
}
