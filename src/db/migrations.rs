use rusqlite::Connection;

use crate::error::SproutError;

pub fn run_migrations(conn: &Connection) -> Result<(), SproutError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS plants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            species TEXT,
            location TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS task_templates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL
                CHECK (category IN ('water', 'fertilize', 'prune', 'check', 'repot', 'clean')),
            default_interval_days INTEGER NOT NULL DEFAULT 7
                CHECK (default_interval_days >= 1),
            priority TEXT NOT NULL DEFAULT 'medium'
                CHECK (priority IN ('high', 'medium', 'low')),
            is_one_time INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS template_checklist_items (
            id TEXT PRIMARY KEY,
            template_id TEXT NOT NULL REFERENCES task_templates(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            required INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS task_chains (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL
                CHECK (category IN ('water', 'fertilize', 'prune', 'check', 'repot', 'clean')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS chain_steps (
            id TEXT PRIMARY KEY,
            chain_id TEXT NOT NULL REFERENCES task_chains(id) ON DELETE CASCADE,
            template_id TEXT NOT NULL REFERENCES task_templates(id),
            step_order INTEGER NOT NULL,
            is_required INTEGER NOT NULL DEFAULT 1,
            wait_hours INTEGER NOT NULL DEFAULT 0 CHECK (wait_hours >= 0),
            condition TEXT,
            requires_approval INTEGER NOT NULL DEFAULT 0,
            approval_roles TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS chain_assignments (
            id TEXT PRIMARY KEY,
            chain_id TEXT NOT NULL REFERENCES task_chains(id),
            plant_id TEXT NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'completed', 'cancelled')),
            current_step_id TEXT REFERENCES chain_steps(id),
            progress INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL DEFAULT (datetime('now')),
            completed_at TEXT,
            last_updated TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS assignment_step_completions (
            assignment_id TEXT NOT NULL REFERENCES chain_assignments(id) ON DELETE CASCADE,
            step_id TEXT NOT NULL REFERENCES chain_steps(id),
            position INTEGER NOT NULL,
            completed_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (assignment_id, step_id)
        );

        CREATE TABLE IF NOT EXISTS step_approvals (
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL REFERENCES chain_assignments(id) ON DELETE CASCADE,
            step_id TEXT NOT NULL REFERENCES chain_steps(id),
            approved_by TEXT NOT NULL,
            role TEXT NOT NULL,
            notes TEXT,
            approved_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS care_tasks (
            id TEXT PRIMARY KEY,
            plant_id TEXT NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
            template_id TEXT NOT NULL REFERENCES task_templates(id),
            chain_assignment_id TEXT REFERENCES chain_assignments(id) ON DELETE SET NULL,
            chain_step_id TEXT REFERENCES chain_steps(id) ON DELETE SET NULL,
            step_order INTEGER,
            due_date TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            checklist_progress TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_checklist_template ON template_checklist_items(template_id, position);
        CREATE INDEX IF NOT EXISTS idx_steps_chain_order ON chain_steps(chain_id, step_order);
        CREATE INDEX IF NOT EXISTS idx_assignments_plant ON chain_assignments(plant_id, status);
        CREATE INDEX IF NOT EXISTS idx_approvals_step ON step_approvals(assignment_id, step_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_plant ON care_tasks(plant_id, completed);
        CREATE INDEX IF NOT EXISTS idx_tasks_pending ON care_tasks(due_date)
            WHERE completed = 0;
        ",
    )?;
    Ok(())
}
