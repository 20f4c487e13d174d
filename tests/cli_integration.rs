#[allow(deprecated)]
use assert_cmd::Command;
use chrono::NaiveDateTime;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ─── helpers ───────────────────────────────────────────────────────

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create tempdir"),
        }
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("sprout-data")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sprout").expect("binary");
        cmd.env("SPROUT_DATA_DIR", self.data_dir());
        cmd
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut a: Vec<&str> = args.to_vec();
        a.push("--json");
        let output = self.cmd().args(&a).output().expect("run");
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("parse JSON failed: {e}\nstdout: {stdout}"))
    }

    fn run_ok(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], true, "expected success=true: {v}");
        v
    }

    fn run_err(&self, args: &[&str]) -> Value {
        let v = self.run_json(args);
        assert_eq!(v["success"], false, "expected success=false: {v}");
        v
    }

    fn load_chain(&self, content: &str) -> Value {
        let p = self.dir.path().join("_chain.json");
        fs::write(&p, content).expect("write chain file");
        let output = self
            .cmd()
            .args(["chain", "load", "--json"])
            .pipe_stdin(&p)
            .unwrap()
            .output()
            .expect("chain load");
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("parse JSON failed: {e}\nstdout: {stdout}"))
    }

    fn load_chain_ok(&self, content: &str) -> Value {
        let v = self.load_chain(content);
        assert_eq!(v["success"], true, "chain load failed: {v}");
        v
    }
}

fn minutes_until(timestamp: &str) -> i64 {
    let parsed = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("parse timestamp '{timestamp}': {e}"));
    (parsed - chrono::Utc::now().naive_utc()).num_minutes()
}

/// init + one plant + the three templates used by the recovery chain.
fn setup_base(env: &TestEnv) {
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Monstera", "--species", "Monstera deliciosa"]);
    env.run_ok(&["template", "add", "soak", "--category", "water"]);
    env.run_ok(&["template", "add", "feed", "--category", "fertilize"]);
    env.run_ok(&["template", "add", "inspect", "--category", "check"]);
}

fn recovery_chain_json() -> String {
    serde_json::json!({
        "name": "recovery",
        "category": "repot",
        "steps": [
            {"template": "soak", "order": 0},
            {"template": "feed", "order": 1, "wait_hours": 24},
            {"template": "inspect", "order": 2,
             "requires_approval": true, "approval_roles": ["botanist"]}
        ]
    })
    .to_string()
}

// ─── 1. init ───────────────────────────────────────────────────────

#[test]
fn test_init() {
    let env = TestEnv::new();
    let v = env.run_ok(&["init"]);
    let path = v["data"]["path"].as_str().unwrap();
    assert!(path.ends_with("sprout.db"));
    assert!(PathBuf::from(path).exists());
}

#[test]
fn test_init_idempotent() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    let v = env.run_ok(&["init"]);
    assert!(v["data"]["path"].as_str().unwrap().contains("sprout.db"));
}

#[test]
fn test_init_required_before_commands() {
    let env = TestEnv::new();
    let v = env.run_err(&["plant", "list"]);
    assert_eq!(v["error"]["code"], "NOT_INITIALIZED");
}

// ─── 2. plants ─────────────────────────────────────────────────────

#[test]
fn test_plant_crud() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);

    let v = env.run_ok(&["plant", "add", "Monstera", "--location", "living room"]);
    let id = v["data"]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["plant", "list"]);
    assert_eq!(v["data"]["plants"].as_array().unwrap().len(), 1);

    // Resolve by name and by ID prefix.
    let v = env.run_ok(&["plant", "show", "Monstera"]);
    assert_eq!(v["data"]["id"], id.as_str());
    let v = env.run_ok(&["plant", "show", &id[..8]]);
    assert_eq!(v["data"]["location"], "living room");

    env.run_ok(&["plant", "remove", "Monstera"]);
    let v = env.run_err(&["plant", "show", "Monstera"]);
    assert_eq!(v["error"]["code"], "PLANT_NOT_FOUND");
}

#[test]
fn test_plant_ambiguous_reference() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Fern left"]);
    env.run_ok(&["plant", "add", "Fern right"]);

    let v = env.run_err(&["plant", "show", "Fern"]);
    assert_eq!(v["error"]["code"], "AMBIGUOUS_REF");
}

// ─── 3. templates ──────────────────────────────────────────────────

#[test]
fn test_template_add_with_checklist() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);

    let v = env.run_ok(&[
        "template", "add", "repot",
        "--category", "repot",
        "--priority", "high",
        "--one-time",
        "--checklist", "Loosen root ball:required",
        "--checklist", "Add fresh soil",
    ]);
    let checklist = v["data"]["checklist"].as_array().unwrap();
    assert_eq!(checklist.len(), 2);
    assert_eq!(checklist[0]["text"], "Loosen root ball");
    assert_eq!(checklist[0]["required"], true);
    assert_eq!(checklist[1]["required"], false);
    assert_eq!(v["data"]["is_one_time"], true);
}

#[test]
fn test_template_validation() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);

    let v = env.run_err(&["template", "add", "bad", "--category", "sing"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.run_err(&["template", "add", "bad", "--category", "water", "--interval-days", "0"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.run_err(&["template", "add", "bad", "--category", "water", "--priority", "urgent"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");
}

// ─── 4. chain authoring ────────────────────────────────────────────

#[test]
fn test_chain_authoring() {
    let env = TestEnv::new();
    setup_base(&env);

    env.run_ok(&["chain", "create", "weekly-care", "--category", "water"]);
    let v = env.run_ok(&["chain", "add-step", "weekly-care", "soak"]);
    assert_eq!(v["data"]["step"]["order"], 0);
    let v = env.run_ok(&["chain", "add-step", "weekly-care", "feed", "--wait-hours", "48"]);
    assert_eq!(v["data"]["step"]["order"], 1);
    assert_eq!(v["data"]["step"]["wait_hours"], 48);

    let v = env.run_err(&["chain", "add-step", "weekly-care", "inspect", "--order", "1"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.run_ok(&["chain", "show", "weekly-care"]);
    assert_eq!(v["data"]["steps"].as_array().unwrap().len(), 2);
}

#[test]
fn test_chain_approval_step_needs_roles() {
    let env = TestEnv::new();
    setup_base(&env);
    env.run_ok(&["chain", "create", "gated", "--category", "check"]);

    let v = env.run_err(&["chain", "add-step", "gated", "inspect", "--requires-approval"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");
}

#[test]
fn test_chain_load() {
    let env = TestEnv::new();
    setup_base(&env);

    let v = env.load_chain_ok(&recovery_chain_json());
    assert_eq!(v["data"]["name"], "recovery");
    assert_eq!(v["data"]["steps"].as_array().unwrap().len(), 3);
    assert_eq!(v["data"]["steps"][2]["approval_roles"][0], "botanist");

    // Name conflict.
    let v = env.load_chain(&recovery_chain_json());
    assert_eq!(v["error"]["code"], "CHAIN_NAME_CONFLICT");
}

#[test]
fn test_chain_load_validations() {
    let env = TestEnv::new();
    setup_base(&env);

    let v = env.load_chain(r#"{"name":"empty","category":"water","steps":[]}"#);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.load_chain(
        r#"{"name":"dup","category":"water","steps":[
            {"template":"soak","order":0},{"template":"feed","order":0}]}"#,
    );
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.load_chain(
        r#"{"name":"ghost","category":"water","steps":[{"template":"mist","order":0}]}"#,
    );
    assert_eq!(v["error"]["code"], "TEMPLATE_NOT_FOUND");

    // Nothing partial was written.
    let v = env.run_ok(&["chain", "list"]);
    assert_eq!(v["data"]["chains"].as_array().unwrap().len(), 0);
}

// ─── 5. assignment lifecycle ───────────────────────────────────────

#[test]
fn test_assignment_create_materializes_first_task() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    let v = env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    assert_eq!(v["data"]["assignment"]["status"], "active");
    assert_eq!(v["data"]["assignment"]["progress"], 0);
    let first = &v["data"]["first_task"];
    assert_eq!(first["step_order"], 0);
    assert!(minutes_until(first["due_date"].as_str().unwrap()).abs() <= 1);
}

#[test]
fn test_assignment_rejects_inactive_or_empty_chain() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    env.run_ok(&["chain", "deactivate", "recovery"]);
    let v = env.run_err(&["assignment", "create", "recovery", "Monstera"]);
    assert_eq!(v["error"]["code"], "INVALID_STATE");

    env.run_ok(&["chain", "activate", "recovery"]);
    env.run_ok(&["assignment", "create", "recovery", "Monstera"]);

    env.run_ok(&["chain", "create", "hollow", "--category", "water"]);
    let v = env.run_err(&["assignment", "create", "hollow", "Monstera"]);
    assert_eq!(v["error"]["code"], "INVALID_STATE");
}

/// The full walk: A(0h) → B(24h) → C(approval-gated by "botanist").
#[test]
fn test_chain_progression_walkthrough() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    let v = env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    let assignment_id = v["data"]["assignment"]["id"].as_str().unwrap().to_string();
    let task_a = v["data"]["first_task"]["id"].as_str().unwrap().to_string();

    // A done → B materialized with its 24h wait applied.
    let v = env.run_ok(&["task", "done", &task_a]);
    assert_eq!(v["data"]["assignment"]["progress"], 33);
    assert_eq!(v["data"]["assignment"]["status"], "active");
    let task_b = v["data"]["next_task"]["id"].as_str().unwrap().to_string();
    let due_b = v["data"]["next_task"]["due_date"].as_str().unwrap();
    let minutes = minutes_until(due_b);
    assert!((1430..=1441).contains(&minutes), "B due in {minutes} minutes");

    // B done → C materialized, due immediately.
    let v = env.run_ok(&["task", "done", &task_b]);
    assert_eq!(v["data"]["assignment"]["progress"], 67);
    let task_c = v["data"]["next_task"]["id"].as_str().unwrap().to_string();
    assert!(minutes_until(v["data"]["next_task"]["due_date"].as_str().unwrap()).abs() <= 1);

    // C is approval-gated.
    let v = env.run_err(&["task", "done", &task_c]);
    assert_eq!(v["error"]["code"], "APPROVAL_REQUIRED");

    let v = env.run_err(&[
        "assignment", "approve", &assignment_id, "--by", "ines", "--role", "intern",
    ]);
    assert_eq!(v["error"]["code"], "FORBIDDEN");

    env.run_ok(&[
        "assignment", "approve", &assignment_id, "--by", "ines", "--role", "botanist",
    ]);
    let v = env.run_ok(&["task", "done", &task_c]);
    assert_eq!(v["data"]["assignment"]["status"], "completed");
    assert_eq!(v["data"]["assignment"]["progress"], 100);
    assert!(v["data"]["assignment"]["completed_at"].is_string());
    assert!(v["data"].get("next_task").is_none());

    let v = env.run_ok(&["assignment", "show", &assignment_id]);
    assert_eq!(v["data"]["current_step_id"], Value::Null);
    assert_eq!(v["data"]["completed_steps"].as_array().unwrap().len(), 3);
}

#[test]
fn test_replayed_completion_conflicts() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    let v = env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    let assignment_id = v["data"]["assignment"]["id"].as_str().unwrap().to_string();
    let task_a = v["data"]["first_task"]["id"].as_str().unwrap().to_string();

    env.run_ok(&["task", "done", &task_a]);
    let v = env.run_err(&["task", "done", &task_a]);
    assert_eq!(v["error"]["code"], "CONFLICT");

    let v = env.run_ok(&["assignment", "show", &assignment_id]);
    assert_eq!(v["data"]["completed_steps"].as_array().unwrap().len(), 1);
    assert_eq!(v["data"]["progress"], 33);
}

#[test]
fn test_cancel_keeps_history_and_tasks() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    let v = env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    let assignment_id = v["data"]["assignment"]["id"].as_str().unwrap().to_string();
    let task_a = v["data"]["first_task"]["id"].as_str().unwrap().to_string();
    let v = env.run_ok(&["task", "done", &task_a]);
    let task_b = v["data"]["next_task"]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["assignment", "cancel", &assignment_id]);
    assert_eq!(v["data"]["status"], "cancelled");
    assert_eq!(v["data"]["current_step_id"], Value::Null);
    assert_eq!(v["data"]["completed_steps"].as_array().unwrap().len(), 1);

    // B's task survives the cancellation but can no longer advance anything.
    let v = env.run_ok(&["task", "show", &task_b]);
    assert_eq!(v["data"]["completed"], false);
    let v = env.run_err(&["task", "done", &task_b]);
    assert_eq!(v["error"]["code"], "CONFLICT");

    let v = env.run_err(&["assignment", "cancel", &assignment_id]);
    assert_eq!(v["error"]["code"], "CONFLICT");
}

#[test]
fn test_approve_step_without_roles_is_forbidden() {
    let env = TestEnv::new();
    setup_base(&env);
    env.load_chain_ok(&recovery_chain_json());

    let v = env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    let assignment_id = v["data"]["assignment"]["id"].as_str().unwrap().to_string();

    // Current step (order 0) has no approval roles: nobody may approve it.
    let v = env.run_err(&[
        "assignment", "approve", &assignment_id, "--by", "ines", "--role", "botanist",
    ]);
    assert_eq!(v["error"]["code"], "FORBIDDEN");
}

// ─── 6. standalone tasks ───────────────────────────────────────────

#[test]
fn test_standalone_recurrence() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Ficus"]);
    env.run_ok(&["template", "add", "mist", "--category", "water", "--interval-days", "3"]);

    let v = env.run_ok(&["task", "schedule", "Ficus", "mist"]);
    let task_id = v["data"]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["task", "done", &task_id]);
    let next = &v["data"]["next_occurrence"];
    let minutes = minutes_until(next["due_date"].as_str().unwrap());
    assert!((3 * 24 * 60 - 2..=3 * 24 * 60 + 1).contains(&minutes), "due in {minutes} minutes");
}

#[test]
fn test_one_time_template_does_not_recur() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Ficus"]);
    env.run_ok(&["template", "add", "repot-once", "--category", "repot", "--one-time"]);

    let v = env.run_ok(&["task", "schedule", "Ficus", "repot-once"]);
    let task_id = v["data"]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["task", "done", &task_id]);
    assert!(v["data"].get("next_occurrence").is_none());

    let v = env.run_ok(&["task", "list", "--plant", "Ficus"]);
    assert_eq!(v["data"]["tasks"].as_array().unwrap().len(), 0);
}

#[test]
fn test_task_checklist_checkoff() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Ficus"]);
    env.run_ok(&[
        "template", "add", "clean", "--category", "clean", "--one-time",
        "--checklist", "Wipe leaves", "--checklist", "Rinse saucer",
    ]);

    let v = env.run_ok(&["template", "show", "clean"]);
    let item_id = v["data"]["checklist"][0]["id"].as_str().unwrap().to_string();

    let v = env.run_ok(&["task", "schedule", "Ficus", "clean"]);
    let task_id = v["data"]["id"].as_str().unwrap().to_string();

    let v = env.run_err(&["task", "done", &task_id, "--check", "nonexistent"]);
    assert_eq!(v["error"]["code"], "VALIDATION_ERROR");

    let v = env.run_ok(&["task", "done", &task_id, "--check", &item_id]);
    assert_eq!(v["data"]["task"]["checklist_progress"][&item_id], true);
}

// ─── 7. schedule & status ──────────────────────────────────────────

#[test]
fn test_schedule_view_flags_overdue() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.run_ok(&["plant", "add", "Ficus"]);
    env.run_ok(&["template", "add", "mist", "--category", "water"]);
    env.run_ok(&["template", "add", "feed", "--category", "fertilize"]);

    env.run_ok(&["task", "schedule", "Ficus", "mist", "--in-days", "-1"]);
    env.run_ok(&["task", "schedule", "Ficus", "feed", "--in-days", "2"]);

    let v = env.run_ok(&["schedule"]);
    let entries = v["data"]["schedule"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // Ordered by due date: the overdue one first.
    assert_eq!(entries[0]["template"], "mist");
    assert_eq!(entries[0]["overdue"], true);
    assert_eq!(entries[1]["overdue"], false);
}

#[test]
fn test_status_counts() {
    let env = TestEnv::new();
    setup_base(&env);
    env.run_ok(&["task", "schedule", "Monstera", "soak", "--in-days", "-2"]);
    env.run_ok(&["task", "schedule", "Monstera", "feed", "--in-days", "2"]);

    let v = env.run_ok(&["status"]);
    assert_eq!(v["data"]["plants"], 1);
    assert_eq!(v["data"]["pending_tasks"], 2);
    assert_eq!(v["data"]["overdue_tasks"], 1);
    assert_eq!(v["data"]["active_assignments"], 0);

    env.load_chain_ok(&recovery_chain_json());
    env.run_ok(&["assignment", "create", "recovery", "Monstera"]);
    let v = env.run_ok(&["status"]);
    assert_eq!(v["data"]["pending_tasks"], 3);
    assert_eq!(v["data"]["active_assignments"], 1);
}

// ─── 8. text output smoke ──────────────────────────────────────────

#[test]
fn test_text_output() {
    let env = TestEnv::new();
    env.run_ok(&["init"]);
    env.cmd()
        .args(["plant", "add", "Monstera"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added plant: Monstera"));
    env.cmd()
        .args(["plant", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plant not found"));
}
