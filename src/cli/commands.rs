use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sprout",
    version,
    about = "Plant care tracking CLI",
    after_help = "\
NOTE:
  Data is stored at $SPROUT_DATA_DIR/sprout.db (default ~/.sprout/sprout.db).
  Run `sprout init` before any other command.

EXIT CODES:
  0  Success
  1  Error (DB, validation, conflict, etc.)

CHAIN BEHAVIOR:
  A chain assignment completes steps strictly in order. Complete the step's
  task with `sprout task done <id>`; the next step's task is created with its
  wait applied. Steps gated on approval need `sprout assignment approve`
  first (or --approved-by/--role on `task done`).
  Cancelling an assignment keeps completed steps and existing tasks.
  Terminal assignments (completed/cancelled) are immutable."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the sprout database
    Init,

    /// Plant registry
    #[command(subcommand)]
    Plant(PlantCommands),

    /// Task templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Task chains
    #[command(subcommand)]
    Chain(ChainCommands),

    /// Chain assignments
    #[command(subcommand)]
    Assignment(AssignmentCommands),

    /// Care tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Upcoming care schedule (pending tasks by due date)
    Schedule,

    /// Overall status
    Status,
}

#[derive(Subcommand)]
pub enum PlantCommands {
    /// Register a plant
    Add {
        /// Plant name
        name: String,
        #[arg(long)]
        species: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List all plants
    List,
    /// Show plant details
    Show {
        /// Plant name or ID prefix
        reference: String,
    },
    /// Remove a plant (cascades its tasks and assignments)
    Remove {
        /// Plant name or ID prefix
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a task template
    Add {
        /// Template name
        name: String,
        /// Category: water|fertilize|prune|check|repot|clean
        #[arg(long)]
        category: String,
        /// Recurrence interval in days
        #[arg(long, default_value = "7")]
        interval_days: i64,
        /// Priority: high|medium|low
        #[arg(long, default_value = "medium")]
        priority: String,
        /// One-time template (no recurrence after completion)
        #[arg(long)]
        one_time: bool,
        /// Checklist item, repeatable. Append ':required' to mark required.
        #[arg(long)]
        checklist: Vec<String>,
    },
    /// List templates
    List,
    /// Show template details including checklist item IDs
    Show {
        /// Template name or ID prefix
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum ChainCommands {
    /// Create an empty chain
    Create {
        /// Chain name (unique)
        name: String,
        /// Category: water|fertilize|prune|check|repot|clean
        #[arg(long)]
        category: String,
    },
    /// Append a step to a chain
    AddStep {
        /// Chain name or ID prefix
        chain: String,
        /// Template name or ID prefix
        template: String,
        /// Step order (defaults to next free slot)
        #[arg(long)]
        order: Option<i64>,
        /// Hours to wait after the previous step's completion
        #[arg(long, default_value = "0")]
        wait_hours: i64,
        /// Mark the step optional
        #[arg(long)]
        optional: bool,
        /// Gate completion on an approval
        #[arg(long)]
        requires_approval: bool,
        /// Role allowed to approve, repeatable
        #[arg(long)]
        approval_role: Vec<String>,
        /// Opaque condition data (JSON), stored for external evaluation
        #[arg(long)]
        condition: Option<String>,
    },
    /// List chains
    List,
    /// Show chain details
    Show {
        /// Chain name or ID prefix
        reference: String,
    },
    /// Activate a chain
    Activate {
        /// Chain name or ID prefix
        reference: String,
    },
    /// Deactivate a chain (blocks new assignments only)
    Deactivate {
        /// Chain name or ID prefix
        reference: String,
    },
    /// Load a whole chain from stdin JSON
    #[command(after_help = "\
STDIN FORMAT:
  {\"name\":\"repot-recovery\", \"category\":\"repot\",
   \"steps\":[{\"template\":\"repot\", \"order\":0, \"wait_hours\":0,
              \"requires_approval\":false, \"approval_roles\":[]}]}

NOTE:
  Atomic: all-or-nothing. Validates name conflicts, unknown templates,
  duplicate step orders. Templates are referenced by name or ID.")]
    Load,
}

#[derive(Subcommand)]
pub enum AssignmentCommands {
    /// Assign a chain to a plant (creates the first step's task, due now)
    Create {
        /// Chain name or ID prefix
        chain: String,
        /// Plant name or ID prefix
        plant: String,
    },
    /// List assignments
    List {
        /// Filter by plant name or ID prefix
        #[arg(long)]
        plant: Option<String>,
    },
    /// Show assignment progress
    Show {
        /// Assignment ID prefix
        reference: String,
    },
    /// Approve the assignment's current step
    Approve {
        /// Assignment ID prefix
        reference: String,
        /// Approver identity
        #[arg(long)]
        by: String,
        /// Approver role (must be allowed by the step)
        #[arg(long)]
        role: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel an active assignment
    Cancel {
        /// Assignment ID prefix
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Materialize a standalone task from a template
    Schedule {
        /// Plant name or ID prefix
        plant: String,
        /// Template name or ID prefix
        template: String,
        /// Due in N days instead of now (negative allowed for backfill)
        #[arg(long, allow_negative_numbers = true)]
        in_days: Option<i64>,
    },
    /// List tasks (pending by default)
    List {
        /// Filter by plant name or ID prefix
        #[arg(long)]
        plant: Option<String>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Show task details
    Show {
        /// Task ID prefix
        reference: String,
    },
    /// Complete a task (advances its chain assignment, or schedules the
    /// next recurrence for standalone recurring templates)
    Done {
        /// Task ID prefix
        reference: String,
        /// Check off a checklist item by ID, repeatable
        #[arg(long)]
        check: Vec<String>,
        /// Supply an approval inline: approver identity
        #[arg(long)]
        approved_by: Option<String>,
        /// Supply an approval inline: approver role
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}
