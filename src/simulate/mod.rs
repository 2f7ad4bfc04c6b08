//! Scenario simulation.
//!
//! Runs the orchestrator against scripted step handlers so workflows can be
//! exercised end to end without a ledger or media store.
//!
//! - [`ScriptedHandler`] - Replays `ok` / `transient` / `fatal` / ... attempts
//! - [`Scenario`] - YAML description of a run
//! - [`RecoveryPrompter`] - Retry / resume / abort after a failure
//! - [`run_scenario`] - Drives the workflows to an end state

pub mod driver;
pub mod recovery;
pub mod scenario;
pub mod script;

pub use driver::{run_scenario, ScenarioReport, MAX_PROMPTS};
pub use recovery::{
    DialoguerPrompter, NonInteractivePrompter, RecoveryAction, RecoveryPrompter,
    ScriptedPrompter,
};
pub use scenario::{load_scenario, parse_scenario, Scenario};
pub use script::{ScriptedAttempt, ScriptedHandler};
