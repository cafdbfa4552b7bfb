pub mod reports;
pub mod simulation;

pub use simulation::{ScriptedNotes, SimulationSummary, check_invariants, run_simulation};
