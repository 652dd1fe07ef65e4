pub mod action;
pub mod analysis;
pub mod errors;
pub mod fan;
pub mod format;
pub mod replay;
pub mod script;
pub mod state;
pub mod tile;
pub mod types;

mod tests;

pub use replay::{RecordReplayer, ReplayObserver, ReplayOutcome};
pub use types::{GameLog, StepLog, WinAnalysis};
