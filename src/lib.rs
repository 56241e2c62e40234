// lib.rs - Main library entry point
//
// A deterministic streak, experience-points, and progress gamification engine. The
// calculators (`streak`, `experience`) are pure functions of an event log; `orchestrator`
// drives them against a caller-supplied `repository` implementation; `commands` exposes the
// two callable entry points a host Tauri application registers.

pub mod calendar;
pub mod commands;
pub mod error;
pub mod experience;
pub mod freeze;
pub mod model;
pub mod orchestrator;
pub mod repository;
pub mod streak;

pub use commands::AppState;
pub use error::{Error, Result};

/// Install a `tracing` subscriber reading `RUST_LOG`, honoring whatever a host application
/// already installed. Safe to call more than once; later calls are no-ops.
///
/// This crate never bootstraps its own `tauri::Builder` — the host application registers
/// `commands::calculate_streak` / `commands::calculate_experience_points` on its own
/// `invoke_handler![]` alongside its own commands, and `.manage()`s its own `AppState` built
/// from its concrete repository adapters.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
