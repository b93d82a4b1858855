#[macro_use]
extern crate log;

pub mod app;
pub mod config;
pub mod format;
pub mod search;
pub mod session;
pub mod stats;

pub use app::{AppShell, Command, ShellState};
pub use search::SearchPanel;
pub use stats::StatsPanel;

pub use filehub_client as client;
