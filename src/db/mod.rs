//! SQLite persistence: one connection on a dedicated worker thread, with
//! repositories for the in-progress session and the saved-session archive.

mod connection;
pub mod helpers;
mod migrations;
mod repositories;

pub use connection::Database;
