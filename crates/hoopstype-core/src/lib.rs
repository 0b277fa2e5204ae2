// Shared infrastructure: the player table, configuration, and the results
// store.

pub mod config;
pub mod db;
pub mod policy;
pub mod table;
