// Player-type pipeline orchestration: parameter assembly from config,
// report artifacts, and persistence of the labeled table.

pub mod persist;
pub mod pipeline;
pub mod report;
