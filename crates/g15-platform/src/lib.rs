//! Platform service abstractions for g15control.

pub mod process;
pub mod services;

pub use process::{ProcessHandle, ProcessLauncher, ProcessTable, StdProcessLauncher, split_args};
pub use services::{
    FixedClock, LocalClock, ProcStats, StatsService, SystemStats, TimeService, WallTime,
};
