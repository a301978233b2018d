//! Host-side tooling: the simulated hardware, a Set 2 monitor, key scripts
//! and logging setup for the simulator binary.

pub mod logging;
pub mod monitor;
pub mod script;
pub mod session;
pub mod sim;
