pub mod config;
pub mod logging;
pub mod replay;
pub mod scheduler;
pub mod state;
pub mod watch_loader;
