pub mod session_sweeper;
pub mod store_monitor;
