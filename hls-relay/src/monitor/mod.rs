//! Background monitors that run alongside the API server.

mod self_check;

pub use self_check::SelfCheckMonitor;
