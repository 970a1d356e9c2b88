//! Ready-made conversation graphs

pub mod office;
pub mod react;

pub use office::{create_office_agent, OfficeAgentConfig};
pub use react::{create_react_agent, ReactAgentConfig};
