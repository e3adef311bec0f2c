pub mod clusters;
pub mod customer_steps;
pub mod customers;
pub mod enums;
pub mod releases;
pub mod step_templates;

pub use enums::*;
