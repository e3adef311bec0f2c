pub mod clusters;
pub mod customers;
pub mod health;
pub mod releases;
pub mod steps;
pub mod templates;
