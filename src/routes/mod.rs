pub mod auth;
pub mod dashboard;
pub mod stats;
pub mod visitors;
