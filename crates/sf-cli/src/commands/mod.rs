pub mod config;
pub mod dispatch;
pub mod route;
pub mod schema;
pub mod simulate;
pub mod steps;
