pub mod config;
pub mod cost;
pub mod fetch;
pub mod guard;
pub mod routes;
