//! Database queries

pub mod availability;
pub mod employee;
pub mod organization;
pub mod route;
pub mod shift;
pub mod stop;
pub mod vehicle;
