//! Type definitions

pub mod availability;
pub mod employee;
pub mod messages;
pub mod organization;
pub mod route;
pub mod shift;
pub mod stop;
pub mod vehicle;

pub use availability::*;
pub use employee::*;
pub use messages::*;
pub use organization::*;
pub use route::*;
pub use shift::*;
pub use stop::*;
pub use vehicle::*;
