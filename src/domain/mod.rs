// Domain module: problem model, backend contract and value objects

pub mod cancellation;
pub mod models;
pub mod solver_service;
pub mod translation;
pub mod value_objects;

pub use cancellation::*;
pub use models::*;
pub use solver_service::*;
pub use value_objects::*;
