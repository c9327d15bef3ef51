//! Domain records shared by the store and the HTTP layer.

pub mod errors;
pub mod customer;

pub use customer::Customer;
