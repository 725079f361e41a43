//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! The store implementation is a thin adapter: it translates between Diesel
//! rows and domain types and enforces the port's atomicity contract with
//! transactions and row locks. Row structs (`models`) and table definitions
//! (`schema`) are internal and never exposed to the domain layer.

mod diesel_membership_store;
mod models;
mod pool;
mod schema;

pub use diesel_membership_store::DieselMembershipStore;
pub use pool::{DbPool, PoolConfig, PoolError};
