pub mod auth;
pub mod categories;
pub mod payments;
pub mod products;
pub mod transactions;
