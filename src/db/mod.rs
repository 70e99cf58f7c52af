pub mod migrations;
pub mod predicate;
pub mod queries;
pub mod setup;
pub mod store;
