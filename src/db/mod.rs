pub mod main;
pub mod models;
pub mod store;

pub use main::Db;
