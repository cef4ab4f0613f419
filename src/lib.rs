pub mod app;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notify;
pub mod placement;
pub mod reconciler;
pub mod settlement;
pub mod state;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
