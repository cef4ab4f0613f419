pub mod client;
pub mod models;
pub mod traits;

pub use client::OddsApiClient;
pub use models::*;
pub use traits::OddsFeed;
