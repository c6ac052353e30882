pub mod app_config;
pub mod database;
pub mod feed;
pub mod memory;
pub mod notify;
pub mod quote_repo;
pub mod token_repo;
pub mod trip_repo;

pub use database::DbClient;
pub use feed::TripFeed;
pub use notify::LogDispatcher;
