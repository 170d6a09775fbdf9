pub mod app_config;
pub mod booking_repo;
pub mod cloudinary;
pub mod connection;
pub mod database;
pub mod event_repo;
pub mod memory;

pub use cloudinary::CloudinaryClient;
pub use connection::{Connect, ConnectionCache, ConnectionState};
pub use database::PgDatastore;
pub use memory::MemoryDatastore;
