pub mod credentials;
pub mod error;
pub mod expiry;
pub mod models;
pub mod settings;
pub mod sheet;
pub mod store;
pub mod tokens;
