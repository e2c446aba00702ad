/// Database configuration and connection management
pub mod database;

/// Account and catalog seeding from config.toml
pub mod seed;
