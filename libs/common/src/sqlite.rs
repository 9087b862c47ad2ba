pub mod client;

pub use client::{database_file, SqliteClient, SqliteSettings, SqlitePool};
