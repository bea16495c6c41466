pub mod db;
pub mod memory;
pub mod models;
pub mod repository;

pub use rusqlite;
