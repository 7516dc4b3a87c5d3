pub mod ai;
pub mod coin;
pub mod config;
pub mod db;
pub mod decimal;
pub mod error;
pub mod fanout;
pub mod fetch;
pub mod jupiter;
pub mod models;
pub mod series;
pub mod swap;
pub mod wallet;

pub use error::{ScrapError, ScrapResult};

#[cfg(test)]
mod testing;
