pub mod config;
pub mod error;
mod models;
mod supplier;

pub use supplier::OpenTriviaSupplier;
