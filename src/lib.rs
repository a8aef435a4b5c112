pub mod backend;
pub mod classifier;
pub mod constants;
pub mod db;
pub mod detector;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod host;
pub mod models;
pub mod platform;
pub mod session;
pub mod settings;
#[cfg(test)]
mod test_utils;
pub mod validation;
