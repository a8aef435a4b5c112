pub mod types;

pub use types::{GlobalAction, Platform};
