pub mod clock;
pub mod config;
pub mod error;
pub mod listing;
pub mod preview;
pub mod providers;
pub mod utils;
mod view;

pub use view::{browser, components, event, screens};
