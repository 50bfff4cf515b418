pub mod catalog;
pub mod compose;
pub mod config;
pub mod describe;
pub mod error;
pub mod frames;
pub mod gif;
pub mod opts;
pub mod orchestrator;
pub mod output;
pub mod overlay;
pub mod request;
pub mod resolve;
pub mod subtitles;
pub mod video;

#[cfg(test)]
mod testing;

pub use crate::config::Settings;
pub use crate::orchestrator::{handle_request, RequestOutcome};
