pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod song;
pub mod songsterr;
#[cfg(test)]
mod testing;
pub mod video;
