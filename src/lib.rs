pub mod bucket;
pub mod config;
pub mod download;
pub mod pipeline;
pub mod store;
pub mod tasks;
pub mod upload;
