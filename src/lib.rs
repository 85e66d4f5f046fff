pub mod config;
pub mod errors;
pub mod fetch;
pub mod guide;
pub mod models;
pub mod pipeline;
pub mod playlist;
pub mod rules;
