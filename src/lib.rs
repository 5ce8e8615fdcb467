pub mod cascade;
pub mod cli;
pub mod config;
pub mod orchestration;
pub mod prompts;
pub mod provider;
pub mod schema;
pub mod shared;
