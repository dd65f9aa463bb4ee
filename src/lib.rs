pub mod config;
pub mod db;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod server;
