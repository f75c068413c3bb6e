pub mod config;
pub mod enrich;
pub mod ingest;
pub mod intent;
pub mod models;
pub mod report;
pub mod scoring;
pub mod sentiment;
pub mod server;
pub mod text;
