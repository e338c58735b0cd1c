//! Business logic shared by the HTTP handlers and the ingestion workers

pub mod ingest;
pub mod members;
pub mod upsert;
