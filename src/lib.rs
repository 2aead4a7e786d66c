pub mod core;
pub mod ingest;
pub mod llm;
pub mod query;
pub mod rag;
pub mod server;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
