pub mod handler;

pub use handler::{QueryHandler, QueryOutcome};
