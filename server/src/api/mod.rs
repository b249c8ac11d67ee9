//! HTTP surface of the dispatch server

mod error;
mod routes;

pub use routes::router;
