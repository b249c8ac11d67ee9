pub mod http;
pub mod traits;

pub use http::HttpTaskSource;
pub use traits::TaskSource;
