pub mod http;
pub mod traits;

pub use http::ReqwestFetcher;
pub use traits::{HttpFetcher, HttpResponse};
