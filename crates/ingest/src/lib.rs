//! Daily APOD ingestion: fetch the Astronomy Picture of the Day, normalize
//! it, and append it to the `apod_data` table.
//!
//! Pipeline flow: schema init → extract → transform → load

pub mod extract;
pub mod load;
pub mod runner;
pub mod schema;
pub mod source;
pub mod store;
pub mod transform;
pub mod trigger;

pub use extract::Extractor;
pub use load::{LoadReport, Loader};
pub use runner::{PipelineRunner, RunReport, RunState, Stage, StageFailure};
pub use schema::SchemaInitializer;
pub use source::{HttpFetcher, HttpResponse, ReqwestFetcher};
pub use store::{ApodStore, PgStore};
pub use transform::normalize;
pub use trigger::DailyTrigger;
