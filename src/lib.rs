//! Turn vendor EAP utilization reports (XML) into a dashboard model,
//! then flatten that model into tables and export files.
pub mod access;
pub mod config;
pub mod error;
pub mod extract;
pub mod loader;
pub mod output;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;
pub mod xml;

pub use error::{ExtractError, LoadError, ParseError, SchemaError};
pub use extract::{build_model, extract_dashboard};
pub use schema::ReportSchema;
pub use types::DashboardModel;
