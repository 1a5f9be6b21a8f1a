//! # region-client
//!
//! REST client for the region research API.
//!
//! ## Features
//! - Typed records for research tasks, reports and municipalities
//! - `ResearchApi` / `MunicipalityApi` traits so callers can be tested
//!   against scripted responses
//! - Automatic retry with exponential backoff for idempotent lookups

pub mod api;
pub mod error;
pub mod http;
pub mod retry;
pub mod types;

// Traits
pub use api::{ClientResult, MunicipalityApi, ResearchApi};

// Error and retry
pub use error::ClientError;
pub use retry::{RetryConfig, RetryableError};

// HTTP implementation
pub use http::HttpClient;

// Records
pub use types::{
    CreateResearchRequest, Municipality, MunicipalityKind, ReportRecord, ResearchPage,
    ResearchQuery, ResearchStatus, TaskStatusRecord, DEFAULT_BREADTH, DEFAULT_DEPTH,
    MAX_PER_PAGE,
};
