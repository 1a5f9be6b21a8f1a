//! API traits
//!
//! The monitor and the TUI depend on these traits rather than on the HTTP
//! client, so tests can script responses.

use crate::error::ClientError;
use crate::types::{
    CreateResearchRequest, Municipality, ReportRecord, ResearchPage, ResearchQuery,
    TaskStatusRecord,
};
use async_trait::async_trait;

/// Result alias for API calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Research task endpoints (`/api/research`)
#[async_trait]
pub trait ResearchApi: Send + Sync {
    /// `GET /api/research/{task_id}`
    async fn get_status(&self, task_id: &str) -> ClientResult<TaskStatusRecord>;

    /// `POST /api/research/{task_id}/stop`; any 2xx is success
    async fn stop(&self, task_id: &str) -> ClientResult<()>;

    /// `GET /api/research/{task_id}/report`
    async fn get_report(&self, task_id: &str) -> ClientResult<ReportRecord>;

    /// `GET /api/research/` with filters and pagination
    async fn list(&self, query: &ResearchQuery) -> ClientResult<ResearchPage>;

    /// `POST /api/research/`
    async fn create(&self, request: &CreateResearchRequest) -> ClientResult<TaskStatusRecord>;
}

/// Municipality lookup endpoints (`/api/municipalities`)
#[async_trait]
pub trait MunicipalityApi: Send + Sync {
    /// `GET /api/municipalities/search?q=..&limit=..`
    async fn search(&self, query: &str, limit: u32) -> ClientResult<Vec<Municipality>>;

    /// `GET /api/municipalities/{id}`
    async fn get(&self, id: i64) -> ClientResult<Municipality>;
}
