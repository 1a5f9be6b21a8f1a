//! Wire types for the research and municipality API

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Research status
// ============================================================================

/// Server-reported lifecycle status of a research task.
///
/// Unknown strings are preserved in [`ResearchStatus::Other`] so the raw
/// value can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResearchStatus {
    Queued,
    Starting,
    Running,
    Completed,
    Failed,
    Stopped,
    Other(String),
}

impl ResearchStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => Self::Queued,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Other(raw) => raw,
        }
    }

    /// Completed, failed or stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Starting or running; the states in which a stop request makes sense
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Failed or stopped
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }

    /// Display label
    pub fn display_name(&self) -> &str {
        match self {
            Self::Queued => "Queued",
            Self::Starting | Self::Running => "In progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
            Self::Other(raw) => raw,
        }
    }

    /// Statuses accepted by the list filter
    pub fn filter_values() -> [ResearchStatus; 5] {
        [
            Self::Queued,
            Self::Running,
            Self::Completed,
            Self::Failed,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResearchStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResearchStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// ============================================================================
// Task status record
// ============================================================================

/// Snapshot of one research task as returned by `GET /api/research/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusRecord {
    pub task_id: String,

    pub status: ResearchStatus,

    /// Percentage; not guaranteed monotonic or in range
    #[serde(default, deserialize_with = "null_as_zero")]
    pub progress: i64,

    #[serde(default)]
    pub current_step: Option<String>,

    #[serde(default)]
    pub region_name: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub region_id: Option<String>,

    #[serde(default)]
    pub breadth: Option<u32>,

    #[serde(default)]
    pub depth: Option<u32>,

    #[serde(default)]
    pub municipality_id: Option<i64>,

    #[serde(default)]
    pub created_at: Option<String>,

    /// Seconds between start and end (or now)
    #[serde(default)]
    pub duration: Option<f64>,
}

fn null_as_zero<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

impl TaskStatusRecord {
    /// Minimal record; used by fakes and tests
    pub fn new(task_id: impl Into<String>, status: ResearchStatus, progress: i64) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            progress,
            current_step: None,
            region_name: None,
            start_time: None,
            updated_at: None,
            end_time: None,
            error_message: None,
            title: None,
            region_id: None,
            breadth: None,
            depth: None,
            municipality_id: None,
            created_at: None,
            duration: None,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_region_name(mut self, name: impl Into<String>) -> Self {
        self.region_name = Some(name.into());
        self
    }

    pub fn with_current_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    /// Progress clamped to 0..=100 for display
    pub fn progress_percent(&self) -> u16 {
        self.progress.clamp(0, 100) as u16
    }
}

// ============================================================================
// Report
// ============================================================================

/// Report body from `GET /api/research/{id}/report`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub report: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl ReportRecord {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            title: None,
            kind: None,
            created_at: None,
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Filters and pagination for `GET /api/research/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchQuery {
    pub status: Option<ResearchStatus>,
    /// Case-insensitive substring match on the region name
    pub region_name: Option<String>,
    pub municipality_id: Option<i64>,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

/// Server-side cap on `per_page`
pub const MAX_PER_PAGE: u32 = 100;

impl Default for ResearchQuery {
    fn default() -> Self {
        Self {
            status: None,
            region_name: None,
            municipality_id: None,
            page: 1,
            per_page: 10,
        }
    }
}

impl ResearchQuery {
    /// Query string pairs, omitting unset filters
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("per_page", self.per_page.clamp(1, MAX_PER_PAGE).to_string()),
        ];
        if let Some(status) = &self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(region) = self.region_name.as_deref().map(str::trim) {
            if !region.is_empty() {
                pairs.push(("region_name", region.to_string()));
            }
        }
        if let Some(id) = self.municipality_id {
            pairs.push(("municipality_id", id.to_string()));
        }
        pairs
    }
}

/// One page of research tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPage {
    pub items: Vec<TaskStatusRecord>,
    pub total: u64,
    pub pages: u32,
    pub page: u32,
    pub per_page: u32,
}

// ============================================================================
// Creation
// ============================================================================

pub const DEFAULT_BREADTH: u32 = 4;
pub const DEFAULT_DEPTH: u32 = 2;

/// Body for `POST /api/research/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateResearchRequest {
    pub region_name: String,
    pub region_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub breadth: u32,
    pub depth: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,

    /// Client-chosen id; the server generates one when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl CreateResearchRequest {
    pub fn new(region_name: impl Into<String>, region_id: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            region_id: region_id.into(),
            title: None,
            breadth: DEFAULT_BREADTH,
            depth: DEFAULT_DEPTH,
            municipality_id: None,
            task_id: None,
        }
    }

    /// Pre-fill region fields from a selected municipality
    pub fn for_municipality(municipality: &Municipality) -> Self {
        let mut request = Self::new(&municipality.name, &municipality.teryt_code);
        request.municipality_id = Some(municipality.id);
        request.title = Some(default_title(&municipality.name));
        request
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_breadth(mut self, breadth: u32) -> Self {
        self.breadth = breadth;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_municipality_id(mut self, id: i64) -> Self {
        self.municipality_id = Some(id);
        self
    }

    /// Title that will be sent (explicit or derived from the region)
    pub fn effective_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default_title(&self.region_name))
    }

    /// Reject requests the server would refuse
    pub fn validate(&self) -> Result<(), String> {
        if self.region_name.trim().is_empty() || self.region_id.trim().is_empty() {
            return Err("Region name and region id are required".to_string());
        }
        if self.breadth == 0 || self.depth == 0 {
            return Err("Breadth and depth must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_title(region_name: &str) -> String {
    format!("Region research: {}", region_name)
}

// ============================================================================
// Municipality
// ============================================================================

/// Municipality as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: i64,
    pub teryt_code: String,
    pub name: String,

    /// "gmina miejska", "gmina wiejska", "gmina miejsko-wiejska", ...
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub voivodeship_name: Option<String>,

    #[serde(default)]
    pub county_name: Option<String>,

    #[serde(default)]
    pub population: Option<u64>,
}

/// Municipality kind, used for badge coloring in the picker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MunicipalityKind {
    Urban,
    Rural,
    UrbanRural,
    Other,
}

impl Municipality {
    pub fn kind(&self) -> MunicipalityKind {
        // "miejsko-wiejska" contains "wiejska"; check it before the rural case.
        if self.kind.contains("miejsko-wiejska") {
            MunicipalityKind::UrbanRural
        } else if self.kind.contains("miejska") {
            MunicipalityKind::Urban
        } else if self.kind.contains("wiejska") {
            MunicipalityKind::Rural
        } else {
            MunicipalityKind::Other
        }
    }
}
