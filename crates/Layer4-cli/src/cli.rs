//! Non-interactive commands

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use region_client::{
    ClientError, CreateResearchRequest, Municipality, MunicipalityApi, ResearchApi, ResearchPage,
    ResearchStatus, TaskStatusRecord,
};
use region_foundation::strings::fit_cell;
use region_foundation::time::describe_timestamp;
use region_foundation::ConsoleConfig;
use region_task::{HistoryBrowser, DEFAULT_STEP_LABEL, FAILED_MESSAGE, STOPPED_MESSAGE};
use std::sync::Arc;
use tracing::info;

const BAR_WIDTH: usize = 20;

/// Filters and paging for `list`
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub status: Option<ResearchStatus>,
    pub region: Option<String>,
    pub municipality_id: Option<i64>,
    pub page: u32,
    pub per_page: u32,
}

pub async fn show_status(api: &dyn ResearchApi, task_id: &str, json: bool) -> anyhow::Result<()> {
    let record = fetch_status(api, task_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        for line in status_lines(&record, Utc::now()) {
            println!("{}", line);
        }
    }
    Ok(())
}

pub async fn stop(api: &dyn ResearchApi, task_id: &str) -> anyhow::Result<()> {
    api.stop(task_id)
        .await
        .map_err(|e| anyhow!("Failed to stop research: {}", e.user_message()))?;
    info!("Stop requested for {}", task_id);
    println!("Stop requested for {}\n", task_id);

    let record = fetch_status(api, task_id).await?;
    for line in status_lines(&record, Utc::now()) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn show_report(api: &dyn ResearchApi, task_id: &str) -> anyhow::Result<()> {
    let report = api.get_report(task_id).await.map_err(|e| match e {
        ClientError::NotFound(_) => anyhow!("No report available for research task {}", task_id),
        other => anyhow!("Failed to load report: {}", other.user_message()),
    })?;

    if let Some(title) = report.title.as_deref().filter(|t| !t.is_empty()) {
        println!("{}\n", title);
    }
    println!("{}", report.report);
    Ok(())
}

pub async fn list(api: Arc<dyn ResearchApi>, options: ListOptions) -> anyhow::Result<()> {
    let mut browser = HistoryBrowser::new(api, options.per_page);
    browser.set_status_filter(options.status);
    browser.set_region_filter(options.region);
    browser.set_municipality_filter(options.municipality_id);
    browser.go_to_page(options.page);
    browser.load().await;

    if let Some(error) = browser.error() {
        bail!("Failed to load research list: {}", error);
    }
    let Some(page) = browser.page() else {
        return Ok(());
    };

    if page.items.is_empty() {
        println!("No research tasks found");
        return Ok(());
    }

    print!("{}", research_table(page, Utc::now()));
    if let Some(summary) = browser.summary() {
        println!("\n{}", summary);
    }
    if browser.last_page() > 1 {
        let current = browser.query().page;
        let pager: Vec<String> = browser
            .page_window()
            .map(|n| {
                if n == current {
                    format!("[{}]", n)
                } else {
                    n.to_string()
                }
            })
            .collect();
        println!("Pages: {}", pager.join(" "));
    }
    Ok(())
}

/// Arguments of `create`
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub region_name: Option<String>,
    pub region_id: Option<String>,
    pub title: Option<String>,
    pub breadth: Option<u32>,
    pub depth: Option<u32>,
    pub municipality_id: Option<i64>,
}

/// Build the creation request. A municipality id alone is enough: the
/// region fields are filled from the municipality, explicit flags win.
pub async fn build_request(
    municipalities: &dyn MunicipalityApi,
    options: CreateOptions,
) -> anyhow::Result<CreateResearchRequest> {
    let mut request = match (&options.region_name, &options.region_id, options.municipality_id) {
        (Some(name), Some(id), _) => CreateResearchRequest::new(name, id),
        (_, _, Some(municipality_id)) => {
            let municipality = municipalities.get(municipality_id).await.map_err(|e| match e {
                ClientError::NotFound(_) => anyhow!("Municipality {} not found", municipality_id),
                other => anyhow!("Failed to load municipality: {}", other.user_message()),
            })?;
            let mut request = CreateResearchRequest::for_municipality(&municipality);
            if let Some(name) = &options.region_name {
                request.region_name = name.clone();
            }
            if let Some(id) = &options.region_id {
                request.region_id = id.clone();
            }
            request
        }
        _ => bail!("Either --region-name with --region-id, or --municipality-id is required"),
    };

    if let Some(id) = options.municipality_id {
        request = request.with_municipality_id(id);
    }
    if let Some(title) = options.title {
        request = request.with_title(title);
    }
    if let Some(breadth) = options.breadth {
        request = request.with_breadth(breadth);
    }
    if let Some(depth) = options.depth {
        request = request.with_depth(depth);
    }
    Ok(request)
}

/// Create a research task; returns the created record
pub async fn create(
    api: &dyn ResearchApi,
    request: &CreateResearchRequest,
) -> anyhow::Result<TaskStatusRecord> {
    request.validate().map_err(|e| anyhow!(e))?;
    let record = api
        .create(request)
        .await
        .map_err(|e| anyhow!("Failed to create research: {}", e.user_message()))?;

    info!("Created research task {}", record.task_id);
    println!("Created research task {}", record.task_id);
    println!("  Title:  {}", request.effective_title());
    println!("  Region: {} ({})", request.region_name, request.region_id);
    println!("  Breadth {} / depth {}", request.breadth, request.depth);
    Ok(record)
}

pub fn print_municipality(municipality: &Municipality) {
    println!("{}", municipality.name);
    println!("  ID:          {}", municipality.id);
    println!("  TERYT:       {}", municipality.teryt_code);
    if !municipality.kind.is_empty() {
        println!("  Type:        {}", municipality.kind);
    }
    if let Some(voivodeship) = &municipality.voivodeship_name {
        println!("  Voivodeship: {}", voivodeship);
    }
    if let Some(county) = &municipality.county_name {
        println!("  County:      {}", county);
    }
    if let Some(population) = municipality.population {
        println!("  Population:  {}", population);
    }
}

pub fn print_config(config: &ConsoleConfig) {
    println!("API URL:          {}", config.api_base_url);
    println!("Request timeout:  {}s", config.request_timeout.as_secs());
    println!("Poll interval:    {}s", config.poll_interval.as_secs());
    println!("Stop on terminal: {}", config.stop_on_terminal);
    println!("Report preview:   {} chars", config.report_preview_chars);
    println!(
        "Search:           {}ms debounce, {} chars min, {} results",
        config.search_debounce.as_millis(),
        config.search_min_chars,
        config.search_limit
    );
    println!("Page size:        {}", config.default_per_page);
    println!("Theme:            {:?}", config.theme);
}

async fn fetch_status(api: &dyn ResearchApi, task_id: &str) -> anyhow::Result<TaskStatusRecord> {
    api.get_status(task_id).await.map_err(|e| match e {
        ClientError::NotFound(_) => anyhow!("Research task not found: {}", task_id),
        other => anyhow!(other.user_message()),
    })
}

// ============================================================================
// Formatting
// ============================================================================

fn status_label(status: &ResearchStatus) -> String {
    let display = status.display_name();
    if display.eq_ignore_ascii_case(status.as_str()) {
        display.to_string()
    } else {
        format!("{} ({})", display, status.as_str())
    }
}

fn progress_bar(percent: u16) -> String {
    let filled = (percent.min(100) as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

/// Key/value lines describing one task
pub fn status_lines(record: &TaskStatusRecord, now: DateTime<Utc>) -> Vec<String> {
    let mut rows: Vec<(&str, String)> = vec![
        ("Task ID", record.task_id.clone()),
        ("Region", or_dash(record.region_name.clone().unwrap_or_default())),
    ];
    if let Some(title) = &record.title {
        rows.push(("Title", title.clone()));
    }
    rows.push(("Status", status_label(&record.status)));
    rows.push(("Progress", progress_bar(record.progress_percent())));
    rows.push((
        "Step",
        record
            .current_step
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STEP_LABEL.to_string()),
    ));
    rows.push(("Started", or_dash(describe_timestamp(record.start_time.as_deref(), now))));
    rows.push(("Updated", or_dash(describe_timestamp(record.updated_at.as_deref(), now))));
    if record.end_time.is_some() {
        rows.push(("Ended", or_dash(describe_timestamp(record.end_time.as_deref(), now))));
    }

    let error = match (&record.status, record.error_message.as_deref()) {
        (_, Some(message)) if !message.is_empty() => Some(message.to_string()),
        (ResearchStatus::Failed, _) => Some(FAILED_MESSAGE.to_string()),
        (ResearchStatus::Stopped, _) => Some(STOPPED_MESSAGE.to_string()),
        _ => None,
    };
    if let Some(error) = error {
        rows.push(("Error", error));
    }

    rows.into_iter()
        .map(|(label, value)| format!("{:<10}{}", label, value))
        .collect()
}

fn pad_cell(value: &str, width: usize) -> String {
    format!("{:<width$}", fit_cell(value, width), width = width)
}

/// Fixed-width table of a research page
pub fn research_table(page: &ResearchPage, now: DateTime<Utc>) -> String {
    const COLUMNS: [(&str, usize); 5] = [
        ("TASK ID", 28),
        ("REGION", 22),
        ("STATUS", 12),
        ("PROGRESS", 8),
        ("CREATED", 20),
    ];

    let mut out = String::new();
    let header: Vec<String> = COLUMNS.iter().map(|(name, w)| pad_cell(name, *w)).collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    for item in &page.items {
        let created = item.created_at.as_deref().or(item.start_time.as_deref());
        let cells = [
            item.task_id.clone(),
            item.region_name.clone().unwrap_or_default(),
            item.status.display_name().to_string(),
            format!("{}%", item.progress_percent()),
            or_dash(describe_timestamp(created, now)),
        ];
        let row: Vec<String> = cells
            .iter()
            .zip(COLUMNS.iter())
            .map(|(cell, (_, w))| pad_cell(cell, *w))
            .collect();
        out.push_str(row.join("  ").trim_end());
        out.push('\n');
    }
    out
}
