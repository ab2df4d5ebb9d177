//! Dashboard state: filters, the load cycle, server status and export status.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::api::retry::{retry_async, RetryPolicy};
use crate::api::{format_date_for_api, parse_date_from_api, AnalysisApi, ExportFormat};
use crate::error::ApiResult;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{AnalysisSummary, Event, EventCorrelation, ExportDescriptor, OilPriceSeries};
use crate::render::{self, Card};

pub const EVENT_CATEGORIES: [&str; 6] = [
    "Geopolitical",
    "Economic",
    "Oil Market",
    "Financial Crisis",
    "War/Conflict",
    "Policy",
];

pub const SUMMARY_LOAD_FAILED: &str =
    "Failed to load analysis data. Please ensure the backend server is running.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub categories: Vec<String>,
}

impl Filters {
    /// On error the filters are left untouched.
    pub fn set_start_date(&mut self, raw: Option<&str>) -> Result<()> {
        let start = normalize_date(raw)?;
        check_range(start.as_deref(), self.end_date.as_deref())?;
        self.start_date = start;
        Ok(())
    }

    pub fn set_end_date(&mut self, raw: Option<&str>) -> Result<()> {
        let end = normalize_date(raw)?;
        check_range(self.start_date.as_deref(), end.as_deref())?;
        self.end_date = end;
        Ok(())
    }

    /// Add the category if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle_category(&mut self, category: &str) -> Result<bool> {
        let Some(known) = EVENT_CATEGORIES.iter().find(|c| c.eq_ignore_ascii_case(category.trim())) else {
            bail!("unknown event category '{}' (expected one of: {})", category, EVENT_CATEGORIES.join(", "));
        };
        if let Some(pos) = self.categories.iter().position(|c| c == known) {
            self.categories.remove(pos);
            Ok(false)
        } else {
            self.categories.push(known.to_string());
            Ok(true)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Selected categories as the `category` query value.
    pub fn category_param(&self) -> Option<String> {
        if self.categories.is_empty() {
            None
        } else {
            Some(self.categories.join(","))
        }
    }

    pub fn describe_active(&self) -> String {
        let mut parts = Vec::new();
        if let Some(s) = &self.start_date {
            parts.push(format!("Start: {}", s));
        }
        if let Some(e) = &self.end_date {
            parts.push(format!("End: {}", e));
        }
        if !self.categories.is_empty() {
            parts.push(format!("Categories: {}", self.categories.join(", ")));
        }
        if parts.is_empty() {
            "None".to_string()
        } else {
            parts.join(" ")
        }
    }
}

fn check_range(start: Option<&str>, end: Option<&str>) -> Result<()> {
    if let (Some(s), Some(e)) = (start, end) {
        // YYYY-MM-DD compares lexically
        if s > e {
            bail!("start date {} is after end date {}", s, e);
        }
    }
    Ok(())
}

fn normalize_date(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) => match parse_date_from_api(r) {
            Some(d) => Ok(Some(format_date_for_api(d))),
            None => bail!("invalid date '{}', expected YYYY-MM-DD", r),
        },
    }
}

// =============================================================================
// Load cycle
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardData {
    pub summary: AnalysisSummary,
    pub oil: OilPriceSeries,
    pub events: Vec<Event>,
    pub correlation: EventCorrelation,
}

impl DashboardData {
    /// Cards in page order.
    pub fn render(&self, filters: &Filters, status: &ServerStatus) -> Vec<Card> {
        let cp = self.summary.changepoint.as_ref();
        vec![
            render::header_card(status, Some(&self.summary)),
            render::export_card(None),
            render::filter_card(filters),
            render::key_insights_card(Some(&self.summary), Some(&self.correlation)),
            render::price_chart_card(Some(&self.oil), cp),
            render::data_summary_card(Some(&self.oil), Some(&self.events), cp),
            render::change_point_card(cp),
            render::event_correlation_card(Some(&self.correlation)),
            render::methodology_card(),
            render::footer_card(Some(&self.summary)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    #[default]
    Idle,
    Loaded(Box<DashboardData>),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub filters: Filters,
    pub state: LoadState,
    retry: Option<RetryPolicy>,
}

impl Dashboard {
    pub fn new(filters: Filters) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    /// Wrap every fetch of the load cycle in the backoff helper.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Fetch summary, prices, events and correlation in sequence. The first
    /// failure stops the cycle and becomes the displayed error.
    pub async fn load<A: AnalysisApi + Sync + ?Sized>(&mut self, api: &A) -> &LoadState {
        log(
            Level::Info,
            Domain::Dashboard,
            "load_start",
            obj(&[("msg", v_str(&self.filters.describe_active()))]),
        );
        self.state = match self.fetch_all(api).await {
            Ok(data) => LoadState::Loaded(Box::new(data)),
            Err(message) => {
                log(
                    Level::Error,
                    Domain::Dashboard,
                    "load_failed",
                    obj(&[("msg", v_str(&message))]),
                );
                LoadState::Failed(message)
            }
        };
        &self.state
    }

    /// The "Retry" action: run the same load again.
    pub async fn reload<A: AnalysisApi + Sync + ?Sized>(&mut self, api: &A) -> &LoadState {
        self.load(api).await
    }

    async fn fetch_all<A: AnalysisApi + Sync + ?Sized>(&self, api: &A) -> std::result::Result<DashboardData, String> {
        let start = self.filters.start_date.as_deref();
        let end = self.filters.end_date.as_deref();
        let category = self.filters.category_param();
        let category = category.as_deref();

        let summary = self
            .call("analysis_summary", move || api.fetch_analysis_summary())
            .await
            .map_err(|_| SUMMARY_LOAD_FAILED.to_string())?;
        let oil = self
            .call("oil_prices", move || api.fetch_oil_prices(start, end))
            .await
            .map_err(|e| e.to_string())?;
        let events = self
            .call("events", move || api.fetch_events(category, start, end))
            .await
            .map_err(|e| e.to_string())?;
        let correlation = self
            .call("event_correlation", move || api.fetch_event_correlation())
            .await
            .map_err(|e| e.to_string())?;

        Ok(DashboardData {
            summary,
            oil,
            events,
            correlation,
        })
    }

    async fn call<T, F, Fut>(&self, name: &str, mut op: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ApiResult<T>>,
    {
        match &self.retry {
            Some(policy) => retry_async(policy, name, op).await,
            None => op().await,
        }
    }

    pub fn render(&self, status: &ServerStatus) -> Vec<Card> {
        match &self.state {
            LoadState::Loaded(data) => data.render(&self.filters, status),
            LoadState::Failed(message) => vec![
                render::header_card(status, None),
                render::error_card("Error Loading Dashboard", message),
            ],
            LoadState::Idle => vec![render::header_card(status, None)],
        }
    }
}

// =============================================================================
// Server status
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ServerStatus {
    #[default]
    Checking,
    Online {
        last_updated: Option<String>,
    },
    Offline,
}

impl ServerStatus {
    pub async fn probe<A: AnalysisApi + ?Sized>(api: &A) -> Self {
        match api.check_health().await {
            Ok(h) => ServerStatus::Online {
                last_updated: h.timestamp,
            },
            Err(_) => ServerStatus::Offline,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServerStatus::Checking => "Checking...",
            ServerStatus::Online { .. } => "Online",
            ServerStatus::Offline => "Offline",
        }
    }

    pub fn last_updated(&self) -> Option<&str> {
        match self {
            ServerStatus::Online { last_updated } => last_updated.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Export
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Preparing,
    Ready { download_url: String, filename: String },
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn message(&self) -> &'static str {
        match self {
            ExportStatus::Preparing => "Preparing export...",
            ExportStatus::Ready { .. } => "Export completed successfully!",
            ExportStatus::Completed => "Export completed!",
            ExportStatus::Failed => "Export failed. Please try again.",
        }
    }

    pub fn from_descriptor(desc: &ExportDescriptor, format: ExportFormat) -> Self {
        match desc.download_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => ExportStatus::Ready {
                download_url: url.to_string(),
                filename: desc
                    .filename
                    .clone()
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| format.default_filename()),
            },
            None => ExportStatus::Completed,
        }
    }
}

/// Request an export and turn the outcome into a status line.
pub async fn request_export<A: AnalysisApi + ?Sized>(api: &A, format: ExportFormat) -> ExportStatus {
    match api.export_data(format).await {
        Ok(desc) => ExportStatus::from_descriptor(&desc, format),
        Err(e) => {
            log(
                Level::Error,
                Domain::Export,
                "export_failed",
                obj(&[("format", v_str(format.as_str())), ("msg", v_str(&e.to_string()))]),
            );
            ExportStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_describe() {
        let mut f = Filters::default();
        assert_eq!(f.describe_active(), "None");
        f.set_start_date(Some("2020-01-01")).unwrap();
        f.toggle_category("oil market").unwrap();
        f.toggle_category("Policy").unwrap();
        assert_eq!(f.describe_active(), "Start: 2020-01-01 Categories: Oil Market, Policy");
        assert_eq!(f.category_param().as_deref(), Some("Oil Market,Policy"));
    }

    #[test]
    fn test_toggle_removes_and_rejects_unknown() {
        let mut f = Filters::default();
        assert!(f.toggle_category("Economic").unwrap());
        assert!(!f.toggle_category("economic").unwrap());
        assert!(f.categories.is_empty());
        assert!(f.toggle_category("Weather").is_err());
    }

    #[test]
    fn test_dates_validated() {
        let mut f = Filters::default();
        assert!(f.set_start_date(Some("2020-13-01")).is_err());
        f.set_start_date(Some("2021-01-01")).unwrap();
        assert!(f.set_end_date(Some("2020-01-01")).is_err());
        assert!(f.end_date.is_none());
        f.set_start_date(Some("")).unwrap();
        assert!(f.start_date.is_none());
    }

    #[test]
    fn test_rejected_date_leaves_filters_unchanged() {
        let mut f = Filters::default();
        f.set_end_date(Some("2020-01-01")).unwrap();
        assert!(f.set_start_date(Some("2021-01-01")).is_err());
        assert_eq!(f.start_date, None);
        assert_eq!(f.end_date.as_deref(), Some("2020-01-01"));
        assert_eq!(f.describe_active(), "End: 2020-01-01");

        f.set_start_date(Some("2019-06-01")).unwrap();
        assert!(f.set_end_date(Some("2019-01-01")).is_err());
        assert_eq!(f.end_date.as_deref(), Some("2020-01-01"));
        assert!(f.set_start_date(Some("not-a-date")).is_err());
        assert_eq!(f.start_date.as_deref(), Some("2019-06-01"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut f = Filters::default();
        f.set_end_date(Some("2022-02-24")).unwrap();
        f.toggle_category("Geopolitical").unwrap();
        f.reset();
        assert_eq!(f, Filters::default());
    }

    #[test]
    fn test_export_status_from_descriptor() {
        let desc = ExportDescriptor {
            download_url: Some("/static/a.csv".into()),
            filename: None,
        };
        assert_eq!(
            ExportStatus::from_descriptor(&desc, ExportFormat::Csv),
            ExportStatus::Ready {
                download_url: "/static/a.csv".into(),
                filename: "oil_analysis_export.csv".into()
            }
        );
        let empty = ExportDescriptor::default();
        let status = ExportStatus::from_descriptor(&empty, ExportFormat::Json);
        assert_eq!(status.message(), "Export completed!");
    }

    #[test]
    fn test_server_status_labels() {
        assert_eq!(ServerStatus::default().label(), "Checking...");
        assert_eq!(ServerStatus::Offline.last_updated(), None);
        let online = ServerStatus::Online {
            last_updated: Some("2024-01-01T00:00:00".into()),
        };
        assert_eq!(online.label(), "Online");
        assert_eq!(online.last_updated(), Some("2024-01-01T00:00:00"));
    }
}
