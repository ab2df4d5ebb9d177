use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::error::ApiResult;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{AnalysisSummary, ChangePoint, Event, EventCorrelation, ExportDescriptor, Health, OilPriceSeries};

mod http;
pub mod retry;

pub use http::HttpApi;

/// The backend's fixed set of REST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    OilPrices,
    Events,
    ChangePoint,
    EventCorrelation,
    AnalysisSummary,
    PriceAnalysis,
    Export,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/health",
            Endpoint::OilPrices => "/oil-prices",
            Endpoint::Events => "/events",
            Endpoint::ChangePoint => "/changepoint",
            Endpoint::EventCorrelation => "/event-correlation",
            Endpoint::AnalysisSummary => "/analysis-summary",
            Endpoint::PriceAnalysis => "/price-analysis",
            Endpoint::Export => "/export-data",
        }
    }

    /// Prefix put in front of a transport message when this call fails.
    pub fn failure_label(&self) -> &'static str {
        match self {
            Endpoint::Health => "Health check failed",
            Endpoint::OilPrices => "Failed to fetch oil prices",
            Endpoint::Events => "Failed to fetch events",
            Endpoint::ChangePoint => "Failed to fetch change point data",
            Endpoint::EventCorrelation => "Failed to fetch event correlation data",
            Endpoint::AnalysisSummary => "Failed to fetch analysis summary",
            Endpoint::PriceAnalysis => "Failed to fetch price analysis",
            Endpoint::Export => "Failed to export data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Pdf];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Pdf => "PDF",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "Comma-separated values for spreadsheet analysis",
            ExportFormat::Json => "JavaScript Object Notation for programmatic use",
            ExportFormat::Pdf => "Portable Document Format report",
        }
    }

    pub fn default_filename(&self) -> String {
        format!("oil_analysis_export.{}", self.as_str())
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Json
    }
}

/// Query parameters in call order; absent or empty values are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opt(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.pairs.push((key, v.to_string()));
        }
        self
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Read access to the analysis backend.
#[async_trait]
pub trait AnalysisApi {
    async fn check_health(&self) -> ApiResult<Health>;
    async fn fetch_oil_prices(&self, start_date: Option<&str>, end_date: Option<&str>) -> ApiResult<OilPriceSeries>;
    async fn fetch_events(
        &self,
        category: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult<Vec<Event>>;
    async fn fetch_change_point(&self) -> ApiResult<ChangePoint>;
    async fn fetch_event_correlation(&self) -> ApiResult<EventCorrelation>;
    async fn fetch_analysis_summary(&self) -> ApiResult<AnalysisSummary>;
    async fn fetch_price_analysis(&self) -> ApiResult<Value>;
    async fn export_data(&self, format: ExportFormat) -> ApiResult<ExportDescriptor>;
}

pub async fn is_api_available<A: AnalysisApi + ?Sized>(api: &A) -> bool {
    match api.check_health().await {
        Ok(_) => true,
        Err(e) => {
            log(
                Level::Warn,
                Domain::Http,
                "api_unavailable",
                obj(&[("msg", v_str(&e.to_string()))]),
            );
            false
        }
    }
}

pub fn format_date_for_api(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date_from_api(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // ISO timestamp without offset, as emitted by `datetime.isoformat()`
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}
