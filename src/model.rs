//! Server-owned analysis records.
//!
//! The client never creates or mutates these; it only decodes them. Every
//! field is optional so a partial response still renders.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    #[serde(default)]
    pub changepoint_date: Option<String>,
    #[serde(default)]
    pub credible_interval_start: Option<String>,
    #[serde(default)]
    pub credible_interval_end: Option<String>,
    #[serde(default)]
    pub prob_increase: Option<f64>,
    #[serde(default)]
    pub mean_before: Option<f64>,
    #[serde(default)]
    pub mean_after: Option<f64>,
    #[serde(default)]
    pub mean_change: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub total_observations: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(default)]
    pub analysis_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub changepoint: Option<ChangePoint>,
    #[serde(default)]
    pub price_summary: Option<PriceSummary>,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub data_quality: Option<DataQuality>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub std: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OilPriceSeries {
    #[serde(default)]
    pub summary: Option<SeriesSummary>,
    /// Series payload (dates, prices, ...) kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A curated historical event. Accepts both the analysis export's
/// capitalised keys and the lowercase keys of the sample backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Date", alias = "date", default)]
    pub date: Option<String>,
    #[serde(rename = "Event", alias = "event", default)]
    pub name: Option<String>,
    #[serde(rename = "Category", alias = "category", default)]
    pub category: Option<String>,
    #[serde(rename = "Abs_Days_to_CP", alias = "abs_days_to_cp", default)]
    pub abs_days_to_cp: Option<f64>,
}

/// `/events` answers either with a bare list or with an envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventsPayload {
    List(Vec<Event>),
    Envelope {
        #[serde(default)]
        events: Vec<Event>,
    },
}

impl EventsPayload {
    pub fn into_events(self) -> Vec<Event> {
        match self {
            EventsPayload::List(events) => events,
            EventsPayload::Envelope { events } => events,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationStats {
    #[serde(default)]
    pub events_within_1year: Option<u64>,
    #[serde(default)]
    pub events_within_2years: Option<u64>,
    #[serde(default)]
    pub closest_event_days: Option<f64>,
    #[serde(default)]
    pub total_events: Option<u64>,
    #[serde(default)]
    pub mean_distance_days: Option<f64>,
    #[serde(default)]
    pub events_within_ci: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventImpact {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub price_change_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCorrelation {
    #[serde(default)]
    pub event_correlation: Option<CorrelationStats>,
    #[serde(default)]
    pub nearby_events: Vec<Event>,
    #[serde(default)]
    pub event_impacts: Vec<EventImpact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDescriptor {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}
