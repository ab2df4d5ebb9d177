use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{AnalysisApi, Endpoint, ExportFormat, Query};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, TransportError};
use crate::logging::{log, log_request, log_response, log_response_error, obj, v_str, Domain, Level};
use crate::model::{
    AnalysisSummary, ChangePoint, Event, EventCorrelation, EventsPayload, ExportDescriptor, Health, OilPriceSeries,
};

/// `AnalysisApi` over HTTP.
pub struct HttpApi {
    client: Client,
    base: String,
    export_timeout: Duration,
}

impl HttpApi {
    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            client,
            base: cfg.base_url.clone(),
            export_timeout: cfg.export_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint_url(&self, endpoint: Endpoint, query: &Query) -> Result<Url, TransportError> {
        let mut url = Url::parse(&format!("{}{}", self.base, endpoint.path()))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query.pairs() {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: Query,
        timeout: Option<Duration>,
    ) -> ApiResult<T> {
        let url = self
            .endpoint_url(endpoint, &query)
            .map_err(|e| ApiError::new(endpoint, e))?;
        let body = self
            .send(url, timeout)
            .await
            .map_err(|e| ApiError::new(endpoint, e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::new(endpoint, TransportError::Decode(e.to_string())))
    }

    /// GET with the response interceptor applied: logs, then classifies failures.
    async fn send(&self, url: Url, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        log_request("GET", url.as_str());
        let mut req = self.client.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(t) = timeout {
            req = req.timeout(t);
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => return Err(intercept_error(TransportError::from_reqwest(&e), url.as_str())),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = TransportError::from_status(status.as_u16(), body.clone());
            log_response_error(err.kind().as_str(), &body, url.as_str());
            return Err(err);
        }
        log_response(status.as_u16(), url.as_str());

        match resp.bytes().await {
            Ok(b) => Ok(b.to_vec()),
            Err(e) => Err(intercept_error(TransportError::from_reqwest(&e), url.as_str())),
        }
    }

    /// Resolve an export's download URL, relative ones against the API host.
    pub fn resolve_download_url(&self, raw: &str) -> Result<Url, TransportError> {
        match Url::parse(raw) {
            Ok(u) => Ok(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("{}/", self.base))
                .and_then(|base| base.join(raw))
                .map_err(|e| TransportError::InvalidRequest(e.to_string())),
            Err(e) => Err(TransportError::InvalidRequest(e.to_string())),
        }
    }

    /// Fetch an exported file and write it to `dest`; returns the byte count.
    pub async fn download(&self, download_url: &str, dest: &Path) -> ApiResult<u64> {
        let url = self
            .resolve_download_url(download_url)
            .map_err(|e| ApiError::new(Endpoint::Export, e))?;
        let bytes = self
            .send(url, Some(self.export_timeout))
            .await
            .map_err(|e| ApiError::new(Endpoint::Export, e))?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| ApiError::new(Endpoint::Export, TransportError::Io(format!("{}: {}", dest.display(), e))))?;
        log(
            Level::Info,
            Domain::Export,
            "downloaded",
            obj(&[
                ("path", v_str(&dest.display().to_string())),
                ("bytes", serde_json::json!(bytes.len())),
            ]),
        );
        Ok(bytes.len() as u64)
    }
}

fn intercept_error(err: TransportError, url: &str) -> TransportError {
    let detail = match &err {
        TransportError::Network { detail } => detail.clone(),
        other => other.to_string(),
    };
    log_response_error(err.kind().as_str(), &detail, url);
    err
}

#[async_trait]
impl AnalysisApi for HttpApi {
    async fn check_health(&self) -> ApiResult<Health> {
        self.get_json(Endpoint::Health, Query::new(), None).await
    }

    async fn fetch_oil_prices(&self, start_date: Option<&str>, end_date: Option<&str>) -> ApiResult<OilPriceSeries> {
        let query = Query::new().opt("start_date", start_date).opt("end_date", end_date);
        self.get_json(Endpoint::OilPrices, query, None).await
    }

    async fn fetch_events(
        &self,
        category: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> ApiResult<Vec<Event>> {
        let query = Query::new()
            .opt("category", category)
            .opt("start_date", start_date)
            .opt("end_date", end_date);
        let payload: EventsPayload = self.get_json(Endpoint::Events, query, None).await?;
        Ok(payload.into_events())
    }

    async fn fetch_change_point(&self) -> ApiResult<ChangePoint> {
        self.get_json(Endpoint::ChangePoint, Query::new(), None).await
    }

    async fn fetch_event_correlation(&self) -> ApiResult<EventCorrelation> {
        self.get_json(Endpoint::EventCorrelation, Query::new(), None).await
    }

    async fn fetch_analysis_summary(&self) -> ApiResult<AnalysisSummary> {
        self.get_json(Endpoint::AnalysisSummary, Query::new(), None).await
    }

    async fn fetch_price_analysis(&self) -> ApiResult<Value> {
        self.get_json(Endpoint::PriceAnalysis, Query::new(), None).await
    }

    async fn export_data(&self, format: ExportFormat) -> ApiResult<ExportDescriptor> {
        let query = Query::new().opt("format", Some(format.as_str()));
        log(
            Level::Info,
            Domain::Export,
            "export_requested",
            obj(&[("format", v_str(format.as_str()))]),
        );
        self.get_json(Endpoint::Export, query, Some(self.export_timeout)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(&ClientConfig::default().with_base_url(base)).unwrap()
    }

    #[test]
    fn test_endpoint_url_with_query() {
        let api = api("http://localhost:5000/api");
        let q = Query::new()
            .opt("category", Some("Oil Market"))
            .opt("start_date", Some("2020-01-01"));
        let url = api.endpoint_url(Endpoint::Events, &q).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/events?category=Oil+Market&start_date=2020-01-01"
        );
    }

    #[test]
    fn test_endpoint_url_without_query_has_no_question_mark() {
        let api = api("http://localhost:5000/api/");
        let url = api.endpoint_url(Endpoint::ChangePoint, &Query::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/changepoint");
    }

    #[test]
    fn test_resolve_download_url() {
        let api = api("http://localhost:5000/api");
        assert_eq!(
            api.resolve_download_url("https://cdn.test/x.csv").unwrap().as_str(),
            "https://cdn.test/x.csv"
        );
        assert_eq!(
            api.resolve_download_url("exports/x.csv").unwrap().as_str(),
            "http://localhost:5000/api/exports/x.csv"
        );
        assert_eq!(
            api.resolve_download_url("/static/x.csv").unwrap().as_str(),
            "http://localhost:5000/static/x.csv"
        );
    }

    #[test]
    fn test_new_rejects_bad_base() {
        assert!(HttpApi::new(&ClientConfig::default().with_base_url("not a url")).is_err());
    }
}
