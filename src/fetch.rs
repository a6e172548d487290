use crate::query::OverpassQuery;
use crate::types::{PointCollection, PointRecord};
use reqwest::StatusCode;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to Overpass failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Overpass answered with HTTP {0}")]
    Status(StatusCode),
    #[error("malformed Overpass response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can answer a built query with points.
pub trait PointSource {
    fn fetch(
        &self,
        query: &OverpassQuery,
    ) -> impl Future<Output = Result<PointCollection, FetchError>> + Send;
}

/// Issues exactly one POST per call. No retry, timeout or caching.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PointSource for OverpassClient {
    async fn fetch(&self, query: &OverpassQuery) -> Result<PointCollection, FetchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .form(&[("data", query.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let points = parse_elements(&body)?;
        info!(clauses = query.clauses().len(), points = points.len(), "fetched Overpass data");
        Ok(points)
    }
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Decodes an `[out:json]` body into points, dropping elements without a
/// usable position.
pub fn parse_elements(body: &str) -> Result<PointCollection, FetchError> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    let points = response
        .elements
        .into_iter()
        .filter_map(|el| {
            let (lat, lon) = (el.lat?, el.lon?);
            let point = PointRecord::new(lon, lat);
            if point.is_none() {
                debug!(lat, lon, "skipping element with out-of-range position");
            }
            point
        })
        .collect();
    Ok(points)
}

/// Soft-fail fetch: failures are logged and read as zero results.
pub async fn fetch_points<S: PointSource>(source: &S, query: &OverpassQuery) -> PointCollection {
    match source.fetch(query).await {
        Ok(points) => points,
        Err(e) => {
            warn!(error = %e, "error fetching Overpass data");
            PointCollection::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cities;
    use crate::query::build_query;
    use crate::types::FilterSet;

    struct Failing;

    impl PointSource for Failing {
        async fn fetch(&self, _query: &OverpassQuery) -> Result<PointCollection, FetchError> {
            Err(FetchError::Status(StatusCode::TOO_MANY_REQUESTS))
        }
    }

    #[test]
    fn parses_nodes_and_skips_unpositioned_elements() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": -34.60, "lon": -58.38, "tags": {"highway": "traffic_signals"}},
                {"type": "way", "id": 2, "nodes": [1, 3]},
                {"type": "node", "id": 3, "lat": -34.61, "lon": -58.39},
                {"type": "node", "id": 4, "lat": 123.0, "lon": 10.0}
            ]
        }"#;
        let points = parse_elements(body).unwrap();
        assert_eq!(points.len(), 2);
        let first = points.iter().next().unwrap();
        assert_eq!((first.lon(), first.lat()), (-58.38, -34.60));
    }

    #[test]
    fn empty_element_list_is_not_an_error() {
        let points = parse_elements(r#"{"elements": []}"#).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn body_without_elements_is_a_decode_error() {
        let err = parse_elements(r#"{"remark": "runtime error"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(matches!(parse_elements("<html>"), Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn failures_read_as_zero_results() {
        let query = build_query(&FilterSet::default(), cities::find("lima").unwrap());
        let points = fetch_points(&Failing, &query).await;
        assert!(points.is_empty());
    }

    #[test]
    fn client_keeps_configured_endpoint() {
        let client = OverpassClient::new(DEFAULT_ENDPOINT);
        assert_eq!(client.endpoint(), "https://overpass-api.de/api/interpreter");
    }
}
