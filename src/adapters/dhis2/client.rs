//! DHIS2 Web API client
//!
//! Thin HTTP collaborator for the extraction core: paged metadata
//! downloads and per-unit data value fetches. Transient failures are
//! retried here with bounded exponential backoff; the extraction core
//! never retries on its own.

use super::models::{
    ApiElementGroup, ApiNamed, DataElementsPage, DataValueSetResponse, ElementGroupsPage,
    OptionCombosPage, OrgUnitsPage, Page,
};
use crate::config::Dhis2Config;
use crate::domain::ids::{DatasetId, UnitId};
use crate::domain::period::PeriodWindow;
use crate::domain::record::DataValue;
use crate::domain::{Dhis2Error, HarvestError, OrgUnit, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Source of per-unit measurement records
///
/// The scheduler depends on this trait rather than the concrete client so
/// extraction can be tested against an in-memory source.
#[async_trait]
pub trait DataValueSource: Send + Sync {
    /// Fetches all data values for (dataset, unit, period window)
    ///
    /// Returns an empty list when the unit has no data for the window.
    async fn data_values(
        &self,
        dataset: &DatasetId,
        unit: &UnitId,
        window: &PeriodWindow,
    ) -> Result<Vec<DataValue>>;
}

/// DHIS2 API client
#[derive(Debug)]
pub struct Dhis2Client {
    base_url: String,
    client: Client,
    config: Dhis2Config,
}

impl Dhis2Client {
    /// Creates a new client from configuration
    pub fn new(config: Dhis2Config) -> Result<Self> {
        let parsed = Url::parse(&config.base_url).map_err(|e| {
            HarvestError::Configuration(format!(
                "Invalid DHIS2 base URL '{}': {e}",
                config.base_url
            ))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HarvestError::Configuration(format!(
                "DHIS2 base URL '{}' cannot be used as a base",
                config.base_url
            )));
        }
        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                HarvestError::Dhis2(Dhis2Error::ConnectionFailed(format!(
                    "Failed to build HTTP client: {e}"
                )))
            })?;

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Builds the basic-auth header value, if credentials are configured
    fn auth_header_value(&self) -> Option<String> {
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{username}:{}", password.expose_secret());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        }
    }

    /// Retries a request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e);
                    }

                    let delay_ms = self.config.retry.initial_delay_ms
                        * (self
                            .config
                            .retry
                            .backoff_multiplier
                            .powf((attempt - 1) as f64) as u64);
                    let delay_ms = delay_ms.min(self.config.retry.max_delay_ms);

                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms,
                        error = %e,
                        "Retrying request after error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    /// Performs one authenticated GET against `/api/<path>.json` and
    /// decodes the response body
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/api/{path}.json", self.base_url);

        let mut request = self.client.get(&url).query(query);
        if let Some(auth) = self.auth_header_value() {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HarvestError::Dhis2(Dhis2Error::Timeout(e.to_string()))
            } else {
                HarvestError::Dhis2(Dhis2Error::ConnectionFailed(e.to_string()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Dhis2Error::AuthenticationFailed(format!("{status}: {body}"))
                }
                s if s.is_client_error() => Dhis2Error::ClientError {
                    status: s.as_u16(),
                    message: body,
                },
                s => Dhis2Error::ServerError {
                    status: s.as_u16(),
                    message: body,
                },
            };
            return Err(HarvestError::Dhis2(err));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| HarvestError::Dhis2(Dhis2Error::InvalidResponse(e.to_string())))
    }

    /// Downloads every page of a metadata endpoint
    async fn get_paged<P>(&self, entity: &str, fields: &str) -> Result<Vec<P::Record>>
    where
        P: Page + DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let envelope: P = self
                .retry_request(|| async {
                    self.get_json(
                        entity,
                        &[
                            ("fields", fields.to_string()),
                            ("pageSize", self.config.page_size.to_string()),
                            ("page", page.to_string()),
                        ],
                    )
                    .await
                })
                .await?;

            let page_count = envelope.pager().page_count;
            tracing::info!(entity, page, page_count, "Fetched metadata page");

            records.extend(envelope.into_records());
            if page >= page_count {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// Downloads the complete organisation unit set
    pub async fn fetch_org_units(&self) -> Result<Vec<OrgUnit>> {
        let fields = self.config.org_unit_fields.clone();
        let api_units = self
            .get_paged::<OrgUnitsPage>("organisationUnits", &fields)
            .await?;

        let mut units = Vec::with_capacity(api_units.len());
        for u in api_units {
            let id = UnitId::new(u.id).map_err(HarvestError::Metadata)?;
            let parent = u
                .parent
                .map(|p| UnitId::new(p.id).map_err(HarvestError::Metadata))
                .transpose()?;
            units.push(OrgUnit::new(id, u.name, parent));
        }
        Ok(units)
    }

    /// Downloads all category option combos
    pub async fn fetch_option_combos(&self) -> Result<Vec<ApiNamed>> {
        self.get_paged::<OptionCombosPage>("categoryOptionCombos", "id,displayName")
            .await
    }

    /// Downloads all data elements
    pub async fn fetch_data_elements(&self) -> Result<Vec<ApiNamed>> {
        self.get_paged::<DataElementsPage>("dataElements", "id,displayName")
            .await
    }

    /// Downloads all data element groups with their member element ids
    pub async fn fetch_element_groups(&self) -> Result<Vec<ApiElementGroup>> {
        self.get_paged::<ElementGroupsPage>("dataElementGroups", "id,name,dataElements[id]")
            .await
    }
}

#[async_trait]
impl DataValueSource for Dhis2Client {
    async fn data_values(
        &self,
        dataset: &DatasetId,
        unit: &UnitId,
        window: &PeriodWindow,
    ) -> Result<Vec<DataValue>> {
        let response: DataValueSetResponse = self
            .retry_request(|| async {
                self.get_json(
                    "dataValueSets",
                    &[
                        ("dataSet", dataset.as_str().to_string()),
                        ("orgUnit", unit.as_str().to_string()),
                        ("period", window.as_str().to_string()),
                    ],
                )
                .await
            })
            .await?;

        Ok(response.data_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_config(base_url: String) -> Dhis2Config {
        let toml = format!(
            r#"
base_url = "{base_url}"
username = "admin"
password = "district"
page_size = 2

[retry]
max_retries = 1
initial_delay_ms = 1
"#
        );
        toml::from_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_org_units_paged() {
        let mut server = mockito::Server::new_async().await;

        let page1 = server
            .mock("GET", "/api/organisationUnits.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "2".into()),
            ]))
            .with_body(
                r#"{"pager": {"page": 1, "pageCount": 2},
                    "organisationUnits": [
                        {"id": "root1", "name": "National"},
                        {"id": "dist1", "name": "District A", "parent": {"id": "root1"}}
                    ]}"#,
            )
            .create_async()
            .await;

        let page2 = server
            .mock("GET", "/api/organisationUnits.json")
            .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
                "page".into(),
                "2".into(),
            )]))
            .with_body(
                r#"{"pager": {"page": 2, "pageCount": 2},
                    "organisationUnits": [
                        {"id": "fac1", "name": "Facility 1", "parent": {"id": "dist1"}}
                    ]}"#,
            )
            .create_async()
            .await;

        let client = Dhis2Client::new(test_config(server.url())).unwrap();
        let units = client.fetch_org_units().await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(units.len(), 3);
        assert!(units[0].is_root());
        assert_eq!(units[2].parent.as_ref().unwrap().as_str(), "dist1");
    }

    #[tokio::test]
    async fn test_data_values_empty_body() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/dataValueSets.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("dataSet".into(), "ds1".into()),
                Matcher::UrlEncoded("orgUnit".into(), "u1".into()),
                Matcher::UrlEncoded("period".into(), "2010Q1,2010Q2".into()),
            ]))
            .with_body("{}")
            .create_async()
            .await;

        let client = Dhis2Client::new(test_config(server.url())).unwrap();
        let values = client
            .data_values(
                &DatasetId::new("ds1").unwrap(),
                &UnitId::new("u1").unwrap(),
                &PeriodWindow::new(&["2010Q1".to_string(), "2010Q2".to_string()]),
            )
            .await
            .unwrap();

        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_mapped() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/dataElements.json")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = Dhis2Client::new(test_config(server.url())).unwrap();
        let err = client.fetch_data_elements().await.unwrap_err();

        assert!(matches!(
            err,
            HarvestError::Dhis2(Dhis2Error::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_mapped() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/categoryOptionCombos.json")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .expect(1)
            .create_async()
            .await;

        let client = Dhis2Client::new(test_config(server.url())).unwrap();
        let err = client.fetch_option_combos().await.unwrap_err();

        assert!(matches!(
            err,
            HarvestError::Dhis2(Dhis2Error::ServerError { status: 502, .. })
        ));
    }

    #[test]
    fn test_auth_header_basic() {
        let client = Dhis2Client::new(test_config("https://dhis2.example.org".into())).unwrap();
        let header = client.auth_header_value().unwrap();
        // base64("admin:district")
        assert_eq!(header, "Basic YWRtaW46ZGlzdHJpY3Q=");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = Dhis2Client::new(test_config("https://dhis2.example.org/".into())).unwrap();
        assert_eq!(client.base_url, "https://dhis2.example.org");
    }

    #[test]
    fn test_malformed_base_url_rejected() {
        let err = Dhis2Client::new(test_config("http://".into())).unwrap_err();
        assert!(matches!(err, HarvestError::Configuration(_)));
    }
}
