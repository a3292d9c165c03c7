//! Google Trends client for interest over time.
//!
//! Follows the service's three-step browser flow: open a session to receive the
//! cookie, request the explore widgets, then read the `TIMESERIES` widget data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::wire::{
    self, ComparisonItem, ExplorePayload, ExploreResponse, ExploreWidget, MultilineResponse,
};
use super::{FetchError, FetchOutcome, TrendsRequest, TrendsSource};

const EXPLORE_PATH: &str = "trends/api/explore";
const MULTILINE_PATH: &str = "trends/api/widgetdata/multiline";
const DEFAULT_SESSION_GEO: &str = "US";

#[derive(Debug, Clone)]
pub struct GoogleTrendsConfig {
    pub base_url: String,
    /// Host language, e.g. `en-US`.
    pub hl: String,
    /// Timezone offset in minutes, as the service expects it.
    pub tz: i32,
    /// Courtesy pause between the explore call and the data call.
    pub request_delay: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GoogleTrendsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trends.google.com".to_string(),
            hl: "en-US".to_string(),
            tz: 360,
            request_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            user_agent: format!("trendpull/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleTrendsClient {
    client: Client,
    base_url: Url,
    hl: String,
    tz: String,
    request_delay: Duration,
}

impl GoogleTrendsClient {
    pub fn new(config: GoogleTrendsConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|source| FetchError::Transport {
                stage: "client setup",
                source,
            })?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            hl: config.hl,
            tz: config.tz.to_string(),
            request_delay: config.request_delay,
        })
    }

    /// Visits the landing page so the cookie store picks up the session cookie.
    async fn open_session(&self, geo: &str) -> Result<(), FetchError> {
        let mut url = self.base_url.clone();
        let geo = if geo.is_empty() { DEFAULT_SESSION_GEO } else { geo };
        url.query_pairs_mut().append_pair("geo", geo);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                stage: "session",
                source,
            })?;
        debug!(status = %response.status(), "opened trends session");
        Ok(())
    }

    async fn explore(&self, request: &TrendsRequest) -> Result<ExploreWidget, FetchError> {
        let payload = ExplorePayload {
            comparison_item: request
                .terms
                .iter()
                .map(|keyword| ComparisonItem {
                    keyword,
                    time: request.window.as_param(),
                    geo: &request.geo,
                })
                .collect(),
            category: request.category,
            property: &request.property,
        };
        let req = serde_json::to_string(&payload).map_err(|source| FetchError::Decode {
            stage: "explore",
            source,
        })?;

        let mut url = self.base_url.join(EXPLORE_PATH)?;
        url.query_pairs_mut()
            .append_pair("hl", &self.hl)
            .append_pair("tz", &self.tz)
            .append_pair("req", &req);

        let response: ExploreResponse = self.send("explore", self.client.post(url)).await?;
        wire::timeseries_widget(response).ok_or(FetchError::MissingWidget)
    }

    async fn multiline(&self, widget: &ExploreWidget) -> Result<MultilineResponse, FetchError> {
        let req = serde_json::to_string(&widget.request).map_err(|source| FetchError::Decode {
            stage: "interest over time",
            source,
        })?;
        let token = widget.token.as_deref().ok_or(FetchError::MissingWidget)?;

        let mut url = self.base_url.join(MULTILINE_PATH)?;
        url.query_pairs_mut()
            .append_pair("req", &req)
            .append_pair("token", token)
            .append_pair("tz", &self.tz);

        self.send("interest over time", self.client.get(url)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Transport { stage, source })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited { stage });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                stage,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { stage, source })?;
        wire::decode_guarded(stage, &body)
    }
}

#[async_trait]
impl TrendsSource for GoogleTrendsClient {
    async fn fetch(&self, request: &TrendsRequest) -> Result<FetchOutcome, FetchError> {
        self.open_session(&request.geo).await?;

        info!(
            timeframe = request.window.as_param(),
            geo = %request.geo,
            category = request.category,
            "requesting explore widgets"
        );
        let widget = self.explore(request).await?;

        if !self.request_delay.is_zero() {
            debug!(delay_ms = self.request_delay.as_millis(), "pausing before data request");
            tokio::time::sleep(self.request_delay).await;
        }

        info!("fetching interest over time data");
        let response = self.multiline(&widget).await?;
        let points = response.default.timeline_data;
        if points.is_empty() {
            return Ok(FetchOutcome::Empty);
        }

        wire::into_table(&request.terms, points).map(FetchOutcome::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::TimeWindow;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> GoogleTrendsConfig {
        GoogleTrendsConfig {
            base_url,
            request_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn request(terms: &[&str]) -> TrendsRequest {
        TrendsRequest {
            terms: terms.iter().map(ToString::to_string).collect(),
            category: 0,
            window: TimeWindow::All,
            geo: "US".into(),
            property: String::new(),
        }
    }

    async fn mount_session(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "NID=abc; Path=/"))
            .mount(server)
            .await;
    }

    async fn mount_explore(server: &MockServer) {
        let body = ")]}'\n{\"widgets\":[{\"id\":\"TIMESERIES\",\"token\":\"tok-1\",\"request\":{\"time\":\"all\"}}]}";
        Mock::given(method("POST"))
            .and(path("/trends/api/explore"))
            .and(query_param("hl", "en-US"))
            .and(query_param("tz", "360"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetch_returns_timeline_rows() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        mount_explore(&server).await;

        let data = ")]}',\n{\"default\":{\"timelineData\":[\
            {\"time\":\"1704067200\",\"value\":[50,12]},\
            {\"time\":\"1706745600\",\"value\":[65,14],\"isPartial\":true}]}}";
        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .and(query_param("token", "tok-1"))
            .and(query_param("req", "{\"time\":\"all\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_string(data))
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let outcome = client
            .fetch(&request(&["marble", "remodel"]))
            .await
            .expect("fetch should succeed");

        let FetchOutcome::Table(table) = outcome else {
            panic!("expected a table");
        };
        assert_eq!(table.terms, vec!["marble", "remodel"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].period.to_string(), "2024-01-01");
        assert_eq!(table.rows[1].values, vec![65.0, 14.0]);
        assert_eq!(table.partial_rows(), 1);
    }

    #[tokio::test]
    async fn fetch_rejects_weekly_timeline() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        mount_explore(&server).await;

        // Four weeks of January 2024
        let data = ")]}',\n{\"default\":{\"timelineData\":[\
            {\"time\":\"1704585600\",\"value\":[10]},\
            {\"time\":\"1705190400\",\"value\":[20]},\
            {\"time\":\"1705795200\",\"value\":[30]},\
            {\"time\":\"1706400000\",\"value\":[40]}]}}";
        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .respond_with(ResponseTemplate::new(200).set_body_string(data))
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let err = client.fetch(&request(&["marble"])).await.unwrap_err();

        assert!(matches!(err, FetchError::MalformedPayload(_)));
        assert_eq!(err.kind(), "MalformedPayload");
    }

    #[tokio::test]
    async fn fetch_signals_empty_timeline() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        mount_explore(&server).await;

        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(")]}',\n{\"default\":{\"timelineData\":[],\"averages\":[]}}"),
            )
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let outcome = client.fetch(&request(&["marble"])).await.expect("fetch should succeed");

        assert_eq!(outcome, FetchOutcome::Empty);
    }

    #[tokio::test]
    async fn fetch_maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        mount_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/trends/api/explore"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let err = client.fetch(&request(&["marble"])).await.unwrap_err();

        assert!(matches!(err, FetchError::RateLimited { stage: "explore" }));
    }

    #[tokio::test]
    async fn fetch_reports_server_errors_with_body() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        mount_explore(&server).await;

        Mock::given(method("GET"))
            .and(path("/trends/api/widgetdata/multiline"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let err = client.fetch(&request(&["marble"])).await.unwrap_err();

        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "backend down");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_fails_without_timeseries_widget() {
        let server = MockServer::start().await;
        mount_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/trends/api/explore"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(")]}'\n{\"widgets\":[{\"id\":\"GEO_MAP\",\"token\":\"g\",\"request\":{}}]}"),
            )
            .mount(&server)
            .await;

        let client = GoogleTrendsClient::new(test_config(server.uri())).expect("client should build");
        let err = client.fetch(&request(&["marble"])).await.unwrap_err();

        assert!(matches!(err, FetchError::MissingWidget));
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        let err = GoogleTrendsClient::new(test_config("not a url".into())).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
