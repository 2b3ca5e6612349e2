use reqwest::Url;
use serde::Deserialize;

use super::{Encyclopedia, LookupError, LookupResult, Summary};
use crate::http::client::HttpClient;

#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: HttpClient,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<base>/api/rest_v1/page/summary/<topic>` with the topic as a single
    /// percent-encoded path segment.
    fn endpoint(&self, topic: &str) -> LookupResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| LookupError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| LookupError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "rest_v1", "page", "summary", topic]);
        Ok(url)
    }
}

impl Encyclopedia for WikipediaClient {
    async fn summary(&self, topic: &str) -> LookupResult<Option<Summary>> {
        let url = self.endpoint(topic.trim())?;
        let response = self
            .http
            .get(url.as_str(), &[])
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        if !response.is_ok() {
            return Ok(None);
        }

        let page = serde_json::from_str::<PageSummary>(&response.body)
            .map_err(|err| LookupError::Parse(err.to_string()))?;
        let Some(extract) = page.extract else {
            return Ok(None);
        };
        Ok(Some(Summary {
            title: page.title,
            extract,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}
