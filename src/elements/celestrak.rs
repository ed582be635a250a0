use chrono::Utc;

use super::error::ElementError;
use super::provider::ElementProvider;
use super::types::RawElements;

pub const DEFAULT_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?CATNR={norad}&FORMAT=tle";

const USER_AGENT: &str = concat!("overhead/", env!("CARGO_PKG_VERSION"));

/// Fetches element sets over HTTP. The URL template carries a `{norad}`
/// placeholder for the catalog number.
#[derive(Clone)]
pub struct CelestrakProvider {
    client: reqwest::Client,
    url_template: String,
}

impl CelestrakProvider {
    pub fn new(url_template: impl Into<String>) -> Result<Self, ElementError> {
        // The cache enforces its own deadline; this only stops sockets lingering.
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ElementError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn url_for(&self, catalog_id: u32) -> String {
        self.url_template
            .replace("{norad}", &catalog_id.to_string())
    }
}

impl ElementProvider for CelestrakProvider {
    async fn fetch(&self, catalog_id: u32) -> Result<RawElements, ElementError> {
        let url = self.url_for(catalog_id);
        log::debug!("Fetching elements for {} from {}", catalog_id, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ElementError::Http(format!("request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ElementError::NotFound(catalog_id));
        }
        if !response.status().is_success() {
            return Err(ElementError::Http(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ElementError::Http(format!("failed to read response: {}", e)))?;

        classify_body(catalog_id, text)
    }
}

fn classify_body(catalog_id: u32, text: String) -> Result<RawElements, ElementError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("No GP data found") {
        return Err(ElementError::NotFound(catalog_id));
    }
    Ok(RawElements {
        text,
        retrieved_at: Utc::now(),
    })
}
