//! Plan submission to explain.dalibo.com.
//!
//! The service accepts a form POST on `/new` and answers with a redirect to
//! the page of the stored plan. Redirects are not followed: the `Location`
//! header is the link.

use super::PlanSubmitter;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

pub const DEFAULT_ENDPOINT: &str = "https://explain.dalibo.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the plan visualization service.
pub struct DaliboClient {
    endpoint: String,
    agent: Agent,
}

impl DaliboClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .max_redirects(0)
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn submit_url(&self) -> String {
        format!("{}/new", self.endpoint)
    }
}

impl Default for DaliboClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl PlanSubmitter for DaliboClient {
    fn submit(&self, plan_json: &str) -> Option<String> {
        let url = self.submit_url();
        let title = format!("Query Plan {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        debug!(%url, "submitting query plan");

        let response = match self
            .agent
            .post(&url)
            .send_form([("plan", plan_json), ("title", title.as_str())])
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "plan submission failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_redirection() {
            warn!(%url, status = status.as_u16(), "plan submission was not redirected");
            return None;
        }

        let location = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok());
        match location {
            Some(location) => {
                let link = resolve_location(&self.endpoint, location);
                info!(%link, "query plan submitted");
                Some(link)
            }
            None => {
                warn!(%url, "plan submission redirect has no Location header");
                None
            }
        }
    }
}

/// Resolve a `Location` header value against the service endpoint.
pub fn resolve_location(endpoint: &str, location: &str) -> String {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else if let Some(path) = location.strip_prefix('/') {
        format!("{}/{}", endpoint.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", endpoint.trim_end_matches('/'), location)
    }
}
