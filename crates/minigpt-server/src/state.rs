use std::time::Duration;

use minigpt_config::UpstreamConfig;

/// Shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub upstream: UpstreamConfig,
}

impl AppState {
    pub fn new(upstream: UpstreamConfig) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = upstream.connect_timeout_seconds {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            upstream,
        })
    }
}
