use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config::ApiConfig;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide API client, built from the first configuration it sees.
pub fn api_client(api: &ApiConfig) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let timeout = Duration::from_secs(api.timeout_secs);
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(api.user_agent.clone())
            .build()
            .with_context(|| format!("failed to build api client ({}s timeout)", api.timeout_secs))
    })
}
