// axlscan Engine: Explorer
// Wires configuration, clients, fetchers and reference data together.

use std::sync::Arc;

use log::info;

use axlscan_core::{CliSource, LcdSource, ScanResult, SearchSource};

use super::cli_proxy::CliClient;
use super::config::ExplorerConfig;
use super::context::ReferenceContext;
use super::fetchers::Fetchers;
use super::http::{build_client, JsonEndpoint, RetryPolicy};
use super::lcd::LcdClient;
use super::search::SearchClient;

pub struct Explorer {
    pub config: ExplorerConfig,
    pub lcd: Arc<dyn LcdSource>,
    pub search: Arc<dyn SearchSource>,
    pub cli: Option<Arc<dyn CliSource>>,
    pub fetchers: Fetchers,
    pub reference: ReferenceContext,
}

impl Explorer {
    pub fn from_config(config: ExplorerConfig) -> ScanResult<Self> {
        config.validate()?;
        let client = build_client(config.request_timeout_secs)?;
        let policy = RetryPolicy { max_retries: config.max_retries, ..Default::default() };

        let lcd: Arc<dyn LcdSource> =
            Arc::new(LcdClient::new(JsonEndpoint::new("lcd", &config.lcd_url, client.clone(), policy)));
        let search: Arc<dyn SearchSource> =
            Arc::new(SearchClient::new(JsonEndpoint::new("search", &config.search_url, client.clone(), policy)));
        let cli = config.cli_url.as_deref().map(|url| {
            Arc::new(CliClient::new(JsonEndpoint::new("cli", url, client.clone(), policy))) as Arc<dyn CliSource>
        });

        info!(
            "[explorer] lcd={} search={} cli={}",
            config.lcd_url,
            config.search_url,
            config.cli_url.as_deref().unwrap_or("disabled")
        );
        Ok(Self::with_sources(config, lcd, search, cli))
    }

    /// Assemble from arbitrary sources (in-memory fakes in tests).
    pub fn with_sources(
        config: ExplorerConfig,
        lcd: Arc<dyn LcdSource>,
        search: Arc<dyn SearchSource>,
        cli: Option<Arc<dyn CliSource>>,
    ) -> Self {
        let fetchers = Fetchers::new(lcd.clone(), &config);
        Explorer { config, lcd, search, cli, fetchers, reference: ReferenceContext::default() }
    }

    pub fn cli(&self) -> Option<&dyn CliSource> {
        self.cli.as_deref()
    }
}
