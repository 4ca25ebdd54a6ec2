use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "https://kpmg.com/xx/en/home/insights.html";
const ENV_PREFIX: &str = "INSIGHTS";

/// Everything the crawler needs, loaded from defaults, an optional TOML
/// file and `INSIGHTS__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub filters: Vec<FilterDimension>,
    /// Cap on extracted articles per filter combination.
    pub max_documents: usize,
    pub scroll_passes: usize,
    pub selectors: Selectors,
    pub delays: Delays,
    pub timeouts: Timeouts,
    pub browser: BrowserSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            filters: vec![
                FilterDimension::new(
                    "kpmg_ind_path",
                    &[
                        "Financial Services",
                        "Infrastructure",
                        "Professional and Business Services",
                        "Regulatory Insight",
                        "Retail",
                        "Technology",
                    ],
                ),
                FilterDimension::new("kpmg_filter_year", &["2024"]),
            ],
            max_documents: 20,
            scroll_passes: 2,
            selectors: Selectors::default(),
            delays: Delays::default(),
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
        }
    }
}

/// One filter control on the listing page and the option values to select in it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterDimension {
    /// Class name of the filter control.
    pub name: String,
    pub values: Vec<String>,
}

impl FilterDimension {
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub consent_button_xpath: String,
    pub filter_option_class: String,
    pub filter_value_class: String,
    pub tile_class: String,
    pub tile_date_class: String,
    pub tile_link_tag: String,
    pub title_class: String,
    pub abstract_class: String,
    pub body_xpath: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            consent_button_xpath: r#"//*[@id="onetrust-accept-btn-handler"]"#.to_string(),
            filter_option_class: "facetsCheckbox".to_string(),
            filter_value_class: "facetBox".to_string(),
            tile_class: "grid-tiles".to_string(),
            tile_date_class: "date-info".to_string(),
            tile_link_tag: "a".to_string(),
            title_class: "banner-title".to_string(),
            abstract_class: "banner-description".to_string(),
            body_xpath: r#"//*[@id="page-content"]/section/div/div/div[4]/div/div[1]/section"#
                .to_string(),
        }
    }
}

/// Settle delays in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Delays {
    pub listing_ms: u64,
    pub article_ms: u64,
    pub filter_settle_ms: u64,
    pub scroll_ms: u64,
    pub between_articles_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            listing_ms: 4000,
            article_ms: 2000,
            filter_settle_ms: 2000,
            scroll_ms: 2000,
            between_articles_ms: 2000,
        }
    }
}

impl Delays {
    pub fn none() -> Self {
        Self {
            listing_ms: 0,
            article_ms: 0,
            filter_settle_ms: 0,
            scroll_ms: 0,
            between_articles_ms: 0,
        }
    }

    pub fn listing(&self) -> Duration {
        Duration::from_millis(self.listing_ms)
    }

    pub fn article(&self) -> Duration {
        Duration::from_millis(self.article_ms)
    }

    pub fn filter_settle(&self) -> Duration {
        Duration::from_millis(self.filter_settle_ms)
    }

    pub fn scroll(&self) -> Duration {
        Duration::from_millis(self.scroll_ms)
    }

    pub fn between_articles(&self) -> Duration {
        Duration::from_millis(self.between_articles_ms)
    }
}

/// Upper bounds for condition waits, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub clickable_ms: u64,
    pub page_load_ms: u64,
    pub ready_ms: u64,
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clickable_ms: 5000,
            page_load_ms: 50_000,
            ready_ms: 10_000,
            poll_ms: 250,
        }
    }
}

impl Timeouts {
    pub fn clickable(&self) -> Duration {
        Duration::from_millis(self.clickable_ms)
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    pub fn ready(&self) -> Duration {
        Duration::from_millis(self.ready_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
        }
    }
}

impl Settings {
    /// Layer the optional TOML file and environment over the defaults.
    ///
    /// Not validated here: callers apply their overrides first, then call
    /// [`Settings::validate`].
    pub fn load(file: &Path) -> Result<Self> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", file.display()))?
            .try_deserialize()
            .context("Invalid settings")?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.host).with_context(|| format!("Invalid host URL: {}", self.host))?;
        if self.filters.is_empty() {
            bail!("At least one filter dimension must be configured");
        }
        if let Some(dim) = self.filters.iter().find(|d| d.name.trim().is_empty()) {
            bail!("Filter dimension with values {:?} has no name", dim.values);
        }
        Ok(())
    }
}
