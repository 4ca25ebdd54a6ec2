use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `(raw date text, absolute article URL)` pair read from one listing tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub date_text: String,
    pub url: String,
}

/// One filter value per configured dimension, in dimension order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCombination(pub Vec<(String, String)>);

impl FilterCombination {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for FilterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(d, v)| format!("{}={}", d, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Normalized insight article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub text: Option<String>,
    pub web_link: String,
    pub local_link: Option<String>,
    pub other_data: BTreeMap<String, serde_json::Value>,
    pub pub_date: Option<DateTime<Utc>>,
    pub load_date: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(
        title: String,
        abstract_text: Option<String>,
        text: Option<String>,
        web_link: String,
        pub_date: DateTime<Utc>,
        load_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title,
            abstract_text,
            text,
            web_link,
            local_link: None,
            other_data: BTreeMap::new(),
            pub_date: Some(pub_date),
            load_date: Some(load_date),
        }
    }

    /// Single-line summary used in the discovery log.
    pub fn log_line(&self) -> String {
        format!(
            "Find document | name: {} | link to web: {} | publication date: {}",
            self.title,
            self.web_link,
            self.pub_date.map(|d| d.to_rfc3339()).unwrap_or_default()
        )
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "  link:      {}", self.web_link)?;
        if let Some(d) = self.pub_date {
            writeln!(f, "  published: {}", d.format("%Y-%m-%d"))?;
        }
        if let Some(a) = &self.abstract_text {
            writeln!(f, "  abstract:  {}", a)?;
        }
        let chars = self.text.as_ref().map(|t| t.chars().count()).unwrap_or(0);
        write!(f, "  body:      {} chars", chars)
    }
}
