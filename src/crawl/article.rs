use chrono::Utc;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info};

use super::consent::dismiss_consent;
use super::date::{parse_publication_date, DateParseError};
use crate::browser::{BrowserError, BrowserSession, By};
use crate::config::Settings;
use crate::document::Document;

/// Why an article produced no document.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("could not load {url}: {source}")]
    Load {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("publication date missing: {0}")]
    Date(#[from] DateParseError),

    #[error("title missing on {url}: {source}")]
    Title {
        url: String,
        #[source]
        source: BrowserError,
    },
}

/// Load one article page and build its `Document`.
///
/// Date and title are mandatory; abstract and body text are recorded as
/// absent when they can't be read.
pub async fn extract_article(
    session: &mut dyn BrowserSession,
    settings: &Settings,
    date_text: &str,
    url: &str,
) -> Result<Document, ArticleError> {
    let selectors = &settings.selectors;

    session.navigate(url).await.map_err(|source| ArticleError::Load {
        url: url.to_string(),
        source,
    })?;
    sleep(settings.delays.article()).await;
    dismiss_consent(session, selectors, &settings.timeouts).await;

    let pub_date = parse_publication_date(date_text)?;

    let title = read_text(session, &By::class(&selectors.title_class))
        .await
        .map_err(|source| ArticleError::Title {
            url: url.to_string(),
            source,
        })?;

    let abstract_text = read_text(session, &By::class(&selectors.abstract_class))
        .await
        .map_err(|e| error!("Abstract not found on {}: {}", url, e))
        .ok();

    let text = read_text(session, &By::xpath(&selectors.body_xpath))
        .await
        .map_err(|e| error!("Body text not found on {}: {}", url, e))
        .ok();

    let document = Document::new(title, abstract_text, text, url.to_string(), pub_date, Utc::now());
    info!("{}", document.log_line());
    Ok(document)
}

async fn read_text(session: &mut dyn BrowserSession, by: &By) -> Result<String, BrowserError> {
    let el = session.find(None, by).await?;
    session.text(el).await
}
