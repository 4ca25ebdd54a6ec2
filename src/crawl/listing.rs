use anyhow::anyhow;
use tokio::time::sleep;
use tracing::{debug, error};
use url::Url;

use super::filter::select_filter;
use crate::browser::{BrowserError, BrowserSession, By, ElementRef};
use crate::config::Settings;
use crate::document::{FilterCombination, ListingEntry};

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Apply `combination` on the loaded listing page and collect its tiles.
///
/// Entries come back in DOM order. Tiles whose date or link can't be read
/// are skipped.
pub async fn harvest(
    session: &mut dyn BrowserSession,
    settings: &Settings,
    combination: &FilterCombination,
) -> Vec<ListingEntry> {
    for (dimension, value) in &combination.0 {
        select_filter(session, &settings.selectors, &settings.timeouts, dimension, value).await;
    }
    sleep(settings.delays.filter_settle()).await;

    load_lazy_tiles(session, settings).await;

    let selectors = &settings.selectors;
    let tiles = match session.find_all(None, &By::class(&selectors.tile_class)).await {
        Ok(tiles) => tiles,
        Err(e) => {
            error!("Listing tiles not readable for {}: {}", combination, e);
            return Vec::new();
        }
    };
    debug!("Found {} tiles for {}", tiles.len(), combination);

    let base = match session.current_url().await {
        Ok(u) => u,
        Err(_) => settings.host.clone(),
    };

    let mut entries = Vec::with_capacity(tiles.len());
    for tile in tiles {
        match read_tile(session, settings, tile, &base).await {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                error!("Skipping tile: {}", e);
                continue;
            }
        }
    }
    entries
}

async fn load_lazy_tiles(session: &mut dyn BrowserSession, settings: &Settings) {
    for _ in 0..settings.scroll_passes {
        if let Err(e) = session.execute_script(SCROLL_TO_BOTTOM_JS).await {
            error!("Scroll failed, using tiles loaded so far: {}", e);
            return;
        }
        sleep(settings.delays.scroll()).await;
    }
}

async fn read_tile(
    session: &mut dyn BrowserSession,
    settings: &Settings,
    tile: ElementRef,
    base: &str,
) -> anyhow::Result<ListingEntry> {
    let selectors = &settings.selectors;
    let date_el = session
        .find(Some(tile), &By::class(&selectors.tile_date_class))
        .await?;
    let date_text = session.text(date_el).await?;

    let link_el = session
        .find(Some(tile), &By::tag(&selectors.tile_link_tag))
        .await?;
    let href = session
        .attribute(link_el, "href")
        .await?
        .ok_or_else(|| anyhow!("tile link has no href"))?;

    Ok(ListingEntry {
        date_text,
        url: absolute_url(base, &href)?,
    })
}

fn absolute_url(base: &str, href: &str) -> Result<String, BrowserError> {
    let joined = Url::parse(base)
        .and_then(|b| b.join(href.trim()))
        .or_else(|_| Url::parse(href.trim()))
        .map_err(|e| BrowserError::Protocol(format!("bad href {:?}: {}", href, e)))?;
    Ok(joined.to_string())
}
