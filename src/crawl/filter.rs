use tracing::debug;

use crate::browser::{wait_until_clickable, BrowserError, BrowserSession, By};
use crate::config::{Selectors, Timeouts};

const ACTIVATE_JS: &str = "function() { this.setAttribute('class', 'active'); }";
const CLICK_JS: &str = "function() { this.click(); }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Selected,
    /// The control opened but no option carried the requested value.
    NoMatch,
    Failed,
}

/// Open the filter control `dimension` and click the option whose value is `value`.
///
/// Best effort: failures are logged and the listing keeps whatever filter
/// state it had.
pub async fn select_filter(
    session: &mut dyn BrowserSession,
    selectors: &Selectors,
    timeouts: &Timeouts,
    dimension: &str,
    value: &str,
) -> FilterOutcome {
    match try_select(session, selectors, timeouts, dimension, value).await {
        Ok(true) => FilterOutcome::Selected,
        Ok(false) => {
            debug!("No option '{}' at filter by class name: {}", value, dimension);
            FilterOutcome::NoMatch
        }
        Err(e) => {
            debug!("Filter {}='{}' not applied: {}", dimension, value, e);
            FilterOutcome::Failed
        }
    }
}

async fn try_select(
    session: &mut dyn BrowserSession,
    selectors: &Selectors,
    timeouts: &Timeouts,
    dimension: &str,
    value: &str,
) -> Result<bool, BrowserError> {
    let control = session.find(None, &By::class(dimension)).await?;
    // Options are only interactable once the control is marked active.
    session.call_on(control, ACTIVATE_JS).await?;
    debug!("Open filter by class name: {}", dimension);

    let options = session
        .find_all(Some(control), &By::class(&selectors.filter_option_class))
        .await?;

    let mut selected = false;
    for option in options {
        let value_box = session
            .find(Some(option), &By::class(&selectors.filter_value_class))
            .await?;
        if session.attribute(value_box, "value").await?.as_deref() != Some(value) {
            continue;
        }
        wait_until_clickable(session, option, timeouts.clickable(), timeouts.poll()).await?;
        session.call_on(option, CLICK_JS).await?;
        debug!("Choice option '{}' at filter by class name: {}", value, dimension);
        selected = true;
    }
    Ok(selected)
}
