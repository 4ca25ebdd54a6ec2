use tracing::{debug, error};

use crate::browser::{wait_until_clickable, BrowserError, BrowserSession, By};
use crate::config::{Selectors, Timeouts};

/// What happened to the cookie banner on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed,
    Absent,
    Failed,
}

/// Click the cookie-consent accept button if the current page shows one.
///
/// Never fails: a missing banner is normal and any other problem is logged.
pub async fn dismiss_consent(
    session: &mut dyn BrowserSession,
    selectors: &Selectors,
    timeouts: &Timeouts,
) -> ConsentOutcome {
    match try_dismiss(session, selectors, timeouts).await {
        Ok(()) => {
            let url = session.current_url().await.unwrap_or_default();
            debug!("Passed cookie modal on page: {}", url);
            ConsentOutcome::Dismissed
        }
        Err(e) if e.is_not_found() => {
            let url = session.current_url().await.unwrap_or_default();
            debug!("Consent modal not found on page: {}", url);
            ConsentOutcome::Absent
        }
        Err(e) => {
            error!("Consent modal could not be dismissed: {}", e);
            ConsentOutcome::Failed
        }
    }
}

async fn try_dismiss(
    session: &mut dyn BrowserSession,
    selectors: &Selectors,
    timeouts: &Timeouts,
) -> Result<(), BrowserError> {
    let button = session
        .find(None, &By::xpath(&selectors.consent_button_xpath))
        .await?;
    wait_until_clickable(session, button, timeouts.clickable(), timeouts.poll()).await?;
    session.click(button).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{MockNode, MockPage, MockSession};

    const URL: &str = "https://kpmg.com/xx/en/home/insights.html";

    fn fast() -> Timeouts {
        Timeouts {
            clickable_ms: 0,
            poll_ms: 0,
            ..Timeouts::default()
        }
    }

    fn with_banner(button: MockNode) -> MockSession {
        let selectors = Selectors::default();
        let page = MockPage::new(URL)
            .child(MockNode::new("div").child(button))
            .xpath(&selectors.consent_button_xpath, &[0, 0]);
        MockSession::new().page(page)
    }

    #[tokio::test]
    async fn clicks_visible_banner() {
        let mut session =
            with_banner(MockNode::new("button").id("onetrust-accept-btn-handler").named("accept"));
        session.navigate(URL).await.unwrap();

        let outcome = dismiss_consent(&mut session, &Selectors::default(), &fast()).await;
        assert_eq!(outcome, ConsentOutcome::Dismissed);
        assert_eq!(session.clicks, vec!["accept"]);
    }

    #[tokio::test]
    async fn absent_banner_is_not_an_error() {
        let mut session = MockSession::new().page(MockPage::new(URL));
        session.navigate(URL).await.unwrap();

        let outcome = dismiss_consent(&mut session, &Selectors::default(), &fast()).await;
        assert_eq!(outcome, ConsentOutcome::Absent);
        assert!(session.clicks.is_empty());
    }

    #[tokio::test]
    async fn unclickable_banner_is_swallowed() {
        let mut session = with_banner(MockNode::new("button").named("accept").hidden());
        session.navigate(URL).await.unwrap();

        let outcome = dismiss_consent(&mut session, &Selectors::default(), &fast()).await;
        assert_eq!(outcome, ConsentOutcome::Failed);
        assert!(session.clicks.is_empty());
    }
}
