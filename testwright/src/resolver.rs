use tracing::debug;

use crate::engine::{ElementRef, Page};
use crate::errors::AutomationError;
use crate::selector::Selector;

/// Tries an ordered list of candidate selectors against a live page and acts
/// on the first candidate with at least one currently-interactable match.
///
/// First-match wins; callers order candidates most-specific-first. The
/// resolver is read-only unless explicitly asked to fill or click, in which
/// case it mutates exactly the one matched element.
pub struct SelectorResolver<'a> {
    page: &'a Page,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }

    /// First interactable match across the candidate list, in order.
    pub async fn resolve(&self, candidates: &[Selector]) -> Result<ElementRef, AutomationError> {
        for candidate in candidates {
            if matches!(candidate, Selector::Invalid(_)) {
                debug!(%candidate, "skipping invalid candidate");
                continue;
            }
            let matches = self.page.get_elements(candidate).await?;
            if let Some(element) = matches.into_iter().find(|e| e.interactable) {
                debug!(%candidate, element = %element.id, "candidate resolved");
                return Ok(element);
            }
        }
        Err(AutomationError::ElementNotFound(format!(
            "no interactable match among {} candidate(s)",
            candidates.len()
        )))
    }

    /// Whether any candidate currently has a match, interactable or not.
    ///
    /// Used for presence probes (e.g. "is a login form on this page?") where
    /// a hidden match still counts.
    pub async fn any_match(&self, candidates: &[Selector]) -> Result<bool, AutomationError> {
        for candidate in candidates {
            if matches!(candidate, Selector::Invalid(_)) {
                continue;
            }
            if !self.page.get_elements(candidate).await?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolve, then fill the single matched element.
    pub async fn fill_first(
        &self,
        candidates: &[Selector],
        value: &str,
    ) -> Result<(), AutomationError> {
        let element = self.resolve(candidates).await?;
        self.page.fill(&element, value).await
    }

    /// Resolve, then click the single matched element.
    pub async fn click_first(&self, candidates: &[Selector]) -> Result<(), AutomationError> {
        let element = self.resolve(candidates).await?;
        self.page.click(&element).await
    }
}
