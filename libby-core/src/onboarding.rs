use crate::config::OnboardingConfig;
use crate::error::{LibbyError, LibbyResult};
use crate::models::InterestSelection;
use crate::session::Session;

/// Interest picker shown to new users: a few pages of genre tags walked
/// in order, with one selection shared by every page.
#[derive(Debug, Clone)]
pub struct OnboardingWizard {
    pages: Vec<Vec<String>>,
    page: usize,
    selection: InterestSelection,
    min_interests: usize,
}

impl OnboardingWizard {
    pub fn new(config: &OnboardingConfig) -> Self {
        let pages = if config.pages.is_empty() {
            OnboardingConfig::default().pages
        } else {
            config.pages.clone()
        };
        Self {
            pages,
            page: 0,
            selection: InterestSelection::new(),
            min_interests: config.min_interests,
        }
    }

    pub fn with_selection(config: &OnboardingConfig, selection: InterestSelection) -> Self {
        let mut wizard = Self::new(config);
        wizard.selection = selection;
        wizard
    }

    /// Zero-based.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_last_page(&self) -> bool {
        self.page + 1 == self.pages.len()
    }

    pub fn tags(&self) -> &[String] {
        self.pages.get(self.page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selection(&self) -> &InterestSelection {
        &self.selection
    }

    pub fn min_interests(&self) -> usize {
        self.min_interests
    }

    pub fn toggle(&mut self, tag: &str) -> bool {
        self.selection.toggle(tag)
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.selection.contains(tag)
    }

    pub fn next(&mut self) -> bool {
        if self.is_last_page() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn back(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn can_finish(&self) -> bool {
        self.is_last_page() && self.selection.len() >= self.min_interests
    }

    /// Saves the selection for the signed-in user. Without a session the
    /// caller gets `SignInRequired` and should show the sign-in prompt.
    pub fn finish(&self, session: &mut Session) -> LibbyResult<InterestSelection> {
        if !self.can_finish() {
            return Err(LibbyError::NotEnoughInterests {
                selected: self.selection.len(),
                required: self.min_interests,
            });
        }
        if !session.is_signed_in() {
            return Err(LibbyError::SignInRequired);
        }
        session.save_interests(self.selection.clone())?;
        Ok(self.selection.clone())
    }

    pub fn redo(&mut self) {
        self.page = 0;
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_stops_at_last_page_and_back_at_first() {
        let mut wizard = OnboardingWizard::new(&OnboardingConfig::default());
        assert!(!wizard.back());
        assert!(wizard.next());
        assert!(wizard.next());
        assert!(wizard.is_last_page());
        assert!(!wizard.next());
        assert_eq!(wizard.page(), 2);
    }

    #[test]
    fn empty_page_config_uses_default_pages() {
        let config = OnboardingConfig {
            min_interests: 1,
            pages: Vec::new(),
        };
        let wizard = OnboardingWizard::new(&config);
        assert_eq!(wizard.page_count(), 3);
        assert!(!wizard.tags().is_empty());
    }

    #[test]
    fn redo_resets_page_and_selection() {
        let mut wizard = OnboardingWizard::new(&OnboardingConfig::default());
        wizard.toggle("fantasy");
        wizard.next();
        wizard.redo();
        assert_eq!(wizard.page(), 0);
        assert!(wizard.selection().is_empty());
    }
}
