use crate::app::App;
use crate::db::models::LostFoundStatus;
use crate::error::{ClientError, ClientResult};
use crate::state::{Modal, Page};

impl App {
    /// Switch the visible page and load its data.
    ///
    /// Re-entering the current page reloads it too. The profile page needs a
    /// session; without one the login prompt opens instead.
    pub async fn navigate(&self, page: Page) -> ClientResult<()> {
        let (filter, year, opportunities) = {
            let mut state = self.state();
            if page == Page::Profile && state.identity.is_none() {
                state.modal = Some(Modal::LoginPrompt);
                return Err(ClientError::AuthRequired);
            }
            state.page = page;
            (
                state.filter,
                state.listings.year,
                state.listings.opportunity_filter.clone(),
            )
        };
        tracing::debug!("Navigated to {}", page.as_str());

        match page {
            Page::Feed => self.load_feed(filter).await,
            Page::Academics => self.load_academics(year).await,
            Page::Opportunities => self.load_opportunities(opportunities).await,
            Page::More => self.load_lost_found(LostFoundStatus::Lost).await,
            Page::Profile => {
                self.state().refresh_identity_views();
                self.load_profile_posts().await
            }
        }
    }

    pub fn current_page(&self) -> Page {
        self.state().page
    }
}
