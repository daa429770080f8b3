use crate::app::App;
use crate::db::models::{LostFoundStatus, ReportCategory};
use crate::error::{ClientError, ClientResult};
use crate::feed::view::ProfileGridView;
use crate::media::ImageFile;
use crate::remote::OpportunityQuery;
use crate::state::{FeedFilter, Modal, Page};

/// Everything a user can do, keyed by action type and record id.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(Page),
    SetFilter(FeedFilter),
    ToggleLike { post_id: String },
    OpenComments { post_id: String },
    SubmitComment { content: String },
    EditCaption { post_id: String },
    SaveCaption { caption: String },
    DeletePost { post_id: String },
    ConfirmDelete { accepted: bool },
    ReportPost { post_id: String },
    SubmitReport { category: Option<ReportCategory>, other: String },
    HidePost { post_id: String },
    OpenPost { post_id: String },
    OpenComposer,
    OpenConfession,
    AddImages(Vec<ImageFile>),
    RemoveImage(usize),
    SubmitPost { caption: String },
    SubmitConfession { text: String, category: String },
    ToggleSearch,
    SearchInput(String),
    SearchSubmit,
    CloseSearch,
    SaveName(String),
    UploadAvatar(ImageFile),
    SignIn,
    SignOut,
    FilterOpportunities(OpportunityQuery),
    SelectYear(u8),
    LostFoundTab(LostFoundStatus),
    OpenLostItem,
    SubmitLostItem {
        status: LostFoundStatus,
        name: String,
        location: String,
        contact: String,
    },
    OpenBugReport,
    SubmitBugReport { description: String },
    SetDarkMode(bool),
    SetReduceMotion(bool),
    FinishOnboarding,
    CloseModal,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Navigate(_) => "navigate",
            Action::SetFilter(_) => "set-filter",
            Action::ToggleLike { .. } => "toggle-like",
            Action::OpenComments { .. } => "open-comments",
            Action::SubmitComment { .. } => "submit-comment",
            Action::EditCaption { .. } => "edit-caption",
            Action::SaveCaption { .. } => "save-caption",
            Action::DeletePost { .. } => "delete-post",
            Action::ConfirmDelete { .. } => "confirm-delete",
            Action::ReportPost { .. } => "report-post",
            Action::SubmitReport { .. } => "submit-report",
            Action::HidePost { .. } => "hide-post",
            Action::OpenPost { .. } => "open-post",
            Action::OpenComposer => "open-composer",
            Action::OpenConfession => "open-confession",
            Action::AddImages(_) => "add-images",
            Action::RemoveImage(_) => "remove-image",
            Action::SubmitPost { .. } => "submit-post",
            Action::SubmitConfession { .. } => "submit-confession",
            Action::ToggleSearch => "toggle-search",
            Action::SearchInput(_) => "search-input",
            Action::SearchSubmit => "search-submit",
            Action::CloseSearch => "close-search",
            Action::SaveName(_) => "save-name",
            Action::UploadAvatar(_) => "upload-avatar",
            Action::SignIn => "sign-in",
            Action::SignOut => "sign-out",
            Action::FilterOpportunities(_) => "filter-opportunities",
            Action::SelectYear(_) => "select-year",
            Action::LostFoundTab(_) => "lost-found-tab",
            Action::OpenLostItem => "open-lost-item",
            Action::SubmitLostItem { .. } => "submit-lost-item",
            Action::OpenBugReport => "open-bug-report",
            Action::SubmitBugReport { .. } => "submit-bug-report",
            Action::SetDarkMode(_) => "set-dark-mode",
            Action::SetReduceMotion(_) => "set-reduce-motion",
            Action::FinishOnboarding => "finish-onboarding",
            Action::CloseModal => "close-modal",
        }
    }
}

impl App {
    /// Run one user action. Errors stop here and become notices.
    pub async fn dispatch(&self, action: Action) {
        let name = action.name();
        tracing::debug!("Dispatching {}", name);
        if let Err(e) = self.run(action).await {
            tracing::debug!("{} failed: {}", name, e);
            self.surface_error(e);
        }
    }

    fn surface_error(&self, err: ClientError) {
        match err {
            ClientError::AuthRequired => self.state().modal = Some(Modal::LoginPrompt),
            other => {
                let notice = other.notice();
                self.notify(notice);
            }
        }
    }

    async fn run(&self, action: Action) -> ClientResult<()> {
        match action {
            Action::Navigate(page) => self.navigate(page).await,
            Action::SetFilter(filter) => self.load_feed(filter).await,
            Action::ToggleLike { post_id } => self.toggle_like(&post_id).await.map(|_| ()),
            Action::OpenComments { post_id } => self.open_comments(&post_id).await,
            Action::SubmitComment { content } => self.submit_comment(&content).await,
            Action::EditCaption { post_id } => self.open_edit_caption(&post_id),
            Action::SaveCaption { caption } => {
                let modal = self.state().modal.clone();
                match modal {
                    Some(Modal::EditCaption { post_id, .. }) => {
                        self.edit_caption(&post_id, &caption).await
                    }
                    _ => Err(ClientError::NotFound),
                }
            }
            Action::DeletePost { post_id } => {
                let images = self.post_images(&post_id);
                self.delete_post(&post_id, images)
            }
            Action::ConfirmDelete { accepted } => self.confirm_delete(accepted).await.map(|_| ()),
            Action::ReportPost { post_id } => self.open_report(&post_id),
            Action::SubmitReport { category, other } => {
                let modal = self.state().modal.clone();
                match modal {
                    Some(Modal::Report { post_id }) => self.report(&post_id, category, &other).await,
                    _ => Err(ClientError::NotFound),
                }
            }
            Action::HidePost { post_id } => {
                self.hide_post(&post_id);
                Ok(())
            }
            Action::OpenPost { post_id } => self.open_post_overlay(&post_id),
            Action::OpenComposer => self.open_image_composer(),
            Action::OpenConfession => self.open_confession_composer(),
            Action::AddImages(files) => self.add_images(files).map(|_| ()),
            Action::RemoveImage(index) => {
                self.remove_image(index);
                Ok(())
            }
            Action::SubmitPost { caption } => self.submit_image_post(&caption).await.map(|_| ()),
            Action::SubmitConfession { text, category } => {
                self.submit_confession(&text, &category).await.map(|_| ())
            }
            Action::ToggleSearch => self.toggle_search().await,
            Action::SearchInput(text) => {
                self.search_input(&text);
                Ok(())
            }
            Action::SearchSubmit => self.search_submit().await,
            Action::CloseSearch => self.close_search().await,
            Action::SaveName(name) => self.update_name(&name).await,
            Action::UploadAvatar(file) => self.upload_avatar(file).await.map(|_| ()),
            Action::SignIn => {
                let url = self.sign_in().await?;
                self.state().sign_in_url = Some(url);
                Ok(())
            }
            Action::SignOut => self.sign_out().await,
            Action::FilterOpportunities(query) => self.load_opportunities(query).await,
            Action::SelectYear(year) => self.load_academics(year).await,
            Action::LostFoundTab(tab) => self.load_lost_found(tab).await,
            Action::OpenLostItem => self.open_lost_item_form(),
            Action::SubmitLostItem {
                status,
                name,
                location,
                contact,
            } => {
                self.submit_lost_item(status, &name, &location, &contact)
                    .await
            }
            Action::OpenBugReport => {
                self.open_bug_report();
                Ok(())
            }
            Action::SubmitBugReport { description } => self.submit_bug_report(&description).await,
            Action::SetDarkMode(on) => {
                self.set_dark_mode(on);
                Ok(())
            }
            Action::SetReduceMotion(on) => {
                self.set_reduce_motion(on);
                Ok(())
            }
            Action::FinishOnboarding => {
                self.finish_onboarding();
                Ok(())
            }
            Action::CloseModal => {
                self.close_modal();
                Ok(())
            }
        }
    }

    /// Image URLs of a rendered post, from the feed or the profile grid.
    fn post_images(&self, post_id: &str) -> Vec<String> {
        let state = self.state();
        if let Some(card) = state.find_card(post_id) {
            return card.images.clone();
        }
        match &state.profile_grid.view {
            ProfileGridView::Ready { posts, .. } => posts
                .iter()
                .find(|p| p.id == post_id)
                .map(|p| p.images.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}
