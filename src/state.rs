use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::db::models::{AcademicResource, LostFoundStatus, PostKind, Profile, UnknownVariant};
use crate::feed::view::{CommentsView, FeedView, PostCard, ProfileGridView, DEFAULT_NAME};
use crate::listings::{AcademicsView, LostFoundView, OpportunitiesView};
use crate::media::ImageFile;
use crate::prefs::Preferences;
use crate::remote::{OpportunityQuery, Session};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Feed,
    Academics,
    Opportunities,
    More,
    Profile,
}

impl Page {
    pub const ALL: &'static [Page] = &[
        Page::Feed,
        Page::Academics,
        Page::Opportunities,
        Page::More,
        Page::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Feed => "feed",
            Page::Academics => "academics",
            Page::Opportunities => "opportunities",
            Page::More => "more",
            Page::Profile => "profile",
        }
    }
}

impl FromStr for Page {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "page",
                value: s.to_string(),
            })
    }
}

/// Which posts the feed shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedFilter {
    #[default]
    All,
    Only(PostKind),
}

impl FeedFilter {
    pub fn kind(&self) -> Option<PostKind> {
        match self {
            FeedFilter::All => None,
            FeedFilter::Only(kind) => Some(*kind),
        }
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFilter::All => f.write_str("all"),
            FeedFilter::Only(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for FeedFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FeedFilter::All),
            other => other
                .parse::<PostKind>()
                .map(FeedFilter::Only)
                .map_err(|_| UnknownVariant {
                    kind: "feed filter",
                    value: other.to_string(),
                }),
        }
    }
}

/// The signed-in user: provider session plus the stored profile row.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub session: Session,
    pub profile: Profile,
}

impl Identity {
    pub fn user_id(&self) -> &str {
        &self.session.user.id
    }

    /// Stored name first; provider metadata only as a fallback.
    pub fn display_name(&self) -> String {
        let meta = &self.session.user.user_metadata;
        [Some(self.profile.name.as_str()), meta.full_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_string()
    }

    pub fn avatar_url(&self) -> Option<String> {
        let meta = &self.session.user.user_metadata;
        [Some(self.profile.avatar_url.as_str()), meta.avatar_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|a| !a.is_empty())
            .map(str::to_string)
    }

    pub fn email(&self) -> Option<String> {
        self.profile
            .email
            .clone()
            .or_else(|| self.session.user.email.clone())
    }
}

/// The parts of the identity that decide post permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderView {
    pub signed_in: bool,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SettingsView {
    #[default]
    Guest,
    Account {
        name: String,
        email: Option<String>,
        avatar_url: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileHeaderView {
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    /// Pre-filled value of the name editor.
    pub name_input: String,
}

/// Every rendered surface that shows who is signed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityViews {
    pub header: HeaderView,
    pub settings: SettingsView,
    pub profile: ProfileHeaderView,
}

impl IdentityViews {
    pub fn render(identity: Option<&Identity>) -> Self {
        let Some(identity) = identity else {
            return Self::default();
        };
        let name = identity.display_name();
        let avatar_url = identity.avatar_url();
        let email = identity.email();
        Self {
            header: HeaderView {
                signed_in: true,
                name: Some(name.clone()),
                avatar_url: avatar_url.clone(),
            },
            settings: SettingsView::Account {
                name: name.clone(),
                email: email.clone(),
                avatar_url: avatar_url.clone(),
            },
            profile: ProfileHeaderView {
                name_input: name.clone(),
                name,
                email,
                avatar_url,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    LoginPrompt,
    ImageComposer,
    ConfessionComposer,
    ConfirmDelete { post_id: String, images: Vec<String> },
    EditCaption { post_id: String, draft: String },
    Report { post_id: String },
    Comments { post_id: String },
    PostOverlay { card: Box<PostCard> },
    LostItem,
    BugReport,
}

/// A surface whose content is replaced by asynchronous loads.
///
/// Each load stamps a new generation; a continuation may only render if its
/// generation is still the latest one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracked<V> {
    generation: u64,
    pub view: V,
}

impl<V> Tracked<V> {
    pub fn begin(&mut self, loading: V) -> u64 {
        self.generation += 1;
        self.view = loading;
        self.generation
    }

    /// Supersede in-flight loads but keep showing the current content.
    pub fn renew(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.generation == token
    }

    /// Returns false (and renders nothing) for a superseded load.
    pub fn apply(&mut self, token: u64, view: V) -> bool {
        if !self.is_current(token) {
            tracing::debug!(
                "Dropping stale render (token {}, current {})",
                token,
                self.generation
            );
            return false;
        }
        self.view = view;
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposerState {
    pub images: Vec<ImageFile>,
    pub submitting: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub open: bool,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingsState {
    pub opportunity_filter: OpportunityQuery,
    pub opportunities: Tracked<OpportunitiesView>,
    pub year: u8,
    pub academics: Tracked<AcademicsView>,
    pub resource_cache: HashMap<u8, Vec<AcademicResource>>,
    pub lost_found_tab: LostFoundStatus,
    pub lost_found: Tracked<LostFoundView>,
}

impl Default for ListingsState {
    fn default() -> Self {
        Self {
            opportunity_filter: OpportunityQuery::default(),
            opportunities: Tracked::default(),
            year: 1,
            academics: Tracked::default(),
            resource_cache: HashMap::new(),
            lost_found_tab: LostFoundStatus::Lost,
            lost_found: Tracked::default(),
        }
    }
}

/// All mutable client state. Owned by [`crate::App`] behind one mutex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub page: Page,
    pub filter: FeedFilter,
    pub identity: Option<Identity>,
    pub identity_views: IdentityViews,
    /// Shared by the feed and search results.
    pub feed: Tracked<FeedView>,
    pub profile_grid: Tracked<ProfileGridView>,
    pub comments: Tracked<CommentsView>,
    pub composer: ComposerState,
    pub search: SearchState,
    pub listings: ListingsState,
    pub modal: Option<Modal>,
    pub notices: Vec<String>,
    /// Provider page to finish an OAuth sign-in.
    pub sign_in_url: Option<Url>,
    pub prefs: Preferences,
}

impl AppState {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            ..Self::default()
        }
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.identity.as_ref().map(|i| Viewer {
            user_id: i.user_id().to_string(),
            is_admin: i.profile.is_admin,
        })
    }

    pub fn user_id(&self) -> Option<String> {
        self.identity.as_ref().map(|i| i.user_id().to_string())
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.profile.is_admin)
    }

    pub fn refresh_identity_views(&mut self) {
        self.identity_views = IdentityViews::render(self.identity.as_ref());
    }

    pub fn push_notice(&mut self, notice: impl Into<String>) {
        let notice = notice.into();
        tracing::debug!("Notice: {}", notice);
        self.notices.push(notice);
    }

    /// Every rendered card of `post_id`: in the feed and in an open overlay.
    pub fn cards_mut<'a>(&'a mut self, post_id: &'a str) -> impl Iterator<Item = &'a mut PostCard> + 'a {
        let overlay = match &mut self.modal {
            Some(Modal::PostOverlay { card }) => Some(card.as_mut()),
            _ => None,
        };
        self.feed
            .view
            .cards_mut()
            .iter_mut()
            .chain(overlay)
            .filter(move |c| c.id == post_id)
    }

    pub fn find_card(&self, post_id: &str) -> Option<&PostCard> {
        let overlay = match &self.modal {
            Some(Modal::PostOverlay { card }) => Some(card.as_ref()),
            _ => None,
        };
        self.feed
            .view
            .cards()
            .iter()
            .chain(overlay)
            .find(|c| c.id == post_id)
    }
}
