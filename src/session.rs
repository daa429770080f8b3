use bytes::Bytes;
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use url::Url;

use crate::app::App;
use crate::db::models::{NewProfile, Profile, ProfilePatch};
use crate::error::{ClientError, ClientResult};
use crate::feed::view::{ProfileGridView, DEFAULT_NAME};
use crate::media::ImageFile;
use crate::remote::{AuthEvent, Session, UploadOptions};
use crate::state::{Identity, Modal, Page};

pub const AVATAR_BUCKET: &str = "avatars";

impl App {
    /// Adopt any existing session and start following session changes.
    pub async fn initialize(&self) -> ClientResult<()> {
        // Subscribe before reading the session so a sign-in in between is not lost.
        let mut events = self.auth.subscribe();
        let app = self.clone();
        let listener = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => app.handle_auth_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("Auth listener missed {} events", missed)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Auth listener stopped");
        });
        self.set_auth_listener(listener);

        match self.auth.get_session().await? {
            Some(session) => self.reconcile(session).await,
            None => {
                self.clear_identity();
                Ok(())
            }
        }
    }

    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                let user_id = session.user.id.clone();
                if let Err(e) = self.reconcile(session).await {
                    tracing::warn!("Failed to load profile for {}: {}", user_id, e);
                    self.notify(e.notice());
                    return;
                }
                if let Err(e) = self.navigate(Page::Profile).await {
                    tracing::debug!("Profile load after sign-in failed: {}", e);
                }
            }
            AuthEvent::SignedOut => self.clear_identity(),
        }
    }

    /// Load or create the profile row for `session` and make it current.
    pub async fn reconcile(&self, session: Session) -> ClientResult<()> {
        let user_id = session.user.id.clone();
        let meta = session.user.user_metadata.clone();
        let provider_avatar = meta.avatar_url.filter(|a| !a.is_empty());

        let profile = match self.data.fetch_profile(&user_id).await? {
            Some(existing) => match provider_avatar {
                Some(avatar) if existing.avatar_url.is_empty() => {
                    self.backfill_avatar(existing, avatar).await
                }
                _ => existing,
            },
            None => {
                let new = NewProfile {
                    id: user_id.clone(),
                    name: meta
                        .full_name
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_NAME.to_string()),
                    avatar_url: provider_avatar.unwrap_or_default(),
                    email: session.user.email.clone(),
                };
                let created = self.data.insert_profile(&new).await?;
                tracing::info!("Created profile for {}", user_id);
                created
            }
        };

        let mut state = self.state();
        state.identity = Some(Identity { session, profile });
        state.refresh_identity_views();
        Ok(())
    }

    // One-time copy of the provider avatar into an empty stored avatar.
    async fn backfill_avatar(&self, existing: Profile, avatar: String) -> Profile {
        let patch = ProfilePatch {
            avatar_url: Some(avatar),
            ..Default::default()
        };
        match self.data.update_profile(&existing.id, &patch).await {
            Ok(Some(updated)) => updated,
            Ok(None) => existing,
            Err(e) => {
                tracing::warn!("Avatar backfill for {} failed: {}", existing.id, e);
                existing
            }
        }
    }

    pub(crate) fn clear_identity(&self) {
        let mut state = self.state();
        state.identity = None;
        state.refresh_identity_views();
        // A new load generation, so a grid load still in flight for the old
        // user can never render.
        state.profile_grid.begin(ProfileGridView::Loading);
        for card in state.feed.view.cards_mut() {
            card.forget_viewer();
        }
        if matches!(state.modal, Some(Modal::PostOverlay { .. })) {
            state.modal = None;
        }
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.state().user_id()
    }

    pub fn is_admin(&self) -> bool {
        self.state().is_admin()
    }

    /// The signed-in user's id, or the login prompt.
    pub fn require_auth(&self) -> ClientResult<String> {
        let mut state = self.state();
        match state.user_id() {
            Some(id) => Ok(id),
            None => {
                state.modal = Some(Modal::LoginPrompt);
                Err(ClientError::AuthRequired)
            }
        }
    }

    pub async fn update_name(&self, name: &str) -> ClientResult<()> {
        let user_id = self.require_auth()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("Name cannot be empty"));
        }

        let patch = ProfilePatch {
            name: Some(name.to_string()),
            ..Default::default()
        };
        let updated = self
            .data
            .update_profile(&user_id, &patch)
            .await
            .map_err(ClientError::persist)?
            .ok_or(ClientError::NotFound)?;

        self.adopt_profile(updated);
        self.notify("Name saved ✅");
        Ok(())
    }

    /// Replace the avatar. Returns the new public URL.
    pub async fn upload_avatar(&self, file: ImageFile) -> ClientResult<String> {
        let user_id = self.require_auth()?;
        let resized = self.resize_image(&file).await?;

        let path = format!("{user_id}/avatar.jpg");
        self.storage
            .upload(AVATAR_BUCKET, &path, resized, &UploadOptions::jpeg(true))
            .await
            .map_err(ClientError::upload)?;

        // Same path every time; the query string defeats caches.
        let url = format!(
            "{}?t={}",
            self.storage.public_url(AVATAR_BUCKET, &path),
            Utc::now().timestamp_millis()
        );
        let patch = ProfilePatch {
            avatar_url: Some(url.clone()),
            ..Default::default()
        };
        let updated = self
            .data
            .update_profile(&user_id, &patch)
            .await
            .map_err(ClientError::persist)?
            .ok_or(ClientError::NotFound)?;

        self.adopt_profile(updated);
        self.notify("Profile photo updated ✅");
        Ok(url)
    }

    /// Start the OAuth flow. Returns the URL the user has to visit.
    pub async fn sign_in(&self) -> ClientResult<Url> {
        let auth = &self.config.auth;
        self.auth
            .sign_in_with_oauth(&auth.provider, &auth.redirect_url)
            .await
            .map_err(|e| {
                tracing::warn!("OAuth sign-in failed: {}", e);
                ClientError::Login(e.to_string())
            })
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!("Remote sign-out failed: {}", e);
        }
        self.clear_identity();
        self.notify("Logged out");
        self.navigate(Page::Feed).await
    }

    pub(crate) async fn resize_image(&self, file: &ImageFile) -> ClientResult<Bytes> {
        let resizer = self.resizer.clone();
        let data = file.data.clone();
        let resized = tokio::task::spawn_blocking(move || resizer.resize(&data))
            .await
            .map_err(|e| ClientError::Upload(format!("image processing interrupted: {e}")))??;
        Ok(resized)
    }

    fn adopt_profile(&self, profile: Profile) {
        let mut state = self.state();
        if let Some(identity) = state.identity.as_mut() {
            if identity.user_id() == profile.id {
                identity.profile = profile;
            }
        }
        state.refresh_identity_views();
    }
}
