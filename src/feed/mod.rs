pub mod view;

use std::time::Duration;

use crate::app::App;
use crate::db::models::{NewComment, NewReport, Post, ReportCategory};
use crate::error::{ClientError, ClientResult};
use crate::remote::storage::storage_path_from_url;
use crate::remote::{PostQuery, PostScope};
use crate::state::{FeedFilter, Modal, Page};

use self::view::{CommentView, CommentsView, FeedView, GridTile, PostCard, ProfileGridView};

pub const POST_BUCKET: &str = "post-images";

const DUPLICATE_REPORT: &str = "You already reported this post";

impl App {
    /// Load the feed for `filter`: active posts, pinned first, newest first.
    pub async fn load_feed(&self, filter: FeedFilter) -> ClientResult<()> {
        let token = {
            let mut state = self.state();
            state.filter = filter;
            state.feed.begin(FeedView::Loading)
        };

        let query = PostQuery {
            kind: filter.kind(),
            pinned_first: true,
            limit: Some(self.config.limits.feed_limit),
            ..PostQuery::active()
        };
        let posts = match self.data.select_posts(&query).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Failed to load feed ({}): {}", filter, e);
                self.state()
                    .feed
                    .apply(token, FeedView::Failed("Failed to load posts.".to_string()));
                return Err(e.into());
            }
        };

        if self.render_feed(token, &posts, FeedView::Empty) {
            self.annotate_likes(token).await;
        }
        Ok(())
    }

    /// Render `posts` into the feed surface if `token` is still current.
    pub(crate) fn render_feed(&self, token: u64, posts: &[Post], empty: FeedView) -> bool {
        let mut state = self.state();
        let viewer = state.viewer();
        let view = if posts.is_empty() {
            empty
        } else {
            FeedView::Posts(
                posts
                    .iter()
                    .map(|p| PostCard::build(p, viewer.as_ref()))
                    .collect(),
            )
        };
        state.feed.apply(token, view)
    }

    /// Mark the posts the current user already liked. Visual only.
    pub(crate) async fn annotate_likes(&self, token: u64) {
        let (user_id, post_ids) = {
            let state = self.state();
            let Some(user_id) = state.user_id() else {
                return;
            };
            let ids: Vec<String> = state.feed.view.cards().iter().map(|c| c.id.clone()).collect();
            (user_id, ids)
        };
        if post_ids.is_empty() {
            return;
        }

        match self.data.liked_post_ids(&user_id, &post_ids).await {
            Ok(liked) => {
                let mut state = self.state();
                if !state.feed.is_current(token)
                    || state.user_id().as_deref() != Some(user_id.as_str())
                {
                    return;
                }
                for card in state.feed.view.cards_mut() {
                    if liked.contains(&card.id) {
                        card.liked = true;
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to load likes: {}", e),
        }
    }

    /// Flip the like on `post_id` optimistically. Returns the new liked state.
    ///
    /// A like the server already has is kept, with the count restored to what
    /// it was before the toggle. Any other failure reverts the toggle.
    pub async fn toggle_like(&self, post_id: &str) -> ClientResult<bool> {
        let user_id = self.require_auth()?;

        let was_liked = {
            let mut state = self.state();
            let was_liked = state.find_card(post_id).ok_or(ClientError::NotFound)?.liked;
            let delta = if was_liked { -1 } else { 1 };
            for card in state.cards_mut(post_id) {
                card.liked = !was_liked;
                card.like_count += delta;
            }
            was_liked
        };

        // Server writes for one post go out in toggle order. Adjustments are
        // relative so toggles interleaved across the await compose.
        let lane = self.like_lane(post_id);
        let _turn = lane.lock().await;
        if was_liked {
            match self.data.delete_like(post_id, &user_id).await {
                Ok(0) => {
                    // The server never had this like, so it was never counted.
                    tracing::debug!("Post {} had no like from {} to remove", post_id, user_id);
                    self.adjust_like(post_id, false, 1);
                    Ok(false)
                }
                Ok(_) => Ok(false),
                Err(e) => {
                    self.adjust_like(post_id, true, 1);
                    Err(ClientError::persist(e))
                }
            }
        } else {
            match self.data.insert_like(post_id, &user_id).await {
                Ok(()) => Ok(true),
                Err(e) if e.is_unique_violation() => {
                    tracing::debug!("Post {} was already liked by {}", post_id, user_id);
                    self.adjust_like(post_id, true, -1);
                    Ok(true)
                }
                Err(e) => {
                    self.adjust_like(post_id, false, -1);
                    Err(ClientError::persist(e))
                }
            }
        }
    }

    fn adjust_like(&self, post_id: &str, liked: bool, delta: i64) {
        let mut state = self.state();
        for card in state.cards_mut(post_id) {
            card.liked = liked;
            card.like_count += delta;
        }
    }

    /// Owner scope for regular users, any post for admins.
    fn post_scope(&self, post_id: &str) -> ClientResult<PostScope> {
        let user_id = self.require_auth()?;
        let owner = if self.is_admin() { None } else { Some(user_id) };
        Ok(PostScope {
            post_id: post_id.to_string(),
            owner,
        })
    }

    fn find_post_caption(&self, post_id: &str) -> Option<String> {
        let state = self.state();
        if let Some(card) = state.find_card(post_id) {
            return Some(card.caption.clone().unwrap_or_default());
        }
        match &state.profile_grid.view {
            ProfileGridView::Ready { posts, .. } => posts
                .iter()
                .find(|p| p.id == post_id)
                .map(|p| p.caption.clone().unwrap_or_default()),
            _ => None,
        }
    }

    pub fn open_edit_caption(&self, post_id: &str) -> ClientResult<()> {
        self.require_auth()?;
        let draft = self.find_post_caption(post_id).ok_or(ClientError::NotFound)?;
        self.state().modal = Some(Modal::EditCaption {
            post_id: post_id.to_string(),
            draft,
        });
        Ok(())
    }

    pub async fn edit_caption(&self, post_id: &str, caption: &str) -> ClientResult<()> {
        let scope = self.post_scope(post_id)?;
        let rows = self
            .data
            .update_caption(&scope, caption.trim())
            .await
            .map_err(ClientError::persist)?;
        if rows == 0 {
            tracing::warn!("Caption update on {} matched no rows", post_id);
            return Err(ClientError::Persist(
                "post not found or not editable by you".to_string(),
            ));
        }

        {
            let mut state = self.state();
            if matches!(&state.modal, Some(Modal::EditCaption { post_id: id, .. }) if id == post_id)
            {
                state.modal = None;
            }
            state.push_notice("Caption updated ✅");
        }
        self.reload_after_change().await;
        Ok(())
    }

    /// Ask for confirmation before deleting; nothing is removed yet.
    pub fn delete_post(&self, post_id: &str, image_urls: Vec<String>) -> ClientResult<()> {
        self.require_auth()?;
        self.state().modal = Some(Modal::ConfirmDelete {
            post_id: post_id.to_string(),
            images: image_urls,
        });
        Ok(())
    }

    /// Answer the pending delete confirmation. Returns whether a post was deleted.
    pub async fn confirm_delete(&self, accepted: bool) -> ClientResult<bool> {
        let pending = {
            let mut state = self.state();
            match state.modal.take() {
                Some(Modal::ConfirmDelete { post_id, images }) => Some((post_id, images)),
                other => {
                    state.modal = other;
                    None
                }
            }
        };
        let Some((post_id, images)) = pending else {
            return Err(ClientError::NotFound);
        };
        if !accepted {
            return Ok(false);
        }

        let scope = self.post_scope(&post_id)?;
        let rows = self
            .data
            .delete_post(&scope)
            .await
            .map_err(ClientError::persist)?;
        if rows == 0 {
            tracing::warn!("Delete of {} matched no rows", post_id);
            return Err(ClientError::Persist(
                "post not found or not deletable by you".to_string(),
            ));
        }
        tracing::info!("Deleted post {}", post_id);

        self.remove_post_images(&images).await;
        self.play_removal(&post_id);
        self.notify("Post deleted 🗑️");

        if self.current_page() == Page::Profile {
            if let Err(e) = self.load_profile_posts().await {
                tracing::debug!("Profile reload after delete failed: {}", e);
            }
        }
        Ok(true)
    }

    // Best effort: the post row is already gone.
    async fn remove_post_images(&self, image_urls: &[String]) {
        let paths: Vec<String> = image_urls
            .iter()
            .filter_map(|url| {
                let path = storage_path_from_url(url, POST_BUCKET);
                if path.is_none() {
                    tracing::debug!("Skipping unparseable image URL {}", url);
                }
                path
            })
            .collect();
        if paths.is_empty() {
            return;
        }
        if let Err(e) = self.storage.remove(POST_BUCKET, &paths).await {
            tracing::warn!("Failed to remove {} images: {}", paths.len(), e);
        }
    }

    /// Fade the card out, then drop it from the feed.
    fn play_removal(&self, post_id: &str) {
        {
            let mut state = self.state();
            for card in state.cards_mut(post_id) {
                card.removing = true;
            }
            if matches!(&state.modal, Some(Modal::PostOverlay { card }) if card.id == post_id) {
                state.modal = None;
            }
        }

        let app = self.clone();
        let post_id = post_id.to_string();
        let delay = Duration::from_millis(self.config.limits.removal_transition_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            app.drop_card(&post_id);
        });
    }

    fn drop_card(&self, post_id: &str) {
        let mut state = self.state();
        let now_empty = match &mut state.feed.view {
            FeedView::Posts(cards) => {
                cards.retain(|c| c.id != post_id);
                cards.is_empty()
            }
            _ => false,
        };
        if now_empty {
            state.feed.view = FeedView::Empty;
        }
    }

    pub fn open_report(&self, post_id: &str) -> ClientResult<()> {
        self.require_auth()?;
        self.state().modal = Some(Modal::Report {
            post_id: post_id.to_string(),
        });
        Ok(())
    }

    /// Report `post_id`. The reason is the category label, or the free text
    /// for [`ReportCategory::Other`].
    pub async fn report(
        &self,
        post_id: &str,
        category: Option<ReportCategory>,
        other_text: &str,
    ) -> ClientResult<()> {
        let reporter_id = self.require_auth()?;
        let category = category.ok_or_else(|| ClientError::validation("Select a reason"))?;
        let reason = match category {
            ReportCategory::Other => {
                let text = other_text.trim();
                if text.is_empty() {
                    return Err(ClientError::validation("Describe the problem"));
                }
                text.to_string()
            }
            other => other.label().to_string(),
        };

        // The unique index is authoritative; this only saves a round trip.
        match self.data.find_report(post_id, &reporter_id).await {
            Ok(Some(_)) => {
                self.close_modal();
                return Err(ClientError::Conflict(DUPLICATE_REPORT.to_string()));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Duplicate report check failed: {}", e),
        }

        let report = NewReport {
            post_id: post_id.to_string(),
            reporter_id,
            category,
            reason,
        };
        match self.data.insert_report(&report).await {
            Ok(()) => {
                self.close_modal();
                self.notify("Post reported. Thank you 🚩");
                Ok(())
            }
            Err(e) if e.is_unique_violation() => {
                self.close_modal();
                Err(ClientError::Conflict(DUPLICATE_REPORT.to_string()))
            }
            Err(e) => Err(ClientError::persist(e)),
        }
    }

    /// Hide a post for this session only.
    pub fn hide_post(&self, post_id: &str) {
        let mut state = self.state();
        for card in state.cards_mut(post_id) {
            card.hidden = true;
        }
        state.push_notice("Post hidden");
    }

    pub async fn open_comments(&self, post_id: &str) -> ClientResult<()> {
        let token = {
            let mut state = self.state();
            state.modal = Some(Modal::Comments {
                post_id: post_id.to_string(),
            });
            state.comments.begin(CommentsView::Loading)
        };
        self.load_comments(post_id, token).await
    }

    async fn load_comments(&self, post_id: &str, token: u64) -> ClientResult<()> {
        match self.data.list_comments(post_id).await {
            Ok(comments) => {
                let view = if comments.is_empty() {
                    CommentsView::Empty
                } else {
                    CommentsView::Thread(comments.iter().map(CommentView::from).collect())
                };
                self.state().comments.apply(token, view);
                Ok(())
            }
            Err(e) => {
                self.state().comments.apply(
                    token,
                    CommentsView::Failed("Failed to load comments.".to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Add a comment to the post whose thread is open.
    pub async fn submit_comment(&self, content: &str) -> ClientResult<()> {
        let user_id = self.require_auth()?;
        let modal = self.state().modal.clone();
        let Some(Modal::Comments { post_id }) = modal else {
            return Err(ClientError::NotFound);
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        let comment = NewComment {
            post_id: post_id.clone(),
            user_id,
            content: content.to_string(),
        };
        self.data
            .insert_comment(&comment)
            .await
            .map_err(ClientError::persist)?;

        let token = {
            let mut state = self.state();
            for card in state.cards_mut(&post_id) {
                card.comment_count += 1;
            }
            state.comments.renew()
        };
        self.load_comments(&post_id, token).await
    }

    /// The current user's own active posts, newest first.
    pub async fn load_profile_posts(&self) -> ClientResult<()> {
        let Some(user_id) = self.current_user_id() else {
            return Ok(());
        };
        let token = self.state().profile_grid.begin(ProfileGridView::Loading);

        let query = PostQuery {
            user_id: Some(user_id),
            ..PostQuery::active()
        };
        match self.data.select_posts(&query).await {
            Ok(posts) => {
                let view = if posts.is_empty() {
                    ProfileGridView::Empty
                } else {
                    ProfileGridView::Ready {
                        post_count: posts.len(),
                        like_total: posts.iter().map(|p| p.like_count).sum(),
                        tiles: posts.iter().map(GridTile::for_post).collect(),
                        posts,
                    }
                };
                self.state().profile_grid.apply(token, view);
                Ok(())
            }
            Err(e) => {
                self.state().profile_grid.apply(
                    token,
                    ProfileGridView::Failed("Failed to load your posts.".to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Show one of the profile grid's posts as a full card.
    pub fn open_post_overlay(&self, post_id: &str) -> ClientResult<()> {
        let mut state = self.state();
        let viewer = state.viewer();
        let card = match &state.profile_grid.view {
            ProfileGridView::Ready { posts, .. } => posts
                .iter()
                .find(|p| p.id == post_id)
                .map(|p| PostCard::build(p, viewer.as_ref())),
            _ => None,
        }
        .ok_or(ClientError::NotFound)?;
        state.modal = Some(Modal::PostOverlay {
            card: Box::new(card),
        });
        Ok(())
    }

    /// Refetch the current feed and, on the profile page, the grid.
    pub(crate) async fn reload_after_change(&self) {
        let (filter, page) = {
            let state = self.state();
            (state.filter, state.page)
        };
        if let Err(e) = self.load_feed(filter).await {
            tracing::debug!("Feed reload failed: {}", e);
        }
        if page == Page::Profile {
            if let Err(e) = self.load_profile_posts().await {
                tracing::debug!("Profile reload failed: {}", e);
            }
        }
    }
}
