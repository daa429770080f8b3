use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::app::App;
use crate::db::models::{ConfessionCategory, NewPost, Post, PostKind};
use crate::error::{ClientError, ClientResult};
use crate::feed::POST_BUCKET;
use crate::media::ImageFile;
use crate::remote::UploadOptions;
use crate::state::{ComposerState, Modal};

/// Start of the current local calendar day, in UTC.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        // Midnight skipped by a DST jump: count from the start of the UTC day.
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).with_timezone(&Local))
        .with_timezone(&Utc)
}

fn upload_path(user_id: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!(
        "{}/{}-{}.jpg",
        user_id,
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

impl App {
    pub fn open_image_composer(&self) -> ClientResult<()> {
        self.require_auth()?;
        let mut state = self.state();
        state.composer = ComposerState::default();
        state.modal = Some(Modal::ImageComposer);
        Ok(())
    }

    pub fn open_confession_composer(&self) -> ClientResult<()> {
        self.require_auth()?;
        self.state().modal = Some(Modal::ConfessionComposer);
        Ok(())
    }

    /// Queue picked files. Non-images are ignored and only the prefix that
    /// fits the remaining capacity is kept. Returns how many were added.
    pub fn add_images(&self, files: Vec<ImageFile>) -> ClientResult<usize> {
        let capacity = self.config.limits.images_per_post;
        let max_bytes = self.config.media.max_image_bytes;
        let full_notice = format!("Max {capacity} images allowed");

        let mut state = self.state();
        let slots = capacity.saturating_sub(state.composer.images.len());
        if slots == 0 {
            return Err(ClientError::Validation(full_notice));
        }

        let images: Vec<ImageFile> = files.into_iter().filter(ImageFile::is_image).collect();
        let (fits, too_large): (Vec<ImageFile>, Vec<ImageFile>) =
            images.into_iter().partition(|f| f.data.len() <= max_bytes);
        if !too_large.is_empty() {
            tracing::debug!("Ignoring {} oversized images", too_large.len());
            state.push_notice(format!(
                "Images must be under {} MB",
                max_bytes / (1024 * 1024)
            ));
        }

        let offered = fits.len();
        let accepted: Vec<ImageFile> = fits.into_iter().take(slots).collect();
        let added = accepted.len();
        state.composer.images.extend(accepted);
        if offered > added {
            state.push_notice(full_notice);
        }
        Ok(added)
    }

    pub fn remove_image(&self, index: usize) -> Option<ImageFile> {
        let mut state = self.state();
        if index < state.composer.images.len() {
            Some(state.composer.images.remove(index))
        } else {
            None
        }
    }

    /// Post the queued images with `caption`.
    ///
    /// Images that fail to process or upload are skipped; the post is still
    /// created with the rest, as text if none made it.
    pub async fn submit_image_post(&self, caption: &str) -> ClientResult<Post> {
        let user_id = self.require_auth()?;
        let caption = caption.trim().to_string();
        let files = self.state().composer.images.clone();
        if caption.is_empty() && files.is_empty() {
            return Err(ClientError::validation("Add a caption or image"));
        }

        let cap = self.config.limits.posts_per_day;
        let today = self
            .data
            .count_posts_since(&user_id, local_midnight(Local::now()))
            .await?;
        if today >= cap {
            return Err(ClientError::RateLimit(format!(
                "Max {cap} posts per day reached"
            )));
        }

        {
            let mut state = self.state();
            if state.composer.submitting {
                return Err(ClientError::validation("Already posting"));
            }
            state.composer.submitting = true;
        }
        let result = self.create_image_post(&user_id, caption, &files).await;
        self.state().composer.submitting = false;
        let post = result?;

        {
            let mut state = self.state();
            state.composer = ComposerState::default();
            state.modal = None;
            state.push_notice("Post shared! 🚀");
        }
        let filter = self.state().filter;
        if let Err(e) = self.load_feed(filter).await {
            tracing::debug!("Feed reload after post failed: {}", e);
        }
        if let Err(e) = self.load_profile_posts().await {
            tracing::debug!("Profile reload after post failed: {}", e);
        }
        Ok(post)
    }

    async fn create_image_post(
        &self,
        user_id: &str,
        caption: String,
        files: &[ImageFile],
    ) -> ClientResult<Post> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            match self.upload_post_image(user_id, file).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    tracing::warn!("Skipping image {}: {}", file.name, e);
                    self.notify("Image upload failed, posting without it");
                }
            }
        }

        let new = NewPost {
            user_id: user_id.to_string(),
            kind: if urls.is_empty() {
                PostKind::Text
            } else {
                PostKind::Image
            },
            caption: Some(caption).filter(|c| !c.is_empty()),
            images: urls,
            confession_category: None,
            is_pinned: false,
        };
        let post = self
            .data
            .insert_post(&new)
            .await
            .map_err(ClientError::persist)?;
        tracing::info!("Created {} post {} with {} images", post.kind, post.id, post.images.len());
        Ok(post)
    }

    async fn upload_post_image(&self, user_id: &str, file: &ImageFile) -> ClientResult<String> {
        let resized = self.resize_image(file).await?;
        let path = upload_path(user_id);
        self.storage
            .upload(POST_BUCKET, &path, resized, &UploadOptions::jpeg(false))
            .await
            .map_err(ClientError::upload)?;
        Ok(self.storage.public_url(POST_BUCKET, &path))
    }

    /// Post an anonymous confession. Both fields are required.
    pub async fn submit_confession(&self, text: &str, category: &str) -> ClientResult<Post> {
        let user_id = self.require_auth()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::validation("Write your confession first"));
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(ClientError::validation("Select a category"));
        }
        let category: ConfessionCategory = category
            .parse()
            .map_err(|e| ClientError::Validation(format!("{e}")))?;

        let new = NewPost {
            user_id,
            kind: PostKind::Confession,
            caption: Some(text.to_string()),
            images: Vec::new(),
            confession_category: Some(category),
            is_pinned: false,
        };
        let post = self
            .data
            .insert_post(&new)
            .await
            .map_err(ClientError::persist)?;
        tracing::info!("Created confession {}", post.id);

        {
            let mut state = self.state();
            state.modal = None;
            state.push_notice("Confession submitted anonymously 🎭");
        }
        let filter = self.state().filter;
        if let Err(e) = self.load_feed(filter).await {
            tracing::debug!("Feed reload after confession failed: {}", e);
        }
        Ok(post)
    }
}
