// --- View models ---
//
// Pure mapping from records to what the screen shows. No I/O here.

use chrono::{DateTime, Utc};

use crate::db::models::{Comment, Post, PostKind};
use crate::state::Viewer;

pub const ANONYMOUS_AUTHOR: &str = "Anonymous 🎭";
pub const DEFAULT_NAME: &str = "Student";
const SNIPPET_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Pinned,
    Event,
    Confession,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Pinned => "📌 Pinned",
            Badge::Event => "📅 Event",
            Badge::Confession => "🎭 Confession",
        }
    }
}

/// Entries of a post's overflow menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    EditCaption,
    Delete,
    Report,
    Hide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostCard {
    pub id: String,
    pub kind: PostKind,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub badge: Option<Badge>,
    pub pinned: bool,
    pub images: Vec<String>,
    pub caption: Option<String>,
    pub category_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked: bool,
    /// Owner or admin: may edit and delete.
    pub can_manage: bool,
    /// Hidden locally by the viewer.
    pub hidden: bool,
    /// Playing the removal transition; dropped from the list afterwards.
    pub removing: bool,
}

impl PostCard {
    pub fn build(post: &Post, viewer: Option<&Viewer>) -> Self {
        let is_confession = post.kind == PostKind::Confession;

        let author_name = if is_confession {
            ANONYMOUS_AUTHOR.to_string()
        } else {
            post.author_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string())
        };
        let author_avatar = if is_confession {
            None
        } else {
            post.author_avatar.clone().filter(|a| !a.is_empty())
        };

        let badge = match post.kind {
            PostKind::Announcement => Some(Badge::Pinned),
            PostKind::Event => Some(Badge::Event),
            PostKind::Confession => Some(Badge::Confession),
            PostKind::Image | PostKind::Text => None,
        };

        let category_label = if is_confession {
            post.confession_category.map(|c| c.label().to_string())
        } else {
            None
        };

        let can_manage = viewer.is_some_and(|v| {
            v.is_admin || post.user_id.as_deref() == Some(v.user_id.as_str())
        });

        Self {
            id: post.id.clone(),
            kind: post.kind,
            author_name,
            author_avatar,
            badge,
            pinned: post.is_pinned,
            images: post.images.clone(),
            caption: post.caption.clone().filter(|c| !c.is_empty()),
            category_label,
            created_at: post.created_at,
            like_count: post.like_count,
            comment_count: post.comment_count,
            liked: false,
            can_manage,
            hidden: false,
            removing: false,
        }
    }

    pub fn menu(&self) -> &'static [MenuItem] {
        if self.can_manage {
            &[MenuItem::EditCaption, MenuItem::Delete]
        } else {
            &[MenuItem::Report, MenuItem::Hide]
        }
    }

    /// Render as seen by a guest.
    pub fn forget_viewer(&mut self) {
        self.liked = false;
        self.can_manage = false;
    }

    pub fn time_ago(&self) -> String {
        format_relative_time(self.created_at, Utc::now())
    }
}

/// What the feed surface currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedView {
    #[default]
    Loading,
    Posts(Vec<PostCard>),
    Empty,
    Failed(String),
    NoResults {
        query: String,
    },
}

impl FeedView {
    pub fn cards(&self) -> &[PostCard] {
        match self {
            FeedView::Posts(cards) => cards,
            _ => &[],
        }
    }

    pub fn cards_mut(&mut self) -> &mut [PostCard] {
        match self {
            FeedView::Posts(cards) => cards,
            _ => &mut [],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentView {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id.clone(),
            author_name: c
                .author_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            author_avatar: c.author_avatar.clone().filter(|a| !a.is_empty()),
            content: c.content.clone(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CommentsView {
    #[default]
    Loading,
    Thread(Vec<CommentView>),
    Empty,
    Failed(String),
}

/// One square in the profile grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridTile {
    Image { post_id: String, url: String },
    Text { post_id: String, text: String },
}

impl GridTile {
    pub fn for_post(post: &Post) -> Self {
        if let Some(url) = post.images.first() {
            return GridTile::Image {
                post_id: post.id.clone(),
                url: url.clone(),
            };
        }
        let text = if post.kind == PostKind::Confession {
            "🎭 Confession".to_string()
        } else {
            post.caption
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(SNIPPET_CHARS)
                .collect()
        };
        GridTile::Text {
            post_id: post.id.clone(),
            text,
        }
    }

    pub fn post_id(&self) -> &str {
        match self {
            GridTile::Image { post_id, .. } | GridTile::Text { post_id, .. } => post_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProfileGridView {
    #[default]
    Loading,
    Ready {
        post_count: usize,
        like_total: i64,
        tiles: Vec<GridTile>,
        posts: Vec<Post>,
    },
    Empty,
    Failed(String),
}

pub fn format_relative_time(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(dt);

    let minutes = diff.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    format!("{}d ago", diff.num_days())
}

// --- Tests ---
