use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A column value that did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed text enums stored as plain strings in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(
    /// What a post is; decides badges and author visibility.
    PostKind, "post type" {
        Image => "image",
        Text => "text",
        Confession => "confession",
        Announcement => "announcement",
        Event => "event",
    }
);

text_enum!(
    PostStatus, "post status" {
        Active => "active",
        Removed => "removed",
    }
);

text_enum!(
    ConfessionCategory, "confession category" {
        Crush => "crush",
        Rant => "rant",
        Funny => "funny",
        Academic => "academic",
        Social => "social",
        Secret => "secret",
        Motivation => "motivation",
        Other => "other",
    }
);

impl ConfessionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Crush => "💕 Crush / Love",
            Self::Rant => "😤 College Rant",
            Self::Funny => "😂 Funny / Embarrassing",
            Self::Academic => "📚 Academic Stress",
            Self::Social => "👥 Friends / Social Life",
            Self::Secret => "🤫 Secret / Guilt",
            Self::Motivation => "💪 Motivation / Positivity",
            Self::Other => "💬 Other",
        }
    }
}

text_enum!(
    ReportCategory, "report category" {
        Spam => "spam",
        Harassment => "harassment",
        Inappropriate => "inappropriate",
        Misinformation => "misinformation",
        Other => "other",
    }
);

impl ReportCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spam => "Spam",
            Self::Harassment => "Harassment or bullying",
            Self::Inappropriate => "Inappropriate content",
            Self::Misinformation => "False information",
            Self::Other => "Other",
        }
    }
}

text_enum!(
    LostFoundStatus, "lost & found status" {
        Lost => "lost",
        Found => "found",
    }
);

text_enum!(
    ResourceKind, "resource type" {
        Notes => "notes",
        QuestionBank => "question-bank",
        QuestionPapers => "question-papers",
    }
);

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Notes => "Notes",
            Self::QuestionBank => "Question Bank",
            Self::QuestionPapers => "Question Papers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Empty when the user never set one and the provider had none.
    pub avatar_url: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A post as read through the counting view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: Option<String>,
    pub kind: PostKind,
    pub caption: Option<String>,
    pub images: Vec<String>,
    pub confession_category: Option<ConfessionCategory>,
    pub is_pinned: bool,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub user_id: String,
    pub kind: PostKind,
    pub caption: Option<String>,
    pub images: Vec<String>,
    pub confession_category: Option<ConfessionCategory>,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub post_id: String,
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub post_id: String,
    pub reporter_id: String,
    pub category: Option<ReportCategory>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub post_id: String,
    pub reporter_id: String,
    pub category: ReportCategory,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub organization: Option<String>,
    pub deadline: Option<String>,
    pub eligible_years: Vec<u8>,
    pub description: Option<String>,
    pub apply_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicResource {
    pub id: String,
    pub year: u8,
    pub subject: String,
    pub kind: ResourceKind,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostFoundItem {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub status: LostFoundStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLostFoundItem {
    pub user_id: String,
    pub name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub status: LostFoundStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBugReport {
    pub user_id: Option<String>,
    pub description: String,
}
