use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quad", about = "College community feed client")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Act as this user id (signs in locally before running the command)
    #[arg(long = "as-user")]
    pub as_user: Option<String>,

    /// Display name used when the acting user has no profile yet
    #[arg(long)]
    pub display_name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the feed
    Feed {
        #[arg(long, default_value = "all")]
        filter: String,
    },
    /// Search captions and author names
    Search { query: String },
    /// Share a post with up to two images
    Post {
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// Post an anonymous confession
    Confess {
        #[arg(long)]
        category: String,
        text: String,
    },
    /// Like or unlike a post
    Like { post_id: String },
    /// Comment on a post
    Comment { post_id: String, content: String },
    /// Change a post's caption
    Edit { post_id: String, caption: String },
    /// Delete a post and its images
    Delete { post_id: String },
    /// Report a post
    Report {
        post_id: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show or update the acting user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// List opportunities
    Opportunities {
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        year: Option<u8>,
    },
    /// Browse academic resources for a year
    Academics {
        #[arg(long, default_value_t = 1)]
        year: u8,
    },
    /// Browse lost & found
    LostFound {
        #[arg(long, default_value = "lost")]
        tab: String,
    },
    /// Serve stored objects over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
    pub media: MediaConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
    pub public_url: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: String,
    pub authorize_url: String,
    pub redirect_url: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub images_per_post: usize,
    pub posts_per_day: u64,
    pub feed_limit: usize,
    pub search_limit: usize,
    pub lost_found_limit: usize,
    pub search_debounce_ms: u64,
    pub removal_transition_ms: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    pub max_width: u32,
    pub jpeg_quality: u8,
    pub max_image_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            public_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            authorize_url: "http://127.0.0.1:3000/auth/v1/authorize".to_string(),
            redirect_url: "http://127.0.0.1:3000/".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            images_per_post: 2,
            posts_per_day: 4,
            feed_limit: 30,
            search_limit: 20,
            lost_found_limit: 10,
            search_debounce_ms: 350,
            removal_transition_ms: 300,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            jpeg_quality: 85,
            max_image_bytes: 3 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("quad.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("storage"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".quad")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("quad.db"))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("storage"))
    }
}
