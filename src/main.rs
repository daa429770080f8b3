use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use url::Url;

use quad::config::{Cli, Command, Config};
use quad::db::models::ReportCategory;
use quad::feed::view::{CommentsView, FeedView, PostCard, ProfileGridView};
use quad::listings::{AcademicsView, ListView};
use quad::media::{ImageFile, JpegResizer};
use quad::prefs::PreferenceStore;
use quad::remote::auth::ProviderMetadata;
use quad::remote::{FsObjectStorage, LocalAuth, OpportunityQuery, SessionUser, SqliteDataClient};
use quad::state::{FeedFilter, Page};
use quad::{routes, Action, App, Backends};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure storage directory exists
    let storage_root = config.storage_path();
    std::fs::create_dir_all(&storage_root)?;
    let public_url =
        Url::parse(&config.storage.public_url).context("invalid storage.public_url")?;
    let storage = Arc::new(FsObjectStorage::new(&storage_root, public_url));

    if let Command::Serve { host, port } = &cli.command {
        return serve(storage, &config, host.clone(), *port).await;
    }

    // Initialize database
    let data = SqliteDataClient::open(&config.db_path())?;

    let authorize_url = Url::parse(&config.auth.authorize_url).context("invalid auth.authorize_url")?;
    let auth = match &cli.as_user {
        Some(id) => LocalAuth::with_session(
            authorize_url,
            SessionUser {
                id: id.clone(),
                email: None,
                user_metadata: ProviderMetadata {
                    full_name: cli.display_name.clone(),
                    avatar_url: None,
                },
            },
        ),
        None => LocalAuth::new(authorize_url),
    };

    let backends = Backends {
        data: Arc::new(data),
        auth: Arc::new(auth),
        storage,
        resizer: Arc::new(JpegResizer::new(
            config.media.max_width,
            config.media.jpeg_quality,
        )),
    };
    let prefs = PreferenceStore::open(data_dir.join("prefs.toml"))?;

    let app = App::new(backends, config, prefs);
    app.initialize().await?;
    let result = run(&app, cli.command).await;

    for notice in app.take_notices() {
        println!("» {notice}");
    }
    app.shutdown();
    result
}

async fn serve(
    storage: Arc<FsObjectStorage>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let app = routes::storage::router(storage).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Serving objects on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Feed { filter } => {
            let filter: FeedFilter = filter.parse()?;
            app.dispatch(Action::SetFilter(filter)).await;
            print_feed(app);
        }
        Command::Search { query } => {
            app.dispatch(Action::ToggleSearch).await;
            app.dispatch(Action::SearchInput(query)).await;
            app.dispatch(Action::SearchSubmit).await;
            print_feed(app);
        }
        Command::Post { caption, images } => {
            let files = images
                .iter()
                .map(|path| ImageFile::from_path(path).with_context(|| path.display().to_string()))
                .collect::<anyhow::Result<Vec<_>>>()?;
            app.dispatch(Action::OpenComposer).await;
            app.dispatch(Action::AddImages(files)).await;
            app.dispatch(Action::SubmitPost { caption }).await;
        }
        Command::Confess { category, text } => {
            app.dispatch(Action::OpenConfession).await;
            app.dispatch(Action::SubmitConfession { text, category }).await;
        }
        Command::Like { post_id } => {
            app.dispatch(Action::SetFilter(FeedFilter::All)).await;
            app.dispatch(Action::ToggleLike { post_id: post_id.clone() }).await;
            if let Some(card) = app.read(|s| s.find_card(&post_id).cloned()) {
                println!("{} likes, liked: {}", card.like_count, card.liked);
            }
        }
        Command::Comment { post_id, content } => {
            app.dispatch(Action::OpenComments { post_id }).await;
            app.dispatch(Action::SubmitComment { content }).await;
            print_comments(app);
        }
        Command::Edit { post_id, caption } => {
            app.dispatch(Action::SetFilter(FeedFilter::All)).await;
            app.dispatch(Action::EditCaption { post_id }).await;
            app.dispatch(Action::SaveCaption { caption }).await;
        }
        Command::Delete { post_id } => {
            app.dispatch(Action::SetFilter(FeedFilter::All)).await;
            app.dispatch(Action::DeletePost { post_id }).await;
            app.dispatch(Action::ConfirmDelete { accepted: true }).await;
        }
        Command::Report {
            post_id,
            category,
            reason,
        } => {
            let category: ReportCategory = category.parse()?;
            app.dispatch(Action::ReportPost { post_id }).await;
            app.dispatch(Action::SubmitReport {
                category: Some(category),
                other: reason.unwrap_or_default(),
            })
            .await;
        }
        Command::Profile { name, avatar } => {
            if let Some(name) = name {
                app.dispatch(Action::SaveName(name)).await;
            }
            if let Some(path) = avatar {
                let file = ImageFile::from_path(&path).with_context(|| path.display().to_string())?;
                app.dispatch(Action::UploadAvatar(file)).await;
            }
            app.dispatch(Action::Navigate(Page::Profile)).await;
            print_profile(app);
        }
        Command::Opportunities { kind, year } => {
            let query = OpportunityQuery {
                kind,
                eligible_year: year,
            };
            app.dispatch(Action::FilterOpportunities(query)).await;
            print_opportunities(app);
        }
        Command::Academics { year } => {
            app.dispatch(Action::SelectYear(year)).await;
            print_academics(app);
        }
        Command::LostFound { tab } => {
            app.dispatch(Action::LostFoundTab(tab.parse()?)).await;
            print_lost_found(app);
        }
        Command::Serve { .. } => anyhow::bail!("serve runs without a client session"),
    }
    Ok(())
}

// --- Output ---

fn print_card(card: &PostCard) {
    let badge = card.badge.map(|b| format!(" [{}]", b.label())).unwrap_or_default();
    println!(
        "{}{} · {} · {}",
        card.author_name,
        badge,
        card.time_ago(),
        card.id
    );
    if let Some(label) = &card.category_label {
        println!("  {label}");
    }
    if let Some(caption) = &card.caption {
        println!("  {caption}");
    }
    for image in &card.images {
        println!("  🖼 {image}");
    }
    let heart = if card.liked { "♥" } else { "♡" };
    println!("  {} {} · 💬 {}", heart, card.like_count, card.comment_count);
}

fn print_feed(app: &App) {
    match app.read(|s| s.feed.view.clone()) {
        FeedView::Loading => println!("Loading..."),
        FeedView::Posts(cards) => cards.iter().filter(|c| !c.hidden).for_each(print_card),
        FeedView::Empty => println!("No posts yet."),
        FeedView::Failed(msg) => println!("{msg}"),
        FeedView::NoResults { query } => println!("No results for \"{query}\""),
    }
}

fn print_comments(app: &App) {
    match app.read(|s| s.comments.view.clone()) {
        CommentsView::Thread(comments) => {
            for c in comments {
                println!("{}: {}", c.author_name, c.content);
            }
        }
        CommentsView::Empty => println!("No comments yet."),
        CommentsView::Loading => println!("Loading..."),
        CommentsView::Failed(msg) => println!("{msg}"),
    }
}

fn print_profile(app: &App) {
    let (header, grid) = app.read(|s| (s.identity_views.profile.clone(), s.profile_grid.view.clone()));
    println!("{}", header.name);
    if let Some(email) = header.email {
        println!("{email}");
    }
    match grid {
        ProfileGridView::Ready {
            post_count,
            like_total,
            posts,
            ..
        } => {
            println!("{post_count} posts · {like_total} likes");
            for post in &posts {
                println!(
                    "  {} {} {}",
                    post.id,
                    post.kind,
                    post.caption.as_deref().unwrap_or_default()
                );
            }
        }
        ProfileGridView::Empty => println!("No posts yet."),
        ProfileGridView::Loading => println!("Loading..."),
        ProfileGridView::Failed(msg) => println!("{msg}"),
    }
}

fn print_opportunities(app: &App) {
    match app.read(|s| s.listings.opportunities.view.clone()) {
        ListView::Items(items) => {
            for opp in items {
                println!("{} [{}] {}", opp.title, opp.kind, opp.organization.unwrap_or_default());
                if let Some(deadline) = opp.deadline {
                    println!("  Deadline: {deadline}");
                }
                if let Some(url) = opp.apply_url {
                    println!("  Apply: {url}");
                }
            }
        }
        ListView::Empty => println!("No opportunities yet."),
        ListView::Loading => println!("Loading..."),
        ListView::Failed(msg) => println!("{msg}"),
    }
}

fn print_academics(app: &App) {
    match app.read(|s| s.listings.academics.view.clone()) {
        AcademicsView::Divisions(divisions) => {
            for division in divisions {
                println!("Division {}", division.name);
                for subject in division.subjects {
                    println!(
                        "  {} ({}): {} resources",
                        subject.name,
                        subject.abbr,
                        subject.resources.len()
                    );
                }
            }
        }
        AcademicsView::Unavailable { year } => {
            println!("No content available yet for year {year}. Contributions welcome!")
        }
        AcademicsView::Loading => println!("Loading..."),
    }
}

fn print_lost_found(app: &App) {
    let (tab, view) = app.read(|s| (s.listings.lost_found_tab, s.listings.lost_found.view.clone()));
    match view {
        ListView::Items(items) => {
            for item in items {
                println!(
                    "{} [{}] 📍 {}",
                    item.name,
                    item.status,
                    item.location.as_deref().unwrap_or("Unknown")
                );
                if let Some(contact) = item.contact {
                    println!("  📞 {contact}");
                }
            }
        }
        ListView::Empty => println!("No {tab} items found."),
        ListView::Loading => println!("Loading..."),
        ListView::Failed(msg) => println!("{msg}"),
    }
}
