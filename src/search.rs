use std::time::Duration;

use crate::app::App;
use crate::error::ClientResult;
use crate::feed::view::FeedView;
use crate::remote::PostQuery;
use crate::state::Page;

impl App {
    pub async fn toggle_search(&self) -> ClientResult<()> {
        let open = self.state().search.open;
        if open {
            self.close_search().await
        } else {
            self.state().search.open = true;
            Ok(())
        }
    }

    /// Close the search bar and put the unfiltered feed back.
    pub async fn close_search(&self) -> ClientResult<()> {
        self.replace_search_timer(None);
        let filter = {
            let mut state = self.state();
            state.search.open = false;
            state.search.input.clear();
            state.filter
        };
        self.load_feed(filter).await
    }

    /// Record a keystroke and (re)start the debounce timer.
    pub fn search_input(&self, text: &str) {
        let query = {
            let mut state = self.state();
            state.search.input = text.to_string();
            text.trim().to_string()
        };
        if query.is_empty() {
            self.replace_search_timer(None);
            return;
        }

        let app = self.clone();
        let delay = Duration::from_millis(self.config.limits.search_debounce_ms);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = app.search(&query).await {
                app.notify(e.notice());
            }
        });
        self.replace_search_timer(Some(handle));
    }

    /// Enter: search right away, leaving the search bar open.
    pub async fn search_submit(&self) -> ClientResult<()> {
        self.replace_search_timer(None);
        let query = self.state().search.input.trim().to_string();
        self.search(&query).await
    }

    /// Case-insensitive match on caption or author name, shown in the feed.
    pub async fn search(&self, query: &str) -> ClientResult<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let token = {
            let mut state = self.state();
            state.page = Page::Feed;
            state.feed.begin(FeedView::Loading)
        };
        let request = PostQuery {
            search: Some(query.to_string()),
            limit: Some(self.config.limits.search_limit),
            ..PostQuery::active()
        };
        let posts = match self.data.select_posts(&request).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Search for {:?} failed: {}", query, e);
                self.state()
                    .feed
                    .apply(token, FeedView::Failed("Search failed.".to_string()));
                return Err(e.into());
            }
        };
        tracing::debug!("Search {:?} matched {} posts", query, posts.len());

        let no_results = FeedView::NoResults {
            query: query.to_string(),
        };
        if self.render_feed(token, &posts, no_results) {
            self.annotate_likes(token).await;
        }
        Ok(())
    }
}
