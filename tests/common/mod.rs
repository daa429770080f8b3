#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;
use tokio::sync::oneshot;
use url::Url;

use quad::config::Config;
use quad::db::models::*;
use quad::media::{ImageFile, JpegResizer};
use quad::prefs::PreferenceStore;
use quad::remote::auth::ProviderMetadata;
use quad::remote::{
    DataClient, FsObjectStorage, LocalAuth, ObjectStorage, OpportunityQuery, PostQuery, PostScope,
    RemoteError, RemoteResult, SessionUser, SqliteDataClient, UploadOptions,
};
use quad::{App, Backends};

type Failure = fn() -> RemoteError;

/// Records every call by method name and can fail a chosen method once.
///
/// A method can also be held: its next call is recorded, then waits until the
/// test releases it.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    holds: Mutex<HashMap<&'static str, oneshot::Receiver<()>>>,
    interleave: AtomicBool,
}

impl CallLog {
    async fn record(&self, method: &'static str) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(method);
        let hold = self.holds.lock().unwrap().remove(method);
        if let Some(release) = hold {
            let _ = release.await;
        }
        if self.interleave.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        match self.failures.lock().unwrap().remove(method) {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }

    fn hold(&self, method: &'static str) -> oneshot::Sender<()> {
        let (release, held) = oneshot::channel();
        self.holds.lock().unwrap().insert(method, held);
        release
    }

    fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }
}

pub struct CountingData {
    pub inner: SqliteDataClient,
    log: CallLog,
}

impl CountingData {
    pub fn calls(&self, method: &str) -> usize {
        self.log.count(method)
    }

    pub fn reset(&self) {
        self.log.calls.lock().unwrap().clear();
    }

    pub fn fail_once(&self, method: &'static str, failure: Failure) {
        self.log.failures.lock().unwrap().insert(method, failure);
    }

    /// Hold the next call to `method` until the returned sender fires or drops.
    pub fn hold(&self, method: &'static str) -> oneshot::Sender<()> {
        self.log.hold(method)
    }

    /// Yield to the scheduler inside every call so concurrent calls interleave.
    pub fn interleave(&self) {
        self.log.interleave.store(true, Ordering::SeqCst);
    }

    /// Wait until `method` has been called `n` times.
    pub async fn wait_for_calls(&self, method: &str, n: usize) {
        for _ in 0..1000 {
            if self.calls(method) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{method} was never called {n} times");
    }

    /// Mutating calls made so far.
    pub fn mutations(&self) -> Vec<&'static str> {
        self.log
            .calls
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|m| m.starts_with("insert") || m.starts_with("update") || m.starts_with("delete"))
            .collect()
    }
}

#[async_trait]
impl DataClient for CountingData {
    async fn fetch_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>> {
        self.log.record("fetch_profile").await?;
        self.inner.fetch_profile(user_id).await
    }

    async fn insert_profile(&self, profile: &NewProfile) -> RemoteResult<Profile> {
        self.log.record("insert_profile").await?;
        self.inner.insert_profile(profile).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> RemoteResult<Option<Profile>> {
        self.log.record("update_profile").await?;
        self.inner.update_profile(user_id, patch).await
    }

    async fn select_posts(&self, query: &PostQuery) -> RemoteResult<Vec<Post>> {
        self.log.record("select_posts").await?;
        self.inner.select_posts(query).await
    }

    async fn count_posts_since(&self, user_id: &str, since: DateTime<Utc>) -> RemoteResult<u64> {
        self.log.record("count_posts_since").await?;
        self.inner.count_posts_since(user_id, since).await
    }

    async fn insert_post(&self, post: &NewPost) -> RemoteResult<Post> {
        self.log.record("insert_post").await?;
        self.inner.insert_post(post).await
    }

    async fn update_caption(&self, scope: &PostScope, caption: &str) -> RemoteResult<u64> {
        self.log.record("update_caption").await?;
        self.inner.update_caption(scope, caption).await
    }

    async fn delete_post(&self, scope: &PostScope) -> RemoteResult<u64> {
        self.log.record("delete_post").await?;
        self.inner.delete_post(scope).await
    }

    async fn liked_post_ids(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> RemoteResult<Vec<String>> {
        self.log.record("liked_post_ids").await?;
        self.inner.liked_post_ids(user_id, post_ids).await
    }

    async fn insert_like(&self, post_id: &str, user_id: &str) -> RemoteResult<()> {
        self.log.record("insert_like").await?;
        self.inner.insert_like(post_id, user_id).await
    }

    async fn delete_like(&self, post_id: &str, user_id: &str) -> RemoteResult<u64> {
        self.log.record("delete_like").await?;
        self.inner.delete_like(post_id, user_id).await
    }

    async fn list_comments(&self, post_id: &str) -> RemoteResult<Vec<Comment>> {
        self.log.record("list_comments").await?;
        self.inner.list_comments(post_id).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> RemoteResult<()> {
        self.log.record("insert_comment").await?;
        self.inner.insert_comment(comment).await
    }

    async fn find_report(&self, post_id: &str, reporter_id: &str) -> RemoteResult<Option<Report>> {
        self.log.record("find_report").await?;
        self.inner.find_report(post_id, reporter_id).await
    }

    async fn insert_report(&self, report: &NewReport) -> RemoteResult<()> {
        self.log.record("insert_report").await?;
        self.inner.insert_report(report).await
    }

    async fn select_opportunities(
        &self,
        query: &OpportunityQuery,
    ) -> RemoteResult<Vec<Opportunity>> {
        self.log.record("select_opportunities").await?;
        self.inner.select_opportunities(query).await
    }

    async fn select_resources(&self, year: u8) -> RemoteResult<Vec<AcademicResource>> {
        self.log.record("select_resources").await?;
        self.inner.select_resources(year).await
    }

    async fn select_lost_found(
        &self,
        status: LostFoundStatus,
        limit: usize,
    ) -> RemoteResult<Vec<LostFoundItem>> {
        self.log.record("select_lost_found").await?;
        self.inner.select_lost_found(status, limit).await
    }

    async fn insert_lost_found(&self, item: &NewLostFoundItem) -> RemoteResult<()> {
        self.log.record("insert_lost_found").await?;
        self.inner.insert_lost_found(item).await
    }

    async fn insert_bug_report(&self, report: &NewBugReport) -> RemoteResult<()> {
        self.log.record("insert_bug_report").await?;
        self.inner.insert_bug_report(report).await
    }
}

pub struct CountingStorage {
    pub inner: FsObjectStorage,
    log: CallLog,
    removals: Mutex<Vec<(String, Vec<String>)>>,
}

impl CountingStorage {
    pub fn calls(&self, method: &str) -> usize {
        self.log.count(method)
    }

    pub fn fail_once(&self, method: &'static str, failure: Failure) {
        self.log.failures.lock().unwrap().insert(method, failure);
    }

    /// Every `remove` call as (bucket, paths).
    pub fn removals(&self) -> Vec<(String, Vec<String>)> {
        self.removals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for CountingStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> RemoteResult<()> {
        self.log.record("upload").await?;
        self.inner.upload(bucket, path, data, options).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> RemoteResult<()> {
        self.removals
            .lock()
            .unwrap()
            .push((bucket.to_string(), paths.to_vec()));
        self.log.record("remove").await?;
        self.inner.remove(bucket, paths).await
    }
}

pub struct TestApp {
    pub app: App,
    pub data: Arc<CountingData>,
    pub storage: Arc<CountingStorage>,
    pub auth: Arc<LocalAuth>,
    pub config: Config,
    _tmp: TempDir,
}

pub fn session_user(id: &str, name: &str) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        email: Some(format!("{id}@college.edu")),
        user_metadata: ProviderMetadata {
            full_name: Some(name.to_string()),
            avatar_url: None,
        },
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.public_url = "http://127.0.0.1:3000".to_string();
    config
}

fn build(auth: LocalAuth, config: Config) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let inner = SqliteDataClient::open(&tmp.path().join("test.db")).unwrap();
    let data = Arc::new(CountingData {
        inner,
        log: CallLog::default(),
    });
    let storage = Arc::new(CountingStorage {
        inner: FsObjectStorage::new(
            tmp.path().join("storage"),
            Url::parse(&config.storage.public_url).unwrap(),
        ),
        log: CallLog::default(),
        removals: Mutex::new(Vec::new()),
    });
    let auth = Arc::new(auth);

    let backends = Backends {
        data: data.clone(),
        auth: auth.clone(),
        storage: storage.clone(),
        resizer: Arc::new(JpegResizer::new(
            config.media.max_width,
            config.media.jpeg_quality,
        )),
    };
    let app = App::new(backends, config.clone(), PreferenceStore::in_memory());
    TestApp {
        app,
        data,
        storage,
        auth,
        config,
        _tmp: tmp,
    }
}

fn authorize_url() -> Url {
    Url::parse("http://127.0.0.1:3000/auth/v1/authorize").unwrap()
}

/// A client with nobody signed in.
pub async fn guest() -> TestApp {
    let t = build(LocalAuth::new(authorize_url()), test_config());
    t.app.initialize().await.unwrap();
    t
}

/// A client already signed in as `id`, with its profile reconciled.
pub async fn signed_in(id: &str, name: &str) -> TestApp {
    signed_in_with(id, name, test_config()).await
}

pub async fn signed_in_with(id: &str, name: &str, config: Config) -> TestApp {
    let t = build(
        LocalAuth::with_session(authorize_url(), session_user(id, name)),
        config,
    );
    t.app.initialize().await.unwrap();
    t.data.reset();
    t
}

impl TestApp {
    /// Insert a post directly, bypassing the client and the call log.
    pub async fn seed_post(&self, user_id: &str, kind: PostKind, caption: &str) -> Post {
        self.seed(NewPost {
            user_id: user_id.to_string(),
            kind,
            caption: Some(caption.to_string()),
            images: Vec::new(),
            confession_category: (kind == PostKind::Confession).then_some(ConfessionCategory::Rant),
            is_pinned: false,
        })
        .await
    }

    pub async fn seed(&self, post: NewPost) -> Post {
        self.data.inner.insert_post(&post).await.unwrap()
    }

    pub async fn seed_profile(&self, id: &str, name: &str) {
        self.data
            .inner
            .insert_profile(&NewProfile {
                id: id.to_string(),
                name: name.to_string(),
                avatar_url: String::new(),
                email: None,
            })
            .await
            .unwrap();
    }

    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) {
        let conn = self.data.inner.pool().get().unwrap();
        conn.execute(sql, params).unwrap();
    }

    /// Grant admin rights to the signed-in user and re-read their profile.
    pub async fn make_admin(&self, id: &str) {
        self.execute("UPDATE profiles SET is_admin = 1 WHERE id = ?1", [id]);
        self.app.initialize().await.unwrap();
        self.data.reset();
    }

    pub fn feed_ids(&self) -> Vec<String> {
        self.app
            .read(|s| s.feed.view.cards().iter().map(|c| c.id.clone()).collect())
    }
}

pub fn png(width: u32, height: u32) -> ImageFile {
    let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    ImageFile::new("photo.png", "image/png", buf.into_inner())
}

pub fn storage_error() -> RemoteError {
    RemoteError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "bucket offline"))
}

pub fn policy_error() -> RemoteError {
    RemoteError::Auth("row-level security policy".into())
}
