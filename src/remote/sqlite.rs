// SQLite stand-in for the hosted tables
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;

use super::{DataClient, OpportunityQuery, PostQuery, PostScope, RemoteError, RemoteResult};
use crate::db::models::*;
use crate::db::{self, parse_timestamp, timestamp, DbPool};

const POST_COLUMNS: &str = "id, user_id, type, caption, images, confession_category, is_pinned, \
     status, created_at, author_name, author_avatar, like_count, comment_count";

pub struct SqliteDataClient {
    pool: DbPool,
}

impl SqliteDataClient {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let pool = db::create_pool(path)?;
        db::run_migrations(&pool)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Maps constraint failures to the service's unique-violation error.
fn map_write_error(err: rusqlite::Error) -> RemoteError {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return RemoteError::UniqueViolation(msg.clone().unwrap_or_else(|| e.to_string()));
        }
    }
    RemoteError::Sql(err)
}

fn parse_column<T>(idx: usize, text: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json_column<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let kind: String = row.get(2)?;
    let images: String = row.get(4)?;
    let category: Option<String> = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parse_column(2, &kind)?,
        caption: row.get(3)?,
        images: parse_json_column(4, &images)?,
        confession_category: category
            .filter(|c| !c.is_empty())
            .map(|c| parse_column(5, &c))
            .transpose()?,
        is_pinned: row.get(6)?,
        status: parse_column(7, &status)?,
        created_at: parse_timestamp(&created_at),
        author_name: row.get(9)?,
        author_avatar: row.get(10)?,
        like_count: row.get(11)?,
        comment_count: row.get(12)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let created_at: String = row.get(5)?;
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        avatar_url: row.get(2)?,
        email: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: parse_timestamp(&created_at),
    })
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn now() -> String {
    timestamp(Utc::now())
}

#[async_trait]
impl DataClient for SqliteDataClient {
    async fn fetch_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                "SELECT id, name, avatar_url, email, is_admin, created_at
                 FROM profiles WHERE id = ?1",
                params![user_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> RemoteResult<Profile> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO profiles (id, name, avatar_url, email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.id,
                profile.name,
                profile.avatar_url,
                profile.email,
                now()
            ],
        )
        .map_err(map_write_error)?;

        let created = conn.query_row(
            "SELECT id, name, avatar_url, email, is_admin, created_at
             FROM profiles WHERE id = ?1",
            params![profile.id],
            profile_from_row,
        )?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> RemoteResult<Option<Profile>> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE profiles
             SET name = COALESCE(?2, name),
                 avatar_url = COALESCE(?3, avatar_url)
             WHERE id = ?1",
            params![user_id, patch.name, patch.avatar_url],
        )?;
        if rows == 0 {
            return Ok(None);
        }

        let updated = conn.query_row(
            "SELECT id, name, avatar_url, email, is_admin, created_at
             FROM profiles WHERE id = ?1",
            params![user_id],
            profile_from_row,
        )?;
        Ok(Some(updated))
    }

    async fn select_posts(&self, query: &PostQuery) -> RemoteResult<Vec<Post>> {
        let conn = self.pool.get()?;

        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts_with_counts WHERE status = ?");
        let mut values: Vec<Value> = vec![Value::Text(query.status.as_str().to_string())];

        if let Some(kind) = query.kind {
            sql.push_str(" AND type = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(ref user_id) = query.user_id {
            sql.push_str(" AND user_id = ?");
            values.push(Value::Text(user_id.clone()));
        }
        if let Some(ref needle) = query.search {
            sql.push_str(
                " AND (fold_case(caption) LIKE ? ESCAPE '\\' \
                 OR fold_case(author_name) LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(&needle.to_lowercase());
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }

        sql.push_str(" ORDER BY ");
        if query.pinned_first {
            sql.push_str("is_pinned DESC, ");
        }
        sql.push_str("created_at DESC, id DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(values.iter()), post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn count_posts_since(&self, user_id: &str, since: DateTime<Utc>) -> RemoteResult<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND created_at >= ?2",
            params![user_id, timestamp(since)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn insert_post(&self, post: &NewPost) -> RemoteResult<Post> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();

        conn.execute(
            "INSERT INTO posts (id, user_id, type, caption, images, confession_category, is_pinned, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active', ?8)",
            params![
                id,
                post.user_id,
                post.kind.as_str(),
                post.caption,
                serde_json::to_string(&post.images)?,
                post.confession_category.map(|c| c.as_str()),
                post.is_pinned,
                now()
            ],
        )
        .map_err(map_write_error)?;

        let created = conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts_with_counts WHERE id = ?1"),
            params![id],
            post_from_row,
        )?;
        Ok(created)
    }

    async fn update_caption(&self, scope: &PostScope, caption: &str) -> RemoteResult<u64> {
        let conn = self.pool.get()?;
        let rows = match scope.owner {
            Some(ref owner) => conn.execute(
                "UPDATE posts SET caption = ?1 WHERE id = ?2 AND user_id = ?3",
                params![caption, scope.post_id, owner],
            )?,
            None => conn.execute(
                "UPDATE posts SET caption = ?1 WHERE id = ?2",
                params![caption, scope.post_id],
            )?,
        };
        Ok(rows as u64)
    }

    async fn delete_post(&self, scope: &PostScope) -> RemoteResult<u64> {
        let conn = self.pool.get()?;
        let rows = match scope.owner {
            Some(ref owner) => conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                params![scope.post_id, owner],
            )?,
            None => conn.execute("DELETE FROM posts WHERE id = ?1", params![scope.post_id])?,
        };
        Ok(rows as u64)
    }

    async fn liked_post_ids(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> RemoteResult<Vec<String>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;

        let placeholders = vec!["?"; post_ids.len()].join(", ");
        let sql = format!(
            "SELECT post_id FROM likes WHERE user_id = ? AND post_id IN ({placeholders})"
        );
        let mut values = vec![Value::Text(user_id.to_string())];
        values.extend(post_ids.iter().map(|id| Value::Text(id.clone())));

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    async fn insert_like(&self, post_id: &str, user_id: &str) -> RemoteResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![post_id, user_id, now()],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn delete_like(&self, post_id: &str, user_id: &str) -> RemoteResult<u64> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(rows as u64)
    }

    async fn list_comments(&self, post_id: &str) -> RemoteResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, post_id, user_id, content, created_at, author_name, author_avatar
             FROM comments_with_author
             WHERE post_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let comments = stmt
            .query_map(params![post_id], |row| {
                let created_at: String = row.get(4)?;
                Ok(Comment {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    user_id: row.get(2)?,
                    content: row.get(3)?,
                    created_at: parse_timestamp(&created_at),
                    author_name: row.get(5)?,
                    author_avatar: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn insert_comment(&self, comment: &NewComment) -> RemoteResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (id, post_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::now_v7().to_string(),
                comment.post_id,
                comment.user_id,
                comment.content,
                now()
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_report(&self, post_id: &str, reporter_id: &str) -> RemoteResult<Option<Report>> {
        let conn = self.pool.get()?;
        let report = conn
            .query_row(
                "SELECT id, post_id, reporter_id, category, reason, created_at
                 FROM reports WHERE post_id = ?1 AND reporter_id = ?2",
                params![post_id, reporter_id],
                |row| {
                    let category: Option<String> = row.get(3)?;
                    let created_at: String = row.get(5)?;
                    Ok(Report {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        reporter_id: row.get(2)?,
                        category: category.map(|c| parse_column(3, &c)).transpose()?,
                        reason: row.get(4)?,
                        created_at: parse_timestamp(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(report)
    }

    async fn insert_report(&self, report: &NewReport) -> RemoteResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO reports (id, post_id, reporter_id, category, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::now_v7().to_string(),
                report.post_id,
                report.reporter_id,
                report.category.as_str(),
                report.reason,
                now()
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn select_opportunities(
        &self,
        query: &OpportunityQuery,
    ) -> RemoteResult<Vec<Opportunity>> {
        let conn = self.pool.get()?;

        let mut sql = String::from(
            "SELECT id, title, type, organization, deadline, eligible_years, description, apply_url, created_at
             FROM opportunities WHERE status = 'active'",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(ref kind) = query.kind {
            sql.push_str(" AND type = ?");
            values.push(Value::Text(kind.clone()));
        }
        if let Some(year) = query.eligible_year {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM json_each(opportunities.eligible_years) WHERE json_each.value = ?)",
            );
            values.push(Value::Integer(year as i64));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                let years: String = row.get(5)?;
                let created_at: String = row.get(8)?;
                Ok(Opportunity {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    kind: row.get(2)?,
                    organization: row.get(3)?,
                    deadline: row.get(4)?,
                    eligible_years: parse_json_column(5, &years)?,
                    description: row.get(6)?,
                    apply_url: row.get(7)?,
                    created_at: parse_timestamp(&created_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn select_resources(&self, year: u8) -> RemoteResult<Vec<AcademicResource>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, year, subject, type, title, url
             FROM academic_resources
             WHERE year = ?1 AND status = 'approved'
             ORDER BY subject, title",
        )?;
        let items = stmt
            .query_map(params![year], |row| {
                let kind: String = row.get(3)?;
                Ok(AcademicResource {
                    id: row.get(0)?,
                    year: row.get(1)?,
                    subject: row.get(2)?,
                    kind: parse_column(3, &kind)?,
                    title: row.get(4)?,
                    url: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn select_lost_found(
        &self,
        status: LostFoundStatus,
        limit: usize,
    ) -> RemoteResult<Vec<LostFoundItem>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, location, contact, status, created_at
             FROM lost_found
             WHERE status = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        let items = stmt
            .query_map(params![status.as_str(), limit as i64], |row| {
                let status: String = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok(LostFoundItem {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    location: row.get(3)?,
                    contact: row.get(4)?,
                    status: parse_column(5, &status)?,
                    created_at: parse_timestamp(&created_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn insert_lost_found(&self, item: &NewLostFoundItem) -> RemoteResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO lost_found (id, user_id, name, location, contact, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid::Uuid::now_v7().to_string(),
                item.user_id,
                item.name,
                item.location,
                item.contact,
                item.status.as_str(),
                now()
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert_bug_report(&self, report: &NewBugReport) -> RemoteResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO bug_reports (id, user_id, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                uuid::Uuid::now_v7().to_string(),
                report.user_id,
                report.description,
                now()
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_client() -> (SqliteDataClient, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let client = SqliteDataClient::open(&temp_dir.path().join("test.db")).unwrap();
        (client, temp_dir)
    }

    fn new_post(user_id: &str, kind: PostKind, caption: &str) -> NewPost {
        NewPost {
            user_id: user_id.to_string(),
            kind,
            caption: Some(caption.to_string()),
            images: Vec::new(),
            confession_category: None,
            is_pinned: false,
        }
    }

    async fn seed_profile(client: &SqliteDataClient, id: &str, name: &str) {
        client
            .insert_profile(&NewProfile {
                id: id.to_string(),
                name: name.to_string(),
                avatar_url: String::new(),
                email: None,
            })
            .await
            .unwrap();
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("exam"), "%exam%");
    }

    #[tokio::test]
    async fn profile_insert_fetch_update() {
        let (client, _tmp) = create_test_client();
        assert!(client.fetch_profile("u1").await.unwrap().is_none());

        seed_profile(&client, "u1", "Asha").await;
        let fetched = client.fetch_profile("u1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Asha");
        assert!(!fetched.is_admin);

        let patch = ProfilePatch {
            avatar_url: Some("https://cdn/a.jpg".into()),
            ..Default::default()
        };
        let updated = client.update_profile("u1", &patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.avatar_url, "https://cdn/a.jpg");

        let missing = client.update_profile("nobody", &patch).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn select_posts_orders_pinned_first() {
        let (client, _tmp) = create_test_client();
        seed_profile(&client, "u1", "Asha").await;

        let mut pinned = new_post("u1", PostKind::Announcement, "pinned");
        pinned.is_pinned = true;
        client.insert_post(&pinned).await.unwrap();
        client
            .insert_post(&new_post("u1", PostKind::Text, "newer"))
            .await
            .unwrap();

        let query = PostQuery {
            pinned_first: true,
            ..PostQuery::active()
        };
        let posts = client.select_posts(&query).await.unwrap();
        let captions: Vec<_> = posts.iter().map(|p| p.caption.clone().unwrap()).collect();
        assert_eq!(captions, vec!["pinned", "newer"]);

        let newest_first = client.select_posts(&PostQuery::active()).await.unwrap();
        assert_eq!(newest_first[0].caption.as_deref(), Some("newer"));
    }

    #[tokio::test]
    async fn confession_author_is_suppressed_in_view() {
        let (client, _tmp) = create_test_client();
        seed_profile(&client, "u1", "Asha").await;

        let mut confession = new_post("u1", PostKind::Confession, "secret");
        confession.confession_category = Some(ConfessionCategory::Secret);
        let created = client.insert_post(&confession).await.unwrap();

        assert_eq!(created.user_id.as_deref(), Some("u1"));
        assert!(created.author_name.is_none());
        assert!(created.author_avatar.is_none());
        assert_eq!(created.confession_category, Some(ConfessionCategory::Secret));
    }

    #[tokio::test]
    async fn search_matches_caption_or_author_case_insensitively() {
        let (client, _tmp) = create_test_client();
        seed_profile(&client, "u1", "Asha").await;
        seed_profile(&client, "u2", "Ravi").await;
        client
            .insert_post(&new_post("u1", PostKind::Text, "Midterm EXAM tips"))
            .await
            .unwrap();
        client
            .insert_post(&new_post("u2", PostKind::Text, "canteen menu"))
            .await
            .unwrap();

        let by_caption = PostQuery {
            search: Some("exam".into()),
            ..PostQuery::active()
        };
        assert_eq!(client.select_posts(&by_caption).await.unwrap().len(), 1);

        let by_author = PostQuery {
            search: Some("rav".into()),
            ..PostQuery::active()
        };
        let found = client.select_posts(&by_author).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].caption.as_deref(), Some("canteen menu"));
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let (client, _tmp) = create_test_client();
        seed_profile(&client, "u1", "Élodie").await;
        client
            .insert_post(&new_post("u1", PostKind::Text, "Études du soir"))
            .await
            .unwrap();

        for needle in ["études", "ÉTUDES", "élo", "50%"] {
            let query = PostQuery {
                search: Some(needle.into()),
                ..PostQuery::active()
            };
            let expected = usize::from(needle != "50%");
            assert_eq!(
                client.select_posts(&query).await.unwrap().len(),
                expected,
                "search for {needle}"
            );
        }
    }

    #[tokio::test]
    async fn duplicate_like_maps_to_unique_violation() {
        let (client, _tmp) = create_test_client();
        let post = client
            .insert_post(&new_post("u1", PostKind::Text, "hi"))
            .await
            .unwrap();

        client.insert_like(&post.id, "u2").await.unwrap();
        let err = client.insert_like(&post.id, "u2").await.unwrap_err();
        assert!(err.is_unique_violation());

        let liked = client
            .liked_post_ids("u2", &[post.id.clone(), "other".into()])
            .await
            .unwrap();
        assert_eq!(liked, vec![post.id.clone()]);
        assert_eq!(client.delete_like(&post.id, "u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scoped_update_affects_only_owner() {
        let (client, _tmp) = create_test_client();
        let post = client
            .insert_post(&new_post("u1", PostKind::Text, "original"))
            .await
            .unwrap();

        let stranger = PostScope {
            post_id: post.id.clone(),
            owner: Some("u2".into()),
        };
        assert_eq!(client.update_caption(&stranger, "hacked").await.unwrap(), 0);
        assert_eq!(client.delete_post(&stranger).await.unwrap(), 0);

        let admin = PostScope {
            post_id: post.id.clone(),
            owner: None,
        };
        assert_eq!(client.update_caption(&admin, "moderated").await.unwrap(), 1);
        let posts = client.select_posts(&PostQuery::active()).await.unwrap();
        assert_eq!(posts[0].caption.as_deref(), Some("moderated"));
    }

    #[tokio::test]
    async fn count_posts_since_respects_cutoff() {
        let (client, _tmp) = create_test_client();
        client
            .insert_post(&new_post("u1", PostKind::Text, "one"))
            .await
            .unwrap();
        client
            .insert_post(&new_post("u1", PostKind::Text, "two"))
            .await
            .unwrap();

        let hour_ago = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(client.count_posts_since("u1", hour_ago).await.unwrap(), 2);
        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(client.count_posts_since("u1", future).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_report_maps_to_unique_violation() {
        let (client, _tmp) = create_test_client();
        let post = client
            .insert_post(&new_post("u1", PostKind::Text, "hi"))
            .await
            .unwrap();
        let report = NewReport {
            post_id: post.id.clone(),
            reporter_id: "u2".into(),
            category: ReportCategory::Spam,
            reason: "Spam".into(),
        };
        client.insert_report(&report).await.unwrap();
        assert!(client
            .insert_report(&report)
            .await
            .unwrap_err()
            .is_unique_violation());

        let found = client.find_report(&post.id, "u2").await.unwrap().unwrap();
        assert_eq!(found.category, Some(ReportCategory::Spam));
    }

    #[tokio::test]
    async fn opportunities_filter_by_eligible_year() {
        let (client, _tmp) = create_test_client();
        {
            let conn = client.pool().get().unwrap();
            conn.execute(
                "INSERT INTO opportunities (id, title, type, eligible_years, created_at)
                 VALUES ('o1', 'Summer internship', 'internship', '[2,3]', ?1)",
                params![now()],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO opportunities (id, title, type, eligible_years, created_at)
                 VALUES ('o2', 'Hackathon', 'hackathon', '[1,2,3,4]', ?1)",
                params![now()],
            )
            .unwrap();
        }

        let first_years = OpportunityQuery {
            eligible_year: Some(1),
            ..Default::default()
        };
        let found = client.select_opportunities(&first_years).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hackathon");

        let internships = OpportunityQuery {
            kind: Some("internship".into()),
            ..Default::default()
        };
        let found = client.select_opportunities(&internships).await.unwrap();
        assert_eq!(found[0].eligible_years, vec![2, 3]);
    }
}
