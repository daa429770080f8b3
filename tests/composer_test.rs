mod common;

use quad::db::models::{ConfessionCategory, PostKind};
use quad::feed::view::FeedView;
use quad::media::ImageFile;
use quad::state::{FeedFilter, Modal};
use quad::{Action, ClientError};

use common::{guest, png, signed_in, storage_error};

#[tokio::test]
async fn daily_cap_blocks_fifth_post_before_any_insert() {
    let t = signed_in("u1", "Asha").await;
    for i in 0..4 {
        t.seed_post("u1", PostKind::Text, &format!("post {i}")).await;
    }
    t.app.open_image_composer().unwrap();

    let err = t.app.submit_image_post("one more").await.unwrap_err();

    assert!(matches!(err, ClientError::RateLimit(_)));
    assert_eq!(err.notice(), "Max 4 posts per day reached");
    assert_eq!(t.data.calls("insert_post"), 0);
    assert_eq!(t.storage.calls("upload"), 0);
}

#[tokio::test]
async fn other_users_posts_do_not_count_toward_cap() {
    let t = signed_in("u1", "Asha").await;
    for i in 0..4 {
        t.seed_post("u2", PostKind::Text, &format!("post {i}")).await;
    }

    let post = t.app.submit_image_post("my first").await.unwrap();

    assert_eq!(post.kind, PostKind::Text);
    assert_eq!(t.data.calls("insert_post"), 1);
}

#[tokio::test]
async fn third_image_is_rejected_and_first_two_kept() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();

    let first = png(8, 8);
    let second = png(16, 16);
    assert_eq!(t.app.add_images(vec![first.clone(), second.clone()]).unwrap(), 2);

    let err = t.app.add_images(vec![png(4, 4)]).unwrap_err();

    assert_eq!(err.notice(), "Max 2 images allowed");
    let queued = t.app.read(|s| s.composer.images.clone());
    assert_eq!(queued, vec![first, second]);
}

#[tokio::test]
async fn picking_more_than_capacity_keeps_a_prefix() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();

    let files = vec![png(1, 1), png(2, 2), png(3, 3)];
    let added = t.app.add_images(files.clone()).unwrap();

    assert_eq!(added, 2);
    assert_eq!(t.app.read(|s| s.composer.images.clone()), files[..2].to_vec());
    assert_eq!(t.app.last_notice().as_deref(), Some("Max 2 images allowed"));
}

#[tokio::test]
async fn non_images_are_ignored() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();

    let notes = ImageFile::new("notes.pdf", "application/pdf", b"%PDF".to_vec());
    let added = t.app.add_images(vec![notes, png(2, 2)]).unwrap();

    assert_eq!(added, 1);
}

#[tokio::test]
async fn removing_an_image_frees_a_slot() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();
    t.app.add_images(vec![png(1, 1), png(2, 2)]).unwrap();

    assert!(t.app.remove_image(0).is_some());
    assert!(t.app.remove_image(5).is_none());
    assert_eq!(t.app.add_images(vec![png(3, 3)]).unwrap(), 1);
}

#[tokio::test]
async fn image_post_uploads_and_appears_in_feed() {
    let t = signed_in("u1", "Asha").await;
    t.app.load_feed(FeedFilter::All).await.unwrap();
    t.app.open_image_composer().unwrap();
    t.app.add_images(vec![png(2400, 10), png(10, 10)]).unwrap();

    let post = t.app.submit_image_post("  campus at dawn ").await.unwrap();

    assert_eq!(post.kind, PostKind::Image);
    assert_eq!(post.caption.as_deref(), Some("campus at dawn"));
    assert_eq!(post.images.len(), 2);
    for url in &post.images {
        assert!(url.starts_with(
            "http://127.0.0.1:3000/storage/v1/object/public/post-images/u1/"
        ));
        assert!(url.ends_with(".jpg"));
    }
    assert_eq!(t.feed_ids(), vec![post.id.clone()]);
    assert_eq!(t.app.last_notice().as_deref(), Some("Post shared! 🚀"));

    let state = t.app.snapshot();
    assert!(state.composer.images.is_empty());
    assert!(!state.composer.submitting);
    assert!(state.modal.is_none());
}

#[tokio::test]
async fn failed_upload_posts_remaining_images() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();
    t.app.add_images(vec![png(4, 4), png(6, 6)]).unwrap();
    t.storage.fail_once("upload", storage_error);

    let post = t.app.submit_image_post("half there").await.unwrap();

    assert_eq!(post.kind, PostKind::Image);
    assert_eq!(post.images.len(), 1);
    let notices = t.app.take_notices();
    assert!(notices.contains(&"Image upload failed, posting without it".to_string()));
}

#[tokio::test]
async fn all_uploads_failing_makes_a_text_post() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();
    t.app.add_images(vec![png(4, 4)]).unwrap();
    t.storage.fail_once("upload", storage_error);

    let post = t.app.submit_image_post("words only").await.unwrap();

    assert_eq!(post.kind, PostKind::Text);
    assert!(post.images.is_empty());
}

#[tokio::test]
async fn empty_post_is_rejected() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_image_composer().unwrap();

    let err = t.app.submit_image_post("   ").await.unwrap_err();

    assert_eq!(err.notice(), "Add a caption or image");
    assert_eq!(t.data.calls("count_posts_since"), 0);
}

#[tokio::test]
async fn guest_cannot_open_composer() {
    let t = guest().await;

    t.app.dispatch(Action::OpenComposer).await;

    assert_eq!(t.app.read(|s| s.modal.clone()), Some(Modal::LoginPrompt));
}

#[tokio::test]
async fn confession_needs_text_and_category() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_confession_composer().unwrap();

    let err = t.app.submit_confession("", "crush").await.unwrap_err();
    assert_eq!(err.notice(), "Write your confession first");

    let err = t
        .app
        .submit_confession("I like someone in my lab", "")
        .await
        .unwrap_err();
    assert_eq!(err.notice(), "Select a category");

    let err = t
        .app
        .submit_confession("I like someone in my lab", "gossip")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(t.data.calls("insert_post"), 0);
}

#[tokio::test]
async fn confession_is_anonymous_in_feed() {
    let t = signed_in("u1", "Asha").await;
    t.app.open_confession_composer().unwrap();

    let post = t
        .app
        .submit_confession("I like someone in my lab", "crush")
        .await
        .unwrap();

    assert_eq!(post.kind, PostKind::Confession);
    assert_eq!(post.confession_category, Some(ConfessionCategory::Crush));
    assert_eq!(
        t.app.last_notice().as_deref(),
        Some("Confession submitted anonymously 🎭")
    );
    match t.app.read(|s| s.feed.view.clone()) {
        FeedView::Posts(cards) => {
            assert_eq!(cards[0].author_name, "Anonymous 🎭");
            assert!(cards[0].author_avatar.is_none());
            assert_eq!(cards[0].category_label.as_deref(), Some("💕 Crush / Love"));
            // The author still manages their own confession.
            assert!(cards[0].can_manage);
        }
        other => panic!("expected posts, got {other:?}"),
    }
}
