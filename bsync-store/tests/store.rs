//! Gateway tests against a live PostgreSQL.
//!
//! These need a reachable database configured through the usual libpq
//! environment and are therefore opt-in:
//!
//! ```text
//! cargo test -p bsync-store -- --ignored
//! ```
//!
//! The schema is (re-)created from scratch on every run.

use bsync_common::model::{
    AssetStatus, FileType, MediaAsset, MediaAssetVariant, Post, PostVersion, Rating, Tag,
    TagCategory,
};
use bsync_common::timestamp::{self, Timestamp};
use bsync_store::{self as store, InsertMode, Store, StoreError};
use chrono::TimeZone;
use sqlx::Executor;

const SCHEMA: &str = r"
    DROP TABLE IF EXISTS post_versions;
    DROP TABLE IF EXISTS posts;
    DROP TABLE IF EXISTS media_asset_variants;
    DROP TABLE IF EXISTS media_assets;
    DROP TABLE IF EXISTS tags;
    DROP TYPE IF EXISTS tag_category;
    DROP TYPE IF EXISTS post_rating;
    DROP TYPE IF EXISTS file_type;
    DROP TYPE IF EXISTS asset_status;

    CREATE TYPE tag_category AS ENUM ('general', 'artist', 'copyright', 'character', 'meta');
    CREATE TYPE post_rating AS ENUM ('g', 's', 'q', 'e');
    CREATE TYPE file_type AS ENUM ('jpg', 'png', 'gif', 'webp', 'avif', 'mp4', 'webm', 'swf', 'zip');
    CREATE TYPE asset_status AS ENUM ('processing', 'active', 'deleted', 'expunged', 'failed');

    CREATE TABLE tags (
        id            INT PRIMARY KEY,
        name          TEXT UNIQUE NOT NULL,
        post_count    INT NOT NULL,
        category      tag_category NOT NULL,
        is_deprecated BOOLEAN NOT NULL,
        created_at    TIMESTAMPTZ,
        updated_at    TIMESTAMPTZ
    );

    CREATE TABLE media_assets (
        id           INT PRIMARY KEY,
        md5          TEXT NOT NULL,
        file_ext     file_type NOT NULL,
        file_size    BIGINT NOT NULL,
        image_width  INT NOT NULL,
        image_height INT NOT NULL,
        duration     REAL,
        pixel_hash   TEXT NOT NULL,
        status       asset_status NOT NULL,
        file_key     TEXT NOT NULL,
        is_public    BOOLEAN NOT NULL,
        created_at   TIMESTAMPTZ NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL
    );

    CREATE TABLE media_asset_variants (
        asset_id INT NOT NULL REFERENCES media_assets(id),
        type     TEXT NOT NULL,
        width    INT NOT NULL,
        height   INT NOT NULL,
        file_ext file_type NOT NULL
    );

    CREATE TABLE posts (
        id           INT PRIMARY KEY,
        uploader_id  INT NOT NULL,
        approver_id  INT,
        tags         INT[] NOT NULL,
        rating       post_rating NOT NULL,
        parent       INT,
        source       TEXT,
        media_asset  INT NOT NULL REFERENCES media_assets(id),
        fav_count    INT NOT NULL,
        has_children BOOLEAN NOT NULL,
        up_score     INT NOT NULL,
        down_score   INT NOT NULL,
        is_pending   BOOLEAN NOT NULL,
        is_flagged   BOOLEAN NOT NULL,
        is_deleted   BOOLEAN NOT NULL,
        is_banned    BOOLEAN NOT NULL,
        pixiv_id     INT,
        bit_flags    INT NOT NULL,
        last_comment TIMESTAMPTZ,
        last_bump    TIMESTAMPTZ,
        last_note    TIMESTAMPTZ,
        created_at   TIMESTAMPTZ NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL
    );

    CREATE TABLE post_versions (
        id           INT PRIMARY KEY,
        post_id      INT NOT NULL REFERENCES posts(id),
        updater_id   INT NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL,
        version      INT NOT NULL,
        added_tags   INT[],
        removed_tags INT[],
        new_rating   post_rating,
        new_parent   INT,
        new_source   TEXT
    );
";

async fn fresh_store() -> Store {
    let mut db = Store::connect().await.expect("database not reachable");

    let mut tx = db.work().await.unwrap();
    tx.as_mut().execute(SCHEMA).await.unwrap();
    tx.commit().await.unwrap();

    db
}

fn ts(secs: i64) -> Timestamp {
    chrono::Utc.timestamp_opt(secs, 0).unwrap()
}

fn tag(id: i32, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_string(),
        post_count: 0,
        category: TagCategory::General,
        is_deprecated: false,
        created_at: ts(1_700_000_000),
        updated_at: ts(1_700_000_000),
    }
}

fn asset(id: i32) -> MediaAsset {
    MediaAsset {
        id,
        md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        file_ext: FileType::Png,
        file_size: 1024,
        image_width: 100,
        image_height: 150,
        duration: None,
        pixel_hash: "9e107d9d372bb6826bd81d3542a419d6".to_string(),
        status: AssetStatus::Active,
        file_key: "aBcDeFgHi".to_string(),
        is_public: true,
        variants: vec![MediaAssetVariant {
            variant_type: "original".to_string(),
            width: 100,
            height: 150,
            file_ext: FileType::Png,
        }],
        created_at: ts(1_700_000_100),
        updated_at: ts(1_700_000_100),
    }
}

fn post(id: i32, tags: Vec<i32>, media_asset: i32) -> Post {
    Post {
        id,
        uploader_id: 1,
        approver_id: None,
        tags,
        rating: Rating::G,
        parent: None,
        source: String::new(),
        media_asset,
        fav_count: 0,
        has_children: false,
        up_score: 0,
        down_score: 0,
        is_pending: false,
        is_flagged: false,
        is_deleted: false,
        is_banned: false,
        pixiv_id: None,
        bit_flags: 0,
        last_comment: None,
        last_bump: None,
        last_note: None,
        created_at: ts(1_700_000_200),
        updated_at: ts(1_700_000_200),
    }
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn empty_tables_report_zero() {
    let mut db = fresh_store().await;

    assert_eq!(db.latest_tag().await.unwrap(), 0);
    assert_eq!(db.latest_post().await.unwrap(), 0);
    assert_eq!(db.latest_media_asset().await.unwrap(), 0);
    assert_eq!(db.latest_post_version().await.unwrap(), 0);
    assert_eq!(db.lowest_tag().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn weak_insert_swallows_conflicts() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &tag(10, "solo"), InsertMode::Weak)
        .await
        .unwrap();

    let mut renamed = tag(10, "solo");
    renamed.post_count = 999;
    store::insert_tag(&mut tx, &renamed, InsertMode::Weak)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.work().await.unwrap();
    assert_eq!(store::tag_id(&mut tx, "solo").await.unwrap(), 10);
    tx.commit().await.unwrap();

    assert_eq!(db.latest_tag().await.unwrap(), 10);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn overwrite_insert_updates_all_columns() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &tag(10, "solo"), InsertMode::Weak)
        .await
        .unwrap();

    let mut updated = tag(10, "solo");
    updated.post_count = 123;
    updated.category = TagCategory::Meta;
    store::insert_tag(&mut tx, &updated, InsertMode::Overwrite)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.work().await.unwrap();
    let count: i32 = sqlx::query_scalar("SELECT post_count FROM tags WHERE id = 10")
        .fetch_one(tx.as_mut())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(count, 123);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn tag_id_reports_missing_as_zero() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    assert_eq!(store::tag_id(&mut tx, "does_not_exist").await.unwrap(), 0);
    tx.commit().await.unwrap();
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn synthetic_tags_move_the_lowest_id_down() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &tag(42, "existing"), InsertMode::Weak)
        .await
        .unwrap();
    store::insert_tag(&mut tx, &Tag::synthetic(-1, "fabricated"), InsertMode::Weak)
        .await
        .unwrap();
    assert_eq!(store::lowest_tag_in(&mut tx).await.unwrap(), -1);
    tx.commit().await.unwrap();

    assert_eq!(db.lowest_tag().await.unwrap(), -1);
    assert_eq!(db.latest_tag().await.unwrap(), 42);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn synthetic_timestamps_store_as_null() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &Tag::synthetic(-1, "fabricated"), InsertMode::Weak)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.work().await.unwrap();
    let created: Option<Timestamp> = sqlx::query_scalar("SELECT created_at FROM tags WHERE id = -1")
        .fetch_one(tx.as_mut())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(created, None);
    // And the sentinel survives the round trip back into the domain type.
    assert_eq!(created.unwrap_or_else(timestamp::zero), timestamp::zero());
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn post_insert_covers_the_dependency_chain() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &tag(1, "1girl"), InsertMode::Weak)
        .await
        .unwrap();
    store::insert_tag(&mut tx, &tag(2, "hat"), InsertMode::Weak)
        .await
        .unwrap();

    store::insert_media_asset(&mut tx, &asset(500)).await.unwrap();
    store::insert_post(&mut tx, &post(9000, vec![1, 2], 500))
        .await
        .unwrap();

    store::increment_post_count(&mut tx, 1, 1).await.unwrap();
    store::increment_post_count(&mut tx, 2, 1).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(db.latest_post().await.unwrap(), 9000);
    assert_eq!(db.latest_media_asset().await.unwrap(), 500);

    let mut tx = db.work().await.unwrap();
    let tags: Vec<i32> = sqlx::query_scalar("SELECT unnest(tags) FROM posts WHERE id = 9000")
        .fetch_all(tx.as_mut())
        .await
        .unwrap();
    let source: Option<String> = sqlx::query_scalar("SELECT source FROM posts WHERE id = 9000")
        .fetch_one(tx.as_mut())
        .await
        .unwrap();
    let variants: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM media_asset_variants WHERE asset_id = 500")
            .fetch_one(tx.as_mut())
            .await
            .unwrap();
    let count: i32 = sqlx::query_scalar("SELECT post_count FROM tags WHERE id = 1")
        .fetch_one(tx.as_mut())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(tags, vec![1, 2]);
    assert_eq!(source, None);
    assert_eq!(variants, 1);
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn post_versions_track_their_post() {
    let mut db = fresh_store().await;

    let mut tx = db.work().await.unwrap();
    store::insert_tag(&mut tx, &tag(1, "1girl"), InsertMode::Weak)
        .await
        .unwrap();
    store::insert_media_asset(&mut tx, &asset(500)).await.unwrap();
    store::insert_post(&mut tx, &post(9000, vec![1], 500))
        .await
        .unwrap();

    store::insert_post_version(
        &mut tx,
        &PostVersion {
            id: 71,
            post_id: 9000,
            updater_id: 1,
            updated_at: ts(1_700_000_300),
            version: 1,
            added_tags: vec![1],
            removed_tags: vec![],
            new_rating: Some(Rating::G),
            new_parent: None,
            new_source: Some(String::new()),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(db.latest_post_version().await.unwrap(), 71);
    assert_eq!(db.latest_post_version_for(9000).await.unwrap(), 71);
    assert_eq!(db.latest_post_version_for(9001).await.unwrap(), 0);

    let mut tx = db.work().await.unwrap();
    // Empty removed_tags and empty new_source both land as NULL.
    let removed: Option<Vec<i32>> =
        sqlx::query_scalar("SELECT removed_tags FROM post_versions WHERE id = 71")
            .fetch_one(tx.as_mut())
            .await
            .unwrap();
    let source: Option<String> =
        sqlx::query_scalar("SELECT new_source FROM post_versions WHERE id = 71")
            .fetch_one(tx.as_mut())
            .await
            .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(removed, None);
    assert_eq!(source, None);
}

#[tokio::test]
#[ignore = "needs a live PostgreSQL"]
async fn duplicate_tag_names_are_a_consistency_error() {
    let mut db = fresh_store().await;

    // The UNIQUE constraint normally prevents this; bypass it to prove the
    // gateway still refuses to pick one arbitrarily.
    let mut tx = db.work().await.unwrap();
    sqlx::query("ALTER TABLE tags DROP CONSTRAINT tags_name_key")
        .execute(tx.as_mut())
        .await
        .unwrap();
    store::insert_tag(&mut tx, &tag(1, "twin"), InsertMode::Weak)
        .await
        .unwrap();
    store::insert_tag(&mut tx, &tag(2, "twin"), InsertMode::Weak)
        .await
        .unwrap();

    let res = store::tag_id(&mut tx, "twin").await;
    assert!(matches!(res, Err(StoreError::DataConsistency(_))));
}
