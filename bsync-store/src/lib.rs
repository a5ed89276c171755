#![deny(clippy::all)]
//! Typed access to the mirrored catalog tables.
//!
//! A [`Store`] wraps exactly one database connection and is therefore not
//! shareable between tasks; every ingestion task owns its own instance.
//! Transaction-scoped operations are free functions over the open
//! [`StoreTx`], so a caller can hold a transaction across many statements
//! and commit once.

use bsync_common::model::{MediaAsset, Post, PostVersion, Tag};
use bsync_common::timestamp::{self, Timestamp};
use log::debug;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection, Postgres, Transaction};

pub mod error;

pub use error::StoreError;

/// Conflict handling for tag inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Discard on conflict.
    Weak,
    /// Overwrite all non-key columns on conflict.
    Overwrite,
}

pub type StoreTx<'a> = Transaction<'a, Postgres>;

pub struct Store {
    conn: PgConnection,
}

impl Store {
    /// Open a connection using the libpq environment (`PGHOST`, `PGUSER`,
    /// `PGPASSWORD`, `PGDATABASE`, ...).
    pub async fn connect() -> Result<Self, StoreError> {
        let options = PgConnectOptions::new();
        debug!("connecting to database {}", options.get_database().unwrap_or("<default>"));

        let conn = PgConnection::connect_with(&options).await?;

        Ok(Self { conn })
    }

    /// Begin a read-write transaction. The caller commits or drops to
    /// abort.
    pub async fn work(&mut self) -> Result<StoreTx<'_>, StoreError> {
        Ok(self.conn.begin().await?)
    }

    /// Highest stored post id, 0 when the table is empty.
    pub async fn latest_post(&mut self) -> Result<i32, StoreError> {
        self.table_max_id("posts").await
    }

    /// Highest stored tag id, 0 when the table is empty.
    pub async fn latest_tag(&mut self) -> Result<i32, StoreError> {
        self.table_max_id("tags").await
    }

    /// Highest stored media asset id, 0 when the table is empty.
    pub async fn latest_media_asset(&mut self) -> Result<i32, StoreError> {
        self.table_max_id("media_assets").await
    }

    /// Highest stored post version id, 0 when the table is empty.
    pub async fn latest_post_version(&mut self) -> Result<i32, StoreError> {
        self.table_max_id("post_versions").await
    }

    /// Highest stored version id for one post, 0 when none are stored.
    pub async fn latest_post_version_for(&mut self, post_id: i32) -> Result<i32, StoreError> {
        let mut tx = self.work().await?;

        let id = sqlx::query_scalar(
            "SELECT COALESCE(MAX(id), 0) FROM post_versions WHERE post_id = $1",
        )
        .bind(post_id)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(id)
    }

    /// Lowest stored tag id in its own transaction; see [`lowest_tag_in`].
    pub async fn lowest_tag(&mut self) -> Result<i32, StoreError> {
        let mut tx = self.work().await?;
        let id = lowest_tag_in(&mut tx).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn table_max_id(&mut self, table: &str) -> Result<i32, StoreError> {
        let mut tx = self.work().await?;

        let id = sqlx::query_scalar(&format!("SELECT COALESCE(MAX(id), 0) FROM {table}"))
            .fetch_one(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(id)
    }
}

/// Lowest stored tag id, 0 when the table is empty. Tag ids below zero are
/// local fabrications for names the server does not know.
pub async fn lowest_tag_in(tx: &mut StoreTx<'_>) -> Result<i32, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT COALESCE(MIN(id), 0) FROM tags")
            .fetch_one(tx.as_mut())
            .await?,
    )
}

/// Id of the tag called `name`, 0 when it is not stored.
pub async fn tag_id(tx: &mut StoreTx<'_>, name: &str) -> Result<i32, StoreError> {
    let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM tags WHERE name = $1")
        .bind(name)
        .fetch_all(tx.as_mut())
        .await?;

    match ids[..] {
        [] => Ok(0),
        [id] => Ok(id),
        _ => Err(StoreError::DataConsistency(format!(
            "{} tags exist with name {name}",
            ids.len()
        ))),
    }
}

const INSERT_TAG_WEAK: &str = "\
    INSERT INTO tags (id, name, post_count, category, is_deprecated, created_at, updated_at) \
    VALUES ($1, $2, $3, $4::tag_category, $5, $6, $7) \
    ON CONFLICT DO NOTHING";

const INSERT_TAG_OVERWRITE: &str = "\
    INSERT INTO tags (id, name, post_count, category, is_deprecated, created_at, updated_at) \
    VALUES ($1, $2, $3, $4::tag_category, $5, $6, $7) \
    ON CONFLICT (id) DO UPDATE SET \
        (name, post_count, category, is_deprecated, created_at, updated_at) = \
        (EXCLUDED.name, EXCLUDED.post_count, EXCLUDED.category, \
         EXCLUDED.is_deprecated, EXCLUDED.created_at, EXCLUDED.updated_at)";

pub async fn insert_tag(
    tx: &mut StoreTx<'_>,
    tag: &Tag,
    mode: InsertMode,
) -> Result<i32, StoreError> {
    let statement = match mode {
        InsertMode::Weak => INSERT_TAG_WEAK,
        InsertMode::Overwrite => INSERT_TAG_OVERWRITE,
    };

    sqlx::query(statement)
        .bind(tag.id)
        .bind(&tag.name)
        .bind(tag.post_count)
        .bind(tag.category.as_str())
        .bind(tag.is_deprecated)
        .bind(ts_or_null(tag.created_at))
        .bind(ts_or_null(tag.updated_at))
        .execute(tx.as_mut())
        .await?;

    Ok(tag.id)
}

const INSERT_POST: &str = "\
    INSERT INTO posts (id, uploader_id, approver_id, tags, rating, parent, source, media_asset, \
                       fav_count, has_children, up_score, down_score, is_pending, is_flagged, \
                       is_deleted, is_banned, pixiv_id, bit_flags, last_comment, last_bump, \
                       last_note, created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5::post_rating, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
            $17, $18, $19, $20, $21, $22, $23)";

pub async fn insert_post(tx: &mut StoreTx<'_>, post: &Post) -> Result<i32, StoreError> {
    sqlx::query(INSERT_POST)
        .bind(post.id)
        .bind(post.uploader_id)
        .bind(post.approver_id)
        .bind(&post.tags)
        .bind(post.rating.as_str())
        .bind(post.parent)
        .bind(str_or_null(&post.source))
        .bind(post.media_asset)
        .bind(post.fav_count)
        .bind(post.has_children)
        .bind(post.up_score)
        .bind(post.down_score)
        .bind(post.is_pending)
        .bind(post.is_flagged)
        .bind(post.is_deleted)
        .bind(post.is_banned)
        .bind(post.pixiv_id)
        .bind(post.bit_flags)
        .bind(post.last_comment)
        .bind(post.last_bump)
        .bind(post.last_note)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(tx.as_mut())
        .await?;

    Ok(post.id)
}

const INSERT_MEDIA_ASSET: &str = "\
    INSERT INTO media_assets (id, md5, file_ext, file_size, image_width, image_height, duration, \
                              pixel_hash, status, file_key, is_public, created_at, updated_at) \
    VALUES ($1, $2, $3::file_type, $4, $5, $6, $7, $8, $9::asset_status, $10, $11, $12, $13)";

const INSERT_MEDIA_ASSET_VARIANT: &str = "\
    INSERT INTO media_asset_variants (asset_id, type, width, height, file_ext) \
    VALUES ($1, $2, $3, $4, $5::file_type)";

/// Insert the asset row, then one row per variant.
pub async fn insert_media_asset(
    tx: &mut StoreTx<'_>,
    asset: &MediaAsset,
) -> Result<i32, StoreError> {
    sqlx::query(INSERT_MEDIA_ASSET)
        .bind(asset.id)
        .bind(&asset.md5)
        .bind(asset.file_ext.as_str())
        .bind(asset.file_size)
        .bind(asset.image_width)
        .bind(asset.image_height)
        .bind(asset.duration)
        .bind(&asset.pixel_hash)
        .bind(asset.status.as_str())
        .bind(&asset.file_key)
        .bind(asset.is_public)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(tx.as_mut())
        .await?;

    for variant in &asset.variants {
        sqlx::query(INSERT_MEDIA_ASSET_VARIANT)
            .bind(asset.id)
            .bind(&variant.variant_type)
            .bind(variant.width)
            .bind(variant.height)
            .bind(variant.file_ext.as_str())
            .execute(tx.as_mut())
            .await?;
    }

    Ok(asset.id)
}

const INSERT_POST_VERSION: &str = "\
    INSERT INTO post_versions (id, post_id, updater_id, updated_at, version, added_tags, \
                               removed_tags, new_rating, new_parent, new_source) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8::post_rating, $9, $10)";

pub async fn insert_post_version(
    tx: &mut StoreTx<'_>,
    version: &PostVersion,
) -> Result<i32, StoreError> {
    sqlx::query(INSERT_POST_VERSION)
        .bind(version.id)
        .bind(version.post_id)
        .bind(version.updater_id)
        .bind(version.updated_at)
        .bind(version.version)
        .bind(array_or_null(&version.added_tags))
        .bind(array_or_null(&version.removed_tags))
        .bind(version.new_rating.map(|rating| rating.as_str()))
        .bind(version.new_parent)
        .bind(version.new_source.as_deref().and_then(str_or_null))
        .execute(tx.as_mut())
        .await?;

    Ok(version.id)
}

pub async fn increment_post_count(
    tx: &mut StoreTx<'_>,
    tag_id: i32,
    count: i32,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE tags SET post_count = post_count + $2 WHERE id = $1")
        .bind(tag_id)
        .bind(count)
        .execute(tx.as_mut())
        .await?;

    Ok(())
}

fn ts_or_null(ts: Timestamp) -> Option<Timestamp> {
    (ts != timestamp::zero()).then_some(ts)
}

fn str_or_null(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

fn array_or_null(vals: &[i32]) -> Option<&[i32]> {
    (!vals.is_empty()).then_some(vals)
}
