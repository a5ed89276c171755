//! Post stream sync.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use bsync_api::Api;
use bsync_common::model::{Post, PostResponse};
use bsync_common::page::PageSelector;
use bsync_common::POST_LIMIT;
use bsync_store::{self as store, InsertMode, Store};
use log::{debug, info, trace};
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::resolver::fetch_and_insert_tags;
use crate::task::PerpetualTask;

/// Attributes requested from the post index; everything else the server
/// would send is dead weight on the wire.
const POST_FIELDS: &str = "id,uploader_id,approver_id,tag_string,rating,parent_id,source,\
    media_asset,fav_count,has_children,up_score,down_score,is_pending,is_flagged,is_deleted,\
    is_banned,pixiv_id,bit_flags,last_commented_at,last_comment_bumped_at,last_noted_at,\
    created_at,updated_at";

/// Walks the post stream forward from the highest stored id, mirroring each
/// page's posts, their media assets, and the tag vocabulary they reference.
pub struct FetchPosts {
    api: Api,
    db: Store,
}

impl FetchPosts {
    #[must_use]
    pub fn new(api: Api, db: Store) -> Self {
        Self { api, db }
    }

    async fn sorted_posts(&self, start_at: i32) -> Result<Vec<PostResponse>, TaskError> {
        let mut posts: Vec<PostResponse> = self
            .api
            .fetch(
                "posts",
                json!({
                    "limit": POST_LIMIT,
                    "page": PageSelector::after(start_at.max(0) as u32),
                    "only": POST_FIELDS,
                }),
            )
            .await?;

        posts.sort_unstable_by_key(|post| post.id);

        Ok(posts)
    }
}

#[async_trait]
impl PerpetualTask for FetchPosts {
    async fn execute(&mut self, stop: &CancellationToken) -> Result<(), TaskError> {
        let mut latest = self.db.latest_post().await?;

        info!("latest post: post #{latest}");

        while !stop.is_cancelled() {
            let begin = Instant::now();

            let posts = self.sorted_posts(latest).await?;
            if posts.is_empty() {
                // Caught up
                break;
            }

            debug!(
                "posts: [{}, {}] ({})",
                posts[0].id,
                posts[posts.len() - 1].id,
                posts.len()
            );

            let names = tag_names(&posts);
            let tag_ids =
                fetch_and_insert_tags(&self.api, &mut self.db, &names, InsertMode::Overwrite)
                    .await?;

            trace!("resolved {} unique tags", tag_ids.len());

            let mut tag_counts: AHashMap<i32, i32> =
                tag_ids.values().map(|&id| (id, 0)).collect();

            let mut tx = self.db.work().await?;

            for src in &posts {
                let post = map_post(src, &tag_ids);

                for &tag in &post.tags {
                    *tag_counts.entry(tag).or_insert(0) += 1;
                }

                store::insert_media_asset(&mut tx, &src.media_asset).await?;
                store::insert_post(&mut tx, &post).await?;
            }

            for (&tag, &count) in &tag_counts {
                store::increment_post_count(&mut tx, tag, count).await?;
            }

            tx.commit().await.map_err(bsync_store::StoreError::from)?;

            latest = self.db.latest_post().await?;

            info!(
                "inserted {} new posts, up to {} ({:?})",
                posts.len(),
                latest,
                begin.elapsed()
            );
        }

        Ok(())
    }
}

/// The whole tag vocabulary one page of posts references.
fn tag_names(posts: &[PostResponse]) -> AHashSet<String> {
    let mut names = AHashSet::new();

    for post in posts {
        names.extend(post.tag_string.split_whitespace().map(str::to_string));
    }

    names
}

fn map_post(src: &PostResponse, tag_ids: &AHashMap<String, i32>) -> Post {
    Post {
        id: src.id,
        uploader_id: src.uploader_id,
        approver_id: src.approver_id,
        tags: src
            .tag_string
            .split_whitespace()
            .map(|tag| tag_ids[tag])
            .collect(),
        rating: src.rating,
        parent: src.parent_id,
        source: src.source.clone(),
        media_asset: src.media_asset.id,
        fav_count: src.fav_count,
        has_children: src.has_children,
        up_score: src.up_score,
        down_score: src.down_score,
        is_pending: src.is_pending,
        is_flagged: src.is_flagged,
        is_deleted: src.is_deleted,
        is_banned: src.is_banned,
        pixiv_id: src.pixiv_id,
        bit_flags: src.bit_flags,
        last_comment: src.last_commented_at,
        last_bump: src.last_comment_bumped_at,
        last_note: src.last_noted_at,
        created_at: src.created_at,
        updated_at: src.updated_at,
    }
}
