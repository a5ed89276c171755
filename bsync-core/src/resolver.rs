//! Tag name resolution.

use ahash::{AHashMap, AHashSet};
use bsync_api::Api;
use bsync_common::model::Tag;
use bsync_common::PAGE_LIMIT;
use bsync_store::{self as store, InsertMode, Store};
use futures::future::try_join_all;
use log::debug;
use serde_json::json;

use crate::error::TaskError;

/// Resolve every name in `names` to a tag id, fetching names the store does
/// not know from the server and fabricating negative ids for names the
/// server does not know either.
///
/// Everything happens in one transaction: on return the store contains a
/// row for every input name and the result maps each one to a non-zero id.
///
/// Real tags are fetched and inserted before any synthetic id is allocated;
/// a name the store is missing may well exist upstream, and burning a
/// negative id on it would waste the id space below zero.
pub async fn fetch_and_insert_tags(
    api: &Api,
    db: &mut Store,
    names: &AHashSet<String>,
    mode: InsertMode,
) -> Result<AHashMap<String, i32>, TaskError> {
    let mut tag_ids = AHashMap::with_capacity(names.len());

    let mut tx = db.work().await?;

    // Which ids do we already know?
    let mut to_fetch = Vec::new();
    for name in names {
        let id = store::tag_id(&mut tx, name).await?;
        if id != 0 {
            tag_ids.insert(name.clone(), id);
        } else {
            to_fetch.push(name.as_str());
        }
    }

    if !to_fetch.is_empty() {
        // Queue one request per chunk of names
        let requests = to_fetch.chunks(PAGE_LIMIT).map(|chunk| {
            api.fetch::<Vec<Tag>>(
                "tags",
                json!({
                    "limit": PAGE_LIMIT,
                    "search": { "name": chunk },
                }),
            )
        });

        for page in try_join_all(requests).await? {
            for mut tag in page {
                // Counted locally instead
                tag.post_count = 0;

                tag_ids.insert(tag.name.clone(), tag.id);
                store::insert_tag(&mut tx, &tag, mode).await?;
            }
        }

        // Whatever the server did not return does not exist upstream. Only
        // the fetched names are rechecked: a name that already resolved to
        // a fabricated id in step one keeps it.
        let missing: Vec<&str> = to_fetch
            .iter()
            .copied()
            .filter(|name| tag_ids.get(*name).map_or(true, |&id| id <= 0))
            .collect();

        let mut next_id = store::lowest_tag_in(&mut tx).await?.min(0) - 1;
        for name in &missing {
            let tag = Tag::synthetic(next_id, *name);
            next_id -= 1;

            tag_ids.insert(tag.name.clone(), tag.id);
            store::insert_tag(&mut tx, &tag, mode).await?;
        }

        debug!(
            "fetched {} new tags out of {}, created {} new ones",
            to_fetch.len() - missing.len(),
            names.len(),
            missing.len()
        );
    }

    tx.commit().await.map_err(bsync_store::StoreError::from)?;

    Ok(tag_ids)
}
