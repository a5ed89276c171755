//! Tag catalog sync.

use async_trait::async_trait;
use bsync_api::Api;
use bsync_common::page::PageSelector;
use bsync_common::PAGE_LIMIT;
use bsync_store::{self as store, InsertMode, Store};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::task::PerpetualTask;

/// Walks the tag index forward from the highest stored id, one page per
/// round trip, until the server has nothing newer.
pub struct FetchTags {
    api: Api,
    db: Store,
}

impl FetchTags {
    #[must_use]
    pub fn new(api: Api, db: Store) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl PerpetualTask for FetchTags {
    async fn execute(&mut self, stop: &CancellationToken) -> Result<(), TaskError> {
        let mut latest = self.db.latest_tag().await?;

        info!("fetching from tag #{latest}");

        while !stop.is_cancelled() {
            let mut page = self
                .api
                .tags(PageSelector::after(latest.max(0) as u32), PAGE_LIMIT)
                .await?;

            if page.is_empty() {
                // Caught up
                break;
            }

            // Pages are ordered by descending id
            latest = page[0].id;

            for tag in &mut page {
                // Recounted by the post sync
                tag.post_count = 0;
            }

            let mut tx = self.db.work().await?;
            for tag in &page {
                store::insert_tag(&mut tx, tag, InsertMode::Weak).await?;
            }
            tx.commit().await.map_err(bsync_store::StoreError::from)?;

            debug!("latest tag: {latest} ({})", page[0].name);
        }

        Ok(())
    }
}
