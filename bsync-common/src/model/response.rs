//! Wire shape of the `only=`-projected post index response.
//!
//! This mirrors exactly the attributes the ingestion requests; mapping to
//! the domain types happens at the ingestion site, once tag names have been
//! resolved to ids.

use serde::{Deserialize, Serialize};

use crate::model::{MediaAsset, Rating};
use crate::timestamp::{self, Timestamp};

/// One record of a projected `posts` page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostResponse {
    pub id: i32,
    pub uploader_id: i32,
    #[serde(default)]
    pub approver_id: Option<i32>,
    pub tag_string: String,
    pub rating: Rating,
    #[serde(default)]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub source: String,
    pub media_asset: MediaAsset,
    pub fav_count: i32,
    pub has_children: bool,
    pub up_score: i32,
    pub down_score: i32,
    pub is_pending: bool,
    pub is_flagged: bool,
    pub is_deleted: bool,
    pub is_banned: bool,
    #[serde(default)]
    pub pixiv_id: Option<i32>,
    pub bit_flags: i32,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_commented_at: Option<Timestamp>,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_comment_bumped_at: Option<Timestamp>,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_noted_at: Option<Timestamp>,
    #[serde(with = "timestamp::serde_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::serde_format")]
    pub updated_at: Timestamp,
}
