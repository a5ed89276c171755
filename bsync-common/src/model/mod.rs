//! Mirrored catalog entities and their wire models.

use serde::{Deserialize, Serialize};

use crate::timestamp::{self, Timestamp};

pub mod category;
pub mod extension;
pub mod level;
pub mod rating;
pub mod response;
pub mod status;

pub use category::{PoolCategory, TagCategory};
pub use extension::FileType;
pub use level::UserLevel;
pub use rating::Rating;
pub use response::PostResponse;
pub use status::AssetStatus;

/// A tag record, identical in shape to the server's `tags` payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub post_count: i32,
    pub category: TagCategory,
    pub is_deprecated: bool,
    #[serde(with = "timestamp::serde_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::serde_format")]
    pub updated_at: Timestamp,
}

impl Tag {
    /// A placeholder for a name the server has no record of. `id` must be
    /// below every tag id already stored.
    #[must_use]
    pub fn synthetic(id: i32, name: impl Into<String>) -> Self {
        debug_assert!(id < 0);

        Self {
            id,
            name: name.into(),
            post_count: 0,
            category: TagCategory::General,
            is_deprecated: false,
            created_at: timestamp::zero(),
            updated_at: timestamp::zero(),
        }
    }
}

/// A mirrored post row. `tags` holds resolved tag ids in the order the
/// server emitted the names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i32,
    pub uploader_id: i32,
    pub approver_id: Option<i32>,
    pub tags: Vec<i32>,
    pub rating: Rating,
    pub parent: Option<i32>,
    pub source: String,
    pub media_asset: i32,
    pub fav_count: i32,
    pub has_children: bool,
    pub up_score: i32,
    pub down_score: i32,
    pub is_pending: bool,
    pub is_flagged: bool,
    pub is_deleted: bool,
    pub is_banned: bool,
    pub pixiv_id: Option<i32>,
    pub bit_flags: i32,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_comment: Option<Timestamp>,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_bump: Option<Timestamp>,
    #[serde(default, with = "timestamp::serde_format_opt")]
    pub last_note: Option<Timestamp>,
    #[serde(with = "timestamp::serde_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::serde_format")]
    pub updated_at: Timestamp,
}

/// One pre-rendered size of a media asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaAssetVariant {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub width: i32,
    pub height: i32,
    pub file_ext: FileType,
}

/// A media asset record, shaped like the server's nested `media_asset`
/// payload. Fields the server elides for non-public assets fall back to
/// their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub id: i32,
    #[serde(default)]
    pub md5: String,
    pub file_ext: FileType,
    pub file_size: i64,
    pub image_width: i32,
    pub image_height: i32,
    #[serde(default)]
    pub duration: Option<f32>,
    #[serde(default)]
    pub pixel_hash: String,
    pub status: AssetStatus,
    #[serde(default)]
    pub file_key: String,
    pub is_public: bool,
    #[serde(default)]
    pub variants: Vec<MediaAssetVariant>,
    #[serde(with = "timestamp::serde_format")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::serde_format")]
    pub updated_at: Timestamp,
}

/// One entry of a post's edit history, with tag names resolved to ids.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostVersion {
    pub id: i32,
    pub post_id: i32,
    pub updater_id: i32,
    #[serde(with = "timestamp::serde_format")]
    pub updated_at: Timestamp,
    pub version: i32,
    pub added_tags: Vec<i32>,
    pub removed_tags: Vec<i32>,
    pub new_rating: Option<Rating>,
    pub new_parent: Option<i32>,
    pub new_source: Option<String>,
}
