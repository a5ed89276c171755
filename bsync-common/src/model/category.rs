//! Tag and pool categories.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid tag category code: {0}")]
pub struct InvalidTagCategory(pub u8);

/// Kind of a tag, an integer code on the wire. Code 2 has never been
/// assigned by the server.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum TagCategory {
    #[default]
    General = 0,
    Artist = 1,
    Copyright = 3,
    Character = 4,
    Meta = 5,
}

impl TagCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Artist => "artist",
            Self::Copyright => "copyright",
            Self::Character => "character",
            Self::Meta => "meta",
        }
    }
}

impl TryFrom<u8> for TagCategory {
    type Error = InvalidTagCategory;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::General),
            1 => Ok(Self::Artist),
            3 => Ok(Self::Copyright),
            4 => Ok(Self::Character),
            5 => Ok(Self::Meta),
            other => Err(InvalidTagCategory(other)),
        }
    }
}

impl From<TagCategory> for u8 {
    fn from(category: TagCategory) -> Self {
        category as Self
    }
}

impl Display for TagCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a pool, serialized by name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PoolCategory {
    Series,
    Collection,
}

impl PoolCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Collection => "collection",
        }
    }
}
