//! Page cursors for the server's paginated indexes.

use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Position of a page relative to its `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagePos {
    Absolute,
    Before,
    After,
}

/// A cursor in the `page` query parameter: `"<n>"` for absolute page `n`,
/// `"b<id>"` for records before `id`, `"a<id>"` for records after `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSelector {
    pub pos: PagePos,
    pub value: u32,
}

impl PageSelector {
    #[must_use]
    pub const fn at(value: u32) -> Self {
        Self {
            pos: PagePos::Absolute,
            value,
        }
    }

    #[must_use]
    pub const fn before(value: u32) -> Self {
        Self {
            pos: PagePos::Before,
            value,
        }
    }

    #[must_use]
    pub const fn after(value: u32) -> Self {
        Self {
            pos: PagePos::After,
            value,
        }
    }
}

impl Display for PageSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.pos {
            PagePos::Absolute => {}
            PagePos::Before => write!(f, "b")?,
            PagePos::After => write!(f, "a")?,
        }

        write!(f, "{}", self.value)
    }
}

#[derive(Error, Debug)]
pub enum ParsePageError {
    #[error("empty page selector")]
    Empty,

    #[error("invalid page value")]
    InvalidValue(#[from] ParseIntError),
}

impl FromStr for PageSelector {
    type Err = ParsePageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pos, digits) = match s.strip_prefix('b') {
            Some(rest) => (PagePos::Before, rest),
            None => match s.strip_prefix('a') {
                Some(rest) => (PagePos::After, rest),
                None => (PagePos::Absolute, s),
            },
        };

        if digits.is_empty() {
            return Err(ParsePageError::Empty);
        }

        Ok(Self {
            pos,
            value: digits.parse()?,
        })
    }
}

impl Serialize for PageSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
