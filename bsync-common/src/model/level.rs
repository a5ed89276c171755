//! Account levels, fixed integer codes on the wire.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("invalid user level code: {0}")]
pub struct InvalidUserLevel(pub u8);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum UserLevel {
    Anonymous = 0,
    Restricted = 10,
    Member = 20,
    Gold = 30,
    Platinum = 31,
    Builder = 32,
    Contributor = 35,
    Approver = 37,
    Moderator = 40,
    Admin = 50,
    Owner = 60,
}

impl UserLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Restricted => "restricted",
            Self::Member => "member",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Builder => "builder",
            Self::Contributor => "contributor",
            Self::Approver => "approver",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl TryFrom<u8> for UserLevel {
    type Error = InvalidUserLevel;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Anonymous),
            10 => Ok(Self::Restricted),
            20 => Ok(Self::Member),
            30 => Ok(Self::Gold),
            31 => Ok(Self::Platinum),
            32 => Ok(Self::Builder),
            35 => Ok(Self::Contributor),
            37 => Ok(Self::Approver),
            40 => Ok(Self::Moderator),
            50 => Ok(Self::Admin),
            60 => Ok(Self::Owner),
            other => Err(InvalidUserLevel(other)),
        }
    }
}

impl From<UserLevel> for u8 {
    fn from(level: UserLevel) -> Self {
        level as Self
    }
}

impl Display for UserLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
