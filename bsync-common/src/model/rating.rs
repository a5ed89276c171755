//! Content rating of a post, serialized as its single-letter form.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// General.
    G,
    /// Sensitive.
    S,
    /// Questionable.
    Q,
    /// Explicit.
    E,
}

impl Rating {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::G => "g",
            Self::S => "s",
            Self::Q => "q",
            Self::E => "e",
        }
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
