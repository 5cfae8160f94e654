//! Product listing sort keys.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned for an unrecognized `orderby` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid orderby parameter: {0:?}")]
pub struct SortError(pub String);

/// Ordering applied to a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    /// Store id order. Ids are random UUIDs, so this reads as a shuffled but
    /// stable order that pages cleanly.
    Random,
    /// Cheapest first.
    Price,
    /// Newest first.
    Created,
    /// Most favourited first.
    Favourites,
}

impl ProductSort {
    /// All accepted sort keys, in wire form.
    pub const ALL: [Self; 4] = [Self::Random, Self::Price, Self::Created, Self::Favourites];

    /// The wire form of this key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Price => "price",
            Self::Created => "created",
            Self::Favourites => "favourites",
        }
    }
}

impl FromStr for ProductSort {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| SortError(s.to_owned()))
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_key() {
        for sort in ProductSort::ALL {
            assert_eq!(sort.as_str().parse::<ProductSort>().unwrap(), sort);
        }
    }

    #[test]
    fn test_rejects_unknown_and_case_variants() {
        assert!("bogus".parse::<ProductSort>().is_err());
        assert!("Price".parse::<ProductSort>().is_err());
        assert!("".parse::<ProductSort>().is_err());
    }
}
