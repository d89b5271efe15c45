use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};
use url::Url;

use crate::ratelimit::GovernorKey;

/// The search endpoints a query can be sent to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Regular web pages
    Web,
    /// Images
    Images,
    /// Videos
    Videos,
    /// News articles
    News,
}

impl SearchKind {
    /// The governor key throttling this endpoint, e.g. `brave-api-images`
    #[must_use]
    pub fn governor_key(self) -> GovernorKey {
        GovernorKey::from(format!("brave-api-{self}"))
    }

    /// Address of this endpoint below the API base
    pub(crate) fn endpoint(self, base: &Url) -> Result<Url, url::ParseError> {
        base.join(&format!("res/v1/{self}/search"))
    }
}
