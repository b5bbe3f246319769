//! Recipes (fixed recommendation algorithms) offered by the service.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Recipe ARN prefix shared by every built-in recipe.
const RECIPE_ARN_PREFIX: &str = "arn:aws:personalize:::recipe/";

/// A built-in recipe used by the training stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
)]
pub enum Recipe {
    /// Item-to-item similarity.
    #[strum(to_string = "SIMS")]
    Sims,
    /// Per-user recommendations.
    #[strum(to_string = "User-Personalization")]
    UserPersonalization,
    /// Re-ranks a candidate list for a user.
    #[strum(to_string = "Personalized-Ranking")]
    PersonalizedRanking,
}

impl Recipe {
    /// Iterates over all recipes in training order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Returns the short name used in resource names and state keys.
    #[must_use]
    pub const fn as_slug(self) -> &'static str {
        match self {
            Self::Sims => "sims",
            Self::UserPersonalization => "user-personalization",
            Self::PersonalizedRanking => "personalized-ranking",
        }
    }

    /// Returns the recipe ARN passed to solution creation.
    #[must_use]
    pub fn arn(self) -> String {
        format!("{RECIPE_ARN_PREFIX}aws-{}", self.as_slug())
    }
}

impl FromStr for Recipe {
    type Err = anyhow::Error;

    /// Accepts the slug (`sims`), the `aws-` name or the full recipe ARN.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let lowered = s.to_lowercase();
        let name = lowered.strip_prefix(RECIPE_ARN_PREFIX).unwrap_or(&lowered);
        let name = name.strip_prefix("aws-").unwrap_or(name);

        Self::all()
            .find(|recipe| recipe.as_slug() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown recipe: {s}"))
    }
}
