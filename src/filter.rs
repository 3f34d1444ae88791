//! Item inclusion rules
//!
//! After a record is fetched the batch loop asks an [`ItemFilter`] whether to
//! keep it. Filters must be deterministic and free of side effects so repeated
//! runs over the same data give the same result.
//!
//! Use [`evaluate`] rather than calling [`ItemFilter::keep`] directly: a filter
//! that panics is treated as having excluded the item.

use crate::config::FilterConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Attribute holding the video resolution label (e.g. "720p")
pub const RESOLUTION_FIELD: &str = "ratio";

/// Attribute holding the like count
pub const ENGAGEMENT_FIELD: &str = "digg_count";

/// A fetched record, opaque to the core beyond its attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Item with the given attributes
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Raw attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String attribute, if present and a string
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Unsigned integer attribute, if present and a non-negative integer
    pub fn u64_attr(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    /// All attributes
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for Item {
    type Error = Value;

    /// Only JSON objects are items; anything else is handed back
    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Decides whether a fetched item is kept
pub trait ItemFilter: Send + Sync {
    /// `true` keeps the item, `false` drops it
    fn keep(&self, item: &Item) -> bool;
}

/// Keeps everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ItemFilter for AcceptAll {
    fn keep(&self, _item: &Item) -> bool {
        true
    }
}

/// Adapts a closure into an [`ItemFilter`]
pub struct FnFilter<F>(pub F);

impl<F> ItemFilter for FnFilter<F>
where
    F: Fn(&Item) -> bool + Send + Sync,
{
    fn keep(&self, item: &Item) -> bool {
        (self.0)(item)
    }
}

/// Filter built from [`FilterConfig`] rules
///
/// Drops items whose resolution is excluded or whose like count is below the
/// minimum. Items lacking a like count are treated as having zero likes.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    excluded_resolutions: Vec<String>,
    min_engagement: Option<u64>,
}

impl RuleFilter {
    /// Filter applying the rules in `config`
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            excluded_resolutions: config.excluded_resolutions.clone(),
            min_engagement: config.min_engagement,
        }
    }
}

impl ItemFilter for RuleFilter {
    fn keep(&self, item: &Item) -> bool {
        if let Some(ratio) = item.str_attr(RESOLUTION_FIELD) {
            if self.excluded_resolutions.iter().any(|r| r == ratio) {
                return false;
            }
        }
        match self.min_engagement {
            Some(min) => item.u64_attr(ENGAGEMENT_FIELD).unwrap_or(0) >= min,
            None => true,
        }
    }
}

/// Run `filter` on `item`, excluding the item if the filter panics
pub fn evaluate(filter: &dyn ItemFilter, item: &Item) -> bool {
    match catch_unwind(AssertUnwindSafe(|| filter.keep(item))) {
        Ok(keep) => keep,
        Err(_) => {
            tracing::warn!("Item filter panicked, excluding item");
            false
        }
    }
}
