//! Catalog browsing: sorting, quick filters and tab counts

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::Listing;
use crate::store::ComponentStore;

/// Page size of the catalog.
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// Window for the `last_released` filter.
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Downloads,
    Likes,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    #[default]
    All,
    LastReleased,
    MostDownloaded,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Downloads => "downloads",
            SortOption::Likes => "likes",
            SortOption::Date => "date",
        }
    }
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 3] = [
        QuickFilter::All,
        QuickFilter::LastReleased,
        QuickFilter::MostDownloaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuickFilter::All => "all",
            QuickFilter::LastReleased => "last_released",
            QuickFilter::MostDownloaded => "most_downloaded",
        }
    }

    /// Whether a listing belongs under this tab at time `now`.
    pub fn matches(&self, listing: &Listing, now: DateTime<Utc>) -> bool {
        match self {
            QuickFilter::All => true,
            QuickFilter::LastReleased => {
                listing.demo.created_at >= now - Duration::days(RECENT_WINDOW_DAYS)
            }
            QuickFilter::MostDownloaded => listing.component.downloads_count > 0,
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "downloads" => Ok(SortOption::Downloads),
            "likes" => Ok(SortOption::Likes),
            "date" => Ok(SortOption::Date),
            other => Err(format!("unknown sort option '{}'", other)),
        }
    }
}

impl FromStr for QuickFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(QuickFilter::All),
            "last_released" => Ok(QuickFilter::LastReleased),
            "most_downloaded" => Ok(QuickFilter::MostDownloaded),
            other => Err(format!("unknown quick filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub quick_filter: QuickFilter,
    pub sort: SortOption,
    pub offset: usize,
    pub limit: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            quick_filter: QuickFilter::default(),
            sort: SortOption::default(),
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Row of the per-filter count procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCount {
    pub filter_type: QuickFilter,
    pub count: u64,
}

/// Lists public demos for one catalog page.
pub async fn browse(store: &dyn ComponentStore, query: &CatalogQuery) -> Result<Vec<Listing>> {
    let listings = store.list_demos(query).await?;
    debug!(
        filter = %query.quick_filter,
        sort = %query.sort,
        count = listings.len(),
        "Loaded catalog page"
    );
    Ok(listings)
}

/// Count per tab. Missing tabs and store failures read as zero.
pub async fn tab_counts(store: &dyn ComponentStore) -> BTreeMap<QuickFilter, u64> {
    let mut counts: BTreeMap<QuickFilter, u64> =
        QuickFilter::ALL.iter().map(|filter| (*filter, 0)).collect();

    match store.filter_counts().await {
        Ok(rows) => {
            for row in rows {
                counts.insert(row.filter_type, row.count);
            }
        }
        Err(e) => warn!("Failed to load tab counts: {}", e),
    }

    counts
}

/// Applies a query to an in-memory set of listings: public only, filtered,
/// sorted descending by the chosen key, then paged.
pub fn select_listings(
    listings: impl IntoIterator<Item = Listing>,
    query: &CatalogQuery,
    now: DateTime<Utc>,
) -> Vec<Listing> {
    let mut selected: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| listing.component.is_public)
        .filter(|listing| query.quick_filter.matches(listing, now))
        .collect();

    // ties fall back to demo id so pages are stable
    match query.sort {
        SortOption::Downloads => {
            selected.sort_by_key(|l| (Reverse(l.component.downloads_count), l.demo.id))
        }
        SortOption::Likes => {
            selected.sort_by_key(|l| (Reverse(l.component.likes_count), l.demo.id))
        }
        SortOption::Date => selected.sort_by_key(|l| (Reverse(l.demo.created_at), l.demo.id)),
    }

    selected
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect()
}

/// Counts public listings under every tab.
pub fn count_listings<'a>(
    listings: impl IntoIterator<Item = &'a Listing>,
    now: DateTime<Utc>,
) -> Vec<FilterCount> {
    let public: Vec<&Listing> = listings
        .into_iter()
        .filter(|listing| listing.component.is_public)
        .collect();

    QuickFilter::ALL
        .iter()
        .map(|filter| FilterCount {
            filter_type: *filter,
            count: public.iter().filter(|l| filter.matches(l, now)).count() as u64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::listing;

    fn sample(now: DateTime<Utc>) -> Vec<Listing> {
        let mut popular = listing("alice", "button");
        popular.demo.id = 1;
        popular.component.downloads_count = 120;
        popular.component.likes_count = 3;
        popular.demo.created_at = now - Duration::days(30);

        let mut liked = listing("bob", "card");
        liked.demo.id = 2;
        liked.component.downloads_count = 0;
        liked.component.likes_count = 50;
        liked.demo.created_at = now - Duration::days(2);

        let mut hidden = listing("carol", "secret");
        hidden.demo.id = 3;
        hidden.component.is_public = false;
        hidden.component.downloads_count = 999;

        vec![popular, liked, hidden]
    }

    fn slugs(listings: &[Listing]) -> Vec<&str> {
        listings
            .iter()
            .map(|l| l.component.component_slug.as_str())
            .collect()
    }

    #[test]
    fn test_sort_options() {
        let now = Utc::now();
        let by = |sort| {
            let query = CatalogQuery {
                sort,
                ..Default::default()
            };
            select_listings(sample(now), &query, now)
        };

        assert_eq!(slugs(&by(SortOption::Downloads)), vec!["button", "card"]);
        assert_eq!(slugs(&by(SortOption::Likes)), vec!["card", "button"]);
        assert_eq!(slugs(&by(SortOption::Date)), vec!["card", "button"]);
    }

    #[test]
    fn test_quick_filters_and_paging() {
        let now = Utc::now();
        let query = CatalogQuery {
            quick_filter: QuickFilter::LastReleased,
            ..Default::default()
        };
        assert_eq!(slugs(&select_listings(sample(now), &query, now)), vec!["card"]);

        let query = CatalogQuery {
            quick_filter: QuickFilter::MostDownloaded,
            ..Default::default()
        };
        assert_eq!(slugs(&select_listings(sample(now), &query, now)), vec!["button"]);

        let query = CatalogQuery {
            offset: 1,
            limit: 1,
            ..Default::default()
        };
        assert_eq!(slugs(&select_listings(sample(now), &query, now)), vec!["card"]);
    }

    #[test]
    fn test_count_listings() {
        let now = Utc::now();
        let listings = sample(now);
        let counts = count_listings(&listings, now);
        assert_eq!(
            counts,
            vec![
                FilterCount { filter_type: QuickFilter::All, count: 2 },
                FilterCount { filter_type: QuickFilter::LastReleased, count: 1 },
                FilterCount { filter_type: QuickFilter::MostDownloaded, count: 1 },
            ]
        );
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("likes".parse::<SortOption>(), Ok(SortOption::Likes));
        assert_eq!(
            "last_released".parse::<QuickFilter>(),
            Ok(QuickFilter::LastReleased)
        );
        assert!("popular".parse::<SortOption>().is_err());
        assert_eq!(
            serde_json::to_value(QuickFilter::MostDownloaded).unwrap(),
            serde_json::json!("most_downloaded")
        );
    }

    #[tokio::test]
    async fn test_tab_counts_zero_filled() {
        let store = crate::store::MemoryStore::new();
        let counts = tab_counts(&store).await;
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|count| *count == 0));
    }
}
