//! # Pagination Cursor
//!
//! A [`Pagination`] holds one page of query results together with the request
//! that produced it. Changing the page re-runs that request and refreshes the
//! same cursor, so every clone of the handle sees the new contents.
//!
//! ```rust,ignore
//! let page = widgets.query(None, QueryOptions::paginated()).await?.into_page().unwrap();
//! println!("{} of {} pages", page.page(), page.pages());
//! page.change_page_to(2).await?;
//! for widget in &page { /* ... */ }
//! ```

use crate::client::{FetchOptions, PotionClient};
use crate::error::PotionError;
use crate::value::PotionValue;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

struct PageState {
    options: FetchOptions,
    items: Vec<PotionValue>,
    total: usize,
    position: usize,
}

struct PaginationInner {
    client: PotionClient,
    uri: String,
    state: Mutex<PageState>,
}

/// A page of results that can move to other pages in place.
#[derive(Clone)]
pub struct Pagination {
    inner: Arc<PaginationInner>,
}

impl Pagination {
    pub(crate) fn new(
        client: PotionClient,
        uri: String,
        options: FetchOptions,
        items: Vec<PotionValue>,
        total: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PaginationInner {
                client,
                uri,
                state: Mutex::new(PageState {
                    options,
                    items,
                    total,
                    position: 0,
                }),
            }),
        }
    }

    /// The full request URI.
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    fn search_u32(&self, key: &str) -> Option<u32> {
        let state = self.inner.state.lock();
        state
            .options
            .search
            .as_ref()
            .and_then(|s| s.get(key))
            .and_then(PotionValue::as_i64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// The current page number, starting at 1.
    pub fn page(&self) -> u32 {
        self.search_u32("page").unwrap_or(1)
    }

    pub fn per_page(&self) -> u32 {
        self.search_u32("perPage")
            .filter(|n| *n > 0)
            .unwrap_or(self.inner.client.config().default_per_page)
    }

    /// Total items across all pages.
    pub fn total(&self) -> usize {
        self.inner.state.lock().total
    }

    /// `ceil(total / per_page)`.
    pub fn pages(&self) -> usize {
        self.total().div_ceil(self.per_page().max(1) as usize)
    }

    /// Items on the current page.
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }

    /// A snapshot of the current page.
    pub fn items(&self) -> Vec<PotionValue> {
        self.inner.state.lock().items.clone()
    }

    /// Iterates over a snapshot of the current page. Each call starts over.
    pub fn iter(&self) -> std::vec::IntoIter<PotionValue> {
        self.items().into_iter()
    }

    /// Advances the cursor. Returns `None` once past the last item and
    /// rewinds, so the next call starts from the first item again.
    pub fn next_item(&self) -> Option<PotionValue> {
        let mut state = self.inner.state.lock();
        match state.items.get(state.position).cloned() {
            Some(item) => {
                state.position += 1;
                Some(item)
            }
            None => {
                state.position = 0;
                None
            }
        }
    }

    /// True when both handles refer to the same cursor.
    pub fn ptr_eq(&self, other: &Pagination) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replaces the current items and total in one step.
    pub fn update(&self, items: Vec<PotionValue>, total: usize) {
        let mut state = self.inner.state.lock();
        state.items = items;
        state.total = total;
        state.position = 0;
    }

    /// Fetches page `page` of the same query into this cursor.
    ///
    /// On failure the cursor keeps its previous items but already points at
    /// the requested page number.
    #[instrument(skip(self), fields(uri = %self.inner.uri))]
    pub async fn change_page_to(&self, page: u32) -> Result<(), PotionError> {
        let options = {
            let mut state = self.inner.state.lock();
            state
                .options
                .search
                .get_or_insert_with(Default::default)
                .insert("page".to_string(), PotionValue::from(u64::from(page)));
            state.options.clone()
        };
        debug!(page, "Changing page");
        self.inner
            .client
            .fetch(&self.inner.uri, options, Some(self))
            .await?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Pagination {
    type Item = PotionValue;
    type IntoIter = std::vec::IntoIter<PotionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pagination")
            .field("uri", &self.inner.uri)
            .field("page", &self.page())
            .field("per_page", &self.per_page())
            .field("total", &self.total())
            .field("len", &self.len())
            .finish()
    }
}
