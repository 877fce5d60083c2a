use serde::{Deserialize, Serialize};

pub const MAX_LIMIT: i64 = 100;

/// Query parameters accepted by every windowed listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    pub fn window(&self) -> Option<Window> {
        Window::from_params(self.limit, self.offset)
    }
}

/// A limit/offset slice of an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

impl Window {
    /// Listings are only windowed when the client asks for a `limit`.
    pub fn from_params(limit: Option<i64>, offset: Option<i64>) -> Option<Self> {
        let limit = limit?;
        Some(Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        })
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(0))
            .collect()
    }
}

/// Rows returned by the store together with the size of the unwindowed set.
#[derive(Debug)]
pub struct Listed<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Listed<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listed<U> {
        Listed {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Either the whole collection or one page of it, depending on whether the
/// request carried a `limit`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(Page<T>),
}

impl<T> Listing<T> {
    /// `path` is the request path; `extra` holds the non-window query
    /// parameters that must survive into the `next`/`previous` links.
    pub fn build(
        listed: Listed<T>,
        window: Option<Window>,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Self {
        let Some(window) = window else {
            return Listing::All(listed.items);
        };

        let Window { limit, offset } = window;
        let next = offset
            .checked_add(limit)
            .filter(|end| *end < listed.total)
            .map(|end| page_link(path, extra, limit, Some(end)));
        let previous = (offset > 0).then(|| {
            let start = offset.saturating_sub(limit);
            page_link(path, extra, limit, (start > 0).then_some(start))
        });

        Listing::Page(Page {
            count: listed.total,
            next,
            previous,
            results: listed.items,
        })
    }
}

fn page_link(path: &str, extra: &[(&str, &str)], limit: i64, offset: Option<i64>) -> String {
    let mut query = vec![format!("limit={}", limit)];
    if let Some(offset) = offset {
        query.push(format!("offset={}", offset));
    }
    for (key, value) in extra {
        query.push(format!("{}={}", key, urlencoding::encode(value)));
    }
    format!("{}?{}", path, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(total: i64) -> Listed<i64> {
        Listed {
            items: Vec::new(),
            total,
        }
    }

    #[test]
    fn no_limit_means_no_window() {
        assert_eq!(Window::from_params(None, Some(10)), None);
    }

    #[test]
    fn limit_is_clamped_and_offset_floored() {
        let w = Window::from_params(Some(1000), Some(-5)).unwrap();
        assert_eq!(w, Window { limit: MAX_LIMIT, offset: 0 });
        let w = Window::from_params(Some(0), None).unwrap();
        assert_eq!(w.limit, 1);
    }

    #[test]
    fn apply_slices_items() {
        let w = Window { limit: 2, offset: 1 };
        assert_eq!(w.apply(vec![1, 2, 3, 4]), vec![2, 3]);
    }

    #[test]
    fn links_for_middle_page() {
        let window = Window { limit: 2, offset: 2 };
        let Listing::Page(page) = Listing::build(listed(5), Some(window), "/v1/posts/", &[])
        else {
            panic!("expected a page");
        };
        assert_eq!(page.count, 5);
        assert_eq!(page.next.as_deref(), Some("/v1/posts/?limit=2&offset=4"));
        assert_eq!(page.previous.as_deref(), Some("/v1/posts/?limit=2"));
    }

    #[test]
    fn last_page_has_no_next_and_keeps_search() {
        let window = Window { limit: 2, offset: 4 };
        let Listing::Page(page) =
            Listing::build(listed(5), Some(window), "/v1/follow/", &[("search", "a b")])
        else {
            panic!("expected a page");
        };
        assert_eq!(page.next, None);
        assert_eq!(
            page.previous.as_deref(),
            Some("/v1/follow/?limit=2&offset=2&search=a%20b")
        );
    }

    #[test]
    fn offset_at_the_top_of_the_range_does_not_overflow() {
        let window = Window::from_params(Some(10), Some(i64::MAX)).unwrap();
        let Listing::Page(page) = Listing::build(listed(1), Some(window), "/v1/posts/", &[])
        else {
            panic!("expected a page");
        };
        assert_eq!(page.next, None);
        assert_eq!(
            page.previous,
            Some(format!("/v1/posts/?limit=10&offset={}", i64::MAX - 10))
        );
        assert!(page.results.is_empty());
    }

    #[test]
    fn unwindowed_listing_is_a_plain_list() {
        let listing = Listing::build(
            Listed {
                items: vec![1, 2],
                total: 2,
            },
            None,
            "/v1/posts/",
            &[],
        );
        assert!(matches!(listing, Listing::All(items) if items == vec![1, 2]));
    }
}
