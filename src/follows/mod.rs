use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    config::settings::SearchMode,
    pagination::{ListParams, Window},
    posts::not_blank,
};

pub mod handler;
pub mod validate;

/// A follow joined with both usernames.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub user: String,
    pub following_id: i64,
    pub following: String,
}

/// A follow that passed the validation chain and may be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewFollow {
    pub user_id: i64,
    pub following_id: i64,
}

/// Body of `POST /v1/follow/`. Any `user` field sent by the client is dropped.
#[derive(Debug, Deserialize, Validate)]
pub struct FollowPayload {
    #[validate(custom(function = "not_blank"))]
    pub following: String,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub user: String,
    pub following: String,
}

impl From<Follow> for FollowResponse {
    fn from(f: Follow) -> Self {
        FollowResponse {
            user: f.user,
            following: f.following,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowFilter {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FollowFilter {
    pub fn window(&self) -> Option<Window> {
        ListParams {
            limit: self.limit,
            offset: self.offset,
        }
        .window()
    }

    pub fn search(&self, mode: SearchMode) -> Option<FollowSearch> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        Some(FollowSearch {
            term: term.to_string(),
            mode,
        })
    }
}

/// Case-insensitive match on the followed user's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSearch {
    pub term: String,
    pub mode: SearchMode,
}

impl FollowSearch {
    pub fn matches(&self, username: &str) -> bool {
        let username = username.to_lowercase();
        let term = self.term.to_lowercase();
        match self.mode {
            SearchMode::Contains => username.contains(&term),
            SearchMode::Prefix => username.starts_with(&term),
        }
    }

    /// `ILIKE` pattern with the wildcard characters of the term escaped.
    pub fn like_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.term.len() + 2);
        for c in self.term.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        match self.mode {
            SearchMode::Contains => format!("%{}%", escaped),
            SearchMode::Prefix => format!("{}%", escaped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(term: &str, mode: SearchMode) -> FollowSearch {
        FollowSearch {
            term: term.to_string(),
            mode,
        }
    }

    #[test]
    fn contains_matches_anywhere_ignoring_case() {
        let s = search("OB", SearchMode::Contains);
        assert!(s.matches("bob"));
        assert!(s.matches("Oberon"));
        assert!(!s.matches("alice"));
    }

    #[test]
    fn prefix_matches_start_only() {
        let s = search("bo", SearchMode::Prefix);
        assert!(s.matches("Bob"));
        assert!(!s.matches("rambo"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(search("a_b%", SearchMode::Contains).like_pattern(), "%a\\_b\\%%");
        assert_eq!(search("x", SearchMode::Prefix).like_pattern(), "x%");
    }

    #[test]
    fn blank_search_is_no_search() {
        let filter = FollowFilter {
            search: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search(SearchMode::Contains), None);
    }
}
