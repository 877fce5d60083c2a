use serde::{Deserialize, Serialize};
use slug::slugify;

use crate::store::{Store, StoreResult};

pub mod handler;

/// Groups are curated by operators; the HTTP surface only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    pub fn new(title: &str, description: &str) -> Self {
        NewGroup {
            title: title.trim().to_string(),
            slug: slugify(title),
            description: description.trim().to_string(),
        }
    }
}

/// Backs the `add-group` command.
pub async fn add_group(store: &dyn Store, title: &str, description: &str) -> StoreResult<Group> {
    store.create_group(NewGroup::new(title, description)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_derived_from_title() {
        let group = NewGroup::new("  Cats & Dogs ", "pets");
        assert_eq!(group.title, "Cats & Dogs");
        assert_eq!(group.slug, "cats-dogs");
    }
}
