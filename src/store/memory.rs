use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    auth::User,
    comments::{Comment, NewComment},
    follows::{Follow, FollowSearch, NewFollow},
    groups::{Group, NewGroup},
    pagination::{Listed, Window},
    posts::{NewPost, Post, PostChanges},
    store::{Store, StoreError, StoreResult},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    last_id: LastIds,
}

#[derive(Default)]
struct LastIds {
    user: i64,
    group: i64,
    post: i64,
    comment: i64,
    follow: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn username(&self, id: i64) -> StoreResult<String> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .ok_or_else(|| StoreError::MissingReference("users".to_string()))
    }
}

/// Keeps every table in process behind one lock, so each operation is
/// atomic with respect to the others. Rows are appended in id order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn windowed<T: Clone>(rows: Vec<T>, window: Option<Window>) -> Listed<T> {
    let total = rows.len() as i64;
    let items = match window {
        Some(window) => window.apply(rows),
        None => rows,
    };
    Listed { items, total }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        let mut t = self.tables.write();
        if t.users.iter().any(|u| u.username == username) {
            return Err(StoreError::UniqueViolation("users".to_string()));
        }
        let user = User {
            id: next(&mut t.last_id.user),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            date_joined: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let mut t = self.tables.write();
        if t.groups.iter().any(|g| g.slug == group.slug) {
            return Err(StoreError::UniqueViolation("post_groups".to_string()));
        }
        let group = Group {
            id: next(&mut t.last_id.group),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        t.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.tables.read().groups.clone())
    }

    async fn find_group(&self, id: i64) -> StoreResult<Option<Group>> {
        Ok(self.tables.read().groups.iter().find(|g| g.id == id).cloned())
    }

    async fn list_posts(&self, window: Option<Window>) -> StoreResult<Listed<Post>> {
        Ok(windowed(self.tables.read().posts.clone(), window))
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut t = self.tables.write();
        let author = t.username(post.author_id)?;
        if let Some(group_id) = post.group_id {
            if !t.groups.iter().any(|g| g.id == group_id) {
                return Err(StoreError::MissingReference("post_groups".to_string()));
            }
        }
        let post = Post {
            id: next(&mut t.last_id.post),
            author_id: post.author_id,
            author,
            text: post.text,
            pub_date: Utc::now(),
            image: post.image,
            group_id: post.group_id,
        };
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut t = self.tables.write();
        if let Some(Some(group_id)) = changes.group_id {
            if !t.groups.iter().any(|g| g.id == group_id) {
                return Err(StoreError::MissingReference("post_groups".to_string()));
            }
        }
        let Some(post) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            post.text = text;
        }
        if let Some(image) = changes.image {
            post.image = image;
        }
        if let Some(group_id) = changes.group_id {
            post.group_id = group_id;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write();
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        let removed = t.posts.len() != before;
        if removed {
            t.comments.retain(|c| c.post_id != id);
        }
        Ok(removed)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn find_comment(&self, post_id: i64, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self
            .tables
            .read()
            .comments
            .iter()
            .find(|c| c.id == id && c.post_id == post_id)
            .cloned())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut t = self.tables.write();
        if !t.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(StoreError::MissingReference("posts".to_string()));
        }
        let author = t.username(comment.author_id)?;
        let comment = Comment {
            id: next(&mut t.last_id.comment),
            post_id: comment.post_id,
            author_id: comment.author_id,
            author,
            text: comment.text,
            created: Utc::now(),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: String) -> StoreResult<Option<Comment>> {
        let mut t = self.tables.write();
        Ok(t.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.text = text;
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write();
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id);
        Ok(t.comments.len() != before)
    }

    async fn list_follows(
        &self,
        user_id: i64,
        search: Option<&FollowSearch>,
        window: Option<Window>,
    ) -> StoreResult<Listed<Follow>> {
        let rows: Vec<Follow> = self
            .tables
            .read()
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter(|f| search.map_or(true, |s| s.matches(&f.following)))
            .cloned()
            .collect();
        Ok(windowed(rows, window))
    }

    async fn follow_exists(&self, user_id: i64, following_id: i64) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.following_id == following_id))
    }

    async fn create_follow(&self, follow: NewFollow) -> StoreResult<Follow> {
        let mut t = self.tables.write();
        if follow.user_id == follow.following_id {
            return Err(StoreError::CheckViolation("no_self_follow".to_string()));
        }
        if t
            .follows
            .iter()
            .any(|f| f.user_id == follow.user_id && f.following_id == follow.following_id)
        {
            return Err(StoreError::UniqueViolation("follows".to_string()));
        }
        let user = t.username(follow.user_id)?;
        let following = t.username(follow.following_id)?;
        let follow = Follow {
            id: next(&mut t.last_id.follow),
            user_id: follow.user_id,
            user,
            following_id: follow.following_id,
            following,
        };
        t.follows.push(follow.clone());
        Ok(follow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn two_users(store: &MemoryStore) -> (User, User) {
        let a = store.create_user("ann", "h").await.unwrap();
        let b = store.create_user("bob", "h").await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        store.create_user("ann", "h").await.unwrap();
        let err = store.create_user("ann", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn duplicate_follow_is_a_unique_violation() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;
        let pair = NewFollow {
            user_id: a.id,
            following_id: b.id,
        };
        let follow = store.create_follow(pair).await.unwrap();
        assert_eq!((follow.user.as_str(), follow.following.as_str()), ("ann", "bob"));

        let err = store.create_follow(pair).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert!(store.follow_exists(a.id, b.id).await.unwrap());
        assert!(!store.follow_exists(b.id, a.id).await.unwrap());
    }

    #[tokio::test]
    async fn self_follow_violates_check() {
        let store = MemoryStore::new();
        let (a, _) = two_users(&store).await;
        let err = store
            .create_follow(NewFollow {
                user_id: a.id,
                following_id: a.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CheckViolation(_)));
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let store = MemoryStore::new();
        let (a, b) = two_users(&store).await;
        let keep = store
            .create_post(NewPost {
                author_id: a.id,
                text: "keep".into(),
                image: None,
                group_id: None,
            })
            .await
            .unwrap();
        let doomed = store
            .create_post(NewPost {
                author_id: a.id,
                text: "doomed".into(),
                image: None,
                group_id: None,
            })
            .await
            .unwrap();
        for post_id in [keep.id, doomed.id] {
            store
                .create_comment(NewComment {
                    post_id,
                    author_id: b.id,
                    text: "hi".into(),
                })
                .await
                .unwrap();
        }

        assert!(store.delete_post(doomed.id).await.unwrap());
        assert!(store.list_comments(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.list_comments(keep.id).await.unwrap().len(), 1);
        assert!(!store.delete_post(doomed.id).await.unwrap());
    }

    #[tokio::test]
    async fn comment_lookup_is_scoped_to_its_post() {
        let store = MemoryStore::new();
        let (a, _) = two_users(&store).await;
        let mut ids = Vec::new();
        for text in ["one", "two"] {
            let post = store
                .create_post(NewPost {
                    author_id: a.id,
                    text: text.into(),
                    image: None,
                    group_id: None,
                })
                .await
                .unwrap();
            ids.push(post.id);
        }
        let comment = store
            .create_comment(NewComment {
                post_id: ids[0],
                author_id: a.id,
                text: "c".into(),
            })
            .await
            .unwrap();

        assert!(store.find_comment(ids[0], comment.id).await.unwrap().is_some());
        assert!(store.find_comment(ids[1], comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_post_applies_only_given_fields() {
        let store = MemoryStore::new();
        let (a, _) = two_users(&store).await;
        let group = store
            .create_group(NewGroup::new("Cats", ""))
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                author_id: a.id,
                text: "hello".into(),
                image: Some("a.png".into()),
                group_id: Some(group.id),
            })
            .await
            .unwrap();

        let updated = store
            .update_post(
                post.id,
                PostChanges {
                    group_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.text, "hello");
        assert_eq!(updated.image.as_deref(), Some("a.png"));
        assert_eq!(updated.group_id, None);
    }

    #[tokio::test]
    async fn follow_listing_filters_and_windows() {
        let store = MemoryStore::new();
        let (a, _) = two_users(&store).await;
        for name in ["bobby", "carol", "robert"] {
            let u = store.create_user(name, "h").await.unwrap();
            store
                .create_follow(NewFollow {
                    user_id: a.id,
                    following_id: u.id,
                })
                .await
                .unwrap();
        }
        let search = FollowSearch {
            term: "OB".into(),
            mode: crate::config::settings::SearchMode::Contains,
        };

        let listed = store.list_follows(a.id, Some(&search), None).await.unwrap();
        let names: Vec<_> = listed.items.iter().map(|f| f.following.as_str()).collect();
        assert_eq!(names, vec!["bobby", "robert"]);

        let window = Window { limit: 1, offset: 1 };
        let listed = store.list_follows(a.id, None, Some(window)).await.unwrap();
        assert_eq!(listed.total, 3);
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].following, "carol");
    }
}
