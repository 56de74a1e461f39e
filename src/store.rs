//! In-process concurrent document store.
//!
//! Documents live in per-entity `DashMap`s (per-document atomicity, no
//! cross-document transactions). The unique invariants the API relies on,
//! (author, slug) for posts and email for users, are enforced here by
//! mutex-guarded index maps so that check-and-insert is atomic; violations
//! surface as [`StoreError`] and map to `Conflict` at the API boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, Comment, Post, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("A post with this slug already exists for this author")]
    DuplicateSlug,
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("A category with this name already exists")]
    DuplicateCategory,
}

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Comment>,
    categories: DashMap<Uuid, Category>,
    /// lowercased email -> user id
    email_index: Mutex<HashMap<String, Uuid>>,
    /// (author, lowercased slug) -> post id
    slug_index: Mutex<HashMap<(Uuid, String), Uuid>>,
    /// lowercased category name -> category id
    category_names: Mutex<HashMap<String, Uuid>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a poisoned index lock means a panic mid-update; propagating the inner
    // guard is still sound for these insert-or-remove maps
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // --- users ---

    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut emails = lock(&self.inner.email_index);
        let key = user.email.to_lowercase();
        if emails.contains_key(&key) {
            return Err(StoreError::DuplicateEmail);
        }
        emails.insert(key, user.id);
        self.inner.users.insert(user.id, user);
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Option<User> {
        self.inner.users.get(&id).map(|u| u.clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let id = *lock(&self.inner.email_index).get(&email.to_lowercase())?;
        self.get_user(id)
    }

    /// Applies `f` to the user document under the map's entry lock.
    pub fn update_user<F>(&self, id: Uuid, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut entry = self.inner.users.get_mut(&id)?;
        f(entry.value_mut());
        Some(entry.clone())
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.users.iter().map(|u| u.clone()).collect()
    }

    // --- posts ---

    /// Inserts a post, atomically claiming its (author, slug) pair.
    pub fn insert_post(&self, post: Post) -> Result<(), StoreError> {
        let mut slugs = lock(&self.inner.slug_index);
        let key = (post.author, post.slug.to_lowercase());
        if slugs.contains_key(&key) {
            return Err(StoreError::DuplicateSlug);
        }
        slugs.insert(key, post.id);
        self.inner.posts.insert(post.id, post);
        Ok(())
    }

    pub fn get_post(&self, id: Uuid) -> Option<Post> {
        self.inner.posts.get(&id).map(|p| p.clone())
    }

    /// Replaces a post document, migrating the slug claim if it changed.
    pub fn replace_post(&self, post: Post) -> Result<(), StoreError> {
        let mut slugs = lock(&self.inner.slug_index);
        if let Some(existing) = self.inner.posts.get(&post.id) {
            let old_key = (existing.author, existing.slug.to_lowercase());
            let new_key = (post.author, post.slug.to_lowercase());
            if old_key != new_key {
                if let Some(&holder) = slugs.get(&new_key) {
                    if holder != post.id {
                        return Err(StoreError::DuplicateSlug);
                    }
                }
                slugs.remove(&old_key);
                slugs.insert(new_key, post.id);
            }
        }
        drop(slugs);
        self.inner.posts.insert(post.id, post);
        Ok(())
    }

    /// Mutates a post document in place under the entry lock. The closure
    /// must not touch the slug; slug changes go through [`Store::replace_post`].
    pub fn update_post<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut Post) -> R,
    {
        let mut entry = self.inner.posts.get_mut(&id)?;
        Some(f(entry.value_mut()))
    }

    pub fn remove_post(&self, id: Uuid) -> Option<Post> {
        let (_, post) = self.inner.posts.remove(&id)?;
        lock(&self.inner.slug_index).remove(&(post.author, post.slug.to_lowercase()));
        Some(post)
    }

    pub fn posts(&self) -> Vec<Post> {
        self.inner.posts.iter().map(|p| p.clone()).collect()
    }

    pub fn posts_by_author(&self, author: Uuid) -> Vec<Post> {
        self.inner
            .posts
            .iter()
            .filter(|p| p.author == author)
            .map(|p| p.clone())
            .collect()
    }

    // --- comments ---

    pub fn insert_comment(&self, comment: Comment) {
        self.inner.comments.insert(comment.id, comment);
    }

    pub fn get_comment(&self, id: Uuid) -> Option<Comment> {
        self.inner.comments.get(&id).map(|c| c.clone())
    }

    pub fn update_comment<F>(&self, id: Uuid, f: F) -> Option<Comment>
    where
        F: FnOnce(&mut Comment),
    {
        let mut entry = self.inner.comments.get_mut(&id)?;
        f(entry.value_mut());
        Some(entry.clone())
    }

    pub fn remove_comment(&self, id: Uuid) -> Option<Comment> {
        self.inner.comments.remove(&id).map(|(_, c)| c)
    }

    /// Snapshot of comments matching `predicate`.
    pub fn comments_where<F>(&self, predicate: F) -> Vec<Comment>
    where
        F: Fn(&Comment) -> bool,
    {
        self.inner
            .comments
            .iter()
            .filter(|c| predicate(c))
            .map(|c| c.clone())
            .collect()
    }

    /// Removes all comments matching `predicate`, returning how many went.
    pub fn remove_comments_where<F>(&self, predicate: F) -> u64
    where
        F: Fn(&Comment) -> bool,
    {
        let doomed: Vec<Uuid> = self
            .inner
            .comments
            .iter()
            .filter(|c| predicate(c))
            .map(|c| c.id)
            .collect();
        let mut removed = 0;
        for id in doomed {
            if self.inner.comments.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    // --- categories ---

    pub fn insert_category(&self, category: Category) -> Result<(), StoreError> {
        let mut names = lock(&self.inner.category_names);
        let key = category.name.to_lowercase();
        if names.contains_key(&key) {
            return Err(StoreError::DuplicateCategory);
        }
        names.insert(key, category.id);
        self.inner.categories.insert(category.id, category);
        Ok(())
    }

    pub fn get_category(&self, id: Uuid) -> Option<Category> {
        self.inner.categories.get(&id).map(|c| c.clone())
    }

    pub fn replace_category(&self, category: Category) -> Result<(), StoreError> {
        let mut names = lock(&self.inner.category_names);
        if let Some(existing) = self.inner.categories.get(&category.id) {
            let old_key = existing.name.to_lowercase();
            let new_key = category.name.to_lowercase();
            if old_key != new_key {
                if names.contains_key(&new_key) {
                    return Err(StoreError::DuplicateCategory);
                }
                names.remove(&old_key);
                names.insert(new_key, category.id);
            }
        }
        drop(names);
        self.inner.categories.insert(category.id, category);
        Ok(())
    }

    pub fn remove_category(&self, id: Uuid) -> Option<Category> {
        let (_, category) = self.inner.categories.remove(&id)?;
        lock(&self.inner.category_names).remove(&category.name.to_lowercase());
        Some(category)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.inner.categories.iter().map(|c| c.clone()).collect()
    }
}
