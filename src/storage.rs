use crate::error::StorageError;
use crate::models::{SavedArticle, User};
use serde::de::DeserializeOwned;
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{Db, Transactional};
use std::path::Path;
use uuid::Uuid;

/// Sled-backed document store for users and saved articles.
///
/// Trees:
/// - `users`: user id -> JSON `User`
/// - `users_by_email`: normalized email -> user id (uniqueness index)
/// - `articles`: article id -> JSON `SavedArticle`
/// - `articles_by_owner`: owner id ++ article id -> () (secondary index)
///
/// Writes touching more than one tree run inside a sled transaction, so a
/// reader sees either the whole record or nothing.
#[derive(Clone)] // sled handles are cheap to clone and thread-safe
pub struct Storage {
    db: Db,
    users: sled::Tree,
    users_by_email: sled::Tree,
    articles: sled::Tree,
    articles_by_owner: sled::Tree,
}

impl Storage {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is removed when dropped.
    pub fn open_temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let users = db.open_tree("users")?;
        let users_by_email = db.open_tree("users_by_email")?;
        let articles = db.open_tree("articles")?;
        let articles_by_owner = db.open_tree("articles_by_owner")?;
        Ok(Self {
            db,
            users,
            users_by_email,
            articles,
            articles_by_owner,
        })
    }

    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db.flush_async().await?;
        Ok(())
    }

    // --- Credential store ---

    /// Insert a new user. Fails with `DuplicateEmail` if the email is taken.
    pub fn create_user(&self, user: &User) -> Result<(), StorageError> {
        let email_key = email_key(&user.email);
        let id_key = user.id.as_bytes().to_vec();
        let bytes = serde_json::to_vec(user)?;

        (&self.users, &self.users_by_email).transaction(|(users, emails)| {
            if emails.get(&email_key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(StorageError::DuplicateEmail));
            }
            users.insert(id_key.clone(), bytes.clone())?;
            emails.insert(email_key.clone(), id_key.clone())?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        match self.users.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let Some(id_bytes) = self.users_by_email.get(email_key(email))? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&id_bytes).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        self.get_user(id)
    }

    // --- Article store ---

    pub fn insert_article(&self, article: &SavedArticle) -> Result<(), StorageError> {
        let id_key = article.id.as_bytes().to_vec();
        let index_key = owner_key(article.owner_id, article.id);
        let bytes = serde_json::to_vec(article)?;

        (&self.articles, &self.articles_by_owner).transaction(|(articles, index)| {
            articles.insert(id_key.clone(), bytes.clone())?;
            index.insert(index_key.clone(), Vec::<u8>::new())?;
            Ok::<_, ConflictableTransactionError<StorageError>>(())
        })?;
        Ok(())
    }

    /// Fetch an article only if it belongs to `owner`.
    pub fn get_article_owned(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> Result<Option<SavedArticle>, StorageError> {
        if !self.articles_by_owner.contains_key(owner_key(owner, id))? {
            return Ok(None);
        }
        match self.articles.get(id.as_bytes())? {
            Some(bytes) => {
                let article: SavedArticle = serde_json::from_slice(&bytes)?;
                Ok((article.owner_id == owner).then_some(article))
            }
            None => Ok(None),
        }
    }

    /// All articles owned by `owner`, in index order.
    pub fn list_articles(&self, owner: Uuid) -> Result<Vec<SavedArticle>, StorageError> {
        let mut out = Vec::new();
        for item in self.articles_by_owner.scan_prefix(owner.as_bytes()) {
            let (key, _) = item?;
            let id = Uuid::from_slice(&key[16..]).map_err(|e| StorageError::Corrupt(e.to_string()))?;
            // Skip entries removed between the index scan and the lookup.
            if let Some(bytes) = self.articles.get(id.as_bytes())? {
                let article: SavedArticle = serde_json::from_slice(&bytes)?;
                if article.owner_id == owner {
                    out.push(article);
                }
            }
        }
        Ok(out)
    }

    /// Apply `update` to an owned article and persist it atomically.
    pub fn update_article_owned<F>(
        &self,
        owner: Uuid,
        id: Uuid,
        update: F,
    ) -> Result<SavedArticle, StorageError>
    where
        F: Fn(&mut SavedArticle),
    {
        let id_key = id.as_bytes().to_vec();
        let index_key = owner_key(owner, id);

        let updated = (&self.articles, &self.articles_by_owner).transaction(|(articles, index)| {
            if index.get(&index_key)?.is_none() {
                return Err(ConflictableTransactionError::Abort(StorageError::NotFound));
            }
            let mut article: SavedArticle = load(articles, &id_key)?;
            if article.owner_id != owner {
                return Err(ConflictableTransactionError::Abort(StorageError::NotFound));
            }
            update(&mut article);
            let bytes = serde_json::to_vec(&article)
                .map_err(|e| ConflictableTransactionError::Abort(StorageError::Serde(e)))?;
            articles.insert(id_key.clone(), bytes)?;
            Ok(article)
        })?;
        Ok(updated)
    }

    /// Remove an article scoped by `(owner, id)`. A foreign or unknown id is `NotFound`.
    pub fn delete_article_owned(&self, owner: Uuid, id: Uuid) -> Result<(), StorageError> {
        let id_key = id.as_bytes().to_vec();
        let index_key = owner_key(owner, id);

        (&self.articles, &self.articles_by_owner).transaction(|(articles, index)| {
            if index.remove(index_key.clone())?.is_none() {
                return Err(ConflictableTransactionError::Abort(StorageError::NotFound));
            }
            articles.remove(id_key.clone())?;
            Ok(())
        })?;
        Ok(())
    }
}

fn load<T: DeserializeOwned>(
    tree: &TransactionalTree,
    key: &[u8],
) -> Result<T, ConflictableTransactionError<StorageError>> {
    let bytes = tree
        .get(key)?
        .ok_or(ConflictableTransactionError::Abort(StorageError::NotFound))?;
    serde_json::from_slice(&bytes).map_err(|e| ConflictableTransactionError::Abort(StorageError::Serde(e)))
}

/// Emails are unique case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_key(email: &str) -> Vec<u8> {
    normalize_email(email).into_bytes()
}

fn owner_key(owner: Uuid, article: Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner.as_bytes());
    key.extend_from_slice(article.as_bytes());
    key
}
