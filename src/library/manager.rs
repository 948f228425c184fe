use super::models::*;
use super::trait_def::LibraryStore;
use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    static ref ACQUISITION_MONTH_REGEX: Regex = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap();
}

const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Library domain operations on top of a [`LibraryStore`]. Validates inputs,
/// enforces ownership and visibility, and maps storage outcomes onto the
/// typed error enum the HTTP layer turns into status codes.
#[derive(Clone)]
pub struct LibraryManager {
    store: Arc<dyn LibraryStore>,
}

impl LibraryManager {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        LibraryManager { store }
    }

    // =========================================================================================
    // Entities
    // =========================================================================================

    /// Returns the local entity for an external reference, creating it on
    /// first sight. Losing the insert race to a concurrent caller is not an
    /// error, the winner's row is returned.
    pub fn resolve_or_create(&self, r: &ExternalRef) -> AppResult<Entity> {
        Self::validate_external_ref(r)?;
        if let Some(entity) = self.store.find_entity(r)? {
            return Ok(entity);
        }
        match self.store.insert_entity(r)? {
            EntityInsert::Inserted(entity) => Ok(entity),
            EntityInsert::AlreadyExists => self
                .store
                .find_entity(r)?
                .ok_or_else(|| {
                    AppError::Storage(anyhow::anyhow!(
                        "Entity {}:{} missing after losing insert race",
                        r.source.as_str(),
                        r.external_id
                    ))
                }),
        }
    }

    fn validate_external_ref(r: &ExternalRef) -> AppResult<()> {
        if r.external_id.trim().is_empty() {
            return Err(AppError::validation("External id must not be empty"));
        }
        Ok(())
    }

    // =========================================================================================
    // Collections
    // =========================================================================================

    pub fn create_collection(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> AppResult<Collection> {
        let name = Self::validate_collection_name(name)?;
        Ok(self
            .store
            .create_collection(owner_id, name, description, is_public)?)
    }

    fn validate_collection_name(name: &str) -> AppResult<&str> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Collection name must not be empty"));
        }
        if name.len() > MAX_COLLECTION_NAME_LEN {
            return Err(AppError::validation("Collection name is too long"));
        }
        Ok(name)
    }

    pub fn list_own_collections(&self, user_id: i64) -> AppResult<Vec<Collection>> {
        Ok(self.store.list_user_collections(user_id)?)
    }

    pub fn list_public_collections(&self) -> AppResult<Vec<Collection>> {
        Ok(self.store.list_public_collections()?)
    }

    /// Loads a collection for reading. Private collections are visible to
    /// their owner only.
    pub fn get_collection(&self, user_id: i64, collection_id: i64) -> AppResult<Collection> {
        let collection = self.load_collection(collection_id)?;
        if !collection.is_public && collection.owner_id != user_id {
            return Err(AppError::forbidden("Collection is private"));
        }
        Ok(collection)
    }

    /// Loads a collection for mutation, which only the owner may do.
    fn get_owned_collection(&self, user_id: i64, collection_id: i64) -> AppResult<Collection> {
        let collection = self.load_collection(collection_id)?;
        if collection.owner_id != user_id {
            return Err(AppError::forbidden("Not the collection owner"));
        }
        Ok(collection)
    }

    fn load_collection(&self, collection_id: i64) -> AppResult<Collection> {
        self.store
            .get_collection(collection_id)?
            .ok_or_else(|| AppError::not_found("Collection", collection_id))
    }

    pub fn update_collection(
        &self,
        user_id: i64,
        collection_id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_public: Option<bool>,
    ) -> AppResult<Collection> {
        self.get_owned_collection(user_id, collection_id)?;
        let name = name.map(Self::validate_collection_name).transpose()?;
        self.store
            .update_collection(collection_id, name, description, is_public)?;
        self.load_collection(collection_id)
    }

    pub fn delete_collection(&self, user_id: i64, collection_id: i64) -> AppResult<()> {
        self.get_owned_collection(user_id, collection_id)?;
        self.store.delete_collection(collection_id)?;
        Ok(())
    }

    pub fn add_to_collection(
        &self,
        user_id: i64,
        collection_id: i64,
        r: &ExternalRef,
        metadata: &CollectionItemMetadata,
    ) -> AppResult<(CollectionItem, bool)> {
        self.get_owned_collection(user_id, collection_id)?;
        Self::validate_external_ref(r)?;
        Self::validate_metadata(metadata)?;
        Ok(self.store.upsert_collection_item(collection_id, r, metadata)?)
    }

    fn validate_metadata(metadata: &CollectionItemMetadata) -> AppResult<()> {
        if let Some(month) = &metadata.acquisition_month_year {
            if !ACQUISITION_MONTH_REGEX.is_match(month) {
                return Err(AppError::validation(
                    "Acquisition month must be formatted YYYY-MM",
                ));
            }
        }
        Ok(())
    }

    pub fn remove_from_collection(
        &self,
        user_id: i64,
        collection_id: i64,
        r: &ExternalRef,
    ) -> AppResult<bool> {
        self.get_owned_collection(user_id, collection_id)?;
        Self::validate_external_ref(r)?;
        Ok(self.store.remove_collection_item(collection_id, r)?)
    }

    pub fn list_collection_items(
        &self,
        user_id: i64,
        collection_id: i64,
        kind: Option<EntityKind>,
    ) -> AppResult<Vec<CollectionItem>> {
        self.get_collection(user_id, collection_id)?;
        Ok(self.store.list_collection_items(collection_id, kind)?)
    }

    // =========================================================================================
    // Wishlist
    // =========================================================================================

    pub fn add_to_wishlist(
        &self,
        user_id: i64,
        r: &ExternalRef,
    ) -> AppResult<(WishlistItem, bool)> {
        Self::validate_external_ref(r)?;
        Ok(self.store.upsert_wishlist_item(user_id, r)?)
    }

    /// Removing an item that is already gone reports `false` rather than an
    /// error, so removal is safe to retry.
    pub fn remove_from_wishlist(&self, user_id: i64, item_id: i64) -> AppResult<bool> {
        match self.store.get_wishlist_item(item_id)? {
            None => Ok(false),
            Some(item) if item.user_id != user_id => {
                Err(AppError::forbidden("Not the wishlist owner"))
            }
            Some(item) => Ok(self.store.delete_wishlist_item(item.id)?),
        }
    }

    pub fn list_wishlist(&self, user_id: i64) -> AppResult<Vec<WishlistItem>> {
        Ok(self.store.list_wishlist(user_id)?)
    }
}
