//! LibraryStore trait definition.
//!
//! Abstracts the library persistence so the manager can be exercised
//! against any backend (the server uses SQLite, tests may stub it).

use super::models::*;
use anyhow::Result;

pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Entities
    // =========================================================================

    /// Finds the entity row for `(external_id, source, kind)`.
    fn find_entity(&self, r: &ExternalRef) -> Result<Option<Entity>>;

    /// Attempts to insert a new entity row. A uniqueness violation on the
    /// `(external_id, source, kind)` key is reported as
    /// [`EntityInsert::AlreadyExists`], never as an error.
    fn insert_entity(&self, r: &ExternalRef) -> Result<EntityInsert>;

    fn count_entities(&self, kind: EntityKind) -> Result<usize>;

    // =========================================================================
    // Collections
    // =========================================================================

    fn create_collection(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<Collection>;

    fn get_collection(&self, id: i64) -> Result<Option<Collection>>;

    fn list_user_collections(&self, owner_id: i64) -> Result<Vec<Collection>>;

    fn list_public_collections(&self) -> Result<Vec<Collection>>;

    /// Applies the supplied fields and bumps `updated`. Returns false if the
    /// collection does not exist.
    fn update_collection(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_public: Option<bool>,
    ) -> Result<bool>;

    /// Deletes the collection; membership rows cascade. Returns whether a
    /// row was deleted.
    fn delete_collection(&self, id: i64) -> Result<bool>;

    fn count_collections(&self) -> Result<usize>;

    // =========================================================================
    // Collection memberships
    // =========================================================================

    /// Resolves (or creates) the entity and upserts the membership row, all
    /// inside one transaction. On re-add the row's `updated` timestamp is
    /// refreshed and any supplied metadata fields overwrite the stored ones.
    /// Returns the membership and whether it was newly created.
    fn upsert_collection_item(
        &self,
        collection_id: i64,
        r: &ExternalRef,
        metadata: &CollectionItemMetadata,
    ) -> Result<(CollectionItem, bool)>;

    /// Returns whether a membership row was actually deleted.
    fn remove_collection_item(&self, collection_id: i64, r: &ExternalRef) -> Result<bool>;

    fn list_collection_items(
        &self,
        collection_id: i64,
        kind: Option<EntityKind>,
    ) -> Result<Vec<CollectionItem>>;

    /// Most recent membership rows across public collections, newest first.
    fn latest_public_collection_items(&self, limit: usize) -> Result<Vec<CollectionItem>>;

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Resolves (or creates) the entity and inserts the wishlist row if
    /// absent, inside one transaction. Re-adding is a pure no-op: the
    /// existing row is returned untouched.
    fn upsert_wishlist_item(&self, user_id: i64, r: &ExternalRef)
        -> Result<(WishlistItem, bool)>;

    fn get_wishlist_item(&self, id: i64) -> Result<Option<WishlistItem>>;

    fn delete_wishlist_item(&self, id: i64) -> Result<bool>;

    fn list_wishlist(&self, user_id: i64) -> Result<Vec<WishlistItem>>;
}
