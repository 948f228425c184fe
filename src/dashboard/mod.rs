//! Read-only statistics assembled from the other stores.

use crate::error::AppResult;
use crate::library::{CollectionItem, EntityKind, LibraryManager, LibraryStore};
use crate::places::PlaceManager;
use crate::user::UserManager;
use serde::Serialize;
use std::sync::Arc;

const LATEST_ADDITIONS_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users: usize,
    pub collections: usize,
    pub albums: usize,
    pub artists: usize,
    pub approved_places: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub collections: usize,
    pub collection_items: usize,
    pub wishlist_items: usize,
}

pub struct DashboardService {
    library_store: Arc<dyn LibraryStore>,
    library: LibraryManager,
    places: Arc<PlaceManager>,
    users: Arc<UserManager>,
}

impl DashboardService {
    pub fn new(
        library_store: Arc<dyn LibraryStore>,
        places: Arc<PlaceManager>,
        users: Arc<UserManager>,
    ) -> Self {
        let library = LibraryManager::new(library_store.clone());
        DashboardService {
            library_store,
            library,
            places,
            users,
        }
    }

    pub fn global_stats(&self) -> AppResult<DashboardStats> {
        Ok(DashboardStats {
            users: self.users.count_users()?,
            collections: self.library_store.count_collections()?,
            albums: self.library_store.count_entities(EntityKind::Album)?,
            artists: self.library_store.count_entities(EntityKind::Artist)?,
            approved_places: self.places.count_approved()?,
        })
    }

    /// Most recently touched memberships across public collections.
    pub fn latest_additions(&self) -> AppResult<Vec<CollectionItem>> {
        Ok(self
            .library_store
            .latest_public_collection_items(LATEST_ADDITIONS_LIMIT)?)
    }

    pub fn user_stats(&self, user_id: i64) -> AppResult<UserStats> {
        let collections = self.library.list_own_collections(user_id)?;
        let mut collection_items = 0;
        for collection in &collections {
            collection_items += self
                .library
                .list_collection_items(user_id, collection.id, None)?
                .len();
        }
        Ok(UserStats {
            collections: collections.len(),
            collection_items,
            wishlist_items: self.library.list_wishlist(user_id)?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{CollectionItemMetadata, EntityKind, ExternalRef, ExternalSource, SqliteLibraryStore};
    use crate::places::{ModerationStatus, NewPlace, PlaceKind, SqlitePlaceStore};
    use crate::user::SqliteUserStore;

    fn service() -> (DashboardService, LibraryManager, Arc<PlaceManager>, Arc<UserManager>) {
        let library_store: Arc<dyn LibraryStore> = Arc::new(SqliteLibraryStore::in_memory().unwrap());
        let places = Arc::new(PlaceManager::new(Arc::new(
            SqlitePlaceStore::in_memory().unwrap(),
        )));
        let users = Arc::new(UserManager::new(Arc::new(
            SqliteUserStore::in_memory().unwrap(),
        )));
        let service = DashboardService::new(library_store.clone(), places.clone(), users.clone());
        (service, LibraryManager::new(library_store), places, users)
    }

    fn album_ref(external_id: &str) -> ExternalRef {
        ExternalRef {
            kind: EntityKind::Album,
            source: ExternalSource::Deezer,
            external_id: external_id.to_string(),
            title: None,
            image_url: None,
        }
    }

    #[test]
    fn global_stats_count_everything() {
        let (service, library, places, users) = service();
        let user = users.register("ada", "ada@example.com", "password1").unwrap();

        let collection = library.create_collection(user.id, "Shelf", None, true).unwrap();
        library
            .add_to_collection(user.id, collection.id, &album_ref("1"), &Default::default())
            .unwrap();
        library.add_to_wishlist(user.id, &album_ref("2")).unwrap();

        let place = places
            .submit_place(
                user.id,
                &NewPlace {
                    name: "Dig Records".to_string(),
                    description: None,
                    city: None,
                    country: None,
                    latitude: 45.0,
                    longitude: 7.0,
                    kind: PlaceKind::Shop,
                },
            )
            .unwrap();

        let stats = service.global_stats().unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.collections, 1);
        assert_eq!(stats.albums, 2);
        assert_eq!(stats.artists, 0);
        assert_eq!(stats.approved_places, 0);

        places.moderate(place.id, ModerationStatus::Approved).unwrap();
        assert_eq!(service.global_stats().unwrap().approved_places, 1);
    }

    #[test]
    fn latest_additions_come_from_public_collections_only() {
        let (service, library, _, users) = service();
        let user = users.register("ada", "ada@example.com", "password1").unwrap();

        let private = library.create_collection(user.id, "Mine", None, false).unwrap();
        let public = library.create_collection(user.id, "Shared", None, true).unwrap();
        library
            .add_to_collection(user.id, private.id, &album_ref("1"), &Default::default())
            .unwrap();
        library
            .add_to_collection(user.id, public.id, &album_ref("2"), &Default::default())
            .unwrap();

        let latest = service.latest_additions().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].entity.external_id, "2");
    }

    #[test]
    fn user_stats_cover_collections_and_wishlist() {
        let (service, library, _, users) = service();
        let user = users.register("ada", "ada@example.com", "password1").unwrap();
        let collection = library.create_collection(user.id, "Shelf", None, false).unwrap();
        library
            .add_to_collection(user.id, collection.id, &album_ref("1"), &CollectionItemMetadata::default())
            .unwrap();
        library.add_to_wishlist(user.id, &album_ref("2")).unwrap();
        library.add_to_wishlist(user.id, &album_ref("3")).unwrap();

        let stats = service.user_stats(user.id).unwrap();
        assert_eq!(stats.collections, 1);
        assert_eq!(stats.collection_items, 1);
        assert_eq!(stats.wishlist_items, 2);
    }
}
