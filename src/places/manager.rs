use super::models::{ModerationStatus, NewPlace, Place};
use super::store::PlaceStore;
use crate::error::{AppError, AppResult};
use std::sync::Arc;

const MAX_PLACE_NAME_LEN: usize = 255;

pub struct PlaceManager {
    store: Arc<dyn PlaceStore>,
}

impl PlaceManager {
    pub fn new(store: Arc<dyn PlaceStore>) -> Self {
        PlaceManager { store }
    }

    pub fn submit_place(&self, user_id: i64, place: &NewPlace) -> AppResult<Place> {
        if place.name.trim().is_empty() {
            return Err(AppError::validation("Place name must not be empty"));
        }
        if place.name.len() > MAX_PLACE_NAME_LEN {
            return Err(AppError::validation("Place name is too long"));
        }
        if !(-90.0..=90.0).contains(&place.latitude) {
            return Err(AppError::validation("Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&place.longitude) {
            return Err(AppError::validation("Longitude must be between -180 and 180"));
        }
        Ok(self.store.create_place(user_id, place)?)
    }

    /// Approved places only, which is what the public listing shows.
    pub fn list_approved(&self) -> AppResult<Vec<Place>> {
        Ok(self.store.list_places_by_status(ModerationStatus::Approved)?)
    }

    pub fn list_pending(&self) -> AppResult<Vec<Place>> {
        Ok(self.store.list_places_by_status(ModerationStatus::Pending)?)
    }

    pub fn list_own(&self, user_id: i64) -> AppResult<Vec<Place>> {
        Ok(self.store.list_user_places(user_id)?)
    }

    /// Visible places are approved ones, plus a submitter always sees their
    /// own regardless of status.
    pub fn get_place(&self, user_id: i64, place_id: i64) -> AppResult<Place> {
        let place = self.load_place(place_id)?;
        if place.status != ModerationStatus::Approved && place.submitted_by != user_id {
            return Err(AppError::not_found("Place", place_id));
        }
        Ok(place)
    }

    fn load_place(&self, place_id: i64) -> AppResult<Place> {
        self.store
            .get_place(place_id)?
            .ok_or_else(|| AppError::not_found("Place", place_id))
    }

    pub fn moderate(&self, place_id: i64, status: ModerationStatus) -> AppResult<Place> {
        if status == ModerationStatus::Pending {
            return Err(AppError::validation("Cannot move a place back to pending"));
        }
        if !self.store.set_place_status(place_id, status)? {
            return Err(AppError::not_found("Place", place_id));
        }
        self.load_place(place_id)
    }

    pub fn delete_own_place(&self, user_id: i64, place_id: i64) -> AppResult<()> {
        let place = self.load_place(place_id)?;
        if place.submitted_by != user_id {
            return Err(AppError::forbidden("Not the place submitter"));
        }
        self.store.delete_place(place_id)?;
        Ok(())
    }

    pub fn like(&self, user_id: i64, place_id: i64) -> AppResult<bool> {
        self.get_place(user_id, place_id)?;
        Ok(self.store.like_place(place_id, user_id)?)
    }

    pub fn unlike(&self, user_id: i64, place_id: i64) -> AppResult<bool> {
        Ok(self.store.unlike_place(place_id, user_id)?)
    }

    pub fn count_approved(&self) -> AppResult<usize> {
        Ok(self.store.count_places_by_status(ModerationStatus::Approved)?)
    }
}
