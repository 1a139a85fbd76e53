//! Screenings (the API's "sessions"): a showing of one movie in one theater.

use std::sync::Arc;

use shared::{
    domain::{MovieId, Screening, ScreeningId, Seat, TheaterId},
    protocol::ScreeningDraft,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    activity::Activity,
    cache::{CacheEntity, DependentMap, IndexedCache},
    error::GatewayError,
    gateway::Gateway,
};

/// Screenings are listed per movie and per theater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreeningKey {
    Movie(MovieId),
    Theater(TheaterId),
}

impl CacheEntity for Screening {
    type Id = ScreeningId;
    type IndexKey = ScreeningKey;

    fn id(&self) -> ScreeningId {
        self.id
    }

    fn index_keys(&self) -> Vec<ScreeningKey> {
        vec![
            ScreeningKey::Movie(self.movie_id),
            ScreeningKey::Theater(self.theater_id),
        ]
    }
}

#[derive(Default)]
struct ScreeningState {
    cache: IndexedCache<Screening>,
    available_seats: DependentMap<ScreeningId, Vec<Seat>>,
}

pub struct ScreeningStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    state: RwLock<ScreeningState>,
}

impl ScreeningStore {
    pub fn new(gateway: Arc<dyn Gateway>, activity: Arc<Activity>) -> Self {
        Self {
            gateway,
            activity,
            state: RwLock::new(ScreeningState::default()),
        }
    }

    pub async fn screenings(&self) -> Vec<Screening> {
        self.state.read().await.cache.all().to_vec()
    }

    pub async fn current_screening(&self) -> Option<Screening> {
        self.state.read().await.cache.current().cloned()
    }

    pub async fn screenings_by_movie(&self, movie_id: MovieId) -> Vec<Screening> {
        self.state
            .read()
            .await
            .cache
            .bucket(&ScreeningKey::Movie(movie_id))
            .to_vec()
    }

    pub async fn screenings_by_theater(&self, theater_id: TheaterId) -> Vec<Screening> {
        self.state
            .read()
            .await
            .cache
            .bucket(&ScreeningKey::Theater(theater_id))
            .to_vec()
    }

    /// Seats still bookable for a screening, once fetched.
    pub async fn available_seats(&self, screening_id: ScreeningId) -> Option<Vec<Seat>> {
        self.state
            .read()
            .await
            .available_seats
            .get(&screening_id)
            .cloned()
    }

    pub async fn with_cache<R>(&self, f: impl FnOnce(&IndexedCache<Screening>) -> R) -> R {
        f(&self.state.read().await.cache)
    }

    pub async fn fetch_screenings(&self) -> Result<Vec<Screening>, GatewayError> {
        const ACTION: &str = "screenings.fetch_all";
        let _busy = self.activity.begin(ACTION);
        let screenings = self
            .activity
            .settle(
                ACTION,
                "Failed to load sessions",
                self.gateway.list_screenings().await,
            )
            .await?;
        debug!(count = screenings.len(), "screenings: loaded");
        self.state.write().await.cache.replace_all(screenings.clone());
        Ok(screenings)
    }

    pub async fn fetch_screening(&self, screening_id: ScreeningId) -> Result<Screening, GatewayError> {
        const ACTION: &str = "screenings.fetch_one";
        let _busy = self.activity.begin(ACTION);
        let screening = self
            .activity
            .settle(
                ACTION,
                "Failed to load session details",
                self.gateway.get_screening(screening_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_current(Some(screening.clone()));
        Ok(screening)
    }

    pub async fn fetch_screenings_by_movie(
        &self,
        movie_id: MovieId,
    ) -> Result<Vec<Screening>, GatewayError> {
        const ACTION: &str = "screenings.fetch_by_movie";
        let _busy = self.activity.begin(ACTION);
        let screenings = self
            .activity
            .settle(
                ACTION,
                "Failed to load movie sessions",
                self.gateway.list_screenings_by_movie(movie_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_index(ScreeningKey::Movie(movie_id), screenings.clone());
        Ok(screenings)
    }

    pub async fn fetch_screenings_by_theater(
        &self,
        theater_id: TheaterId,
    ) -> Result<Vec<Screening>, GatewayError> {
        const ACTION: &str = "screenings.fetch_by_theater";
        let _busy = self.activity.begin(ACTION);
        let screenings = self
            .activity
            .settle(
                ACTION,
                "Failed to load theater sessions",
                self.gateway.list_screenings_by_theater(theater_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_index(ScreeningKey::Theater(theater_id), screenings.clone());
        Ok(screenings)
    }

    pub async fn fetch_available_seats(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Seat>, GatewayError> {
        const ACTION: &str = "screenings.fetch_available_seats";
        let _busy = self.activity.begin(ACTION);
        let seats = self
            .activity
            .settle(
                ACTION,
                "Failed to load available seats",
                self.gateway.list_available_seats(screening_id).await,
            )
            .await?;
        debug!(
            screening_id = screening_id.0,
            count = seats.len(),
            "screenings: loaded available seats"
        );
        self.state
            .write()
            .await
            .available_seats
            .replace(screening_id, seats.clone());
        Ok(seats)
    }

    pub async fn create_screening(&self, draft: &ScreeningDraft) -> Result<Screening, GatewayError> {
        const ACTION: &str = "screenings.create";
        let _busy = self.activity.begin(ACTION);
        let screening = self
            .activity
            .settle(
                ACTION,
                "Failed to create session",
                self.gateway.create_screening(draft).await,
            )
            .await?;
        info!(
            screening_id = screening.id.0,
            movie_id = screening.movie_id.0,
            theater_id = screening.theater_id.0,
            "screenings: created"
        );
        self.state.write().await.cache.insert(screening.clone());
        Ok(screening)
    }

    pub async fn update_screening(
        &self,
        screening_id: ScreeningId,
        draft: &ScreeningDraft,
    ) -> Result<Screening, GatewayError> {
        const ACTION: &str = "screenings.update";
        let _busy = self.activity.begin(ACTION);
        let screening = self
            .activity
            .settle(
                ACTION,
                "Failed to update session",
                self.gateway.update_screening(screening_id, draft).await,
            )
            .await?;
        self.state.write().await.cache.replace(screening.clone());
        info!(screening_id = screening.id.0, "screenings: updated");
        Ok(screening)
    }

    /// Deletes a screening along with its cached seat availability.
    /// Reservations for it are left alone.
    pub async fn delete_screening(&self, screening_id: ScreeningId) -> Result<(), GatewayError> {
        const ACTION: &str = "screenings.delete";
        let _busy = self.activity.begin(ACTION);
        self.activity
            .settle(
                ACTION,
                "Failed to delete session",
                self.gateway.delete_screening(screening_id).await,
            )
            .await?;
        {
            let mut state = self.state.write().await;
            state.cache.remove(screening_id);
            state.available_seats.remove(&screening_id);
        }
        info!(screening_id = screening_id.0, "screenings: deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/screenings_tests.rs"]
mod tests;
