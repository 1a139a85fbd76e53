use std::sync::Arc;

use shared::{
    domain::{Seat, Theater, TheaterId},
    protocol::TheaterDraft,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    activity::Activity,
    cache::{CacheEntity, DependentMap, IndexedCache},
    error::GatewayError,
    gateway::Gateway,
};

impl CacheEntity for Theater {
    type Id = TheaterId;
    /// Theater type, e.g. "IMAX".
    type IndexKey = String;

    // A theater changing type moves between type listings.
    const RECONCILE_ON_KEY_CHANGE: bool = true;

    fn id(&self) -> TheaterId {
        self.id
    }

    fn index_keys(&self) -> Vec<String> {
        self.theater_type.iter().cloned().collect()
    }
}

#[derive(Default)]
struct TheaterState {
    cache: IndexedCache<Theater>,
    seats: DependentMap<TheaterId, Vec<Seat>>,
}

pub struct TheaterStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    state: RwLock<TheaterState>,
}

impl TheaterStore {
    pub fn new(gateway: Arc<dyn Gateway>, activity: Arc<Activity>) -> Self {
        Self {
            gateway,
            activity,
            state: RwLock::new(TheaterState::default()),
        }
    }

    pub async fn theaters(&self) -> Vec<Theater> {
        self.state.read().await.cache.all().to_vec()
    }

    pub async fn current_theater(&self) -> Option<Theater> {
        self.state.read().await.cache.current().cloned()
    }

    pub async fn theaters_by_type(&self, theater_type: &str) -> Vec<Theater> {
        self.state
            .read()
            .await
            .cache
            .bucket(&theater_type.to_string())
            .to_vec()
    }

    pub async fn seats(&self, theater_id: TheaterId) -> Option<Vec<Seat>> {
        self.state.read().await.seats.get(&theater_id).cloned()
    }

    pub async fn with_cache<R>(&self, f: impl FnOnce(&IndexedCache<Theater>) -> R) -> R {
        f(&self.state.read().await.cache)
    }

    pub async fn fetch_theaters(&self) -> Result<Vec<Theater>, GatewayError> {
        const ACTION: &str = "theaters.fetch_all";
        let _busy = self.activity.begin(ACTION);
        let theaters = self
            .activity
            .settle(
                ACTION,
                "Failed to load theaters",
                self.gateway.list_theaters().await,
            )
            .await?;
        debug!(count = theaters.len(), "theaters: loaded");
        self.state.write().await.cache.replace_all(theaters.clone());
        Ok(theaters)
    }

    pub async fn fetch_theater(&self, theater_id: TheaterId) -> Result<Theater, GatewayError> {
        const ACTION: &str = "theaters.fetch_one";
        let _busy = self.activity.begin(ACTION);
        let theater = self
            .activity
            .settle(
                ACTION,
                "Failed to load theater details",
                self.gateway.get_theater(theater_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_current(Some(theater.clone()));
        Ok(theater)
    }

    pub async fn fetch_theaters_by_type(
        &self,
        theater_type: &str,
    ) -> Result<Vec<Theater>, GatewayError> {
        const ACTION: &str = "theaters.fetch_by_type";
        let _busy = self.activity.begin(ACTION);
        let theaters = self
            .activity
            .settle(
                ACTION,
                &format!("Failed to load {theater_type} theaters"),
                self.gateway.list_theaters_by_type(theater_type).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_index(theater_type.to_string(), theaters.clone());
        Ok(theaters)
    }

    pub async fn fetch_theater_seats(&self, theater_id: TheaterId) -> Result<Vec<Seat>, GatewayError> {
        const ACTION: &str = "theaters.fetch_seats";
        let _busy = self.activity.begin(ACTION);
        let seats = self
            .activity
            .settle(
                ACTION,
                "Failed to load theater seats",
                self.gateway.list_theater_seats(theater_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .seats
            .replace(theater_id, seats.clone());
        Ok(seats)
    }

    pub async fn create_theater(&self, draft: &TheaterDraft) -> Result<Theater, GatewayError> {
        const ACTION: &str = "theaters.create";
        let _busy = self.activity.begin(ACTION);
        let theater = self
            .activity
            .settle(
                ACTION,
                "Failed to create theater",
                self.gateway.create_theater(draft).await,
            )
            .await?;
        info!(theater_id = theater.id.0, "theaters: created");
        self.state.write().await.cache.insert(theater.clone());
        Ok(theater)
    }

    pub async fn update_theater(
        &self,
        theater_id: TheaterId,
        draft: &TheaterDraft,
    ) -> Result<Theater, GatewayError> {
        const ACTION: &str = "theaters.update";
        let _busy = self.activity.begin(ACTION);
        let theater = self
            .activity
            .settle(
                ACTION,
                "Failed to update theater",
                self.gateway.update_theater(theater_id, draft).await,
            )
            .await?;
        self.state.write().await.cache.replace(theater.clone());
        info!(
            theater_id = theater.id.0,
            theater_type = theater.theater_type.as_deref(),
            "theaters: updated"
        );
        Ok(theater)
    }

    pub async fn delete_theater(&self, theater_id: TheaterId) -> Result<(), GatewayError> {
        const ACTION: &str = "theaters.delete";
        let _busy = self.activity.begin(ACTION);
        self.activity
            .settle(
                ACTION,
                "Failed to delete theater",
                self.gateway.delete_theater(theater_id).await,
            )
            .await?;
        {
            let mut state = self.state.write().await;
            state.cache.remove(theater_id);
            state.seats.remove(&theater_id);
        }
        info!(theater_id = theater_id.0, "theaters: deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/theaters_tests.rs"]
mod tests;
