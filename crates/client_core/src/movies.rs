use std::sync::Arc;

use shared::{
    domain::{Movie, MovieId},
    protocol::MovieDraft,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    activity::Activity,
    cache::{CacheEntity, IndexedCache},
    error::GatewayError,
    gateway::Gateway,
};

impl CacheEntity for Movie {
    type Id = MovieId;
    /// Genre name.
    type IndexKey = String;

    fn id(&self) -> MovieId {
        self.id
    }

    fn index_keys(&self) -> Vec<String> {
        self.genre.iter().cloned().collect()
    }
}

#[derive(Default)]
struct MovieState {
    cache: IndexedCache<Movie>,
    popular: Vec<Movie>,
}

/// Movie catalogue: every movie, the popular list, the movie being viewed and
/// per-genre listings.
pub struct MovieStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    state: RwLock<MovieState>,
}

impl MovieStore {
    pub fn new(gateway: Arc<dyn Gateway>, activity: Arc<Activity>) -> Self {
        Self {
            gateway,
            activity,
            state: RwLock::new(MovieState::default()),
        }
    }

    pub async fn movies(&self) -> Vec<Movie> {
        self.state.read().await.cache.all().to_vec()
    }

    pub async fn popular_movies(&self) -> Vec<Movie> {
        self.state.read().await.popular.clone()
    }

    pub async fn current_movie(&self) -> Option<Movie> {
        self.state.read().await.cache.current().cloned()
    }

    pub async fn movies_by_genre(&self, genre: &str) -> Vec<Movie> {
        self.state.read().await.cache.bucket(&genre.to_string()).to_vec()
    }

    /// Runs `f` against the cache under a read lock.
    pub async fn with_cache<R>(&self, f: impl FnOnce(&IndexedCache<Movie>) -> R) -> R {
        f(&self.state.read().await.cache)
    }

    pub async fn fetch_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        const ACTION: &str = "movies.fetch_all";
        let _busy = self.activity.begin(ACTION);
        let movies = self
            .activity
            .settle(
                ACTION,
                "Failed to load movies",
                self.gateway.list_movies().await,
            )
            .await?;
        debug!(count = movies.len(), "movies: loaded catalogue");
        self.state.write().await.cache.replace_all(movies.clone());
        Ok(movies)
    }

    pub async fn fetch_popular_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        const ACTION: &str = "movies.fetch_popular";
        let _busy = self.activity.begin(ACTION);
        let movies = self
            .activity
            .settle(
                ACTION,
                "Failed to load popular movies",
                self.gateway.list_popular_movies().await,
            )
            .await?;
        self.state.write().await.popular = movies.clone();
        Ok(movies)
    }

    pub async fn fetch_movie(&self, movie_id: MovieId) -> Result<Movie, GatewayError> {
        const ACTION: &str = "movies.fetch_one";
        let _busy = self.activity.begin(ACTION);
        let movie = self
            .activity
            .settle(
                ACTION,
                "Failed to load movie details",
                self.gateway.get_movie(movie_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_current(Some(movie.clone()));
        Ok(movie)
    }

    pub async fn fetch_movies_by_genre(&self, genre: &str) -> Result<Vec<Movie>, GatewayError> {
        const ACTION: &str = "movies.fetch_by_genre";
        let _busy = self.activity.begin(ACTION);
        let movies = self
            .activity
            .settle(
                ACTION,
                &format!("Failed to load {genre} movies"),
                self.gateway.list_movies_by_genre(genre).await,
            )
            .await?;
        debug!(genre, count = movies.len(), "movies: loaded genre");
        self.state
            .write()
            .await
            .cache
            .replace_index(genre.to_string(), movies.clone());
        Ok(movies)
    }

    pub async fn create_movie(&self, draft: &MovieDraft) -> Result<Movie, GatewayError> {
        const ACTION: &str = "movies.create";
        let _busy = self.activity.begin(ACTION);
        let movie = self
            .activity
            .settle(
                ACTION,
                "Failed to create movie",
                self.gateway.create_movie(draft).await,
            )
            .await?;
        info!(movie_id = movie.id.0, "movies: created");
        self.state.write().await.cache.insert(movie.clone());
        Ok(movie)
    }

    pub async fn update_movie(
        &self,
        movie_id: MovieId,
        draft: &MovieDraft,
    ) -> Result<Movie, GatewayError> {
        const ACTION: &str = "movies.update";
        let _busy = self.activity.begin(ACTION);
        let movie = self
            .activity
            .settle(
                ACTION,
                "Failed to update movie",
                self.gateway.update_movie(movie_id, draft).await,
            )
            .await?;
        let found = self.state.write().await.cache.replace(movie.clone());
        info!(movie_id = movie.id.0, cached = found, "movies: updated");
        Ok(movie)
    }

    pub async fn delete_movie(&self, movie_id: MovieId) -> Result<(), GatewayError> {
        const ACTION: &str = "movies.delete";
        let _busy = self.activity.begin(ACTION);
        self.activity
            .settle(
                ACTION,
                "Failed to delete movie",
                self.gateway.delete_movie(movie_id).await,
            )
            .await?;
        self.state.write().await.cache.remove(movie_id);
        info!(movie_id = movie_id.0, "movies: deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/movies_tests.rs"]
mod tests;
