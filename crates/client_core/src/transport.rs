use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        Movie, MovieId, Payment, Reservation, ReservationId, Screening, ScreeningId, Seat, Theater,
        TheaterId, Ticket, TicketId, User, UserId,
    },
    error::ApiError,
    protocol::{
        AuthResponse, Credentials, DashboardSummary, MovieDraft, MovieRevenue, PaymentRequest,
        ProfileUpdate, Registration, ReservationDraft, RoleUpdate, ScreeningDraft,
        ScreeningOccupancy, TheaterDraft, TokenResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::GatewayError, gateway::Gateway};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Supplies the bearer token attached to outgoing requests.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Never attaches credentials.
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// [`Gateway`] over the booking API's JSON REST endpoints.
pub struct HttpGateway {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpGateway {
    pub fn new(
        api_url: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(api_url).with_context(|| format!("invalid api url '{api_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("api url '{api_url}' cannot carry a path"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(segments)?;
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(
            path = %response.url().path(),
            status = status.as_u16(),
            "gateway: response received"
        );
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiError>(&raw).unwrap_or_default();
        if status == reqwest::StatusCode::FORBIDDEN {
            warn!("gateway: access forbidden");
        }
        Err(GatewayError::from_status(status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let request = self.request(Method::GET, segments)?;
        Ok(self.send(request).await?.json().await?)
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(method, segments)?.json(body);
        Ok(self.send(request).await?.json().await?)
    }

    async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let request = self.request(Method::POST, segments)?;
        Ok(self.send(request).await?.json().await?)
    }

    async fn send_without_body(&self, method: Method, segments: &[&str]) -> Result<(), GatewayError> {
        let request = self.request(method, segments)?;
        self.send(request).await?;
        Ok(())
    }
}

fn id(value: i64) -> String {
    value.to_string()
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError> {
        self.send_json(Method::POST, &["register"], registration).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError> {
        self.send_json(Method::POST, &["login"], credentials).await
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.send_without_body(Method::POST, &["logout"]).await
    }

    async fn refresh_token(&self) -> Result<TokenResponse, GatewayError> {
        self.post_empty(&["refresh"]).await
    }

    async fn get_profile(&self) -> Result<User, GatewayError> {
        self.get_json(&["profile"]).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, GatewayError> {
        self.send_json(Method::PUT, &["profile"], update).await
    }

    async fn delete_account(&self) -> Result<(), GatewayError> {
        self.send_without_body(Method::DELETE, &["profile"]).await
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        self.get_json(&["movies"]).await
    }

    async fn list_popular_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        self.get_json(&["movies", "popular"]).await
    }

    async fn get_movie(&self, movie_id: MovieId) -> Result<Movie, GatewayError> {
        self.get_json(&["movies", &id(movie_id.0)]).await
    }

    async fn list_movies_by_genre(&self, genre: &str) -> Result<Vec<Movie>, GatewayError> {
        self.get_json(&["movies", "genre", genre]).await
    }

    async fn create_movie(&self, draft: &MovieDraft) -> Result<Movie, GatewayError> {
        self.send_json(Method::POST, &["movies"], draft).await
    }

    async fn update_movie(&self, movie_id: MovieId, draft: &MovieDraft) -> Result<Movie, GatewayError> {
        self.send_json(Method::PUT, &["movies", &id(movie_id.0)], draft)
            .await
    }

    async fn delete_movie(&self, movie_id: MovieId) -> Result<(), GatewayError> {
        self.send_without_body(Method::DELETE, &["movies", &id(movie_id.0)])
            .await
    }

    async fn list_screenings(&self) -> Result<Vec<Screening>, GatewayError> {
        self.get_json(&["sessions"]).await
    }

    async fn get_screening(&self, screening_id: ScreeningId) -> Result<Screening, GatewayError> {
        self.get_json(&["sessions", &id(screening_id.0)]).await
    }

    async fn list_screenings_by_movie(
        &self,
        movie_id: MovieId,
    ) -> Result<Vec<Screening>, GatewayError> {
        self.get_json(&["sessions", "movie", &id(movie_id.0)]).await
    }

    async fn list_screenings_by_theater(
        &self,
        theater_id: TheaterId,
    ) -> Result<Vec<Screening>, GatewayError> {
        self.get_json(&["sessions", "theater", &id(theater_id.0)])
            .await
    }

    async fn list_available_seats(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Seat>, GatewayError> {
        self.get_json(&["sessions", &id(screening_id.0), "available-seats"])
            .await
    }

    async fn create_screening(&self, draft: &ScreeningDraft) -> Result<Screening, GatewayError> {
        self.send_json(Method::POST, &["sessions"], draft).await
    }

    async fn update_screening(
        &self,
        screening_id: ScreeningId,
        draft: &ScreeningDraft,
    ) -> Result<Screening, GatewayError> {
        self.send_json(Method::PUT, &["sessions", &id(screening_id.0)], draft)
            .await
    }

    async fn delete_screening(&self, screening_id: ScreeningId) -> Result<(), GatewayError> {
        self.send_without_body(Method::DELETE, &["sessions", &id(screening_id.0)])
            .await
    }

    async fn list_theaters(&self) -> Result<Vec<Theater>, GatewayError> {
        self.get_json(&["theaters"]).await
    }

    async fn get_theater(&self, theater_id: TheaterId) -> Result<Theater, GatewayError> {
        self.get_json(&["theaters", &id(theater_id.0)]).await
    }

    async fn list_theaters_by_type(
        &self,
        theater_type: &str,
    ) -> Result<Vec<Theater>, GatewayError> {
        self.get_json(&["theaters", "type", theater_type]).await
    }

    async fn list_theater_seats(&self, theater_id: TheaterId) -> Result<Vec<Seat>, GatewayError> {
        self.get_json(&["theaters", &id(theater_id.0), "seats"]).await
    }

    async fn create_theater(&self, draft: &TheaterDraft) -> Result<Theater, GatewayError> {
        self.send_json(Method::POST, &["theaters"], draft).await
    }

    async fn update_theater(
        &self,
        theater_id: TheaterId,
        draft: &TheaterDraft,
    ) -> Result<Theater, GatewayError> {
        self.send_json(Method::PUT, &["theaters", &id(theater_id.0)], draft)
            .await
    }

    async fn delete_theater(&self, theater_id: TheaterId) -> Result<(), GatewayError> {
        self.send_without_body(Method::DELETE, &["theaters", &id(theater_id.0)])
            .await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>, GatewayError> {
        self.get_json(&["reservations"]).await
    }

    async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation, GatewayError> {
        self.get_json(&["reservations", &id(reservation_id.0)]).await
    }

    async fn list_reservations_by_screening(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Reservation>, GatewayError> {
        self.get_json(&["reservations", "session", &id(screening_id.0)])
            .await
    }

    async fn create_reservation(
        &self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        self.send_json(Method::POST, &["reservations"], draft).await
    }

    async fn update_reservation(
        &self,
        reservation_id: ReservationId,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        self.send_json(
            Method::PUT,
            &["reservations", &id(reservation_id.0)],
            draft,
        )
        .await
    }

    async fn cancel_reservation(&self, reservation_id: ReservationId) -> Result<(), GatewayError> {
        self.send_without_body(Method::DELETE, &["reservations", &id(reservation_id.0)])
            .await
    }

    async fn list_reservation_tickets(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Vec<Ticket>, GatewayError> {
        self.get_json(&["reservations", &id(reservation_id.0), "tickets"])
            .await
    }

    async fn get_reservation_payment(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Payment, GatewayError> {
        self.get_json(&["reservations", &id(reservation_id.0), "payment"])
            .await
    }

    async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, GatewayError> {
        self.send_json(Method::POST, &["payments"], request).await
    }

    async fn download_ticket(&self, ticket_id: TicketId) -> Result<Vec<u8>, GatewayError> {
        let request = self.request(Method::GET, &["tickets", &id(ticket_id.0), "download"])?;
        let bytes = self.send(request).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn get_dashboard(&self) -> Result<DashboardSummary, GatewayError> {
        self.get_json(&["admin", "dashboard"]).await
    }

    async fn list_screening_occupancy(&self) -> Result<Vec<ScreeningOccupancy>, GatewayError> {
        self.get_json(&["admin", "sessions", "occupancy"]).await
    }

    async fn list_movie_revenue(&self) -> Result<Vec<MovieRevenue>, GatewayError> {
        self.get_json(&["admin", "movies", "revenue"]).await
    }

    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        self.get_json(&["admin", "users"]).await
    }

    async fn update_user_role(
        &self,
        user_id: UserId,
        update: &RoleUpdate,
    ) -> Result<User, GatewayError> {
        self.send_json(
            Method::PUT,
            &["admin", "users", &id(user_id.0), "role"],
            update,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
