//! Scripted gateway and entity builders shared by the store tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{
        Movie, MovieId, Payment, PaymentId, Reservation, ReservationId, ReservationStatus, Role,
        Screening, ScreeningId, Seat, SeatId, Theater, TheaterId, Ticket, TicketId, User, UserId,
    },
    protocol::{
        AuthResponse, Credentials, DashboardSummary, MovieDraft, MovieRevenue, PaymentRequest,
        ProfileUpdate, Registration, ReservationDraft, RoleUpdate, ScreeningDraft,
        ScreeningOccupancy, TheaterDraft, TokenResponse,
    },
};
use tokio::sync::oneshot;

use crate::{
    error::GatewayError, gateway::Gateway, notify::RecordingNotifier, persistence::MemoryStore,
    CinemaClient,
};

/// Gateway answering each operation from a per-operation queue of scripted
/// outcomes. Unscripted calls fail with a transport error.
#[derive(Default)]
pub struct FakeGateway {
    outcomes: Mutex<HashMap<&'static str, VecDeque<Result<Value, GatewayError>>>>,
    gates: Mutex<HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, op: &'static str, value: impl Serialize) {
        let value = serde_json::to_value(value).expect("scripted reply serializes");
        self.push(op, Ok(value));
    }

    pub fn fail(&self, op: &'static str, err: GatewayError) {
        self.push(op, Err(err));
    }

    /// Holds the next `op` call until the returned sender fires or drops.
    pub fn gate(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .entry(op)
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn push(&self, op: &'static str, outcome: Result<Value, GatewayError>) {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .entry(op)
            .or_default()
            .push_back(outcome);
    }

    async fn respond<T: DeserializeOwned>(
        &self,
        op: &'static str,
        detail: impl std::fmt::Display,
    ) -> Result<T, GatewayError> {
        let detail = detail.to_string();
        self.calls.lock().expect("calls lock").push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{op}:{detail}")
        });

        let gate = self
            .gates
            .lock()
            .expect("gates lock")
            .get_mut(op)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let outcome = self
            .outcomes
            .lock()
            .expect("outcomes lock")
            .get_mut(op)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(GatewayError::Transport(format!("no scripted reply for {op}"))));
        Ok(serde_json::from_value(outcome?)?)
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError> {
        self.respond("register", &registration.email).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError> {
        self.respond("login", &credentials.email).await
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.respond("logout", "").await
    }

    async fn refresh_token(&self) -> Result<TokenResponse, GatewayError> {
        self.respond("refresh_token", "").await
    }

    async fn get_profile(&self) -> Result<User, GatewayError> {
        self.respond("get_profile", "").await
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> Result<User, GatewayError> {
        self.respond("update_profile", "").await
    }

    async fn delete_account(&self) -> Result<(), GatewayError> {
        self.respond("delete_account", "").await
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        self.respond("list_movies", "").await
    }

    async fn list_popular_movies(&self) -> Result<Vec<Movie>, GatewayError> {
        self.respond("list_popular_movies", "").await
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie, GatewayError> {
        self.respond("get_movie", id.0).await
    }

    async fn list_movies_by_genre(&self, genre: &str) -> Result<Vec<Movie>, GatewayError> {
        self.respond("list_movies_by_genre", genre).await
    }

    async fn create_movie(&self, draft: &MovieDraft) -> Result<Movie, GatewayError> {
        self.respond("create_movie", &draft.title).await
    }

    async fn update_movie(&self, id: MovieId, _draft: &MovieDraft) -> Result<Movie, GatewayError> {
        self.respond("update_movie", id.0).await
    }

    async fn delete_movie(&self, id: MovieId) -> Result<(), GatewayError> {
        self.respond("delete_movie", id.0).await
    }

    async fn list_screenings(&self) -> Result<Vec<Screening>, GatewayError> {
        self.respond("list_screenings", "").await
    }

    async fn get_screening(&self, id: ScreeningId) -> Result<Screening, GatewayError> {
        self.respond("get_screening", id.0).await
    }

    async fn list_screenings_by_movie(
        &self,
        movie_id: MovieId,
    ) -> Result<Vec<Screening>, GatewayError> {
        self.respond("list_screenings_by_movie", movie_id.0).await
    }

    async fn list_screenings_by_theater(
        &self,
        theater_id: TheaterId,
    ) -> Result<Vec<Screening>, GatewayError> {
        self.respond("list_screenings_by_theater", theater_id.0)
            .await
    }

    async fn list_available_seats(&self, id: ScreeningId) -> Result<Vec<Seat>, GatewayError> {
        self.respond("list_available_seats", id.0).await
    }

    async fn create_screening(&self, _draft: &ScreeningDraft) -> Result<Screening, GatewayError> {
        self.respond("create_screening", "").await
    }

    async fn update_screening(
        &self,
        id: ScreeningId,
        _draft: &ScreeningDraft,
    ) -> Result<Screening, GatewayError> {
        self.respond("update_screening", id.0).await
    }

    async fn delete_screening(&self, id: ScreeningId) -> Result<(), GatewayError> {
        self.respond("delete_screening", id.0).await
    }

    async fn list_theaters(&self) -> Result<Vec<Theater>, GatewayError> {
        self.respond("list_theaters", "").await
    }

    async fn get_theater(&self, id: TheaterId) -> Result<Theater, GatewayError> {
        self.respond("get_theater", id.0).await
    }

    async fn list_theaters_by_type(
        &self,
        theater_type: &str,
    ) -> Result<Vec<Theater>, GatewayError> {
        self.respond("list_theaters_by_type", theater_type).await
    }

    async fn list_theater_seats(&self, id: TheaterId) -> Result<Vec<Seat>, GatewayError> {
        self.respond("list_theater_seats", id.0).await
    }

    async fn create_theater(&self, draft: &TheaterDraft) -> Result<Theater, GatewayError> {
        self.respond("create_theater", &draft.name).await
    }

    async fn update_theater(
        &self,
        id: TheaterId,
        _draft: &TheaterDraft,
    ) -> Result<Theater, GatewayError> {
        self.respond("update_theater", id.0).await
    }

    async fn delete_theater(&self, id: TheaterId) -> Result<(), GatewayError> {
        self.respond("delete_theater", id.0).await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>, GatewayError> {
        self.respond("list_reservations", "").await
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, GatewayError> {
        self.respond("get_reservation", id.0).await
    }

    async fn list_reservations_by_screening(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Reservation>, GatewayError> {
        self.respond("list_reservations_by_screening", screening_id.0)
            .await
    }

    async fn create_reservation(
        &self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        self.respond("create_reservation", draft.screening_id.0)
            .await
    }

    async fn update_reservation(
        &self,
        id: ReservationId,
        _draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        self.respond("update_reservation", id.0).await
    }

    async fn cancel_reservation(&self, id: ReservationId) -> Result<(), GatewayError> {
        self.respond("cancel_reservation", id.0).await
    }

    async fn list_reservation_tickets(
        &self,
        id: ReservationId,
    ) -> Result<Vec<Ticket>, GatewayError> {
        self.respond("list_reservation_tickets", id.0).await
    }

    async fn get_reservation_payment(&self, id: ReservationId) -> Result<Payment, GatewayError> {
        self.respond("get_reservation_payment", id.0).await
    }

    async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, GatewayError> {
        self.respond("process_payment", request.reservation_id.0)
            .await
    }

    async fn download_ticket(&self, id: TicketId) -> Result<Vec<u8>, GatewayError> {
        self.respond("download_ticket", id.0).await
    }

    async fn get_dashboard(&self) -> Result<DashboardSummary, GatewayError> {
        self.respond("get_dashboard", "").await
    }

    async fn list_screening_occupancy(&self) -> Result<Vec<ScreeningOccupancy>, GatewayError> {
        self.respond("list_screening_occupancy", "").await
    }

    async fn list_movie_revenue(&self) -> Result<Vec<MovieRevenue>, GatewayError> {
        self.respond("list_movie_revenue", "").await
    }

    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        self.respond("list_users", "").await
    }

    async fn update_user_role(
        &self,
        id: UserId,
        update: &RoleUpdate,
    ) -> Result<User, GatewayError> {
        self.respond("update_user_role", format!("{}={}", id.0, update.role.as_str()))
            .await
    }
}

pub struct Harness {
    pub client: CinemaClient,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn harness() -> Harness {
    harness_with_store(MemoryStore::new()).await
}

pub async fn harness_with_store(store: MemoryStore) -> Harness {
    let gateway = FakeGateway::new();
    let store = Arc::new(store);
    let notifier = Arc::new(RecordingNotifier::new());
    let client = CinemaClient::new(gateway.clone(), store.clone(), notifier.clone()).await;
    Harness {
        client,
        gateway,
        store,
        notifier,
    }
}

pub fn user(id: i64, role: Role) -> User {
    User {
        id: UserId(id),
        name: format!("user-{id}"),
        email: format!("user{id}@example.com"),
        role,
    }
}

pub fn auth_response(id: i64, role: Role, token: &str) -> AuthResponse {
    AuthResponse {
        user: user(id, role),
        token: token.to_string(),
    }
}

pub fn movie(id: i64, genre: Option<&str>) -> Movie {
    Movie {
        id: MovieId(id),
        title: format!("Movie {id}"),
        genre: genre.map(str::to_string),
        description: None,
        duration_minutes: Some(120),
        release_date: None,
        poster_url: None,
        rating: None,
    }
}

pub fn screening(id: i64, movie_id: i64, theater_id: i64) -> Screening {
    Screening {
        id: ScreeningId(id),
        movie_id: MovieId(movie_id),
        theater_id: TheaterId(theater_id),
        starts_at: Utc
            .with_ymd_and_hms(2026, 5, 1, 20, 0, 0)
            .single()
            .expect("valid timestamp"),
        ends_at: None,
        price: Some(12.5),
        available_seats: None,
    }
}

pub fn theater(id: i64, theater_type: Option<&str>) -> Theater {
    Theater {
        id: TheaterId(id),
        name: format!("Hall {id}"),
        theater_type: theater_type.map(str::to_string),
        capacity: Some(100),
        rows: Some(10),
        seats_per_row: Some(10),
    }
}

pub fn seat(id: i64, row: &str, number: u32) -> Seat {
    Seat {
        id: SeatId(id),
        row: row.to_string(),
        number,
        seat_type: None,
        is_available: true,
    }
}

pub fn reservation(id: i64, screening_id: i64) -> Reservation {
    Reservation {
        id: ReservationId(id),
        screening_id: ScreeningId(screening_id),
        user_id: UserId(1),
        seats: vec![SeatId(id * 10)],
        status: ReservationStatus::Pending,
        total_price: Some(12.5),
        created_at: None,
    }
}

pub fn ticket(id: i64, reservation_id: i64) -> Ticket {
    Ticket {
        id: TicketId(id),
        reservation_id: ReservationId(reservation_id),
        seat_id: None,
        code: format!("TCK-{id}"),
    }
}

pub fn payment(id: i64, reservation_id: Option<i64>) -> Payment {
    Payment {
        id: PaymentId(id),
        reservation_id: reservation_id.map(ReservationId),
        amount: 25.0,
        method: Some("card".to_string()),
        status: "completed".to_string(),
        paid_at: None,
    }
}
