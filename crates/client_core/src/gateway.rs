use async_trait::async_trait;
use shared::{
    domain::{
        Movie, MovieId, Payment, Reservation, ReservationId, Screening, ScreeningId, Seat, Theater,
        TheaterId, Ticket, TicketId, User, UserId,
    },
    protocol::{
        AuthResponse, Credentials, DashboardSummary, MovieDraft, MovieRevenue, PaymentRequest,
        ProfileUpdate, Registration, ReservationDraft, RoleUpdate, ScreeningDraft,
        ScreeningOccupancy, TheaterDraft, TokenResponse,
    },
};

use crate::error::GatewayError;

/// Remote operations of the booking API, one per REST resource action.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, GatewayError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, GatewayError>;
    async fn logout(&self) -> Result<(), GatewayError>;
    async fn refresh_token(&self) -> Result<TokenResponse, GatewayError>;
    async fn get_profile(&self) -> Result<User, GatewayError>;
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, GatewayError>;
    async fn delete_account(&self) -> Result<(), GatewayError>;

    async fn list_movies(&self) -> Result<Vec<Movie>, GatewayError>;
    async fn list_popular_movies(&self) -> Result<Vec<Movie>, GatewayError>;
    async fn get_movie(&self, id: MovieId) -> Result<Movie, GatewayError>;
    async fn list_movies_by_genre(&self, genre: &str) -> Result<Vec<Movie>, GatewayError>;
    async fn create_movie(&self, draft: &MovieDraft) -> Result<Movie, GatewayError>;
    async fn update_movie(&self, id: MovieId, draft: &MovieDraft) -> Result<Movie, GatewayError>;
    async fn delete_movie(&self, id: MovieId) -> Result<(), GatewayError>;

    async fn list_screenings(&self) -> Result<Vec<Screening>, GatewayError>;
    async fn get_screening(&self, id: ScreeningId) -> Result<Screening, GatewayError>;
    async fn list_screenings_by_movie(
        &self,
        movie_id: MovieId,
    ) -> Result<Vec<Screening>, GatewayError>;
    async fn list_screenings_by_theater(
        &self,
        theater_id: TheaterId,
    ) -> Result<Vec<Screening>, GatewayError>;
    async fn list_available_seats(&self, id: ScreeningId) -> Result<Vec<Seat>, GatewayError>;
    async fn create_screening(&self, draft: &ScreeningDraft) -> Result<Screening, GatewayError>;
    async fn update_screening(
        &self,
        id: ScreeningId,
        draft: &ScreeningDraft,
    ) -> Result<Screening, GatewayError>;
    async fn delete_screening(&self, id: ScreeningId) -> Result<(), GatewayError>;

    async fn list_theaters(&self) -> Result<Vec<Theater>, GatewayError>;
    async fn get_theater(&self, id: TheaterId) -> Result<Theater, GatewayError>;
    async fn list_theaters_by_type(&self, theater_type: &str)
        -> Result<Vec<Theater>, GatewayError>;
    async fn list_theater_seats(&self, id: TheaterId) -> Result<Vec<Seat>, GatewayError>;
    async fn create_theater(&self, draft: &TheaterDraft) -> Result<Theater, GatewayError>;
    async fn update_theater(
        &self,
        id: TheaterId,
        draft: &TheaterDraft,
    ) -> Result<Theater, GatewayError>;
    async fn delete_theater(&self, id: TheaterId) -> Result<(), GatewayError>;

    async fn list_reservations(&self) -> Result<Vec<Reservation>, GatewayError>;
    async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, GatewayError>;
    async fn list_reservations_by_screening(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Reservation>, GatewayError>;
    async fn create_reservation(
        &self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError>;
    async fn update_reservation(
        &self,
        id: ReservationId,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError>;
    async fn cancel_reservation(&self, id: ReservationId) -> Result<(), GatewayError>;
    async fn list_reservation_tickets(&self, id: ReservationId)
        -> Result<Vec<Ticket>, GatewayError>;
    async fn get_reservation_payment(&self, id: ReservationId) -> Result<Payment, GatewayError>;
    async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, GatewayError>;
    async fn download_ticket(&self, id: TicketId) -> Result<Vec<u8>, GatewayError>;

    async fn get_dashboard(&self) -> Result<DashboardSummary, GatewayError>;
    async fn list_screening_occupancy(&self) -> Result<Vec<ScreeningOccupancy>, GatewayError>;
    async fn list_movie_revenue(&self) -> Result<Vec<MovieRevenue>, GatewayError>;
    async fn list_users(&self) -> Result<Vec<User>, GatewayError>;
    async fn update_user_role(
        &self,
        id: UserId,
        update: &RoleUpdate,
    ) -> Result<User, GatewayError>;
}
