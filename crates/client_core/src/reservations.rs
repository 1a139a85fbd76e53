use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use shared::{
    domain::{Payment, Reservation, ReservationId, ScreeningId, Ticket, TicketId},
    protocol::{PaymentRequest, ReservationDraft},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    activity::Activity,
    cache::{CacheEntity, DependentMap, IndexedCache},
    error::GatewayError,
    gateway::Gateway,
};

impl CacheEntity for Reservation {
    type Id = ReservationId;
    type IndexKey = ScreeningId;

    fn id(&self) -> ReservationId {
        self.id
    }

    fn index_keys(&self) -> Vec<ScreeningId> {
        vec![self.screening_id]
    }
}

/// File name a downloaded ticket is saved under.
pub fn ticket_file_name(ticket_id: TicketId) -> String {
    format!("ticket-{}.pdf", ticket_id.0)
}

#[derive(Default)]
struct ReservationState {
    cache: IndexedCache<Reservation>,
    tickets: DependentMap<ReservationId, Vec<Ticket>>,
    payments: DependentMap<ReservationId, Payment>,
}

/// The signed-in user's reservations plus per-screening listings, with the
/// tickets and payment owned by each reservation.
pub struct ReservationStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    state: RwLock<ReservationState>,
}

impl ReservationStore {
    pub fn new(gateway: Arc<dyn Gateway>, activity: Arc<Activity>) -> Self {
        Self {
            gateway,
            activity,
            state: RwLock::new(ReservationState::default()),
        }
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.read().await.cache.all().to_vec()
    }

    pub async fn current_reservation(&self) -> Option<Reservation> {
        self.state.read().await.cache.current().cloned()
    }

    pub async fn reservations_by_screening(&self, screening_id: ScreeningId) -> Vec<Reservation> {
        self.state.read().await.cache.bucket(&screening_id).to_vec()
    }

    pub async fn tickets(&self, reservation_id: ReservationId) -> Option<Vec<Ticket>> {
        self.state.read().await.tickets.get(&reservation_id).cloned()
    }

    pub async fn payment(&self, reservation_id: ReservationId) -> Option<Payment> {
        self.state.read().await.payments.get(&reservation_id).cloned()
    }

    pub async fn with_cache<R>(&self, f: impl FnOnce(&IndexedCache<Reservation>) -> R) -> R {
        f(&self.state.read().await.cache)
    }

    pub async fn fetch_user_reservations(&self) -> Result<Vec<Reservation>, GatewayError> {
        const ACTION: &str = "reservations.fetch_all";
        let _busy = self.activity.begin(ACTION);
        let reservations = self
            .activity
            .settle(
                ACTION,
                "Failed to load reservations",
                self.gateway.list_reservations().await,
            )
            .await?;
        debug!(count = reservations.len(), "reservations: loaded");
        self.state
            .write()
            .await
            .cache
            .replace_all(reservations.clone());
        Ok(reservations)
    }

    pub async fn fetch_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation, GatewayError> {
        const ACTION: &str = "reservations.fetch_one";
        let _busy = self.activity.begin(ACTION);
        let reservation = self
            .activity
            .settle(
                ACTION,
                "Failed to load reservation details",
                self.gateway.get_reservation(reservation_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_current(Some(reservation.clone()));
        Ok(reservation)
    }

    pub async fn fetch_screening_reservations(
        &self,
        screening_id: ScreeningId,
    ) -> Result<Vec<Reservation>, GatewayError> {
        const ACTION: &str = "reservations.fetch_by_screening";
        let _busy = self.activity.begin(ACTION);
        let reservations = self
            .activity
            .settle(
                ACTION,
                "Failed to load session reservations",
                self.gateway
                    .list_reservations_by_screening(screening_id)
                    .await,
            )
            .await?;
        self.state
            .write()
            .await
            .cache
            .replace_index(screening_id, reservations.clone());
        Ok(reservations)
    }

    pub async fn fetch_reservation_tickets(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Vec<Ticket>, GatewayError> {
        const ACTION: &str = "reservations.fetch_tickets";
        let _busy = self.activity.begin(ACTION);
        let tickets = self
            .activity
            .settle(
                ACTION,
                "Failed to load reservation tickets",
                self.gateway.list_reservation_tickets(reservation_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .tickets
            .replace(reservation_id, tickets.clone());
        Ok(tickets)
    }

    pub async fn fetch_reservation_payment(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Payment, GatewayError> {
        const ACTION: &str = "reservations.fetch_payment";
        let _busy = self.activity.begin(ACTION);
        let payment = self
            .activity
            .settle(
                ACTION,
                "Failed to load reservation payment",
                self.gateway.get_reservation_payment(reservation_id).await,
            )
            .await?;
        self.state
            .write()
            .await
            .payments
            .replace(reservation_id, payment.clone());
        Ok(payment)
    }

    pub async fn create_reservation(
        &self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        const ACTION: &str = "reservations.create";
        let _busy = self.activity.begin(ACTION);
        let reservation = self
            .activity
            .settle(
                ACTION,
                "Failed to create reservation",
                self.gateway.create_reservation(draft).await,
            )
            .await?;
        info!(
            reservation_id = reservation.id.0,
            screening_id = reservation.screening_id.0,
            seats = reservation.seats.len(),
            "reservations: created"
        );
        self.state.write().await.cache.insert(reservation.clone());
        Ok(reservation)
    }

    pub async fn update_reservation(
        &self,
        reservation_id: ReservationId,
        draft: &ReservationDraft,
    ) -> Result<Reservation, GatewayError> {
        const ACTION: &str = "reservations.update";
        let _busy = self.activity.begin(ACTION);
        let reservation = self
            .activity
            .settle(
                ACTION,
                "Failed to update reservation",
                self.gateway
                    .update_reservation(reservation_id, draft)
                    .await,
            )
            .await?;
        self.state.write().await.cache.replace(reservation.clone());
        info!(reservation_id = reservation.id.0, "reservations: updated");
        Ok(reservation)
    }

    /// Cancels remotely, then forgets the reservation together with its
    /// tickets and payment.
    pub async fn cancel_reservation(&self, reservation_id: ReservationId) -> Result<(), GatewayError> {
        const ACTION: &str = "reservations.cancel";
        let _busy = self.activity.begin(ACTION);
        self.activity
            .settle(
                ACTION,
                "Failed to cancel reservation",
                self.gateway.cancel_reservation(reservation_id).await,
            )
            .await?;
        {
            let mut state = self.state.write().await;
            state.cache.remove(reservation_id);
            state.tickets.remove(&reservation_id);
            state.payments.remove(&reservation_id);
        }
        info!(reservation_id = reservation_id.0, "reservations: cancelled");
        Ok(())
    }

    /// Pays for a reservation. The returned payment is cached under the
    /// reservation it names, if any.
    pub async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, GatewayError> {
        const ACTION: &str = "reservations.process_payment";
        let _busy = self.activity.begin(ACTION);
        let payment = self
            .activity
            .settle(
                ACTION,
                "Payment processing failed",
                self.gateway.process_payment(request).await,
            )
            .await?;
        info!(
            payment_id = payment.id.0,
            reservation_id = payment.reservation_id.map(|id| id.0),
            amount = payment.amount,
            "reservations: payment processed"
        );
        if let Some(reservation_id) = payment.reservation_id {
            self.state
                .write()
                .await
                .payments
                .replace(reservation_id, payment.clone());
        }
        Ok(payment)
    }

    pub async fn download_ticket(&self, ticket_id: TicketId) -> Result<Vec<u8>, GatewayError> {
        const ACTION: &str = "reservations.download_ticket";
        let _busy = self.activity.begin(ACTION);
        let pdf = self
            .activity
            .settle(
                ACTION,
                "Failed to download ticket",
                self.gateway.download_ticket(ticket_id).await,
            )
            .await?;
        debug!(ticket_id = ticket_id.0, bytes = pdf.len(), "reservations: ticket downloaded");
        Ok(pdf)
    }

    /// Downloads a ticket into `dir` as `ticket-{id}.pdf` and returns the
    /// written path.
    pub async fn save_ticket(&self, ticket_id: TicketId, dir: &Path) -> anyhow::Result<PathBuf> {
        let pdf = self.download_ticket(ticket_id).await?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create ticket directory '{}'", dir.display()))?;
        let path = dir.join(ticket_file_name(ticket_id));
        tokio::fs::write(&path, &pdf)
            .await
            .with_context(|| format!("failed to write ticket '{}'", path.display()))?;
        info!(ticket_id = ticket_id.0, path = %path.display(), "reservations: ticket saved");
        Ok(path)
    }
}

#[cfg(test)]
#[path = "tests/reservations_tests.rs"]
mod tests;
