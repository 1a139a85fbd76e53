//! Administrator read models. Each list is replaced wholesale on fetch.

use std::sync::Arc;

use shared::{
    domain::{Role, User, UserId},
    protocol::{DashboardSummary, MovieRevenue, RoleUpdate, ScreeningOccupancy},
};
use tokio::sync::RwLock;
use tracing::info;

use crate::{activity::Activity, error::GatewayError, gateway::Gateway};

#[derive(Default)]
struct AdminState {
    dashboard: Option<DashboardSummary>,
    occupancy: Vec<ScreeningOccupancy>,
    revenue: Vec<MovieRevenue>,
    users: Vec<User>,
}

pub struct AdminStore {
    gateway: Arc<dyn Gateway>,
    activity: Arc<Activity>,
    state: RwLock<AdminState>,
}

impl AdminStore {
    pub fn new(gateway: Arc<dyn Gateway>, activity: Arc<Activity>) -> Self {
        Self {
            gateway,
            activity,
            state: RwLock::new(AdminState::default()),
        }
    }

    pub async fn dashboard(&self) -> Option<DashboardSummary> {
        self.state.read().await.dashboard.clone()
    }

    pub async fn screening_occupancy(&self) -> Vec<ScreeningOccupancy> {
        self.state.read().await.occupancy.clone()
    }

    pub async fn movie_revenue(&self) -> Vec<MovieRevenue> {
        self.state.read().await.revenue.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.read().await.users.clone()
    }

    pub async fn fetch_dashboard(&self) -> Result<DashboardSummary, GatewayError> {
        const ACTION: &str = "admin.fetch_dashboard";
        let _busy = self.activity.begin(ACTION);
        let summary = self
            .activity
            .settle(
                ACTION,
                "Failed to load dashboard data",
                self.gateway.get_dashboard().await,
            )
            .await?;
        self.state.write().await.dashboard = Some(summary.clone());
        Ok(summary)
    }

    pub async fn fetch_screening_occupancy(&self) -> Result<Vec<ScreeningOccupancy>, GatewayError> {
        const ACTION: &str = "admin.fetch_occupancy";
        let _busy = self.activity.begin(ACTION);
        let occupancy = self
            .activity
            .settle(
                ACTION,
                "Failed to load session occupancy data",
                self.gateway.list_screening_occupancy().await,
            )
            .await?;
        self.state.write().await.occupancy = occupancy.clone();
        Ok(occupancy)
    }

    pub async fn fetch_movie_revenue(&self) -> Result<Vec<MovieRevenue>, GatewayError> {
        const ACTION: &str = "admin.fetch_revenue";
        let _busy = self.activity.begin(ACTION);
        let revenue = self
            .activity
            .settle(
                ACTION,
                "Failed to load movie revenue data",
                self.gateway.list_movie_revenue().await,
            )
            .await?;
        self.state.write().await.revenue = revenue.clone();
        Ok(revenue)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>, GatewayError> {
        const ACTION: &str = "admin.fetch_users";
        let _busy = self.activity.begin(ACTION);
        let users = self
            .activity
            .settle(
                ACTION,
                "Failed to load users",
                self.gateway.list_users().await,
            )
            .await?;
        self.state.write().await.users = users.clone();
        Ok(users)
    }

    /// Changes a user's role. The cached user list is patched in place; a
    /// user missing from it is not added.
    pub async fn update_user_role(&self, user_id: UserId, role: Role) -> Result<User, GatewayError> {
        const ACTION: &str = "admin.update_user_role";
        let _busy = self.activity.begin(ACTION);
        let update = RoleUpdate { role };
        let user = self
            .activity
            .settle(
                ACTION,
                "Failed to update user role",
                self.gateway.update_user_role(user_id, &update).await,
            )
            .await?;
        if let Some(slot) = self
            .state
            .write()
            .await
            .users
            .iter_mut()
            .find(|existing| existing.id == user.id)
        {
            *slot = user.clone();
        }
        info!(user_id = user.id.0, role = user.role.as_str(), "admin: user role updated");
        Ok(user)
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
