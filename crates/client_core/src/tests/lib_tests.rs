use super::*;
use crate::{notify::NotificationLevel, test_support::harness};
use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::protocol::Credentials;
use tokio::net::TcpListener;

async fn login() -> Json<Value> {
    Json(json!({
        "user": {"id": 1, "name": "Ada", "email": "ada@example.com", "role": "user"},
        "token": "tok-live"
    }))
}

async fn reservations(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer tok-live");
    if authorized {
        (
            StatusCode::OK,
            Json(json!([{"id": 3, "session_id": 9, "user_id": 1, "seats": [4], "status": "confirmed"}])),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."})))
    }
}

async fn spawn_booking_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/reservations", get(reservations));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

fn temp_db_url(name: &str) -> (std::path::PathBuf, String) {
    let dir = std::env::temp_dir().join(format!("cinema-client-{name}-{}", std::process::id()));
    let url = format!("sqlite://{}", dir.join("client.db").display());
    (dir, url)
}

#[tokio::test]
async fn connected_client_signs_requests_with_its_session() {
    let api_url = spawn_booking_server().await.expect("spawn server");
    let settings = Settings {
        api_url,
        storage_url: "sqlite::memory:".into(),
        request_timeout_secs: 5,
    };
    let client = CinemaClient::connect(&settings, Arc::new(RecordingNotifier::new()))
        .await
        .expect("connect");

    client
        .reservations()
        .fetch_user_reservations()
        .await
        .expect_err("anonymous request rejected");
    assert_eq!(client.activity().last_error().as_deref(), Some("Unauthenticated."));

    client
        .auth()
        .login(&Credentials {
            email: "ada@example.com".into(),
            password: "pw".into(),
        })
        .await
        .expect("login");
    let mine = client
        .reservations()
        .fetch_user_reservations()
        .await
        .expect("authorized request");

    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].screening_id.0, 9);
}

#[tokio::test]
async fn session_survives_reconnect() {
    let api_url = spawn_booking_server().await.expect("spawn server");
    let (dir, storage_url) = temp_db_url("reconnect");
    let settings = Settings {
        api_url,
        storage_url,
        request_timeout_secs: 5,
    };

    {
        let client = CinemaClient::connect(&settings, Arc::new(LogNotifier))
            .await
            .expect("connect");
        client
            .auth()
            .login(&Credentials {
                email: "ada@example.com".into(),
                password: "pw".into(),
            })
            .await
            .expect("login");
    }

    let client = CinemaClient::connect(&settings, Arc::new(LogNotifier))
        .await
        .expect("reconnect");
    assert!(client.session().is_authenticated());
    assert_eq!(client.session().token().as_deref(), Some("tok-live"));
    assert_eq!(client.navigate(&Route::Profile), Navigation::Allow);
    client
        .reservations()
        .fetch_user_reservations()
        .await
        .expect("restored token accepted");

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn unhandled_errors_show_generic_message() {
    let h = harness().await;

    h.client
        .report_unhandled(&anyhow::anyhow!("view exploded while rendering seat map"));

    let notes = h.notifier.snapshot();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert_eq!(notes[0].message, notify::GENERIC_ERROR_MESSAGE);
    assert_eq!(h.client.activity().last_error(), None);
}

#[tokio::test]
async fn stores_share_one_activity() {
    let h = harness().await;
    h.gateway
        .fail("list_theaters", GatewayError::Transport("down".into()));
    h.gateway
        .fail("get_dashboard", GatewayError::Transport("down".into()));
    let mut events = h.client.subscribe_events();

    let _ = h.client.theaters().fetch_theaters().await;
    let _ = h.client.admin().fetch_dashboard().await;

    assert_eq!(
        h.client.activity().last_error().as_deref(),
        Some("Failed to load dashboard data")
    );
    let actions: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            ClientEvent::Error { action, .. } => Some(action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec!["theaters.fetch_all", "admin.fetch_dashboard"]);
}
