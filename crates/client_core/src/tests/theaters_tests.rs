use super::*;
use crate::test_support::{harness, seat, theater};

fn ids(theaters: &[Theater]) -> Vec<i64> {
    theaters.iter().map(|theater| theater.id.0).collect()
}

#[tokio::test]
async fn in_place_update_creates_no_type_listing() {
    let h = harness().await;
    let mut renamed = theater(5, Some("IMAX"));
    renamed.name = "Dome".into();
    h.gateway.reply("list_theaters", vec![theater(5, Some("IMAX"))]);
    h.gateway.reply("update_theater", &renamed);

    let store = h.client.theaters();
    store.fetch_theaters().await.expect("all");
    store
        .update_theater(TheaterId(5), &TheaterDraft::default())
        .await
        .expect("update");

    assert_eq!(store.theaters().await[0].name, "Dome");
    assert!(
        !store
            .with_cache(|cache| cache.has_bucket(&"IMAX".to_string()))
            .await
    );
}

#[tokio::test]
async fn type_change_moves_theater_between_listings() {
    let h = harness().await;
    h.gateway.reply("list_theaters", vec![theater(5, Some("IMAX"))]);
    h.gateway
        .reply("list_theaters_by_type", vec![theater(5, Some("IMAX"))]);
    h.gateway.reply("list_theaters_by_type", Vec::<Theater>::new());
    h.gateway
        .reply("update_theater", theater(5, Some("Standard")));

    let store = h.client.theaters();
    store.fetch_theaters().await.expect("all");
    store.fetch_theaters_by_type("IMAX").await.expect("imax");
    store
        .fetch_theaters_by_type("Standard")
        .await
        .expect("standard");
    store
        .update_theater(
            TheaterId(5),
            &TheaterDraft {
                name: "Hall 5".into(),
                theater_type: Some("Standard".into()),
                ..TheaterDraft::default()
            },
        )
        .await
        .expect("update");

    assert!(store.theaters_by_type("IMAX").await.is_empty());
    assert_eq!(ids(&store.theaters_by_type("Standard").await), vec![5]);
    assert_eq!(
        h.gateway.calls(),
        vec![
            "list_theaters",
            "list_theaters_by_type:IMAX",
            "list_theaters_by_type:Standard",
            "update_theater:5",
        ]
    );
}

#[tokio::test]
async fn delete_drops_seat_map() {
    let h = harness().await;
    h.gateway
        .reply("list_theaters", vec![theater(1, None), theater(2, None)]);
    h.gateway
        .reply("list_theater_seats", vec![seat(1, "A", 1), seat(2, "A", 2)]);
    h.gateway.reply("list_theater_seats", vec![seat(3, "A", 1)]);
    h.gateway.reply("delete_theater", ());

    let store = h.client.theaters();
    store.fetch_theaters().await.expect("all");
    store
        .fetch_theater_seats(TheaterId(1))
        .await
        .expect("seats 1");
    store
        .fetch_theater_seats(TheaterId(2))
        .await
        .expect("seats 2");
    store.delete_theater(TheaterId(1)).await.expect("delete");

    assert_eq!(ids(&store.theaters().await), vec![2]);
    assert!(store.seats(TheaterId(1)).await.is_none());
    assert_eq!(store.seats(TheaterId(2)).await.map(|s| s.len()), Some(1));
}

#[tokio::test]
async fn created_theater_joins_matching_type_listing() {
    let h = harness().await;
    h.gateway.reply("list_theaters_by_type", vec![theater(1, Some("4DX"))]);
    h.gateway.reply("create_theater", theater(2, Some("4DX")));
    h.gateway.reply("get_theater", theater(2, Some("4DX")));

    let store = h.client.theaters();
    store.fetch_theaters_by_type("4DX").await.expect("4dx");
    store
        .create_theater(&TheaterDraft {
            name: "Hall 2".into(),
            theater_type: Some("4DX".into()),
            ..TheaterDraft::default()
        })
        .await
        .expect("create");
    store.fetch_theater(TheaterId(2)).await.expect("details");

    assert_eq!(ids(&store.theaters().await), vec![2]);
    assert_eq!(ids(&store.theaters_by_type("4DX").await), vec![1, 2]);
    assert_eq!(store.current_theater().await.map(|t| t.id), Some(TheaterId(2)));
}

#[tokio::test]
async fn type_failure_message_names_the_type() {
    let h = harness().await;
    h.gateway
        .fail("list_theaters_by_type", GatewayError::Transport("down".into()));

    let _ = h.client.theaters().fetch_theaters_by_type("IMAX").await;

    assert_eq!(
        h.client.activity().last_error().as_deref(),
        Some("Failed to load IMAX theaters")
    );
}
