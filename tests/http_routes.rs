mod common;

use axum::routing::get;
use common::{JPEG, StubSearch, harness};
use virtual_tourist_rmcp::{Pin, web_routes};

#[tokio::test]
async fn serves_pins_and_resolved_images() {
    let h = harness(StubSearch::new(1, 2));
    let pin = h.workflow.create_pin(35.68, 139.69).await.unwrap();
    let album = h.workflow.ensure_album(pin.id).await.unwrap();

    let router = axum::Router::new()
        .route("/pins", get(web_routes::list_pins))
        .route("/pins/{pin_id}/photos/{photo_id}", get(web_routes::photo_image))
        .with_state(h.workflow.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let pins: Vec<Pin> = reqwest::get(format!("{base}/pins"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pins, vec![pin.clone()]);

    let response = reqwest::get(format!("{base}/pins/{}/photos/{}", pin.id, album.photos[0].id))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/jpeg"
    );
    assert!(response.bytes().await.unwrap().starts_with(JPEG));
    assert_eq!(h.client.download_count(), 1);

    let missing = reqwest::get(format!("{base}/pins/{}/photos/{}", pin.id, uuid::Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    h.client.fail_download(&album.photos[1].image_url);
    let failed = reqwest::get(format!("{base}/pins/{}/photos/{}", pin.id, album.photos[1].id))
        .await
        .unwrap();
    assert_eq!(failed.status(), 502);
}
