//! Pet lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `PetApi`
//! operation over real HTTP through `ReqwestTransport`. Validates request
//! marshalling and response handling end-to-end.

use petstore_core::{
    ApiError, Configuration, GetOptions, Pet, PetApi, Requestor, TransportError,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    format!("http://{addr}/pet")
}

#[tokio::test]
async fn pet_lifecycle() {
    // Step 1: start mock server and point the client at it.
    let base_url = start_server().await;
    let requestor = Requestor::with_reqwest(Configuration::new(&base_url));
    let api = PetApi::new(&requestor);

    // Step 2: list, should be empty.
    let response = api.get(GetOptions::default()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.data.to_json(), serde_json::json!([]));

    // Step 3: create two pets.
    let created = api
        .post(Some(&Pet::new("Rex", 100)))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(created.status, 201);
    let created = created.data.to_json();
    assert_eq!(created["name"], "Rex");
    let rex_id = created["id"].as_str().unwrap().to_string();

    api.post(Some(&Pet::new("Tom", 7))).unwrap().await.unwrap();

    // Step 4: list with limit.
    let response = api.get(GetOptions { limit: Some(1) }).await.unwrap();
    let pets = response.data.to_json();
    assert_eq!(pets.as_array().unwrap().len(), 1);
    assert_eq!(pets[0]["name"], "Rex");
    assert_eq!(pets[0]["birthday"], 100);

    // Step 5: update by name.
    let updated = api
        .put(Some(&Pet::new("Rex", 200)))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(updated.data.to_json()["birthday"], 200);

    // Step 6: fetch by id sees the update.
    let fetched = api.get_by_pet_id(rex_id.as_str()).unwrap().await.unwrap();
    let fetched = fetched.data.to_json();
    assert_eq!(fetched["id"], rex_id.as_str());
    assert_eq!(fetched["birthday"], 200);

    // Step 7: unknown id, should be a 404 status error.
    let err = api
        .get_by_pet_id("00000000-0000-0000-0000-000000000000")
        .unwrap()
        .await
        .unwrap_err();
    assert!(err.transport().is_some_and(TransportError::is_not_found));

    // Step 8: updating a pet that does not exist is also a 404.
    let err = api
        .put(Some(&Pet::new("Ghost", 1)))
        .unwrap()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Transport(TransportError::Status { status: 404, .. })
    ));

    // Step 9: full list holds both pets.
    let response = api.get(GetOptions::default()).await.unwrap();
    assert_eq!(response.data.to_json().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let requestor = Requestor::with_reqwest(Configuration::new(&format!("http://{addr}/pet")));
    let err = PetApi::new(&requestor)
        .get(GetOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Transport(TransportError::Network(_))
    ));
}
