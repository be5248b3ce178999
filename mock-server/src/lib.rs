//! In-memory pet store server mirroring the public pet store API.
//!
//! Pets are kept in insertion order so `limit` returns the oldest first.
//! Updates match on the pet's name, which is how the public service
//! identifies a pet in `PUT` bodies.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<i64>,
}

#[derive(Deserialize)]
pub struct NewPet {
    pub name: String,
    pub birthday: Option<i64>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub type Db = Arc<RwLock<Vec<Pet>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/pet", get(list_pets).post(create_pet).put(update_pet))
        .route("/pet/", get(list_pets).post(create_pet).put(update_pet))
        .route("/pet/{pet_id}", get(get_pet))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_pets(State(db): State<Db>, Query(params): Query<ListParams>) -> Json<Vec<Pet>> {
    let pets = db.read().await;
    let limit = params.limit.unwrap_or(pets.len());
    Json(pets.iter().take(limit).cloned().collect())
}

async fn create_pet(State(db): State<Db>, Json(input): Json<NewPet>) -> (StatusCode, Json<Pet>) {
    let pet = Pet {
        id: Uuid::new_v4(),
        name: input.name,
        birthday: input.birthday,
    };
    debug!(id = %pet.id, name = %pet.name, "created pet");
    db.write().await.push(pet.clone());
    (StatusCode::CREATED, Json(pet))
}

async fn update_pet(
    State(db): State<Db>,
    Json(input): Json<NewPet>,
) -> Result<Json<Pet>, StatusCode> {
    let mut pets = db.write().await;
    let pet = pets
        .iter_mut()
        .find(|pet| pet.name == input.name)
        .ok_or(StatusCode::NOT_FOUND)?;
    pet.birthday = input.birthday;
    Ok(Json(pet.clone()))
}

async fn get_pet(
    State(db): State<Db>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Pet>, StatusCode> {
    let pets = db.read().await;
    pets.iter()
        .find(|pet| pet.id == pet_id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
