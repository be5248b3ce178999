//! Pet store service operations.
//!
//! # Design
//! Each operation checks its required arguments up front and fails with
//! `MissingParameter` before any request is built. On success it returns an
//! [`ApiCall`], a boxed future that performs the request when awaited; wrap
//! it in [`with_callback`](crate::client::with_callback) for callback-style
//! consumption.

use futures::future::BoxFuture;
use serde::Serialize;

use crate::coerce::ResultShape;
use crate::client::{ApiResponse, RequestDescriptor, Requestor};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::params::{is_absent, ParamValue};
use crate::types::Pet;

/// A pending API call.
pub type ApiCall<'a> = BoxFuture<'a, Result<ApiResponse, ApiError>>;

const CONTENT_TYPES: [&str; 2] = ["application/json", "text/xml"];
const ACCEPTS: [&str; 2] = ["application/json", "text/html"];
const AUTH_NAMES: [&str; 0] = [];

/// Optional arguments of [`PetApi::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Maximum number of pets to return.
    pub limit: Option<i64>,
}

/// Typed access to the pet store resource.
#[derive(Debug, Clone, Copy)]
pub struct PetApi<'a> {
    requestor: &'a Requestor,
}

impl<'a> PetApi<'a> {
    pub fn new(requestor: &'a Requestor) -> Self {
        Self { requestor }
    }

    fn descriptor(method: HttpMethod, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, path)
            .auth_names(&AUTH_NAMES)
            .content_types(&CONTENT_TYPES)
            .accepts(&ACCEPTS)
            .result_shape(ResultShape::Opaque)
    }

    fn dispatch(&self, descriptor: RequestDescriptor) -> ApiCall<'a> {
        let requestor = self.requestor;
        Box::pin(async move { requestor.request(descriptor).await })
    }

    /// Lists pets, `GET /`.
    pub fn get(&self, options: GetOptions) -> ApiCall<'a> {
        let descriptor =
            Self::descriptor(HttpMethod::Get, "/").query_param("limit", options.limit);
        self.dispatch(descriptor)
    }

    /// Creates a pet, `POST /`.
    ///
    /// # Errors
    /// `MissingParameter` when `pet` is `None`.
    pub fn post(&self, pet: Option<&Pet>) -> Result<ApiCall<'a>, ApiError> {
        let pet = pet.ok_or(ApiError::MissingParameter {
            param: "pet",
            operation: "post",
        })?;
        let descriptor = Self::descriptor(HttpMethod::Post, "/").body(to_body(pet)?);
        Ok(self.dispatch(descriptor))
    }

    /// Updates a pet, `PUT /`.
    ///
    /// # Errors
    /// `MissingParameter` when `pet` is `None`.
    pub fn put(&self, pet: Option<&Pet>) -> Result<ApiCall<'a>, ApiError> {
        let pet = pet.ok_or(ApiError::MissingParameter {
            param: "pet",
            operation: "put",
        })?;
        let descriptor = Self::descriptor(HttpMethod::Put, "/").body(to_body(pet)?);
        Ok(self.dispatch(descriptor))
    }

    /// Fetches one pet, `GET /{petId}`.
    ///
    /// # Errors
    /// `MissingParameter` when `pet_id` is absent.
    pub fn get_by_pet_id(&self, pet_id: impl Into<ParamValue>) -> Result<ApiCall<'a>, ApiError> {
        let pet_id = pet_id.into();
        if is_absent(&pet_id) {
            return Err(ApiError::MissingParameter {
                param: "petId",
                operation: "getByPetId",
            });
        }
        let descriptor = Self::descriptor(HttpMethod::Get, "/{petId}").path_param("petId", pet_id);
        Ok(self.dispatch(descriptor))
    }
}

fn to_body(value: &impl Serialize) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))
}
