//! Request marshalling and dispatch for the pet store API.
//!
//! # Design
//! `Requestor` holds a `Configuration` and a [`Transport`]. Each call is
//! split the same way as before: [`Requestor::build_request`] turns a
//! [`RequestDescriptor`] into a plain-data `HttpRequest` without touching
//! the network, then [`Requestor::request`] hands it to the transport and
//! coerces the response body through the descriptor's `ResultShape`.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, instrument, warn, Span};

use crate::auth::apply_auth;
use crate::coerce::{convert, ResultShape, TypedValue};
use crate::config::Configuration;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartPart, RequestBody, Transport};
use crate::params::{
    is_file_param, normalize, param_to_string, FilePart, ParamMap, ParamValue,
};
use crate::transport::ReqwestTransport;

const JSON_MIME: &str = "application/json";
const FORM_MIME: &str = "application/x-www-form-urlencoded";
const MULTIPART_MIME: &str = "multipart/form-data";

/// Characters left unescaped by `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([\w-]+)\}").expect("placeholder pattern is valid"));

static JSON_MIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^application/json(;.*)?$").expect("json mime pattern is valid")
});

/// Everything needed to issue one API call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub path_params: ParamMap,
    pub query_params: ParamMap,
    pub header_params: ParamMap,
    pub form_params: ParamMap,
    pub body: Option<Value>,
    pub auth_names: Vec<String>,
    pub content_types: Vec<String>,
    pub accepts: Vec<String>,
    pub result_shape: Option<ResultShape>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            path_params: ParamMap::new(),
            query_params: ParamMap::new(),
            header_params: ParamMap::new(),
            form_params: ParamMap::new(),
            body: None,
            auth_names: Vec::new(),
            content_types: Vec::new(),
            accepts: Vec::new(),
            result_shape: None,
        }
    }

    #[must_use]
    pub fn path_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.path_params.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.query_params.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn header_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.header_params.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn form_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.form_params.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn auth_names(mut self, names: &[&str]) -> Self {
        self.auth_names = names.iter().map(|name| name.to_string()).collect();
        self
    }

    #[must_use]
    pub fn content_types(mut self, types: &[&str]) -> Self {
        self.content_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    #[must_use]
    pub fn accepts(mut self, types: &[&str]) -> Self {
        self.accepts = types.iter().map(|t| t.to_string()).collect();
        self
    }

    #[must_use]
    pub fn result_shape(mut self, shape: ResultShape) -> Self {
        self.result_shape = Some(shape);
        self
    }
}

/// A successful response with its coerced payload.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// The raw response text.
    pub text: String,
    /// The body parsed as JSON, if it was JSON.
    pub body: Option<Value>,
    /// The body coerced through the request's `ResultShape`.
    pub data: TypedValue,
}

/// True for `application/json`, with or without parameters, in any case.
pub fn is_json_mime(content_type: &str) -> bool {
    JSON_MIME_PATTERN.is_match(content_type)
}

/// Picks the first JSON content type, otherwise the first candidate.
pub fn json_preferred_mime(content_types: &[String]) -> Option<&str> {
    content_types
        .iter()
        .find(|candidate| is_json_mime(candidate))
        .or_else(|| content_types.first())
        .map(String::as_str)
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Flattens normalized parameters into text pairs; sequences repeat the key.
fn text_pairs(params: &ParamMap, kind: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            ParamValue::Text(text) => pairs.push((key.clone(), text.clone())),
            ParamValue::Sequence(items) => {
                for item in items.iter().filter(|item| !item.is_absent()) {
                    if is_file_param(item) {
                        warn!(param = %key, kind, "file content cannot be sent as text, skipping");
                    } else {
                        pairs.push((key.clone(), param_to_string(item)));
                    }
                }
            }
            _ => warn!(param = %key, kind, "file content cannot be sent as text, skipping"),
        }
    }
    pairs
}

fn multipart_part(name: &str, value: &ParamValue) -> MultipartPart {
    match value {
        ParamValue::File(file) => MultipartPart::File {
            name: name.to_string(),
            file: file.clone(),
        },
        ParamValue::Bytes(bytes) => MultipartPart::File {
            name: name.to_string(),
            file: FilePart {
                file_name: None,
                content_type: None,
                content: bytes.clone(),
            },
        },
        other => MultipartPart::Field {
            name: name.to_string(),
            value: param_to_string(other),
        },
    }
}

fn multipart_parts(params: &ParamMap) -> Vec<MultipartPart> {
    let mut parts = Vec::new();
    for (key, value) in params {
        match value {
            ParamValue::Sequence(items) => parts.extend(
                items
                    .iter()
                    .filter(|item| !item.is_absent())
                    .map(|item| multipart_part(key, item)),
            ),
            other => parts.push(multipart_part(key, other)),
        }
    }
    parts
}

/// Issues API calls described by [`RequestDescriptor`]s.
pub struct Requestor {
    config: Configuration,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Requestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requestor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Requestor {
    pub fn new(config: Configuration, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    /// A requestor backed by a default [`ReqwestTransport`].
    pub fn with_reqwest(config: Configuration) -> Self {
        Self::new(config, ReqwestTransport::new())
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    /// Appends `path` to the base URL and substitutes `{name}` placeholders.
    ///
    /// Values are percent-encoded; placeholders without a value stay as
    /// they are. Query parameters are not handled here.
    pub fn build_url(&self, path: &str, path_params: &ParamMap) -> String {
        let url = if path.starts_with('/') {
            format!("{}{path}", self.config.base_url())
        } else {
            format!("{}/{path}", self.config.base_url())
        };
        PLACEHOLDER
            .replace_all(&url, |caps: &Captures<'_>| match path_params.get(&caps[1]) {
                Some(value) => {
                    utf8_percent_encode(&param_to_string(value), PATH_SEGMENT).to_string()
                }
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Assembles the plain-data request for `descriptor`.
    pub fn build_request(&self, descriptor: &RequestDescriptor) -> HttpRequest {
        let url = self.build_url(&descriptor.path, &descriptor.path_params);
        let mut request = HttpRequest::new(descriptor.method, url);

        apply_auth(
            &mut request,
            self.config.authentications(),
            &descriptor.auth_names,
        );

        request
            .query
            .extend(text_pairs(&normalize(&descriptor.query_params), "query"));

        for (name, value) in &self.config.default_headers {
            request.set_header(name.as_str(), value.as_str());
        }
        for (name, value) in normalize(&descriptor.header_params) {
            if is_file_param(&value) {
                warn!(
                    param = %name,
                    kind = "header",
                    "file content cannot be sent as text, skipping"
                );
                continue;
            }
            request.set_header(name, param_to_string(&value));
        }

        request.timeout = Some(self.config.timeout);

        let content_type = json_preferred_mime(&descriptor.content_types);
        match content_type {
            Some(content_type) => request.set_header("Content-Type", content_type),
            None if request.header("Content-Type").is_none() => {
                request.set_header("Content-Type", JSON_MIME);
            }
            None => {}
        }

        let essence = content_type.map(mime_essence);
        request.body = match essence.as_deref() {
            Some(FORM_MIME) => Some(RequestBody::Form(text_pairs(
                &normalize(&descriptor.form_params),
                "form",
            ))),
            Some(MULTIPART_MIME) => Some(RequestBody::Multipart(multipart_parts(&normalize(
                &descriptor.form_params,
            )))),
            _ => descriptor.body.clone().map(|body| match body {
                Value::String(text) => RequestBody::Text(text),
                other => RequestBody::Json(other),
            }),
        };
        debug!(
            content_type = ?content_type,
            has_body = request.body.is_some(),
            "encoded request body"
        );

        if let Some(accept) = json_preferred_mime(&descriptor.accepts) {
            request.set_header("Accept", accept);
        }

        request
    }

    /// Executes `descriptor` and coerces the response body.
    ///
    /// # Errors
    /// Transport failures and non-2xx responses are returned unmodified as
    /// `ApiError::Transport`; nothing is deserialized in that case.
    #[instrument(
        name = "pet_store_request",
        skip_all,
        fields(
            http.method = %descriptor.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let request = self.build_request(&descriptor);
        Span::current().record("http.url", request.url.as_str());

        let response = self.transport.execute(request).await.map_err(|e| {
            warn!(error = %e, "request failed");
            e
        })?;
        Span::current().record("http.status_code", response.status);
        check_status(&response)?;

        Ok(Self::deserialize(response, descriptor.result_shape.as_ref()))
    }

    /// Parses the body (falling back to the raw text) and coerces it.
    ///
    /// Only JSON responses are parsed. A response without a `Content-Type`
    /// is treated as JSON; any other type keeps its raw text.
    pub fn deserialize(response: HttpResponse, shape: Option<&ResultShape>) -> ApiResponse {
        let is_json = response.header("content-type").is_none_or(is_json_mime);
        let body = if response.body.is_empty() || !is_json {
            None
        } else {
            serde_json::from_str::<Value>(&response.body).ok()
        };
        let data = match shape {
            Some(shape) => {
                let raw = body
                    .clone()
                    .unwrap_or_else(|| Value::String(response.body.clone()));
                convert(&raw, shape)
            }
            None => TypedValue::Null,
        };
        ApiResponse {
            status: response.status,
            headers: response.headers,
            text: response.body,
            body,
            data,
        }
    }
}

/// Map non-2xx status codes to a transport error carrying the raw body.
fn check_status(response: &HttpResponse) -> Result<(), TransportError> {
    if response.is_success() {
        return Ok(());
    }
    warn!(status = response.status, "server returned an error status");
    Err(TransportError::Status {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Awaits `call`, hands the outcome to `callback`, then returns it.
///
/// Lets callback-style consumers observe a call without giving up the
/// returned result.
pub async fn with_callback<F, C>(call: F, callback: C) -> Result<ApiResponse, ApiError>
where
    F: Future<Output = Result<ApiResponse, ApiError>>,
    C: FnOnce(Result<&ApiResponse, &ApiError>),
{
    let result = call.await;
    callback(result.as_ref());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthLocation, AuthScheme};
    use crate::coerce::PrimitiveType;
    use crate::types::Pet;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Records every request and answers with a canned response.
    struct StubTransport {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        reply: Result<HttpResponse, TransportError>,
    }

    impl StubTransport {
        fn replying(status: u16, body: &str) -> (Self, Arc<Mutex<Vec<HttpRequest>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let stub = Self {
                seen: Arc::clone(&seen),
                reply: Ok(HttpResponse {
                    status,
                    headers: vec![("content-type".to_string(), JSON_MIME.to_string())],
                    body: body.to_string(),
                }),
            };
            (stub, seen)
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn requestor() -> Requestor {
        let (stub, _) = StubTransport::replying(200, "{}");
        Requestor::new(Configuration::new("http://host/pet"), stub)
    }

    fn params(entries: Vec<(&str, ParamValue)>) -> ParamMap {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn build_url_substitutes_path_params() {
        let url = requestor().build_url("/{petId}", &params(vec![("petId", 42.into())]));
        assert_eq!(url, "http://host/pet/42");
    }

    #[test]
    fn build_url_leaves_unresolved_placeholders() {
        let url = requestor().build_url("/{missing}", &ParamMap::new());
        assert_eq!(url, "http://host/pet/{missing}");
    }

    #[test]
    fn build_url_adds_leading_slash_and_encodes() {
        let url = requestor().build_url(
            "owners/{owner-name}/pets",
            &params(vec![("owner-name", "Jane Doe/2".into())]),
        );
        assert_eq!(url, "http://host/pet/owners/Jane%20Doe%2F2/pets");
    }

    #[test]
    fn json_is_preferred_among_candidates() {
        let types = vec!["text/xml".to_string(), "Application/JSON; charset=utf-8".to_string()];
        assert_eq!(json_preferred_mime(&types), Some("Application/JSON; charset=utf-8"));

        let types = vec!["text/xml".to_string(), "text/html".to_string()];
        assert_eq!(json_preferred_mime(&types), Some("text/xml"));
        assert_eq!(json_preferred_mime(&[]), None);
        assert!(!is_json_mime("application/jsonp"));
    }

    #[test]
    fn build_request_merges_headers_custom_wins() {
        let mut requestor = requestor();
        requestor
            .config_mut()
            .default_headers
            .insert("X-Env".to_string(), "prod".to_string());

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .header_param("x-env", "test")
            .header_param("X-Skip", ParamValue::Absent)
            .query_param("limit", 1)
            .query_param("offset", ParamValue::Absent)
            .accepts(&["text/html", JSON_MIME]);
        let req = requestor.build_request(&descriptor);

        assert_eq!(req.header("X-Env"), Some("test"));
        assert_eq!(req.header("User-Agent"), Some("ramc"));
        assert!(req.header("X-Skip").is_none());
        assert_eq!(req.query, vec![("limit".to_string(), "1".to_string())]);
        assert_eq!(req.header("Accept"), Some(JSON_MIME));
        assert_eq!(req.header("Content-Type"), Some(JSON_MIME));
        assert_eq!(req.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn header_sequences_are_joined() {
        let descriptor =
            RequestDescriptor::new(HttpMethod::Get, "/").header_param("X-Tags", vec!["a", "b"]);
        let req = requestor().build_request(&descriptor);
        assert_eq!(req.header("X-Tags"), Some("a,b"));
    }

    #[test]
    fn explicit_content_type_header_survives_without_candidates() {
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .header_param("Content-Type", "text/plain");
        let req = requestor().build_request(&descriptor);
        assert_eq!(req.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn content_type_candidates_override_header_param() {
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .header_param("content-type", "text/plain")
            .content_types(&["text/xml", JSON_MIME]);
        let req = requestor().build_request(&descriptor);

        assert_eq!(req.header("Content-Type"), Some(JSON_MIME));
        let content_types = req
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .count();
        assert_eq!(content_types, 1);
    }

    #[test]
    fn sequences_in_query_repeat_the_key() {
        let descriptor =
            RequestDescriptor::new(HttpMethod::Get, "/").query_param("tag", vec!["a", "b"]);
        let req = requestor().build_request(&descriptor);
        assert_eq!(
            req.query,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn urlencoded_content_type_sends_form_params() {
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .content_types(&[FORM_MIME])
            .form_param("name", "Rex")
            .form_param("birthday", 100)
            .form_param("nickname", ParamValue::Absent)
            .body(json!({"ignored": true}));
        let req = requestor().build_request(&descriptor);

        assert_eq!(req.header("Content-Type"), Some(FORM_MIME));
        assert_eq!(
            req.body,
            Some(RequestBody::Form(vec![
                ("birthday".to_string(), "100".to_string()),
                ("name".to_string(), "Rex".to_string()),
            ]))
        );
    }

    #[test]
    fn multipart_splits_files_from_fields() {
        let photo = FilePart::new("rex.png", Bytes::from_static(b"png"));
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .content_types(&[MULTIPART_MIME])
            .form_param("name", "Rex")
            .form_param("photo", photo.clone());
        let req = requestor().build_request(&descriptor);

        assert_eq!(
            req.body,
            Some(RequestBody::Multipart(vec![
                MultipartPart::Field {
                    name: "name".to_string(),
                    value: "Rex".to_string(),
                },
                MultipartPart::File {
                    name: "photo".to_string(),
                    file: photo,
                },
            ]))
        );
    }

    #[test]
    fn files_inside_sequences_stay_files() {
        let front = FilePart::new("front.png", Bytes::from_static(b"\x89PNG"));
        let raw = Bytes::from_static(b"\xff\xfe");
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .content_types(&[MULTIPART_MIME])
            .form_param(
                "photos",
                ParamValue::Sequence(vec![front.clone().into(), raw.clone().into()]),
            );
        let req = requestor().build_request(&descriptor);

        assert_eq!(
            req.body,
            Some(RequestBody::Multipart(vec![
                MultipartPart::File {
                    name: "photos".to_string(),
                    file: front,
                },
                MultipartPart::File {
                    name: "photos".to_string(),
                    file: FilePart {
                        file_name: None,
                        content_type: None,
                        content: raw,
                    },
                },
            ]))
        );
    }

    #[test]
    #[traced_test]
    fn files_inside_text_sequences_are_skipped() {
        let photo = FilePart::new("rex.png", Bytes::from_static(b"png"));
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/")
            .content_types(&[FORM_MIME])
            .form_param("tags", ParamValue::Sequence(vec!["a".into(), photo.into()]));
        let req = requestor().build_request(&descriptor);

        assert_eq!(
            req.body,
            Some(RequestBody::Form(vec![("tags".to_string(), "a".to_string())]))
        );
        assert!(logs_contain("file content cannot be sent as text"));
    }

    #[test]
    fn body_value_is_sent_for_other_content_types() {
        let descriptor = RequestDescriptor::new(HttpMethod::Put, "/")
            .content_types(&[JSON_MIME, "text/xml"])
            .body(json!({"name": "Rex"}));
        let req = requestor().build_request(&descriptor);
        assert_eq!(req.body, Some(RequestBody::Json(json!({"name": "Rex"}))));

        let descriptor = RequestDescriptor::new(HttpMethod::Put, "/")
            .content_types(&["text/xml"])
            .body(json!("<pet/>"));
        let req = requestor().build_request(&descriptor);
        assert_eq!(req.body, Some(RequestBody::Text("<pet/>".to_string())));
    }

    #[test]
    fn auth_is_applied_before_headers() {
        let mut requestor = requestor();
        requestor.config_mut().auth(
            None,
            AuthScheme::api_key("key", "abc").located(AuthLocation::Query),
        );
        let req = requestor.build_request(&RequestDescriptor::new(HttpMethod::Get, "/"));
        assert_eq!(req.query_value("key"), Some("abc"));
    }

    #[tokio::test]
    async fn request_coerces_body_with_result_shape() {
        let (stub, seen) = StubTransport::replying(200, r#"["a","b"]"#);
        let requestor = Requestor::new(Configuration::new("http://host/pet"), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .result_shape(ResultShape::array(PrimitiveType::String.into()));
        let response = requestor.request(descriptor).await.unwrap();

        assert_eq!(response.data.to_json(), json!(["a", "b"]));
        assert_eq!(response.body, Some(json!(["a", "b"])));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn request_falls_back_to_text_when_body_is_not_json() {
        let (stub, _) = StubTransport::replying(200, "42 pets");
        let requestor = Requestor::new(Configuration::default(), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .result_shape(PrimitiveType::Integer.into());
        let response = requestor.request(descriptor).await.unwrap();

        assert!(response.body.is_none());
        assert_eq!(response.data, TypedValue::Integer(42));
    }

    #[tokio::test]
    async fn non_json_responses_keep_their_text() {
        let (mut stub, _) = StubTransport::replying(200, "42");
        if let Ok(response) = &mut stub.reply {
            response.headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        }
        let requestor = Requestor::new(Configuration::default(), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .result_shape(ResultShape::Opaque);
        let response = requestor.request(descriptor).await.unwrap();

        assert!(response.body.is_none());
        assert_eq!(response.data, TypedValue::Opaque(json!("42")));
    }

    #[tokio::test]
    async fn responses_without_content_type_are_parsed_as_json() {
        let (mut stub, _) = StubTransport::replying(200, "42");
        if let Ok(response) = &mut stub.reply {
            response.headers.clear();
        }
        let requestor = Requestor::new(Configuration::default(), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .result_shape(ResultShape::Opaque);
        let response = requestor.request(descriptor).await.unwrap();

        assert_eq!(response.body, Some(json!(42)));
        assert_eq!(response.data, TypedValue::Opaque(json!(42)));
    }

    #[tokio::test]
    async fn request_without_shape_yields_null_data() {
        let (stub, _) = StubTransport::replying(200, r#"{"name":"Rex"}"#);
        let requestor = Requestor::new(Configuration::default(), stub);

        let response = requestor
            .request(RequestDescriptor::new(HttpMethod::Get, "/"))
            .await
            .unwrap();
        assert!(response.data.is_null());
        assert_eq!(response.text, r#"{"name":"Rex"}"#);
    }

    #[tokio::test]
    async fn custom_shape_builds_models() {
        let (stub, _) = StubTransport::replying(200, r#"{"name":"Rex","birthday":100}"#);
        let requestor = Requestor::new(Configuration::default(), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/{petId}")
            .path_param("petId", 1)
            .result_shape(Pet::shape());
        let response = requestor.request(descriptor).await.unwrap();
        assert_eq!(response.data.as_model::<Pet>(), Some(&Pet::new("Rex", 100)));
    }

    #[tokio::test]
    #[traced_test]
    async fn non_success_status_is_a_transport_error() {
        let (stub, _) = StubTransport::replying(404, "no such pet");
        let requestor = Requestor::new(Configuration::default(), stub);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/{petId}")
            .path_param("petId", 9)
            .result_shape(Pet::shape());
        let err = requestor.request(descriptor).await.unwrap_err();

        assert_eq!(
            err.transport(),
            Some(&TransportError::Status {
                status: 404,
                body: "no such pet".to_string(),
            })
        );
        assert!(logs_contain("server returned an error status"));
    }

    #[tokio::test]
    async fn transport_errors_are_surfaced_verbatim() {
        let stub = StubTransport {
            seen: Arc::new(Mutex::new(Vec::new())),
            reply: Err(TransportError::Timeout),
        };
        let requestor = Requestor::new(Configuration::default(), stub);

        let err = requestor
            .request(RequestDescriptor::new(HttpMethod::Get, "/"))
            .await
            .unwrap_err();
        assert_eq!(err.transport(), Some(&TransportError::Timeout));
    }

    #[tokio::test]
    async fn callback_sees_the_same_outcome_as_the_future() {
        let (stub, _) = StubTransport::replying(200, r#"["a"]"#);
        let requestor = Requestor::new(Configuration::default(), stub);
        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/")
            .result_shape(ResultShape::from_tag("[String]"));

        let mut observed = None;
        let result = with_callback(requestor.request(descriptor), |outcome| {
            observed = outcome.ok().map(|response| response.status);
        })
        .await;

        assert_eq!(observed, Some(200));
        assert_eq!(result.unwrap().data.to_json(), json!(["a"]));
    }
}
