//! A [Simpest] processor to make OAuth2 authenticated [JSON:API] requests.
//!
//! This processor first exchanges a set of OAuth2 password grant credentials
//! for an access token, at the `oauth/token` endpoint of the server. It then
//! uses that token to make a single GET, POST or PATCH request to a JSON:API
//! endpoint, and returns the decoded response document.
//!
//! The token is only kept for the lifetime of the request. There is no support
//! for refresh tokens, token caching or retries.
//!
//! [Simpest]: simpest_core
//! [JSON:API]: https://jsonapi.org/
//!
//! # Examples
//!
//! ## POST
//!
//! Create a new page, using the credentials of an administrator.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use simpest_core::{Context, Processor};
//! use simpest_processor_jsonapi_request::{JsonApiRequest, Method};
//! use serde_json::json;
//!
//! let context = Context::from_environment();
//!
//! let processor = JsonApiRequest {
//!     server: "http://localhost/lightning_api/docroot".to_owned(),
//!     endpoint: "jsonapi/node/page".to_owned(),
//!     method: Method::POST,
//!     client_options: json!({
//!         "form_params": {
//!             "grant_type": "password",
//!             "client_id": "0a3e5c1b",
//!             "client_secret": "secret",
//!             "username": "admin",
//!             "password": "admin",
//!         }
//!     }),
//!     post_data: Some(json!({
//!         "data": {
//!             "type": "node--page",
//!             "attributes": { "title": "Hello" },
//!         }
//!     })),
//! };
//!
//! let output = processor.run(&context)?.expect("document");
//! println!("created {}", output.id().unwrap_or_default());
//! #     Ok(())
//! # }
//! ```
//!
//! ## Using your own HTTP client
//!
//! The [`Request`] orchestrator works with any [`HttpClient`]. The processor
//! uses [`ReqwestClient`] by default, but [`JsonApiRequest::run_with`] accepts
//! any other implementation.
#![deny(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    future_incompatible,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unsafe_code,
    unused_import_braces,
    trivial_casts,
    trivial_numeric_casts,
    missing_debug_implementations
)]
#![warn(
    unused_results,
    unused_qualifications,
    unreachable_pub,
    variant_size_differences
)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]
#![doc(html_root_url = "https://docs.rs/simpest-processor-jsonapi-request/0.1.0")]

mod client;
mod headers;
mod request;

pub use crate::client::{HttpClient, ReqwestClient, RequestOptions, Response};
pub use crate::headers::{Header, HeaderName};
pub use crate::request::{
    decode_response, validate_post_data, validate_server, ClientOptions, Request,
    REQUIRED_CLIENT_KEYS, TOKEN_ENDPOINT,
};

use log::debug;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simpest_core::{Context, Processor};
use std::{error, fmt, str::FromStr};

/// The media type of JSON:API documents.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// The processor configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JsonApiRequest {
    /// The server to make the request to, including the protocol.
    pub server: String,

    /// The endpoint, relative to the server.
    pub endpoint: String,

    /// The HTTP method (GET, POST or PATCH) to use.
    pub method: Method,

    /// The OAuth2 client options, with the password grant credentials stored
    /// in a `form_params` map.
    pub client_options: Value,

    /// The optional JSON body of a POST or PATCH request.
    ///
    /// This value is ignored for GET requests.
    pub post_data: Option<Value>,
}

/// The HTTP methods supported by the processor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::upper_case_acronyms)]
pub enum Method {
    /// The GET request method.
    GET,

    /// The PATCH request method.
    PATCH,

    /// The POST request method.
    POST,
}

impl Method {
    /// The lowercase name of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::GET => "get",
            Method::PATCH => "patch",
            Method::POST => "post",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::GET),
            "patch" => Ok(Method::PATCH),
            "post" => Ok(Method::POST),
            _ => Err(Error::InvalidArgument(format!(
                "unsupported method \"{}\", expected one of: get, post, patch",
                s
            ))),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => Self::GET,
            Method::PATCH => Self::PATCH,
            Method::POST => Self::POST,
        }
    }
}

/// A decoded JSON:API response document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Document(Value);

impl Document {
    /// Wrap a decoded JSON value.
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `id` of the primary resource, found at `data.id`.
    pub fn id(&self) -> Option<&str> {
        self.0.pointer("/data/id").and_then(Value::as_str)
    }

    /// A reference to the decoded JSON value.
    pub const fn value(&self) -> &Value {
        &self.0
    }

    /// Consume the document, returning the decoded JSON value.
    #[allow(clippy::missing_const_for_fn)]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = serde_json::to_string_pretty(&self.0).map_err(|_| fmt::Error)?;

        f.write_str(&string)
    }
}

impl JsonApiRequest {
    /// Run the processor using the given HTTP client.
    ///
    /// The flow is always the same: validate the configuration, fetch a token,
    /// attach the post data (for POST and PATCH requests only), and perform the
    /// request.
    ///
    /// # Errors
    ///
    /// See [`Processor::run`](#method.run).
    pub fn run_with<C: HttpClient>(&self, client: C) -> Result<Option<Document>, Error> {
        let mut request = Request::new(&self.server, client)?;

        request.set_client_options(&self.client_options)?;
        let _ = request.fetch_and_store_token()?;

        if self.method != Method::GET {
            if let Some(data) = &self.post_data {
                request.set_post_data(data)?;
            }
        }

        let value = request.perform(&self.endpoint, self.method)?;

        if value.is_null() {
            debug!("{} {} returned a null document", self.method, self.endpoint);
            Ok(None)
        } else {
            Ok(Some(Document::new(value)))
        }
    }
}

impl<'a> Processor<'a> for JsonApiRequest {
    const NAME: &'static str = "JSON:API Request";

    type Error = Error;
    type Output = Document;

    /// Validate the `JsonApiRequest` configuration, without making any
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the server does not include the
    /// `http://` or `https://` protocol, if the client options lack any of the
    /// [`REQUIRED_CLIENT_KEYS`], or if the post data is not a map.
    fn validate(&self) -> Result<(), Self::Error> {
        validate_server(&self.server)?;
        let _ = ClientOptions::from_value(&self.client_options)?;

        if let Some(data) = &self.post_data {
            validate_post_data(data)?;
        }

        Ok(())
    }

    /// Fetch a token, perform the configured request, and return the decoded
    /// response document.
    ///
    /// # Output
    ///
    /// If the response body is the JSON `null` value, `None` is returned.
    ///
    /// # Errors
    ///
    /// Any invalid configuration returns the same errors as [`validate`].
    ///
    /// If one of the requests fails, the [`Error::Response`] error variant is
    /// returned. If the server responds with a non-successful status code, the
    /// [`Error::Status`] variant is returned.
    ///
    /// If a response body is not valid JSON, the [`Error::BadResponse`] error
    /// variant is returned. If the token response has no `access_token`, the
    /// [`Error::Token`] variant is returned.
    ///
    /// [`validate`]: #method.validate
    fn run(&self, _context: &Context) -> Result<Option<Self::Output>, Self::Error> {
        self.validate()?;

        self.run_with(ReqwestClient::new()?)
    }
}

/// Represents all the ways that [`JsonApiRequest`] can fail.
///
/// This type is not intended to be exhaustively matched, and new variants may
/// be added in the future without a major version bump.
#[derive(Debug)]
pub enum Error {
    /// One of the provided arguments has an invalid format.
    InvalidArgument(String),

    /// The response body is not valid JSON. Contains the raw body.
    BadResponse(String, serde_json::Error),

    /// The token response did not contain an access token. Contains the raw
    /// body.
    Token(String),

    /// The request could not be completed.
    Response(reqwest::Error),

    /// The response status is not successful. Contains the status code and the
    /// raw body.
    Status(u16, String),

    /// One of the request headers has an invalid format.
    Header(String),

    /// The URL has an invalid format.
    Url(url::ParseError),

    #[doc(hidden)]
    __Unknown, // Match against _ instead, more variants may be added in the future.
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidArgument(ref err) => write!(f, "Invalid argument: {}", err),
            Error::BadResponse(ref body, ref err) => {
                write!(f, "Bad response ({}): {}", err, body)
            }
            Error::Token(ref body) => write!(f, "Missing access token in response: {}", body),
            Error::Response(ref err) => write!(f, "Response error: {}", err),
            Error::Status(status, _) => write!(f, "Invalid status code: {}", status),
            Error::Header(ref err) => write!(f, "Invalid header: {}", err),
            Error::Url(ref err) => write!(f, "URL error: {}", err),
            Error::__Unknown => unreachable!(),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::BadResponse(_, ref err) => Some(err),
            Error::Response(ref err) => Some(err),
            Error::Url(ref err) => Some(err),
            Error::InvalidArgument(_) | Error::Token(_) | Error::Status(..) | Error::Header(_) => {
                None
            }
            Error::__Unknown => unreachable!(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Response(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Url(err)
    }
}

impl From<header::InvalidHeaderValue> for Error {
    fn from(err: header::InvalidHeaderValue) -> Self {
        Error::Header(err.to_string())
    }
}
