use crate::{Error, Header, Method};
use log::debug;
use reqwest::{blocking, header};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// The options of a single HTTP call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestOptions {
    /// Headers to add to the request.
    pub headers: Vec<Header>,

    /// A JSON document to send as the request body.
    pub json: Option<Value>,

    /// Parameters to send as an `application/x-www-form-urlencoded` body.
    pub form_params: Option<BTreeMap<String, String>>,
}

/// The parts of an HTTP response the [`Request`](crate::Request) orchestrator
/// cares about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    /// The response status code.
    pub status: u16,

    /// The raw response body.
    pub body: String,
}

impl Response {
    /// Create a response from a status code and a body.
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

/// The HTTP client used to talk to the JSON:API server.
///
/// [`ReqwestClient`] is the implementation used at runtime. Implement this
/// trait yourself to observe or stub the calls made by the orchestrator.
pub trait HttpClient {
    /// Send a request using the given method.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the request could not be sent, or if
    /// the server did not respond successfully.
    fn send(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response, Error>;

    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    fn get(&self, url: &str, options: RequestOptions) -> Result<Response, Error> {
        self.send(Method::GET, url, options)
    }

    /// Send a POST request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    fn post(&self, url: &str, options: RequestOptions) -> Result<Response, Error> {
        self.send(Method::POST, url, options)
    }

    /// Send a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    fn patch(&self, url: &str, options: RequestOptions) -> Result<Response, Error> {
        self.send(Method::PATCH, url, options)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn send(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response, Error> {
        (**self).send(method, url, options)
    }
}

/// A blocking [`reqwest`] client.
///
/// Non-successful response statuses are returned as [`Error::Status`].
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: blocking::Client,
}

impl ReqwestClient {
    /// Create a client using the default `reqwest` configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] if the underlying client cannot be
    /// initialized, for example because the TLS backend is unavailable.
    pub fn new() -> Result<Self, Error> {
        let client = blocking::Client::builder().build()?;

        Ok(Self { client })
    }

    /// Create a client that gives up on requests after the given duration.
    ///
    /// # Errors
    ///
    /// See [`ReqwestClient::new`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = blocking::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response, Error> {
        let url = Url::from_str(url)?;
        debug!("sending {} request to {}", method, url);

        // headers
        let mut map = header::HeaderMap::new();
        for header in &options.headers {
            let _ = map.insert(
                header::HeaderName::from(header.name),
                header.value.as_str().parse::<header::HeaderValue>()?,
            );
        }

        let mut request = self.client.request(method.into(), url).headers(map);

        // body
        if let Some(params) = &options.form_params {
            request = request.form(params);
        }

        if let Some(json) = &options.json {
            request = request.json(json);
        }

        // response
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        debug!("received response with status {}", status);

        if !status.is_success() {
            return Err(Error::Status(status.as_u16(), body));
        }

        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}
