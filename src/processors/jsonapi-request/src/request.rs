use crate::client::{HttpClient, RequestOptions, Response};
use crate::{Error, Header, Method};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The endpoint, relative to the server, at which OAuth2 tokens are issued.
pub const TOKEN_ENDPOINT: &str = "oauth/token";

/// The form parameters every OAuth2 password grant must provide.
pub const REQUIRED_CLIENT_KEYS: [&str; 5] = [
    "grant_type",
    "client_id",
    "client_secret",
    "username",
    "password",
];

lazy_static! {
    static ref SERVER_PATTERN: Regex = Regex::new(r"^https?://").unwrap();
}

/// Validate that the server includes the `http://` or `https://` protocol.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the server has any other format.
pub fn validate_server(server: &str) -> Result<(), Error> {
    if SERVER_PATTERN.is_match(server) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "server must start with http:// or https://, got \"{}\"",
            server
        )))
    }
}

/// Validate that the post data is a JSON object.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for any other JSON value.
pub fn validate_post_data(data: &Value) -> Result<(), Error> {
    if data.is_object() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(
            "post data must be a map of values".to_owned(),
        ))
    }
}

/// OAuth2 password grant credentials, sent as form parameters to the token
/// endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    form_params: BTreeMap<String, String>,
}

impl ClientOptions {
    /// Build the client options from a value shaped like
    /// `{"form_params": {"grant_type": ..., ...}}`.
    ///
    /// Besides the [`REQUIRED_CLIENT_KEYS`], any other scalar form parameter
    /// (such as `scope`) is kept, and sent along to the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `form_params` is missing or not a
    /// map, if one of the required keys is missing or `null`, or if a
    /// parameter has a non-scalar value.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let params = value
            .get("form_params")
            .and_then(Value::as_object)
            .ok_or_else(|| missing_keys(&REQUIRED_CLIENT_KEYS))?;

        let missing: Vec<_> = REQUIRED_CLIENT_KEYS
            .iter()
            .copied()
            .filter(|key| params.get(*key).map_or(true, Value::is_null))
            .collect();

        if !missing.is_empty() {
            return Err(missing_keys(&missing));
        }

        let mut form_params = BTreeMap::new();
        for (key, value) in params {
            let value = match value {
                Value::String(string) => string.to_owned(),
                Value::Number(number) => number.to_string(),
                Value::Bool(boolean) => boolean.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::InvalidArgument(format!(
                        "client option \"{}\" must be a scalar value",
                        key
                    )))
                }
            };

            let _ = form_params.insert(key.to_owned(), value);
        }

        Ok(Self { form_params })
    }

    /// The form parameters sent to the token endpoint.
    pub const fn form_params(&self) -> &BTreeMap<String, String> {
        &self.form_params
    }
}

fn missing_keys(missing: &[&str]) -> Error {
    Error::InvalidArgument(format!(
        "client options must contain a \"form_params\" map with the keys: {} (missing: {})",
        REQUIRED_CLIENT_KEYS.join(", "),
        missing.join(", ")
    ))
}

/// Authenticates via OAuth2, and makes requests to JSON:API endpoints.
///
/// A `Request` is meant to be used for a single submission: configure it,
/// fetch a token, perform one request, and drop it.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use simpest_processor_jsonapi_request::{ReqwestClient, Request};
/// use serde_json::json;
///
/// let mut request = Request::new("https://api.example.com", ReqwestClient::new()?)?;
///
/// request.set_client_options(&json!({
///     "form_params": {
///         "grant_type": "password",
///         "client_id": "0a3e5c1b",
///         "client_secret": "secret",
///         "username": "admin",
///         "password": "admin",
///     }
/// }))?;
///
/// assert!(request.token().is_none());
/// #     Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Request<C> {
    client: C,
    server: String,
    client_options: Option<ClientOptions>,
    data: Option<Map<String, Value>>,
    token: Option<String>,
}

impl<C: HttpClient> Request<C> {
    /// Create a new request orchestrator for the given server.
    ///
    /// The server is the base URL of all requests, including the protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the server does not start with
    /// `http://` or `https://`.
    pub fn new(server: &str, client: C) -> Result<Self, Error> {
        validate_server(server)?;

        Ok(Self {
            client,
            server: server.to_owned(),
            client_options: None,
            data: None,
            token: None,
        })
    }

    /// Set the OAuth2 client options used by [`Request::fetch_and_store_token`].
    ///
    /// # Errors
    ///
    /// See [`ClientOptions::from_value`].
    pub fn set_client_options(&mut self, options: &Value) -> Result<(), Error> {
        self.client_options = Some(ClientOptions::from_value(options)?);

        Ok(())
    }

    /// Set the data to send as the JSON body of [`Request::perform`].
    ///
    /// An empty map is accepted, but results in a request without a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the data is not a map.
    pub fn set_post_data(&mut self, data: &Value) -> Result<(), Error> {
        validate_post_data(data)?;
        self.data = data.as_object().cloned();

        Ok(())
    }

    /// Get an OAuth2 token using the configured client options, and store it
    /// to authorize any subsequent request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no client options are set, and
    /// [`Error::Token`] if the response does not contain an `access_token`.
    ///
    /// Any error returned by the HTTP client or by
    /// [`decode_response`] is returned as-is.
    pub fn fetch_and_store_token(&mut self) -> Result<String, Error> {
        let options = self.client_options.as_ref().ok_or_else(|| {
            Error::InvalidArgument("client options must be set before fetching a token".to_owned())
        })?;

        let url = self.build_url(TOKEN_ENDPOINT);
        info!("fetching access token from {}", url);

        let response = self.client.post(
            &url,
            RequestOptions {
                form_params: Some(options.form_params().clone()),
                ..RequestOptions::default()
            },
        )?;

        let body = decode_response(&response)?;
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Token(response.body.clone()))?
            .to_owned();

        debug!(
            "received access token of type {}",
            body.get("token_type").and_then(Value::as_str).unwrap_or("unknown")
        );

        self.token = Some(token.clone());
        Ok(token)
    }

    /// Make a request to the API, using the stored token and post data, if
    /// any.
    ///
    /// If a token is stored, the `Authorization` and `Content-Type` headers
    /// are added. If post data is stored, it is sent as the JSON body.
    ///
    /// # Errors
    ///
    /// Any error returned by the HTTP client or by [`decode_response`] is
    /// returned as-is.
    pub fn perform(&self, endpoint: &str, method: Method) -> Result<Value, Error> {
        let mut options = RequestOptions::default();

        if let Some(token) = &self.token {
            options.headers = vec![Header::bearer(token), Header::json_api()];
        }

        if let Some(data) = self.data.as_ref().filter(|data| !data.is_empty()) {
            options.json = Some(Value::Object(data.clone()));
        }

        let url = self.build_url(endpoint);
        info!("performing {} request to {}", method, url);

        let response = match method {
            Method::GET => self.client.get(&url, options),
            Method::POST => self.client.post(&url, options),
            Method::PATCH => self.client.patch(&url, options),
        }?;

        decode_response(&response)
    }

    /// The server used in all requests.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The client options, if set.
    pub const fn client_options(&self) -> Option<&ClientOptions> {
        self.client_options.as_ref()
    }

    /// The post data, if set.
    pub const fn post_data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// The stored OAuth2 token, if one was fetched.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn build_url(&self, endpoint: &str) -> String {
        [self.server.as_str(), endpoint].join("/")
    }
}

/// Decode a JSON response.
///
/// # Errors
///
/// Returns [`Error::BadResponse`], carrying the raw body, if the body does not
/// contain valid JSON. The response status is not checked.
pub fn decode_response(response: &Response) -> Result<Value, Error> {
    serde_json::from_str(&response.body)
        .map_err(|err| Error::BadResponse(response.body.clone(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeaderName;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        method: Method,
        url: String,
        options: RequestOptions,
    }

    /// Records all calls, and answers them with the queued responses.
    #[derive(Debug, Default)]
    struct FakeClient {
        calls: RefCell<Vec<Call>>,
        responses: RefCell<Vec<Response>>,
    }

    impl FakeClient {
        fn with_responses(bodies: &[&str]) -> Self {
            let client = Self::default();
            client
                .responses
                .borrow_mut()
                .extend(bodies.iter().rev().map(|body| Response::new(200, body)));
            client
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl HttpClient for FakeClient {
        fn send(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response, Error> {
            self.calls.borrow_mut().push(Call {
                method,
                url: url.to_owned(),
                options,
            });

            self.responses
                .borrow_mut()
                .pop()
                .ok_or_else(|| Error::Status(500, "no response queued".to_owned()))
        }
    }

    fn client_options_stub() -> Value {
        json!({
            "form_params": {
                "grant_type": "password",
                "client_id": "0a3e5c1b",
                "client_secret": "secret",
                "username": "admin",
                "password": "admin",
            }
        })
    }

    mod new {
        use super::*;

        #[test]
        fn test_valid_servers() {
            for server in &["http://localhost", "https://api.example.com/docroot"] {
                let request = Request::new(server, FakeClient::default()).unwrap();

                assert_eq!(request.server(), *server);
            }
        }

        #[test]
        fn test_invalid_servers() {
            for server in &["", "localhost", "ftp://example.com", "api.example.com/http://"] {
                let error = Request::new(server, FakeClient::default()).unwrap_err();

                assert!(error.to_string().starts_with("Invalid argument: "));
            }
        }
    }

    mod set_client_options {
        use super::*;

        #[test]
        fn test_valid_options() {
            let mut request = Request::new("https://api.example.com", FakeClient::default()).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();

            let params = request.client_options().unwrap().form_params();

            assert_eq!(params.len(), 5);
            assert_eq!(params["grant_type"], "password");
        }

        #[test]
        fn test_each_missing_key() {
            for key in &REQUIRED_CLIENT_KEYS {
                let mut options = client_options_stub();
                let _ = options["form_params"].as_object_mut().unwrap().remove(*key);

                let mut request = Request::new("https://api.example.com", FakeClient::default()).unwrap();
                let error = request.set_client_options(&options).unwrap_err();

                assert!(error.to_string().contains(&format!("(missing: {})", key)));
                assert!(request.client_options().is_none());
            }
        }

        #[test]
        fn test_null_key_is_missing() {
            let mut options = client_options_stub();
            options["form_params"]["password"] = Value::Null;

            let error = ClientOptions::from_value(&options).unwrap_err();

            assert!(error.to_string().contains("(missing: password)"));
        }

        #[test]
        fn test_missing_form_params() {
            let options = client_options_stub()["form_params"].clone();

            let error = ClientOptions::from_value(&options).unwrap_err();

            assert!(error.to_string().contains("\"form_params\""));
        }

        #[test]
        fn test_extra_and_scalar_params() {
            let mut options = client_options_stub();
            options["form_params"]["client_id"] = json!(42);
            options["form_params"]["scope"] = json!("editor");

            let client_options = ClientOptions::from_value(&options).unwrap();

            assert_eq!(client_options.form_params()["client_id"], "42");
            assert_eq!(client_options.form_params()["scope"], "editor");
        }

        #[test]
        fn test_nested_param() {
            let mut options = client_options_stub();
            options["form_params"]["scope"] = json!(["a", "b"]);

            let error = ClientOptions::from_value(&options).unwrap_err();

            assert!(error.to_string().contains("\"scope\" must be a scalar value"));
        }
    }

    mod set_post_data {
        use super::*;

        #[test]
        fn test_map() {
            let mut request = Request::new("https://api.example.com", FakeClient::default()).unwrap();
            request.set_post_data(&json!({"data": {"type": "item"}})).unwrap();

            assert_eq!(
                request.post_data().unwrap()["data"],
                json!({"type": "item"})
            );
        }

        #[test]
        fn test_non_map_values() {
            let values = vec![json!(null), json!(1), json!("data"), json!([1, 2]), json!(true)];

            for value in values {
                let mut request = Request::new("https://api.example.com", FakeClient::default()).unwrap();
                let error = request.set_post_data(&value).unwrap_err();

                assert_eq!(
                    error.to_string(),
                    "Invalid argument: post data must be a map of values".to_owned()
                );
            }
        }
    }

    mod fetch_and_store_token {
        use super::*;

        #[test]
        fn test_token_request() {
            let client = FakeClient::with_responses(&[r#"{"access_token":"T","token_type":"Bearer"}"#]);
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();

            let token = request.fetch_and_store_token().unwrap();

            assert_eq!(token, "T");
            assert_eq!(request.token(), Some("T"));

            let calls = client.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].method, Method::POST);
            assert_eq!(calls[0].url, "https://api.example.com/oauth/token");
            assert!(calls[0].options.headers.is_empty());
            assert!(calls[0].options.json.is_none());

            let params = calls[0].options.form_params.as_ref().unwrap();
            assert_eq!(params["username"], "admin");
            assert_eq!(params["client_secret"], "secret");
        }

        #[test]
        fn test_without_client_options() {
            let client = FakeClient::default();
            let mut request = Request::new("https://api.example.com", &client).unwrap();

            let error = request.fetch_and_store_token().unwrap_err();

            assert!(error.to_string().starts_with("Invalid argument: "));
            assert!(client.calls().is_empty());
        }

        #[test]
        fn test_missing_access_token() {
            let client = FakeClient::with_responses(&[r#"{"error":"invalid_grant"}"#]);
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();

            let error = request.fetch_and_store_token().unwrap_err();

            assert!(error.to_string().contains("invalid_grant"));
            assert!(request.token().is_none());
        }

        #[test]
        fn test_bad_response() {
            let client = FakeClient::with_responses(&["<html>oops</html>"]);
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();

            let error = request.fetch_and_store_token().unwrap_err();

            assert!(error.to_string().starts_with("Bad response"));
            assert!(request.token().is_none());
        }

        #[test]
        fn test_client_error_is_propagated() {
            let client = FakeClient::default();
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();

            let error = request.fetch_and_store_token().unwrap_err();

            assert_eq!(error.to_string(), "Invalid status code: 500".to_owned());
        }
    }

    mod perform {
        use super::*;

        #[test]
        fn test_get_with_token() {
            let client = FakeClient::with_responses(&[
                r#"{"access_token":"T"}"#,
                r#"{"data":[{"id":"1"}]}"#,
            ]);
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();
            let _ = request.fetch_and_store_token().unwrap();

            let body = request.perform("items", Method::GET).unwrap();

            assert_eq!(body, json!({"data": [{"id": "1"}]}));

            let calls = client.calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[1].method, Method::GET);
            assert_eq!(calls[1].url, "https://api.example.com/items");
            assert_eq!(
                calls[1].options.headers,
                vec![
                    Header::new(HeaderName::AUTHORIZATION, "Bearer T"),
                    Header::new(HeaderName::CONTENT_TYPE, "application/vnd.api+json"),
                ]
            );
            assert!(calls[1].options.json.is_none());
            assert!(calls[1].options.form_params.is_none());
        }

        #[test]
        fn test_post_with_data() {
            let client = FakeClient::with_responses(&[
                r#"{"access_token":"T"}"#,
                r#"{"data":{"id":"abc","type":"item"}}"#,
            ]);
            let mut request = Request::new("https://api.example.com", &client).unwrap();
            request.set_client_options(&client_options_stub()).unwrap();
            let _ = request.fetch_and_store_token().unwrap();
            request.set_post_data(&json!({"data": {"type": "item"}})).unwrap();

            let body = request.perform("items", Method::POST).unwrap();

            assert_eq!(body["data"]["id"], "abc");

            let call = &client.calls()[1];
            assert_eq!(call.method, Method::POST);
            assert_eq!(call.options.json, Some(json!({"data": {"type": "item"}})));
            assert_eq!(call.options.headers[0], Header::bearer("T"));
        }

        #[test]
        fn test_without_token() {
            let client = FakeClient::with_responses(&["{}"]);
            let request = Request::new("http://localhost", &client).unwrap();

            let _ = request.perform("jsonapi", Method::GET).unwrap();

            let call = &client.calls()[0];
            assert!(call.options.headers.is_empty());
            assert_eq!(call.url, "http://localhost/jsonapi");
        }

        #[test]
        fn test_empty_post_data_is_not_sent() {
            let client = FakeClient::with_responses(&["{}"]);
            let mut request = Request::new("http://localhost", &client).unwrap();
            request.set_post_data(&json!({})).unwrap();

            let _ = request.perform("jsonapi", Method::PATCH).unwrap();

            let call = &client.calls()[0];
            assert_eq!(call.method, Method::PATCH);
            assert!(call.options.json.is_none());
        }
    }

    mod decode_response {
        use super::*;

        #[test]
        fn test_valid_json() {
            let value = decode_response(&Response::new(200, r#"{"a":1}"#)).unwrap();

            assert_eq!(value, json!({"a": 1}));
        }

        #[test]
        fn test_status_is_ignored() {
            let value = decode_response(&Response::new(404, r#"{"errors":[]}"#)).unwrap();

            assert_eq!(value, json!({"errors": []}));
        }

        #[test]
        fn test_invalid_json_includes_body() {
            let error = decode_response(&Response::new(200, "not json")).unwrap_err();

            match &error {
                Error::BadResponse(body, _) => assert_eq!(body, "not json"),
                _ => panic!("unexpected error: {:?}", error),
            }
            assert!(error.to_string().contains("not json"));
        }

        #[test]
        fn test_empty_body() {
            let error = decode_response(&Response::new(200, "")).unwrap_err();

            assert!(error.to_string().starts_with("Bad response"));
        }
    }
}
