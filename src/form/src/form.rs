use log::{debug, info};
use processor_jsonapi_request_v1::{
    validate_server, Document, Error as RequestError, JsonApiRequest, Method,
};
use serde::{Deserialize, Serialize};
use simpest_core::{read_yaml, Context, ContextError, OptionKind, OptionProvider, Processor};
use std::path::PathBuf;
use std::{error, fmt};

pub(crate) const DEFAULT_SERVER: &str = "http://localhost/lightning_api/docroot";
pub(crate) const DEFAULT_ENDPOINT: &str = "jsonapi/node/page";

/// The object key in which the client configuration file is wrapped.
const CLIENT_CONFIG_WRAPPER: &str = "form_params";

/// The object key in which the post data file is wrapped.
const POST_DATA_WRAPPER: &str = "data";

/// The values submitted through the request form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct FormValues {
    pub(crate) method: Method,

    /// The selected client configuration, either its label or its path.
    pub(crate) client_config: String,

    /// The selected post data, either its label or its path.
    ///
    /// Required unless the method is GET, ignored if it is.
    pub(crate) post_data: Option<String>,

    pub(crate) server: String,
    pub(crate) endpoint: String,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            method: Method::GET,
            client_config: String::new(),
            post_data: None,
            server: DEFAULT_SERVER.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }
}

/// The configuration files selected in the form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Selection {
    pub(crate) client_config: PathBuf,
    pub(crate) post_data: Option<PathBuf>,
}

/// Lets an operator pick a client configuration and a request body, and send
/// the request.
pub(crate) struct RequestForm<'a> {
    context: &'a Context,
}

impl<'a> RequestForm<'a> {
    pub(crate) const fn new(context: &'a Context) -> Self {
        Self { context }
    }

    /// Validate the form values, and resolve the selected files.
    pub(crate) fn validate(&self, values: &FormValues) -> Result<Selection, FormError> {
        validate_server(&values.server)?;

        let client_config = resolve(self.context, OptionKind::Clients, &values.client_config)?;

        let post_data = match values.method {
            Method::GET => None,
            method => {
                let choice = values
                    .post_data
                    .as_deref()
                    .filter(|choice| !choice.is_empty())
                    .ok_or_else(|| {
                        FormError::Invalid(format!("Post Data is required for {} requests", method))
                    })?;

                Some(resolve(self.context, OptionKind::PostData, choice)?)
            }
        };

        Ok(Selection {
            client_config,
            post_data,
        })
    }

    /// Build the processor, using the contents of the selected files.
    pub(crate) fn build(&self, values: &FormValues) -> Result<JsonApiRequest, FormError> {
        let selection = self.validate(values)?;

        let client_options = read_yaml(&selection.client_config, Some(CLIENT_CONFIG_WRAPPER))?;
        let post_data = selection
            .post_data
            .map(|path| read_yaml(path, Some(POST_DATA_WRAPPER)))
            .transpose()?;

        let processor = JsonApiRequest {
            server: values.server.to_owned(),
            endpoint: values.endpoint.to_owned(),
            method: values.method,
            client_options,
            post_data,
        };

        processor.validate()?;
        Ok(processor)
    }

    /// Submit the form, returning the messages to show to the operator.
    pub(crate) fn submit(&self, values: &FormValues) -> Result<Vec<String>, FormError> {
        let processor = self.build(values)?;

        info!(
            "submitting {} request to {}/{}",
            values.method, values.server, values.endpoint
        );

        let document = processor.run(self.context)?;
        messages(values.method, document.as_ref())
    }
}

/// Find the option of the given kind matching the operator's choice.
pub(crate) fn resolve<P: OptionProvider>(
    provider: &P,
    kind: OptionKind,
    choice: &str,
) -> Result<PathBuf, FormError> {
    let option = provider
        .select_options(kind)?
        .into_iter()
        .find(|option| option.matches(choice))
        .ok_or_else(|| {
            FormError::Invalid(format!(
                "An illegal choice has been detected: \"{}\" is not one of the {} options",
                choice, kind
            ))
        })?;

    debug!("resolved {} choice \"{}\" to {}", kind, choice, option.path.display());
    Ok(option.path)
}

/// The output shown after a successful submission.
///
/// A GET request shows the full response. Any other request shows the method
/// and the id of the created or updated resource.
pub(crate) fn messages(method: Method, document: Option<&Document>) -> Result<Vec<String>, FormError> {
    if method == Method::GET {
        return Ok(vec![document.map_or_else(|| "null".to_owned(), Document::to_string)]);
    }

    let id = document.and_then(Document::id).ok_or(FormError::MissingId)?;

    Ok(vec![format!("Data: {}", method), format!("UUID: {}", id)])
}

#[derive(Debug)]
pub(crate) enum FormError {
    Context(ContextError),
    Request(RequestError),
    Invalid(String),
    MissingId,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FormError::Context(ref err) => write!(f, "Configuration error: {}", err),
            FormError::Request(ref err) => write!(f, "Request error: {}", err),
            FormError::Invalid(ref err) => write!(f, "Invalid form values: {}", err),
            FormError::MissingId => f.write_str("Response error: missing data.id in response"),
        }
    }
}

impl error::Error for FormError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            FormError::Context(ref err) => Some(err),
            FormError::Request(ref err) => Some(err),
            FormError::Invalid(_) | FormError::MissingId => None,
        }
    }
}

impl From<ContextError> for FormError {
    fn from(err: ContextError) -> Self {
        FormError::Context(err)
    }
}

impl From<RequestError> for FormError {
    fn from(err: RequestError) -> Self {
        FormError::Request(err)
    }
}
