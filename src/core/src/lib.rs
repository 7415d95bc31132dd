//! # Simpest
//!
//! Simpest lets you pick a saved OAuth2 client configuration and a saved
//! request body, and send a single authenticated request to a [JSON:API]
//! server.
//!
//! Simpest consists of several crates:
//!
//! * [`simpest-core`][c] (this one) – Provides the basic building blocks for
//!   the functionality of the other crates.
//! * [`simpest-processor-jsonapi-request`][p] – Authenticates using the OAuth2
//!   password grant, and performs the JSON:API request.
//! * [`simpest-form`][f] – The `simpest` command-line form, used to select the
//!   configuration files and submit the request.
//!
//! [JSON:API]: https://jsonapi.org/
//! [c]: https://docs.rs/simpest-core
//! [p]: https://docs.rs/simpest-processor-jsonapi-request
//! [f]: https://docs.rs/simpest-form
//!
//! # Core
//!
//! This crate, `simpest-core`, provides the main [`Processor`] trait to create
//! new processors, and run them.
//!
//! It also provides the [`Context`] object, which knows where the selectable
//! configuration files live, and lists them through the [`OptionProvider`]
//! trait.
//!
//! The configuration directory is expected to look like this:
//!
//! ```text
//! FormValues/
//! ├── Clients/
//! │   └── admin.yml
//! └── PostData/
//!     └── page.yml
//! ```

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
#![warn(unused_results, unused_qualifications, variant_size_differences)]
#![allow(clippy::multiple_crate_versions)]
#![doc(html_root_url = "https://docs.rs/simpest-core/0.1.0")]

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::{env, error, fmt, fs, io, str::FromStr};

/// The environment variable used by [`Context::from_environment`].
pub const CONFIG_PATH_VARIABLE: &str = "SIMPEST_CONFIG_PATH";

/// The configuration directory used when [`CONFIG_PATH_VARIABLE`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/FormValues";

/// The file extension of selectable configuration files.
const OPTION_EXTENSION: &str = "yml";

/// The main trait to implement when creating a new Simpest processor.
pub trait Processor<'de>: Clone + fmt::Debug + Serialize + Deserialize<'de> {
    /// The human-formatted name of the processor, used to visually identify
    /// this processor amongst others.
    const NAME: &'static str;

    /// If a processor fails its intended purpose, the returned error is shown
    /// to the operator submitting the form.
    type Error: error::Error;

    /// The processor can return any (successful) output it wants, as long as
    /// that type implements the [`std::fmt::Display`] trait.
    type Output: fmt::Display;

    /// Actually runs the processor, performing whatever side-effects are
    /// defined in this specific processor.
    ///
    /// # Errors
    ///
    /// When a processor has run to completion, it is supposed to return
    /// whatever valuable information could be used via `Self::Output`. If an
    /// unexpected result occurred, `Self::Error` should be returned.
    fn run(&self, context: &Context) -> Result<Option<Self::Output>, Self::Error>;

    /// Runtime check to make sure that the processor is correctly configured
    /// before running it.
    ///
    /// The default implementation of this method always returns `Ok`.
    ///
    /// # Errors
    ///
    /// If validation fails, an error should be returned, explaining which part
    /// of the configuration is invalid.
    fn validate(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The two kinds of configuration files an operator can select.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    /// OAuth2 client configurations, stored in the `Clients` directory.
    Clients,

    /// Request bodies, stored in the `PostData` directory.
    PostData,
}

impl OptionKind {
    /// The name of the directory (relative to the configuration path) in which
    /// files of this kind are stored.
    pub const fn dir_name(self) -> &'static str {
        match self {
            OptionKind::Clients => "Clients",
            OptionKind::PostData => "PostData",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for OptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clients" | "client" => Ok(OptionKind::Clients),
            "postdata" | "post-data" | "post_data" => Ok(OptionKind::PostData),
            _ => Err(format!(
                "unknown option kind \"{}\", expected one of: clients, post-data",
                s
            )),
        }
    }
}

/// A single selectable configuration file.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SelectOption {
    /// The full path to the file.
    pub path: PathBuf,

    /// The human-readable label of the option, which is the file name.
    pub label: String,
}

impl SelectOption {
    /// Returns `true` if the given choice matches either the path or the label
    /// of this option.
    pub fn matches(&self, choice: &str) -> bool {
        self.label == choice || self.path == Path::new(choice)
    }
}

/// Lists the configuration files an operator can choose from.
pub trait OptionProvider {
    /// Returns all selectable options of the given kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the options could not be listed.
    fn select_options(&self, kind: OptionKind) -> Result<Vec<SelectOption>, ContextError>;
}

/// The `Context` is the object shared by everything taking part in a single
/// form submission.
///
/// It knows the location of the configuration directory on the local file
/// system, and lists the files stored in it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Context {
    config_path: PathBuf,
}

impl Context {
    /// Create a new `Context` object for the given configuration directory.
    pub fn new<P: Into<PathBuf>>(config_path: P) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Create a new `Context`, using the `SIMPEST_CONFIG_PATH` environment
    /// variable, falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn from_environment() -> Self {
        let path = env::var(CONFIG_PATH_VARIABLE).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());

        Self::new(path)
    }

    /// Returns a [`std::path::Path`] reference to the configuration directory.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the directory in which options of the given kind are stored.
    pub fn option_dir(&self, kind: OptionKind) -> PathBuf {
        self.config_path.join(kind.dir_name())
    }
}

impl OptionProvider for Context {
    /// Recursively scan the directory of the given kind for `.yml` files.
    ///
    /// Options are sorted by path. If the directory does not exist, no options
    /// are returned.
    fn select_options(&self, kind: OptionKind) -> Result<Vec<SelectOption>, ContextError> {
        let dir = self.option_dir(kind);
        let mut options = vec![];

        if dir.is_dir() {
            scan_dir(&dir, &mut options)?;
        } else {
            debug!("option directory {} does not exist", dir.display());
        }

        options.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(options)
    }
}

fn scan_dir(dir: &Path, options: &mut Vec<SelectOption>) -> Result<(), ContextError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            scan_dir(&path, options)?;
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some(OPTION_EXTENSION) {
            continue;
        }

        let label = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_owned(),
            None => continue,
        };

        options.push(SelectOption { path, label });
    }

    Ok(())
}

/// Read a YAML file, and optionally wrap its contents in an object key.
///
/// Given a file containing `type: page` and the wrapper `data`, the returned
/// value is `{"data": {"type": "page"}}`.
///
/// # Errors
///
/// Returns [`ContextError::Io`] if the file cannot be read, and
/// [`ContextError::Yaml`] if it does not contain a valid YAML document.
pub fn read_yaml<P: AsRef<Path>>(path: P, wrapper: Option<&str>) -> Result<Value, ContextError> {
    let path = path.as_ref();
    debug!("reading configuration from {}", path.display());

    let file = fs::File::open(path)?;
    let value: Value = serde_yaml::from_reader(file)?;

    Ok(match wrapper {
        Some(key) => {
            let mut map = Map::new();
            let _ = map.insert(key.to_owned(), value);
            Value::Object(map)
        }
        None => value,
    })
}

/// Represents all the ways that a [`Context`] can fail.
///
/// This type is not intended to be exhaustively matched, and new variants may
/// be added in the future without a major version bump.
#[derive(Debug)]
pub enum ContextError {
    /// An error occurred during IO activities.
    Io(io::Error),

    /// A configuration file does not contain valid YAML.
    Yaml(serde_yaml::Error),

    #[doc(hidden)]
    __Unknown, // Match against _ instead, more variants may be added in the future.
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ContextError::Io(ref err) => write!(f, "IO error: {}", err),
            ContextError::Yaml(ref err) => write!(f, "YAML error: {}", err),
            ContextError::__Unknown => unreachable!(),
        }
    }
}

impl error::Error for ContextError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ContextError::Io(ref err) => Some(err),
            ContextError::Yaml(ref err) => Some(err),
            ContextError::__Unknown => unreachable!(),
        }
    }
}

impl From<io::Error> for ContextError {
    fn from(err: io::Error) -> Self {
        ContextError::Io(err)
    }
}

impl From<serde_yaml::Error> for ContextError {
    fn from(err: serde_yaml::Error) -> Self {
        ContextError::Yaml(err)
    }
}
