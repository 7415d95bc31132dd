use crate::form::{FormValues, DEFAULT_ENDPOINT, DEFAULT_SERVER};
use clap::{Args, Parser, Subcommand};
use processor_jsonapi_request_v1::Method;
use simpest_core::{OptionKind, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "simpest",
    about = "Send OAuth2 authenticated requests to a JSON:API server",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Directory containing the `Clients` and `PostData` configuration files
    #[arg(
        long,
        global = true,
        env = "SIMPEST_CONFIG_PATH",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub(crate) config_path: PathBuf,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Fetch a token, and send a request to the server
    Submit(SubmitArgs),

    /// List the selectable configuration files
    Options {
        /// The kind of configuration files to list (clients, post-data)
        kind: OptionKind,
    },
}

#[derive(Debug, Args)]
pub(crate) struct SubmitArgs {
    /// The request method (get, post, patch)
    #[arg(long, default_value = "get")]
    method: Method,

    /// The OAuth2 client configuration, by file name or path
    #[arg(long)]
    client_config: String,

    /// The data to send as the body, by file name or path
    #[arg(long, required_if_eq_any = [("method", "post"), ("method", "patch")])]
    post_data: Option<String>,

    /// The server, including the protocol
    #[arg(long, env = "SIMPEST_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// The JSON:API endpoint, relative to the server
    #[arg(long, env = "SIMPEST_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
}

impl From<SubmitArgs> for FormValues {
    fn from(args: SubmitArgs) -> Self {
        Self {
            method: args.method,
            client_config: args.client_config,
            post_data: args.post_data,
            server: args.server,
            endpoint: args.endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_defaults() {
        let cli = Cli::try_parse_from(&["simpest", "submit", "--client-config", "admin.yml"]).unwrap();

        let values = match cli.command {
            Command::Submit(args) => FormValues::from(args),
            Command::Options { .. } => panic!("expected submit command"),
        };

        assert_eq!(
            values,
            FormValues {
                client_config: "admin.yml".to_owned(),
                ..FormValues::default()
            }
        );
    }

    #[test]
    fn test_submit_post() {
        let cli = Cli::try_parse_from(&[
            "simpest",
            "--config-path",
            "/etc/simpest",
            "submit",
            "--method",
            "post",
            "--client-config",
            "admin.yml",
            "--post-data",
            "page.yml",
            "--server",
            "https://api.example.com",
            "--endpoint",
            "items",
        ])
        .unwrap();

        assert_eq!(cli.config_path, PathBuf::from("/etc/simpest"));

        let values = match cli.command {
            Command::Submit(args) => FormValues::from(args),
            Command::Options { .. } => panic!("expected submit command"),
        };

        assert_eq!(values.method, Method::POST);
        assert_eq!(values.post_data, Some("page.yml".to_owned()));
        assert_eq!(values.server, "https://api.example.com");
        assert_eq!(values.endpoint, "items");
    }

    #[test]
    fn test_post_requires_post_data() {
        let result = Cli::try_parse_from(&[
            "simpest",
            "submit",
            "--method",
            "post",
            "--client-config",
            "admin.yml",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_method() {
        let result = Cli::try_parse_from(&[
            "simpest",
            "submit",
            "--method",
            "delete",
            "--client-config",
            "admin.yml",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from(&["simpest", "options", "post-data"]).unwrap();

        match cli.command {
            Command::Options { kind } => assert_eq!(kind, OptionKind::PostData),
            Command::Submit(_) => panic!("expected options command"),
        }
    }
}
