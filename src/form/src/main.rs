//! The [Simpest] request form.
//!
//! This binary lets an operator pick a saved OAuth2 client configuration and
//! a saved request body, and send a single authenticated request to a JSON:API
//! server:
//!
//! * `simpest options clients` lists the selectable client configurations.
//! * `simpest options post-data` lists the selectable request bodies.
//! * `simpest submit` fetches a token, and sends the request.
//!
//! The configuration files are read from the directory given by
//! `--config-path` or the `SIMPEST_CONFIG_PATH` environment variable. Logging
//! is controlled using the `RUST_LOG` environment variable.
//!
//! [Simpest]: https://docs.rs/simpest-core
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
    trivial_numeric_casts
)]
#![warn(unused_results, unused_qualifications, variant_size_differences)]
#![allow(clippy::multiple_crate_versions)]
#![doc(html_root_url = "https://docs.rs/simpest-form/0.1.0")]

mod cli;
mod form;

use crate::cli::{Cli, Command};
use crate::form::RequestForm;
use clap::Parser;
use simpest_core::{Context, OptionProvider};
use std::{error::Error, process};

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let context = Context::new(cli.config_path);

    match cli.command {
        Command::Submit(args) => {
            let form = RequestForm::new(&context);

            for message in form.submit(&args.into())? {
                println!("{}", message);
            }
        }
        Command::Options { kind } => {
            for option in context.select_options(kind)? {
                println!("{}\t{}", option.label, option.path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_html_root_url() {
        version_sync::assert_html_root_url_updated!("src/main.rs");
    }
}
