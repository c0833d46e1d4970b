//! # Kodegen Release Pipeline
//!
//! Build, archive and publish release artifacts to GitHub.
//!
//! The pipeline is made of independent phases (`build`, `archive`, `release`)
//! that all implement [`pipeline::CommandHandler`]. A [`pipeline::Pipeline`]
//! initializes every phase before executing any of them, so a misconfigured
//! late phase is reported before an early phase has written files or talked to
//! the network.
//!
//! Publishing goes through [`github::ReleaseClient`], either the live GitHub
//! client or a dry-run client that never touches the network. Asset uploads
//! are retried on temporary failures by [`retry::retry_with_backoff`].
//!
//! ## Usage
//!
//! ```bash
//! kodegen_release_pipeline all --tag v1.2.3            # build, archive, publish
//! kodegen_release_pipeline all --tag v1.2.3 --try      # dry run
//! kodegen_release_pipeline release --tag v1.2.3        # publish existing archives
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
mod env_config;
pub mod error;
pub mod fault;
pub mod github;
pub mod pipeline;
pub mod retry;

pub use cli::Args;
pub use config::{ProjectConfig, ReleaseSettings};
pub use env_config::EnvConfig;
pub use error::{ReleaseError, Result};
pub use github::{ReleaseClient, ReleaseId};
pub use pipeline::{CommandHandler, Pipeline, RunContext};
