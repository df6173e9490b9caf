#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod clean;
pub mod client;
pub mod config;
pub mod connection;
pub mod deploy;
pub mod error;
pub mod upload;
pub mod utils;

pub use deploy::{deploy_site, deploy_site_with, Deployer, DeploymentReport};
pub use error::{DeployError, DeployResult};
