//! Maps Deployments between a user-facing configuration [`Tree`](tree::Tree) and the typed
//! `extensions/v1beta1` API object, and computes minimal JSON patches for updates.
//!
//! - [`mapper`] expands configuration blocks into API objects and flattens them back.
//! - [`patch`] diffs two configuration snapshots and builds `replace` operations for the fields
//!   that changed.
//! - [`resource`] ties both together with a [`client::DeploymentClient`] into the create, read,
//!   update and delete lifecycle.

pub mod client;
pub mod codec;
pub mod config;
pub mod deployment;
pub mod mapper;
pub mod patch;
pub mod resource;
pub mod tree;

// External re-exports
pub use json_patch;
pub use k8s_openapi;
pub use kube;
