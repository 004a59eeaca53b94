//! Roost Metadata Resolver
//!
//! This crate provides the core of an EC2-compatible instance metadata
//! service: it interprets request paths and resolves them against a
//! read-only, per-client directory tree on disk.
//!
//! # Overview
//!
//! The metadata service is typically reached at the well-known address
//! `169.254.169.254`. Each client machine is identified by the source IP
//! of its connection and only ever sees the subtree
//! `<base>/<client-ip>/ec2/...` of the backing store. This crate handles
//! path validation, EC2-schema routing, and the filesystem lookup; the
//! HTTP transport lives in `roost-server`.
//!
//! # Supported paths
//!
//! - `/<version>/user-data` - opaque user-data blob
//! - `/<version>/meta-data/public-keys` - `index=name` key listing
//! - `/<version>/meta-data/public-keys/<index>` - key format listing
//! - `/<version>/meta-data/public-keys/<index>/openssh-key` - key contents
//! - `/<version>/meta-data/<attr...>` - attribute content or listing
//!
//! An `openstack` version token is recognized but deliberately not served.
//! Every failure, from a malformed path to a missing file, resolves to the
//! same not-found outcome so callers cannot probe the backing store.

pub mod error;
pub mod path;
pub mod service;
pub mod store;

pub use error::{MetadataError, Result};
pub use service::{MetadataResponse, MetadataService};
pub use store::{Content, FileContent, FileStore};
