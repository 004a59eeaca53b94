//! Metadata router
//!
//! Interprets a validated token sequence as an EC2-style metadata request
//! and dispatches to the per-client resolver: user-data retrieval, the
//! structured public-keys collection, or a generic attribute lookup.
//!
//! The public-keys collection is index-addressed: the sorted directory
//! listing of `ec2/meta-data/public-keys` defines the mapping from
//! zero-based index to key name. One request reads that listing once and
//! reuses it for any indexed lookup, so the index cannot shift mid-request.

use tracing::debug;

use crate::error::{MetadataError, Result};
use crate::path;
use crate::store::{Content, FileContent, FileStore};

/// The only key format this service knows how to serve.
const OPENSSH_KEY: &str = "openssh-key";

/// Resolves request paths for one backing store.
///
/// Stateless per request and safe to share across concurrent requests;
/// the only field is the immutable store configuration.
#[derive(Debug, Clone)]
pub struct MetadataService {
    store: FileStore,
}

/// A successfully resolved request, ready for the transport to write out.
#[derive(Debug)]
pub enum MetadataResponse {
    /// Newline-delimited text: listings and fixed format lines
    Text(String),
    /// File content to stream as the body
    File(FileContent),
}

impl MetadataService {
    /// Create a service over `store`.
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Resolve `url_path` for the client identified by `client`.
    ///
    /// `client` is the address portion of the requester's source address
    /// and selects the per-client subtree. Any error returned here must be
    /// presented to the caller as a plain not-found.
    pub async fn resolve(&self, client: &str, url_path: &str) -> Result<MetadataResponse> {
        let tokens = path::tokenize(url_path)?;
        if tokens.len() < 2 {
            debug!("no mapping for {}", url_path);
            return Err(MetadataError::InvalidPath(url_path.to_string()));
        }

        // tokens[0] is the API version marker. "openstack" is recognized
        // but not served; anything else is assumed to be an EC2 version
        // and not validated further.
        if tokens[0] == "openstack" {
            return Err(MetadataError::UnsupportedSchema("openstack".to_string()));
        }

        match tokens[1].as_str() {
            "user-data" if tokens.len() == 2 => self.serve(client, "ec2/user-data").await,
            "meta-data" => {
                if tokens.get(2).map(String::as_str) == Some("public-keys") {
                    self.resolve_public_keys(client, &tokens).await
                } else {
                    let logical = format!("ec2/{}", tokens[1..].join("/"));
                    self.serve(client, &logical).await
                }
            }
            _ => {
                debug!("no mapping for {}", url_path);
                Err(MetadataError::InvalidPath(url_path.to_string()))
            }
        }
    }

    /// The structured public-keys collection:
    ///
    /// - 3 tokens: `index=name` listing of the sorted key directory
    /// - 4 tokens: format listing for one key (always `openssh-key`)
    /// - 5 tokens ending in `openssh-key`: the key file itself
    async fn resolve_public_keys(
        &self,
        client: &str,
        tokens: &[String],
    ) -> Result<MetadataResponse> {
        let keys = self.store.list(client, "ec2/meta-data/public-keys").await?;

        match tokens.len() {
            3 => {
                let mut body = String::new();
                for (index, name) in keys.iter().enumerate() {
                    let name = name.trim_end_matches('/');
                    body.push_str(&format!("{}={}\n", index, name));
                }
                Ok(MetadataResponse::Text(body))
            }
            4 | 5 => {
                let index: usize = tokens[3]
                    .parse()
                    .map_err(|_| MetadataError::InvalidKeyIndex(tokens[3].clone()))?;
                let name = keys
                    .get(index)
                    .ok_or_else(|| MetadataError::InvalidKeyIndex(tokens[3].clone()))?;

                if tokens.len() == 4 {
                    // Format listing; nothing is checked on disk here
                    return Ok(MetadataResponse::Text(format!("{}\n", OPENSSH_KEY)));
                }

                if tokens[4] == OPENSSH_KEY {
                    let name = name.trim_end_matches('/');
                    let logical = format!("ec2/meta-data/public-keys/{}", name);
                    self.serve(client, &logical).await
                } else {
                    Err(MetadataError::InvalidPath(tokens.join("/")))
                }
            }
            _ => Err(MetadataError::InvalidPath(tokens.join("/"))),
        }
    }

    /// Fetch a logical path: a file streams, a directory becomes one line
    /// per entry, percent-encoded, directories suffixed with `/`. No
    /// ordering is guaranteed for this generic listing.
    async fn serve(&self, client: &str, logical: &str) -> Result<MetadataResponse> {
        match self.store.open(client, logical).await? {
            Content::File(content) => Ok(MetadataResponse::File(content)),
            Content::Listing(entries) => {
                let mut body = String::new();
                for entry in entries {
                    body.push_str(&urlencoding::encode(&entry.name));
                    if entry.is_dir {
                        body.push('/');
                    }
                    body.push('\n');
                }
                Ok(MetadataResponse::Text(body))
            }
        }
    }
}
