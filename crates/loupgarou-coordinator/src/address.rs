//! Public address discovery.
//!
//! A freshly created session can tell its creator which address to share
//! with friends. Looking that up means network I/O, so the coordinator
//! only calls the resolver after every session lock has been released, and
//! a failure just leaves the address out.

use std::future::Future;

/// Errors from an [`AddressResolver`].
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// The lookup service could not be reached or answered with an error.
    #[error("address lookup failed: {0}")]
    Lookup(String),

    /// The lookup service answered with something that is not an address.
    #[error("unexpected address response: {0}")]
    InvalidResponse(String),

    #[cfg(feature = "ipify")]
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Finds the address participants should use to reach this server.
///
/// `Ok(None)` means discovery is not configured. The returned future must
/// be `Send` so coordinator calls can run on spawned tasks.
pub trait AddressResolver: Send + Sync + 'static {
    fn public_address(
        &self,
    ) -> impl Future<Output = Result<Option<String>, AddressError>> + Send;
}

/// Resolver that never looks anything up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

impl AddressResolver for NoDiscovery {
    async fn public_address(&self) -> Result<Option<String>, AddressError> {
        Ok(None)
    }
}

#[cfg(feature = "ipify")]
pub use ipify::IpifyResolver;

#[cfg(feature = "ipify")]
mod ipify {
    use std::net::IpAddr;
    use std::time::Duration;

    use reqwest::Client;
    use serde::Deserialize;

    use super::{AddressError, AddressResolver};

    const IPIFY_URL: &str = "https://api.ipify.org?format=json";
    const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Deserialize)]
    struct IpifyResponse {
        ip: String,
    }

    /// Asks api.ipify.org for this host's public IP.
    #[derive(Debug, Clone)]
    pub struct IpifyResolver {
        client: Client,
        url: String,
    }

    impl IpifyResolver {
        pub fn new() -> Result<Self, AddressError> {
            Self::with_url(IPIFY_URL)
        }

        /// Points the resolver at a different ipify-compatible endpoint.
        pub fn with_url(url: impl Into<String>) -> Result<Self, AddressError> {
            let client = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
            Ok(Self {
                client,
                url: url.into(),
            })
        }
    }

    impl AddressResolver for IpifyResolver {
        async fn public_address(&self) -> Result<Option<String>, AddressError> {
            let response = self.client.get(&self.url).send().await?;
            if !response.status().is_success() {
                return Err(AddressError::Lookup(format!(
                    "{} returned {}",
                    self.url,
                    response.status()
                )));
            }
            let body: IpifyResponse = response.json().await?;
            body.ip
                .parse::<IpAddr>()
                .map_err(|_| AddressError::InvalidResponse(body.ip.clone()))?;
            Ok(Some(body.ip))
        }
    }
}
