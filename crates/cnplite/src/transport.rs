//! Blocking request/response exchange with the endpoint

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Proxy, Url};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, Result};

pub const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

const TIMEOUT: Duration = Duration::from_secs(60);

/// Status line and body of one exchange; the body is fully buffered so it can
/// be parsed more than once
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Posts a request body to a path on the configured endpoint
pub trait Transport: Debug + Send + Sync {
    fn post(&self, path: &str, body: String) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, path: &str, body: String) -> Result<RawResponse> {
        (**self).post(path, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, path: &str, body: String) -> Result<RawResponse> {
        (**self).post(path, body)
    }
}

/// HTTPS transport over a blocking `reqwest` client.
///
/// One client is built per transport and reused for every call, so
/// connections are pooled by reqwest. Failed exchanges are not retried.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    origin: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().timeout(TIMEOUT);
        if let Some(proxy) = config.proxy_url() {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::config(format!("invalid proxy url: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let origin = Url::parse(config.environment().url())
            .map_err(|e| Error::config(format!("invalid endpoint url: {e}")))?;

        Ok(Self {
            client: builder.build()?,
            origin,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(len = body.len()))]
    fn post(&self, path: &str, body: String) -> Result<RawResponse> {
        let url = self
            .origin
            .join(path)
            .map_err(|e| Error::config(format!("invalid request path `{path}`: {e}")))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!(status, len = body.len(), "received response");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::error::ErrorKind;

    #[test]
    fn test_transport_targets_environment_origin() -> Result<()> {
        let config = Config::builder()
            .environment(Environment::Prelive)
            .merchant_id("1")
            .username("u")
            .password("p")
            .build()?;
        let transport = HttpTransport::new(&config)?;
        assert_eq!(transport.origin().host_str(), Some("payments.vantivprelive.com"));
        let url = transport.origin().join(config.environment().path()).ok();
        assert_eq!(url.as_ref().map(Url::as_str), Some(Environment::Prelive.url()));
        Ok(())
    }

    #[test]
    fn test_transport_accepts_proxy() -> Result<()> {
        let config = Config::builder().proxy_url("http://proxy.local:3128").build()?;
        HttpTransport::new(&config)?;
        Ok(())
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() -> Result<()> {
        // nothing listens on the discard port
        let transport = HttpTransport {
            client: Client::builder().timeout(Duration::from_secs(2)).build()?,
            origin: Url::parse("http://127.0.0.1:9/").map_err(|e| Error::config(e.to_string()))?,
        };
        let err = transport.post("/online", "<r/>".to_owned()).err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Transport));
        Ok(())
    }
}
