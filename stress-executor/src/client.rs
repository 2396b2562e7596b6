use std::time::Duration;

use async_trait::async_trait;
use http::header::CONNECTION;
use http::HeaderValue;
use hyper::body::HttpBody;
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use hyper_tls::HttpsConnector;
use log::trace;
use stress_types::RunConfig;
use tokio::time::timeout;

use crate::{ConcreteRequest, TransportError};

pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Sends one request at a time for a worker
#[async_trait]
pub trait RequestSender: Send {
    /// Send the request and fully drain the response body, returns the response status.
    async fn send(&mut self, request: ConcreteRequest) -> Result<u16, TransportError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// connect timeout, also bounds the whole exchange. Zero means no timeout.
    pub timeout: Duration,
    pub keep_alive: bool,
    /// how long pooled connections stay idle when keep-alive is on
    pub idle_timeout: Duration,
}

impl ClientOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        ClientOptions {
            timeout: config.timeout,
            keep_alive: config.keep_alive,
            idle_timeout: common_env::keep_alive_idle_timeout(),
        }
    }

    /// `None` when the configured timeout is zero
    pub fn deadline(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// A new client with its own connection pool
    pub fn build_client(&self) -> HttpsClient {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(self.deadline());
        http.enforce_http(false);
        let https = HttpsConnector::new_with_connector(http);

        let mut builder = Client::builder();
        if self.keep_alive {
            builder.pool_idle_timeout(self.idle_timeout);
        } else {
            builder.pool_max_idle_per_host(0);
        }
        builder.build(https)
    }
}

/// Production [`RequestSender`], one per worker so connections are never shared
pub struct HyperSender {
    client: HttpsClient,
    options: ClientOptions,
}

impl HyperSender {
    pub fn new(options: ClientOptions) -> Self {
        HyperSender {
            client: options.build_client(),
            options,
        }
    }
}

#[async_trait]
impl RequestSender for HyperSender {
    async fn send(&mut self, request: ConcreteRequest) -> Result<u16, TransportError> {
        let mut request = request.into_hyper();
        if !self.options.keep_alive {
            request
                .headers_mut()
                .insert(CONNECTION, HeaderValue::from_static("close"));
        }
        trace!("[HyperSender] - {} {}", request.method(), request.uri());
        let client = &self.client;
        let exchange = async move {
            let response = client.request(request).await?;
            let status = response.status().as_u16();
            // the body has to be consumed before the connection can go back to the pool
            let mut body = response.into_body();
            while let Some(chunk) = body.data().await {
                chunk?;
            }
            Ok::<_, hyper::Error>(status)
        };
        let deadline = match self.options.deadline() {
            Some(deadline) => deadline,
            None => return exchange.await.map_err(TransportError::from),
        };
        match timeout(deadline, exchange).await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::Timeout(deadline)),
        }
    }
}
