//! Request envelope construction and the blocking client

use std::fmt;

use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::response::Response;
use crate::transport::{HttpTransport, Transport};
use crate::value::{Node, Value};
use crate::xml::{XmlParser, XmlSerializer};

/// Caller-facing transaction id key, renamed to the protocol's own key
pub const TXN_ID_KEY: &str = "txnId";

const DEFAULT_ID: &str = "0";

/// Online transactions with a dedicated shortcut
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transaction {
    AuthReversal,
    Authorization,
    Capture,
    Credit,
    RegisterToken,
    Sale,
    Void,
}

impl Transaction {
    pub const ALL: [Self; 7] = [
        Self::AuthReversal,
        Self::Authorization,
        Self::Capture,
        Self::Credit,
        Self::RegisterToken,
        Self::Sale,
        Self::Void,
    ];

    /// Element name of the transaction inside the request root
    pub const fn request_key(self) -> &'static str {
        match self {
            Self::AuthReversal => "authReversal",
            Self::Authorization => "authorization",
            Self::Capture => "capture",
            Self::Credit => "credit",
            Self::RegisterToken => "registerTokenRequest",
            Self::Sale => "sale",
            Self::Void => "void",
        }
    }

    /// Element name of the matching answer inside the response root
    pub fn response_key(self) -> String {
        let key = self.request_key();
        format!("{}Response", key.strip_suffix("Request").unwrap_or(key))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_key())
    }
}

/// Blocking client: builds the request envelope, serializes it with the
/// configured engine, posts it and validates the answer.
pub struct Client {
    config: Config,
    transport: Box<dyn Transport>,
    parser: Box<dyn XmlParser>,
    serializer: Box<dyn XmlSerializer>,
}

impl Client {
    /// Client over HTTPS to the configured environment
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        let backend = config.backend();
        debug!(
            backend = backend.name(),
            environment = config.environment().name(),
            "creating client"
        );
        Self {
            parser: backend.parser(),
            serializer: backend.serializer(config.attributes().clone()),
            transport: Box::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wraps `request` in the protocol root with credentials, and fills the
    /// default attributes of every transaction in it.
    pub fn format_request(&self, mut request: Node) -> Node {
        let protocol = self.config.protocol();
        let authentication = Node::new()
            .with("user", self.config.username())
            .with("password", self.config.password());
        let mut root = Node::new()
            .with("xmlns", protocol.namespace())
            .with("version", self.config.version())
            .with("merchantId", self.config.merchant_id())
            .with("authentication", authentication);

        for (_, value) in request.iter_mut() {
            match value {
                Value::Node(txn) => self.apply_defaults(txn),
                Value::Sequence(items) => items
                    .iter_mut()
                    .filter_map(Value::as_node_mut)
                    .for_each(|txn| self.apply_defaults(txn)),
                _ => {}
            }
        }
        root.merge(request);

        Node::new().with(protocol.request_root(), root)
    }

    fn apply_defaults(&self, txn: &mut Node) {
        txn.insert_default("id", DEFAULT_ID);
        txn.insert_default("reportGroup", self.config.report_group());
        // `txnId` stands in for the protocol key unless the caller set that too
        let key = self.config.protocol().txn_id_key();
        if txn.contains_key(key) {
            txn.remove(TXN_ID_KEY);
        } else {
            txn.rename(TXN_ID_KEY, key);
        }
    }

    /// Request document as it would be posted
    pub fn format_xml(&self, request: Node) -> Result<String> {
        let root = self.config.protocol().request_root();
        let document = self.format_request(request);
        self.serializer.serialize(&document[root], root)
    }

    /// Posts `request` and extracts the value at `path` below the response root
    #[instrument(skip_all, fields(root = self.config.protocol().request_root()))]
    pub fn call<S: AsRef<str>>(&self, request: Node, path: &[S]) -> Result<Response> {
        let xml = self.format_xml(request)?;
        debug!(len = xml.len(), "posting request");
        let raw = self.transport.post(self.config.environment().path(), xml)?;
        Response::new(
            &raw,
            path,
            self.config.protocol().response_root(),
            self.parser.as_ref(),
        )
    }

    /// Sends one transaction and returns its answer element
    pub fn transact(&self, transaction: Transaction, body: Node) -> Result<Response> {
        let request = Node::new().with(transaction.request_key(), body);
        self.call(request, &[transaction.response_key()])
    }

    pub fn auth_reversal(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::AuthReversal, body)
    }

    pub fn authorization(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::Authorization, body)
    }

    pub fn capture(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::Capture, body)
    }

    pub fn credit(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::Credit, body)
    }

    pub fn register_token(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::RegisterToken, body)
    }

    pub fn sale(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::Sale, body)
    }

    pub fn void(&self, body: Node) -> Result<Response> {
        self.transact(Transaction::Void, body)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
