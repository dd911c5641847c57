//! cnplite - XML codec, response envelope and blocking client for the CNP
//! online transaction API
//!
//! # Quick Start
//!
//! ```
//! use cnplite::{parse, serialize, Node, Value};
//! # fn main() -> Result<(), cnplite::Error> {
//! let request = Node::new()
//!     .with("id", "0")
//!     .with("reportGroup", "RG")
//!     .with("orderId", "01");
//! let xml = serialize(&Value::Node(request.clone()), "authorization")?;
//! assert!(xml.ends_with(
//!     r#"<authorization id="0" reportGroup="RG"><orderId>01</orderId></authorization>"#
//! ));
//!
//! let document = parse(&xml)?;
//! assert_eq!(document, Node::new().with("authorization", request));
//! # Ok(())
//! # }
//! ```
//!
//! Talking to the endpoint goes through a [`Client`]:
//!
//! ```no_run
//! use cnplite::{Client, Config, Node};
//! # fn main() -> Result<(), cnplite::Error> {
//! let client = Client::new(Config::builder().report_group("Web").build()?)?;
//! let response = client.void(Node::new().with("txnId", "345454444"))?;
//! println!("{:?}", response.get("response"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod coerce;
pub use coerce::Kind;

pub mod value;
pub use value::{Node, Scalar, Sequence, Value};

pub mod xml;
pub use xml::{AttributePolicy, Backend, XmlParser, XmlSerializer};

pub mod config;
pub use config::{Config, ConfigBuilder, Environment, Protocol};

pub mod transport;
pub use transport::{HttpTransport, RawResponse, Transport};

pub mod response;
pub use response::Response;

pub mod request;
pub use request::{Client, Transaction};

/// Serialize a document as the element `root` with the default engine and
/// attribute policy
pub fn serialize(value: &Value, root: &str) -> Result<String> {
    Backend::default()
        .serializer(AttributePolicy::default())
        .serialize(value, root)
}

/// Parse XML with the default engine
pub fn parse(xml: &str) -> Result<Node> {
    Backend::default().parser().parse(xml)
}
