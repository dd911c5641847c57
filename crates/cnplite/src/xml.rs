//! XML codec with pluggable engines
//!
//! Every engine pairs an [`XmlParser`] with an [`XmlSerializer`]. The folding
//! rules (attributes vs. children, sequence promotion, text trimming) live in
//! [`parser`] and [`serializer`] and are shared, so engines only differ in
//! how they read and write the markup itself.

pub mod native;
pub mod parser;
pub mod policy;
pub mod quick;
pub mod roxml;
pub mod serializer;

pub use native::{NativeParser, NativeSerializer};
pub use parser::XmlParser;
pub use policy::{AttributePolicy, DEFAULT_ATTRIBUTES};
pub use quick::{QuickXmlParser, QuickXmlSerializer};
pub use roxml::RoxmltreeParser;
pub use serializer::XmlSerializer;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};

/// Indent width of the roxmltree engine's writer
const ROXMLTREE_INDENT: usize = 2;

/// Selectable XML engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    #[default]
    Native,
    QuickXml,
    Roxmltree,
}

impl Backend {
    pub const ALL: [Self; 3] = [Self::Native, Self::QuickXml, Self::Roxmltree];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::QuickXml => "quick-xml",
            Self::Roxmltree => "roxmltree",
        }
    }

    pub fn parser(self) -> Box<dyn XmlParser> {
        match self {
            Self::Native => Box::new(NativeParser::new()),
            Self::QuickXml => Box::new(QuickXmlParser::new()),
            Self::Roxmltree => Box::new(RoxmltreeParser::new()),
        }
    }

    pub fn serializer(self, policy: AttributePolicy) -> Box<dyn XmlSerializer> {
        match self {
            Self::Native => Box::new(NativeSerializer::new(policy)),
            Self::QuickXml => Box::new(QuickXmlSerializer::new(policy)),
            // roxmltree cannot write; its documents go out through the
            // quick-xml writer, pretty-printed
            Self::Roxmltree => {
                Box::new(QuickXmlSerializer::new(policy).indented(ROXMLTREE_INDENT))
            }
        }
    }
}

impl AsRef<str> for Backend {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "quick-xml" | "quick_xml" | "quickxml" => Ok(Self::QuickXml),
            "roxmltree" => Ok(Self::Roxmltree),
            other => Err(Error::config(format!("unknown xml backend `{other}`"))),
        }
    }
}

/// Resolves the parser of the engine called `name`
pub fn parser_with(name: &str) -> Result<Box<dyn XmlParser>> {
    let backend: Backend = name.parse()?;
    debug!(backend = backend.name(), "selected xml parser");
    Ok(backend.parser())
}

/// Resolves the serializer of the engine called `name`
pub fn serializer_with(name: &str, policy: AttributePolicy) -> Result<Box<dyn XmlSerializer>> {
    let backend: Backend = name.parse()?;
    debug!(backend = backend.name(), "selected xml serializer");
    Ok(backend.serializer(policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_backend_names_round_trip() -> Result<()> {
        for backend in Backend::ALL {
            assert_eq!(backend.name().parse::<Backend>()?, backend);
            assert_eq!(backend.to_string(), backend.name());
        }
        Ok(())
    }

    #[test]
    fn test_backend_aliases() -> Result<()> {
        assert_eq!("QUICK_XML".parse::<Backend>()?, Backend::QuickXml);
        assert_eq!(" quickxml ".parse::<Backend>()?, Backend::QuickXml);
        assert_eq!("Roxmltree".parse::<Backend>()?, Backend::Roxmltree);
        Ok(())
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = parser_with("libxml").err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::Config));
        let err = serializer_with("rexml", AttributePolicy::default())
            .err()
            .map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::Config));
    }

    #[test]
    fn test_serializer_keeps_policy() -> Result<()> {
        let policy = AttributePolicy::new(["code"])?;
        let serializer = serializer_with("native", policy)?;
        assert!(serializer.policy().contains("code"));
        assert!(!serializer.policy().contains("id"));
        Ok(())
    }
}
