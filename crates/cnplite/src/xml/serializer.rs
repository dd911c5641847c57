//! Document-to-XML walk shared by every backend

use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::value::Value;
use crate::xml::policy::{is_xml_name, AttributePolicy};

/// Turns a structured document into an XML string
pub trait XmlSerializer: Debug + Send + Sync {
    /// Serializes `value` as the content of an element named `root`
    fn serialize(&self, value: &Value, root: &str) -> Result<String>;

    fn policy(&self) -> &AttributePolicy;
}

/// Engine-side receiver of the walk; each backend writes into its own tree or
/// event stream.
pub(crate) trait ElementSink {
    fn open(&mut self, name: &str, attributes: &[(&str, String)]) -> Result<()>;
    fn text(&mut self, text: &str) -> Result<()>;
    fn close(&mut self, name: &str) -> Result<()>;
}

pub(crate) fn write_document<S: ElementSink>(
    sink: &mut S,
    policy: &AttributePolicy,
    root: &str,
    value: &Value,
) -> Result<()> {
    match value {
        Value::Sequence(_) => Err(Error::serialize(format!(
            "root `{root}` must be a single element, not a sequence"
        ))),
        Value::Null => {
            check_name(root)?;
            sink.open(root, &[])?;
            sink.close(root)
        }
        _ => write_element(sink, policy, root, value),
    }
}

fn write_element<S: ElementSink>(
    sink: &mut S,
    policy: &AttributePolicy,
    name: &str,
    value: &Value,
) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Sequence(items) => items
            .iter()
            .try_for_each(|item| write_element(sink, policy, name, item)),
        Value::Leaf(scalar) => {
            check_name(name)?;
            sink.open(name, &[])?;
            sink.text(&scalar.render())?;
            sink.close(name)
        }
        Value::Node(node) => {
            check_name(name)?;
            let mut attributes = Vec::new();
            for (key, value) in node.iter().filter(|(k, _)| policy.contains(k)) {
                match value {
                    Value::Null => {}
                    Value::Leaf(scalar) => attributes.push((key.as_str(), scalar.render())),
                    _ => {
                        return Err(Error::type_error(format!(
                            "attribute `{key}` of <{name}> must be a scalar"
                        )));
                    }
                }
            }

            sink.open(name, &attributes)?;
            for (key, value) in node.iter().filter(|(k, _)| !policy.contains(k)) {
                write_element(sink, policy, key, value)?;
            }
            sink.close(name)
        }
    }
}

fn check_name(name: &str) -> Result<()> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(Error::serialize(format!("`{name}` is not a valid element name")))
    }
}
