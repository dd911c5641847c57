#![no_main]
use cnplite::{AttributePolicy, Backend, XmlParser, XmlSerializer};
use libfuzzer_sys::fuzz_target;

// Anything the parser accepts must serialize to XML it accepts again
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(doc) = Backend::Native.parser().parse(s) {
            if let Some((root, value)) = doc.iter().next() {
                let serializer = Backend::Native.serializer(AttributePolicy::default());
                if let Ok(xml) = serializer.serialize(value, root) {
                    let again = Backend::Native.parser().parse(&xml);
                    assert!(again.is_ok(), "reparse failed: {xml}");
                }
            }
        }
    }
});
