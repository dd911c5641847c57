#![no_main]
use cnplite::{Backend, XmlParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for backend in Backend::ALL {
            let _ = backend.parser().parse(s);
        }
    }
});
