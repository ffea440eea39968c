//! Fuzz target: topology parsing and compilation
//!
//! Feeds arbitrary bytes to both the JSON and the binary blob decoder.
//! Anything that decodes must either compile or be rejected with a
//! `ConfigError`, and a decoded topology must survive a blob round trip.
//!
//! cargo fuzz run fuzz_topology

#![no_main]

use bswm::Topology;
use libfuzzer_sys::fuzz_target;

fn check(t: &Topology) {
    let _ = t.compile();
    let blob = t.to_blob().expect("encoding a decoded topology");
    let back = Topology::from_blob(&blob).expect("decoding our own blob");
    assert_eq!(&back, t);
}

fuzz_target!(|data: &[u8]| {
    if let Ok(t) = Topology::from_blob(data) {
        check(&t);
    }
    if let Ok(json) = core::str::from_utf8(data) {
        if let Ok(t) = Topology::from_json(json) {
            check(&t);
        }
    }
});
