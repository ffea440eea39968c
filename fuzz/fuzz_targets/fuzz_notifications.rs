//! Fuzz target: notification streams against the demo topology
//!
//! Every 4-byte chunk is one call: `[op, source/user, channel, mode]`.
//! Out-of-range sources, channels and modes must be rejected without a
//! panic, and the engine must end every call idle with an empty queue.
//!
//! cargo fuzz run fuzz_notifications

#![no_main]

use bswm::adapters::LoggingBsw;
use bswm::modes::SourceKind;
use bswm::{Engine, EngineConfig, PortKey, Topology};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use libfuzzer_sys::fuzz_target;

const DEMO: &str = include_str!("../../demos/vehicle_topology.json");

fuzz_target!(|data: &[u8]| {
    let topology = Topology::from_json(DEMO).expect("demo topology parses");
    let compiled = topology.compile().expect("demo topology compiles");
    let engine = Engine::<NoopRawMutex>::from_compiled(compiled, EngineConfig::default())
        .expect("default config is valid");
    let bsw = LoggingBsw::new();
    engine.init();

    for chunk in data.chunks_exact(4) {
        let [op, a, channel, mode] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        match op % 5 {
            0 => {
                let source = SourceKind::ALL[usize::from(a) % SourceKind::ALL.len()];
                let key = PortKey::new(source, u32::from(channel));
                engine.notify_mode(&bsw, key, u32::from(mode));
            }
            1 => engine.request_mode(&bsw, u16::from(a), u32::from(mode)),
            2 => engine.main_function(&bsw),
            3 => engine.init(),
            _ => engine.deinit(),
        }
        assert!(!engine.is_active());
        assert_eq!(engine.pending_requests(), 0);
    }
});
