#![no_main]
use libfuzzer_sys::fuzz_target;

use fillmon_core::InboundEvent;

fuzz_target!(|input: (&str, &[u8])| {
    let (topic, payload) = input;
    // Any topic/payload pair must decode or fail with a DecodeError.
    let _ = InboundEvent::decode("tank", topic, payload);
    let _ = InboundEvent::decode("plant/line1", topic, payload);
});
