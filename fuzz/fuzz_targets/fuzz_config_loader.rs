#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Line config and order files: parse or validation errors are fine, panics are not.
    if let Ok(cfg) = fillmon_config::load_toml(data) {
        let _ = cfg.validate();
    }
    if let Ok(order) = fillmon_config::load_order_toml(data) {
        let _ = order.mode();
        let _ = fillmon_core::ProcessOrder::try_from(&order);
    }
});
