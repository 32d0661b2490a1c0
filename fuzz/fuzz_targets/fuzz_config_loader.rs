#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = capscale_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = capscale_core::EngineConfig::from(&cfg);
        }
    }
});
