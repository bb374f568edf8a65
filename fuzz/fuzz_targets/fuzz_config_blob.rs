//! Fuzz target: loading the persisted config blob.
//!
//! Arbitrary bytes in the NVS slot must either load as a config that
//! passes validation or be rejected, never panic.  Anything accepted
//! must survive a save/load cycle unchanged.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use cosmos::adapters::nvs::NvsAdapter;
use cosmos::app::ports::ConfigPort;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let nvs = NvsAdapter::default();
    nvs.sim_put_raw(data);

    if let Ok(cfg) = nvs.load() {
        assert!(cfg.validate().is_ok());
        nvs.save(&cfg).expect("validated config must save");
        assert_eq!(nvs.load().ok(), Some(cfg));
    }
});
