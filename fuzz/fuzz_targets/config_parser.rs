//! Fuzz target for `qlreport.toml` parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

use qlreport_types::ConfigFile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = toml::from_str::<ConfigFile>(text) {
        // Whatever parses must survive a round trip through TOML.
        let written = toml::to_string(&config).expect("config serializes");
        let reparsed: ConfigFile = toml::from_str(&written).expect("written config parses");
        assert_eq!(reparsed, config);
    }
});
