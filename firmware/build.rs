//! Build script
//!
//! Places `memory.x` on the linker search path and forwards the network settings from
//! the build environment, falling back to defaults when they are unset.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Settings read by `system::config` through `env!`
const FORWARDED: [(&str, &str); 3] = [
    ("WIFI_SSID", ""),
    ("WIFI_PASSWORD", ""),
    ("MQTT_HOST", "broker.hivemq.com"),
];

fn main() {
    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    for (name, default) in FORWARDED {
        let value = env::var(name).unwrap_or_else(|_| default.into());
        println!("cargo:rustc-env={}={}", name, value);
        println!("cargo:rerun-if-env-changed={}", name);
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
