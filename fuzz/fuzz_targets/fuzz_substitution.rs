#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;

use launchvar::scope::LaunchScope;
use launchvar::subst::resolve_text;
use launchvar::{MemorySystem, ValueType};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let system = MemorySystem::new()
            .with_package("fuzz", "/fuzz")
            .with_env("HOME", "/home/fuzz");
        let args = BTreeMap::from([("robot".to_string(), "r1".to_string())]);
        let mut scope = LaunchScope::new("/fuzz/main.launch", &system, &args);
        let _ = scope.declare_arg("robot", None);
        let _ = scope.declare_arg("unset", None);

        for ty in [ValueType::Auto, ValueType::String, ValueType::Bool, ValueType::Yaml] {
            let _ = resolve_text(text, &scope, ty);
        }
    }
});
