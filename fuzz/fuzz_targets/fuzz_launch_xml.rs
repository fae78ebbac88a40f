#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;

use launchvar::{InterpreterOptions, LaunchInterpreter, MemorySystem};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let path = "/fuzz/main.launch";
        let system = MemorySystem::new()
            .with_package("fuzz", "/fuzz")
            .with_file(path, content)
            .with_file("/fuzz/params.yaml", "a: 1\nb: {c: true}\n");

        // Parsing and interpreting arbitrary XML must fail gracefully
        let mut interpreter = LaunchInterpreter::new(&system, InterpreterOptions::default());
        if interpreter.interpret(path, &BTreeMap::new()).is_ok() {
            let _ = serde_json::to_string(interpreter.model());
        }
    }
});
