//! Fuzz target for the full compile pipeline.
//!
//! Arbitrary bytes either compile or fail with an error; the fix loop must
//! always terminate.

#![no_main]

use erdsmith::{CompileOptions, CompilerConfig, ErdCompiler};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 20_000 {
        return;
    }

    let mut config = CompilerConfig::default();
    config.fix.max_iterations = 200;
    let compiler = ErdCompiler::with_config(config);

    if let Ok(result) = compiler.compile_bytes(data, &CompileOptions::default()) {
        assert!(result.applied_fixes.len() <= 200);
    }
});
