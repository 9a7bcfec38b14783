//! Fuzz target for the diagram parser.
//!
//! The parser must never panic, and every syntax error it records must
//! point at lines that exist in the input.

#![no_main]

use erdsmith::Parser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let doc = Parser::new().parse(text);
    let lines = text.lines().count();
    for error in &doc.syntax_errors {
        assert!(error.line_start <= error.line_end);
        assert!(error.line_end <= lines);
    }
});
