#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Must never panic; a successful parse must survive a trip through its
    // canonical text form unchanged
    if let Ok(ast) = skilldex::parse_query(data) {
        let canonical = ast.to_string();
        let reparsed = skilldex::parse_query(&canonical).expect("canonical form parses");
        assert_eq!(reparsed.to_string(), canonical);
    }
});
