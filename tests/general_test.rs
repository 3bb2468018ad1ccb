use ctx19_core::parser::Parser;
use miette::Report;
use std::fs;

#[test]
fn test_all_ok_ctx19_files() {
    let tests_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/ok");
    let entries = fs::read_dir(tests_dir).expect("Failed to read tests directory");

    for entry in entries {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "ctx19") {
            println!("Parsing file: {:?}", path);
            let source = fs::read_to_string(&path)
                .unwrap_or_else(|_| panic!("Failed to read file: {:?}", path));

            let mut parser = Parser::new_with_name(&source, path.display().to_string());
            if let Err(err) = parser.parse_rules() {
                panic!("Failed to parse {:?}. Error: {:?}", path, Report::new(err));
            }
        }
    }
}

#[test]
fn test_all_bad_ctx19_files_fail() {
    let tests_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/bad");
    let entries = fs::read_dir(tests_dir).expect("Failed to read tests directory");

    for entry in entries {
        let path = entry.expect("Failed to read directory entry").path();
        if path.extension().is_some_and(|ext| ext == "ctx19") {
            let source = fs::read_to_string(&path).unwrap();
            let result = Parser::new(&source).parse_rules();
            assert!(result.is_err(), "{:?} should not parse", path);
        }
    }
}
