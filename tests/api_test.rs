use ctx19_core::{parse_rules, translate_to, Ctx19Error, Format};
use miette::Diagnostic;
use std::io::{self, Write};
use std::str::FromStr;

#[test]
fn test_simple_parse_to_json() {
    let source = "if\n\tfirst token\n\t\tspeed is fast\n\t3rd token2\n\t\tspeed is not fast\nthen\n\tspeed becomes 5\n";

    let expected_json = serde_json::json!([{
        "if": {
            "token": { "position": 1, "speed": [true, "fast"] },
            "token2": { "position": 3, "speed": [false, "fast"] }
        },
        "then": { "speed": 5 }
    }]);

    let rule_set = parse_rules(source, "test.ctx19").unwrap();
    let result = rule_set.to_json().unwrap();
    let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();

    assert_eq!(result_json, expected_json);
}

#[test]
fn test_then_key_omitted_without_then_block() {
    let rule_set = parse_rules("if\n\ttoken\n\t\tx is y\n", "test.ctx19").unwrap();
    let json = rule_set.to_json().unwrap();
    assert!(!json.contains("then"), "{json}");
    assert!(!json.contains("null"), "{json}");
}

#[test]
fn test_raw_values_are_valid_json() {
    let source = "if\n\ttoken\nthen\n\ta becomes 12\n\tb becomes -3.5e2\n\tc becomes 12abc\n\td becomes say \"hi\"\n\te becomes true\n";
    let rule_set = parse_rules(source, "test.ctx19").unwrap();
    let json = rule_set.to_json().unwrap();
    assert!(json.contains(r#""b": -3.5e2"#), "{json}");

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        value[0]["then"],
        serde_json::json!({
            "a": 12,
            "b": serde_json::Number::from_str("-3.5e2").unwrap(),
            "c": "12abc",
            "d": "say \"hi\"",
            "e": "true"
        })
    );
}

#[test]
fn test_big_and_exponent_numbers_are_verbatim() {
    let source = "if\n\ttoken\nthen\n\tid becomes 12345678901234567890123\n\tscale becomes 1E5\n\ttiny becomes 0.1000000000000000000001\n\tzero becomes -0\n";
    let json = parse_rules(source, "test.ctx19").unwrap().to_json().unwrap();
    for expected in [
        r#""id": 12345678901234567890123"#,
        r#""scale": 1E5"#,
        r#""tiny": 0.1000000000000000000001"#,
        r#""zero": -0"#,
    ] {
        assert!(json.contains(expected), "missing {expected} in {json}");
    }

    let mut streamed = Vec::new();
    translate_to(source.as_bytes(), &mut streamed, "test.ctx19", Format::Json).unwrap();
    assert_eq!(String::from_utf8(streamed).unwrap(), format!("{json}\n"));
}

#[test]
fn test_parse_error_diagnostic() {
    let result = parse_rules("if\n\tfirst next\n\t\tcolor equals red\n", "rules.ctx19");
    let err = match result {
        Err(err) => err,
        Ok(_) => panic!("Expected parse error"),
    };
    assert!(matches!(err, Ctx19Error::Parse(_)));
    let code = err.code().map(|c| c.to_string());
    assert_eq!(code.as_deref(), Some("ctx19::malformed_line"));
    assert!(err.to_string().contains("color equals red"));
}

#[test]
fn test_translate_to_yaml() {
    let mut out = Vec::new();
    let count = translate_to(
        "if\n\tend\n\t\tpos is VERB\n".as_bytes(),
        &mut out,
        "test.ctx19",
        Format::Yaml,
    )
    .unwrap();
    assert_eq!(count, 1);
    let value: serde_json::Value = serde_yaml::from_slice(&out).unwrap();
    assert_eq!(
        value,
        serde_json::json!([{ "if": { "end": { "position": 1, "pos": [true, "VERB"] } } }])
    );
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_failure_is_stream_error() {
    let result = translate_to(
        "if\n\ttoken\n".as_bytes(),
        FailingWriter,
        "test.ctx19",
        Format::Json,
    );
    match result {
        Err(Ctx19Error::Io(err)) => assert_eq!(err.to_string(), "disk full"),
        other => panic!("Expected an I/O error, got {other:?}"),
    }
}
