//! Parsing against template trees built on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use ferrissh_textfsm::{
    FieldValue, MatchKind, OutputParser, ParseError, ParseWarning, ParserBuilder, Resolution,
    TemplateError,
};
use tempfile::TempDir;

const NAMES: &str = "Value NAME (\\S+)\n\nStart\n  ^${NAME}$$ -> Record\n  ^$$ -> Record\n";

const ROUTES: &str = "\
Value Filldown VRF (\\S+)
Value Required PREFIX (\\S+)

Start
  ^VRF ${VRF}
  ^route ${PREFIX} -> Record
";

const INTERFACES: &str = "\
Value Required INTERFACE (\\S+)
Value List VLANS (\\d+)

Start
  ^interface ${INTERFACE}
  ^ vlan ${VLANS}
  ^! -> Record
";

fn write_tree(dir: &Path, index: &str, templates: &[(&str, &str)]) {
    fs::write(dir.join("index"), index).unwrap();
    for (name, source) in templates {
        fs::write(dir.join(name), source).unwrap();
    }
}

fn make_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        "Template, Hostname, Platform, Command\n\
         lab_names.textfsm, .*, lab_os, sh[[ow]] na[[mes]]\n\
         lab_routes.textfsm, .*, lab_os, sh[[ow]] ro[[utes]]\n\
         lab_interfaces.textfsm, .*, lab_os, sh[[ow]] run[[ning-config]] int[[erfaces]]\n\
         lab_broken.textfsm, .*, lab_os, sh[[ow]] bro[[ken]]\n\
         lab_missing.textfsm, .*, lab_os, sh[[ow]] mis[[sing]]\n\
         lab_dir.textfsm, .*, lab_os, sh[[ow]] dir\n",
        &[
            ("lab_names.textfsm", NAMES),
            ("lab_routes.textfsm", ROUTES),
            ("lab_interfaces.textfsm", INTERFACES),
            ("lab_broken.textfsm", "Value A (\\S+)\n\nStart\n  ^${A} -> Nowhere\n"),
        ],
    );
    fs::create_dir(dir.path().join("lab_dir.textfsm")).unwrap();
    dir
}

#[test]
fn test_one_record_per_line() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    let names = ["alpha", "bravo", "charlie", "delta", "echo"];
    let text = format!("{}\n\n", names.join("\n"));
    let records = parser.parse("lab_os", "show names", &text).unwrap();

    assert_eq!(records.len(), names.len());
    for (record, name) in records.iter().zip(names) {
        assert_eq!(record.len(), 1);
        assert_eq!(record.get_str("NAME"), Some(name));
    }
}

#[test]
fn test_filldown_carries_into_next_record() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    let text = "VRF mgmt\nroute 0.0.0.0/0\nroute 10.0.0.0/8\n";
    let records = parser.parse("lab_os", "sh ro", text).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get_str("VRF"), Some("mgmt"));
    assert_eq!(records[1].get_str("VRF"), Some("mgmt"));
    assert_eq!(records[1].get_str("PREFIX"), Some("10.0.0.0/8"));
}

#[test]
fn test_list_accumulates_then_resets() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    let text = "interface Gi1\n vlan 10\n vlan 20\n vlan 30\n!\ninterface Gi2\n!\n";
    let records = parser.parse("lab_os", "show run int", text).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].get("VLANS"),
        Some(&FieldValue::List(vec![
            "10".to_string(),
            "20".to_string(),
            "30".to_string()
        ]))
    );
    assert_eq!(records[1].get_str("INTERFACE"), Some("Gi2"));
    assert_eq!(records[1].get("VLANS"), Some(&FieldValue::List(Vec::new())));
}

#[test]
fn test_required_warning() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    let outcome = parser
        .parse_outcome("lab_os", "show routes", "VRF mgmt\n")
        .unwrap();
    assert!(outcome.records.is_empty());
    assert_eq!(
        outcome.warnings,
        vec![ParseWarning::RequiredNeverFilled {
            value: "PREFIX".to_string()
        }]
    );
}

#[test]
fn test_template_definition_errors() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    match parser.parse("lab_os", "show broken", "x\n") {
        Err(ParseError::TemplateDefinition(TemplateError::UndefinedState {
            state,
            target,
            line,
        })) => {
            assert_eq!(state, "Start");
            assert_eq!(target, "Nowhere");
            assert_eq!(line, 4);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(matches!(
        parser.parse("lab_os", "show dir", "x\n"),
        Err(ParseError::TemplateDefinition(TemplateError::Read { .. }))
    ));
}

#[test]
fn test_missing_template_file() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    assert_eq!(parser.resolve("lab_os", "show missing"), Resolution::NoMatch);
    assert!(matches!(
        parser.parse("lab_os", "show missing", "x\n"),
        Err(ParseError::NoTemplate { .. })
    ));
}

#[test]
fn test_extra_template_dir() {
    let dir = make_tree();
    let extra = TempDir::new().unwrap();
    fs::write(extra.path().join("lab_missing.textfsm"), NAMES).unwrap();
    fs::write(extra.path().join("lab_names.textfsm"), "Value X (\\S+)\n\nStart\n").unwrap();
    let parser = ParserBuilder::new(dir.path())
        .extra_template_dir(extra.path())
        .build();

    let template = parser.resolve("lab_os", "sh mis").into_template().unwrap();
    assert_eq!(template.path, extra.path().join("lab_missing.textfsm"));
    assert_eq!(parser.parse("lab_os", "show missing", "a\nb\n").unwrap().len(), 2);

    // The main directory wins when both hold the file.
    let template = parser.resolve("lab_os", "sh na").into_template().unwrap();
    assert_eq!(template.path, dir.path().join("lab_names.textfsm"));
}

#[test]
fn test_substring_fallback() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();

    let resolution = parser.resolve("lab_os", "show routes vrf mgmt");
    let template = resolution.template().unwrap();
    assert_eq!(template.template_name, "lab_routes.textfsm");
    assert_eq!(template.match_kind, MatchKind::Substring);
    assert_eq!(template.path, dir.path().join("lab_routes.textfsm"));
}

#[test]
fn test_reload_swaps_registry_and_templates() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();
    assert_eq!(
        parser.parse("lab_os", "show names", "one\n").unwrap().len(),
        1
    );
    let before = parser.registry().unwrap();

    // New platform plus an edited template; nothing changes until reload.
    fs::write(
        dir.path().join("index"),
        "Template, Platform, Command\n\
         lab_names.textfsm, lab_os, sh[[ow]] na[[mes]]\n\
         lab_names.textfsm, other_os, list names\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("lab_names.textfsm"),
        "Value NAME (\\S+)\n\nStart\n  ^name ${NAME} -> Record\n",
    )
    .unwrap();
    assert_eq!(
        parser.resolve("other_os", "list names"),
        Resolution::UnsupportedPlatform
    );
    assert_eq!(
        parser.parse("lab_os", "show names", "one\n").unwrap().len(),
        1
    );

    parser.reload().unwrap();
    let after = parser.registry().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(parser.platforms(), vec!["lab_os", "other_os"]);
    assert_eq!(parser.commands("lab_os"), vec!["show names"]);
    assert!(parser.parse("lab_os", "show names", "one\n").unwrap().is_empty());
    assert_eq!(
        parser.parse("other_os", "list names", "name two\n").unwrap()[0].get_str("NAME"),
        Some("two")
    );
}

#[test]
fn test_failed_reload_keeps_snapshot() {
    let dir = make_tree();
    let parser = ParserBuilder::new(dir.path()).build();
    parser.reload().unwrap();

    fs::write(dir.path().join("index"), "Template, Command\nx.textfsm, show x\n").unwrap();
    assert!(parser.reload().is_err());
    assert!(parser.resolve("lab_os", "sh names").template().is_some());
}

#[test]
fn test_concurrent_parses() {
    let dir = make_tree();
    let parser = Arc::new(ParserBuilder::new(dir.path()).template_cache_size(1).build());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let parser: Arc<OutputParser> = Arc::clone(&parser);
            thread::spawn(move || {
                let (command, text, expected) = if i % 2 == 0 {
                    ("show names", "a\nb\nc\n", 3)
                } else {
                    ("show routes", "VRF x\nroute 1.1.1.0/24\n", 1)
                };
                for _ in 0..20 {
                    let records = parser.parse("lab_os", command, text).unwrap();
                    assert_eq!(records.len(), expected);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
