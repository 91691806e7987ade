//! End-to-end tests of the public API against the in-memory `reg.exe`.

use std::sync::Arc;
use std::time::Duration;

use regkit::args;
use regkit::client::{Item, Registry};
use regkit::options::{ClientOptions, Format, Options, View};
use regkit::parser::{ValueOutput, ValuesOutput};
use regkit::test_utils::{FakeRegExe, Locale};
use regkit::value::{data_map, Data, ValueType};

const ROOT: &str = "HKCU\\Software\\RegkitTest";

fn registry(fake: &FakeRegExe) -> Registry {
    Registry::with_spawner(Arc::new(fake.clone()))
}

fn complex() -> Options {
    Options::new().format(Format::Complex).lowercase(false)
}

#[tokio::test]
async fn test_every_type_round_trips() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);

    let cases: Vec<(&str, Data, &str)> = vec![
        ("Sz", Data::from("plain text"), "REG_SZ"),
        ("Expand", Data::from("%SystemRoot%\\System32"), "REG_EXPAND_SZ"),
        ("Multi", Data::from(vec!["one", "two"]), "REG_MULTI_SZ"),
        ("Dword", Data::from(42u32), "REG_DWORD"),
        ("Qword", Data::from(1u64 << 40), "REG_QWORD"),
        ("Binary", Data::Bytes(vec![0x01, 0x02, 0xff]), "REG_BINARY"),
    ];

    for (name, data, tag) in &cases {
        reg.set(args![ROOT, *name, data.clone(), *tag]).await.unwrap();
    }

    for (name, data, tag) in &cases {
        let read = reg
            .get_value(args![ROOT, *name, complex()])
            .await
            .unwrap()
            .unwrap();
        match read {
            ValueOutput::Entry(entry) => {
                assert_eq!(entry.name, *name);
                assert_eq!(entry.value_type.as_str(), *tag);
                assert_eq!(&entry.data, data, "payload of {}", name);
            }
            other => panic!("expected a complex entry for {}, got {:?}", name, other),
        }
    }
}

#[tokio::test]
async fn test_untyped_value_reads_back_as_bytes() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);

    reg.set(args![ROOT, "Marker", "raw", "REG_NONE"]).await.unwrap();

    let read = reg
        .get_value(args![ROOT, "Marker", complex()])
        .await
        .unwrap()
        .unwrap();
    match read {
        ValueOutput::Entry(entry) => {
            assert_eq!(entry.value_type, ValueType::None);
            assert_eq!(entry.data, Data::Bytes(vec![b'r', 0, b'a', 0, b'w', 0, 0, 0]));
        }
        other => panic!("expected a complex entry, got {:?}", other),
    }
}

#[tokio::test]
async fn test_inferred_types() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);

    reg.set(args![ROOT, "Small", 7u32]).await.unwrap();
    reg.set(args![ROOT, "Large", u64::from(u32::MAX) + 1]).await.unwrap();
    reg.set(args![ROOT, "List", vec!["a", "b"]]).await.unwrap();

    let values = reg
        .get_values(args![ROOT, complex()])
        .await
        .unwrap()
        .unwrap();
    let ValuesOutput::Complex(entries) = values else {
        panic!("expected complex values");
    };
    let type_of = |name: &str| {
        entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value_type.clone())
    };
    assert_eq!(type_of("Small"), Some(ValueType::Dword));
    assert_eq!(type_of("Large"), Some(ValueType::Qword));
    assert_eq!(type_of("List"), Some(ValueType::MultiString));
}

#[tokio::test]
async fn test_default_value_after_key_creation() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);

    reg.set_key(args![ROOT]).await.unwrap();
    assert_eq!(reg.get_value(args![ROOT, ""]).await.unwrap(), None);
    assert!(!reg.has_value(args![ROOT, ""]).await.unwrap());

    reg.set_value(args![ROOT, "", ""]).await.unwrap();
    assert_eq!(
        reg.get_value(args![ROOT, ""]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("")))
    );
    assert!(reg.has_value(args![ROOT, ""]).await.unwrap());
}

#[tokio::test]
async fn test_lowercase_folds_names_only() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);
    let subkey = format!("{}\\SubKey", ROOT);
    reg.set(args![subkey.as_str(), "MixedName", "Mixed Data"])
        .await
        .unwrap();

    let folded = reg.get_keys(args![ROOT]).await.unwrap().unwrap();
    assert_eq!(folded, vec!["subkey"]);
    let kept = reg
        .get_keys(args![ROOT, Options::new().lowercase(false)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept, vec!["SubKey"]);

    let tree = reg.get_key(args![ROOT, true]).await.unwrap().unwrap();
    let root = tree.as_simple().unwrap();
    assert_eq!(
        root.keys["subkey"].values.get("mixedname"),
        Some(&Data::from("Mixed Data"))
    );
}

#[tokio::test]
async fn test_missing_paths_and_bad_types() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);
    let missing = format!("{}\\Nope", ROOT);

    assert_eq!(reg.get(args![missing.as_str()]).await.unwrap(), None);
    assert_eq!(reg.get(args![missing.as_str(), "x"]).await.unwrap(), None);
    assert!(!reg.has(args![missing.as_str()]).await.unwrap());
    reg.delete(args![missing.as_str()]).await.unwrap();
    reg.clear(args![missing.as_str()]).await.unwrap();

    let err = reg
        .set(args![ROOT, "x", "y", "REG_FANCY"])
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Illegal type 'REG_FANCY'"));
}

#[tokio::test]
async fn test_structured_write_layout() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);

    let payload = data_map([
        ("", Data::from("root data")),
        ("leader", Data::from("X")),
        ("nested", data_map([("leader", Data::from("Y"))])),
    ]);
    reg.set(args![ROOT, payload]).await.unwrap();

    assert_eq!(
        reg.get_value(args![ROOT]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("root data")))
    );
    assert_eq!(
        reg.get_value(args![ROOT, "leader"]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("X")))
    );
    let nested = format!("{}\\nested", ROOT);
    assert_eq!(
        reg.get_value(args![nested.as_str(), "leader"]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("Y")))
    );
}

#[tokio::test]
async fn test_formats_expose_same_names() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);
    reg.set(args![
        ROOT,
        data_map([
            ("", Data::from("d")),
            ("a", Data::from(1u32)),
            ("B", Data::from("b")),
            ("child", data_map([("c", Data::from("c"))])),
        ])
    ])
    .await
    .unwrap();

    let simple = reg.get_key(args![ROOT, true]).await.unwrap().unwrap();
    let detailed = reg
        .get_key(args![ROOT, Options::new().recursive(true).format(Format::Complex)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(simple.subkey_names(), detailed.subkey_names());
    assert_eq!(simple.value_names(), detailed.value_names());
    assert_eq!(simple.value_names(), vec!["", "a", "b"]);

    let simple_values = reg.get_values(args![ROOT]).await.unwrap().unwrap();
    let complex_values = reg
        .get_values(args![ROOT, Options::new().format(Format::Complex)])
        .await
        .unwrap()
        .unwrap();
    let mut complex_names = complex_values.names();
    complex_names.sort_unstable();
    assert_eq!(simple_values.names(), complex_names);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_calibrate_once() {
    let fake = FakeRegExe::new().with_latency(Duration::from_millis(10));
    let reg = registry(&fake);

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let reg = reg.clone();
            tokio::spawn(async move {
                let path = format!("{}\\Worker{}", ROOT, i);
                reg.has_key(args![path]).await
            })
        })
        .collect();
    for task in tasks {
        assert!(!task.await.unwrap().unwrap());
    }

    assert_eq!(fake.count_calls(&["QUERY", "HKLM\\NONEXISTENT"]), 1);
    assert_eq!(fake.count_calls(&["QUERY", "HKCR", "/ve"]), 1);
}

#[tokio::test]
async fn test_german_installation() {
    let fake = FakeRegExe::new().with_locale(Locale::german());
    let reg = registry(&fake);

    reg.set_key(args![ROOT]).await.unwrap();
    assert_eq!(reg.get_value(args![ROOT]).await.unwrap(), None);
    assert_eq!(reg.get(args!["HKCU\\Fehlt"]).await.unwrap(), None);

    reg.set(args![ROOT, "", "Standardwert"]).await.unwrap();
    let values = reg.get_values(args![ROOT]).await.unwrap().unwrap();
    assert_eq!(values.names(), vec![""]);
}

#[tokio::test]
async fn test_registry_key_wrapper() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);
    let key = reg.key(ROOT, None).unwrap();

    key.set(args![]).await.unwrap();
    key.set(args!["Name", "value"]).await.unwrap();
    key.set(args!["\\Child", "Inner", 5u32]).await.unwrap();
    key.set(args![".\\Other"]).await.unwrap();

    match key.get(args!["\\Child", "Inner"]).await.unwrap() {
        Some(Item::Value(value)) => assert_eq!(value.data(), &Data::Integer(5)),
        other => panic!("expected a value, got {:?}", other),
    }
    match key.get(args![]).await.unwrap() {
        Some(Item::Key(tree)) => {
            assert_eq!(tree.subkey_names(), vec!["child", "other"]);
            assert_eq!(tree.value_names(), vec!["name"]);
        }
        other => panic!("expected a key, got {:?}", other),
    }

    key.clear(args![]).await.unwrap();
    assert!(key.has(args![]).await.unwrap());
    assert!(!key.has(args!["Name"]).await.unwrap());
    assert!(!key.has(args!["\\Child"]).await.unwrap());

    key.delete(args![]).await.unwrap();
    assert!(!fake.key_exists(ROOT));
}

#[tokio::test]
async fn test_32_bit_view() {
    let fake = FakeRegExe::new();
    let reg = registry(&fake);
    let wow = reg.with_defaults(ClientOptions {
        view: Some(View::Bits32),
        ..ClientOptions::default()
    });

    wow.set(args![ROOT, "Arch", "x86"]).await.unwrap();
    reg.set(args![ROOT, "Arch", "x64"]).await.unwrap();

    assert_eq!(
        wow.get_value(args![ROOT, "Arch"]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("x86")))
    );
    assert_eq!(
        reg.get_value(args![ROOT, "Arch"]).await.unwrap(),
        Some(ValueOutput::Data(Data::from("x64")))
    );
    assert_eq!(
        reg.get_value(args![ROOT, "Arch", Options::new().bits(32)])
            .await
            .unwrap(),
        Some(ValueOutput::Data(Data::from("x86")))
    );

    wow.delete(args![ROOT]).await.unwrap();
    assert!(!wow.has(args![ROOT]).await.unwrap());
    assert!(reg.has(args![ROOT]).await.unwrap());
}
