use super::*;
use crate::args;
use crate::value::{data_map, ValueType};

fn read(args: Vec<Arg>) -> RegResult<Request> {
    normalize(CallKind::Read, args, None, &ClientOptions::default())
}

fn write(args: Vec<Arg>) -> RegResult<Request> {
    normalize(CallKind::Write, args, None, &ClientOptions::default())
}

fn record(entries: &[(&str, Data)]) -> BTreeMap<String, Data> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn test_path_only() {
    let request = read(args!["HKLM/SOFTWARE/Test/"]).unwrap();
    assert_eq!(request.path.as_deref(), Some("HKLM\\SOFTWARE\\Test"));
    assert_eq!(request.name, None);
    assert!(!request.recursive);
    assert_eq!(request.format, Format::Simple);
    assert!(request.lowercase);
    assert_eq!(request.view, None);
    assert_eq!(request.values_key, "$values");
}

#[test]
fn test_recursive_flag_in_second_slot() {
    let request = read(args!["HKCU\\Software", true]).unwrap();
    assert!(request.recursive);
    assert_eq!(request.name, None);
}

#[test]
fn test_name_data_and_type_slots() {
    let request = write(args!["HKCU\\Software\\Test", "Count", "12", "dword"]).unwrap();
    assert_eq!(request.name.as_deref(), Some("Count"));
    assert_eq!(request.data, Some(Data::from("12")));
    assert_eq!(request.value_type, Some(ValueType::Dword));
}

#[test]
fn test_trailing_map_is_options_for_reads() {
    let options = record(&[
        ("recursive", Data::Bool(true)),
        ("format", Data::from("complex")),
        ("bits", Data::Integer(32)),
    ]);
    let request = read(args!["HKLM\\SOFTWARE", options]).unwrap();
    assert!(request.recursive);
    assert_eq!(request.format, Format::Complex);
    assert_eq!(request.view, Some(View::Bits32));
}

#[test]
fn test_leading_record_carries_path() {
    let options = record(&[
        ("path", Data::from("HKCU/Software")),
        ("name", Data::from("Value")),
    ]);
    let request = read(args![options]).unwrap();
    assert_eq!(request.path.as_deref(), Some("HKCU\\Software"));
    assert_eq!(request.name.as_deref(), Some("Value"));
}

#[test]
fn test_write_pins_trailing_map_as_data() {
    let payload = record(&[("leader", Data::from("X"))]);

    let request = write(args!["HKCU\\Software\\Test", payload.clone()]).unwrap();
    assert_eq!(request.name, None);
    assert_eq!(request.data, Some(Data::Map(payload.clone())));

    let request = write(args!["HKCU\\Software\\Test", "Sub", payload.clone()]).unwrap();
    assert_eq!(request.name.as_deref(), Some("Sub"));
    assert_eq!(request.data, Some(Data::Map(payload)));
}

#[test]
fn test_tagged_map_is_options_even_for_writes() {
    let options = record(&[
        (IS_OPTIONS, Data::Bool(true)),
        ("bits", Data::Integer(64)),
    ]);
    let request = write(args!["HKCU\\Software\\Test", "Name", options]).unwrap();
    assert_eq!(request.name.as_deref(), Some("Name"));
    assert_eq!(request.data, None);
    assert_eq!(request.view, Some(View::Bits64));
}

#[test]
fn test_non_string_fourth_slot_is_options() {
    let options = record(&[("lowercase", Data::Bool(false))]);
    let request = write(args!["HKCU\\Software\\Test", "Name", "data", options]).unwrap();
    assert_eq!(request.value_type, None);
    assert!(!request.lowercase);
    assert_eq!(request.data, Some(Data::from("data")));
}

#[test]
fn test_layering_order() {
    let defaults = ClientOptions {
        lowercase: false,
        format: Format::Complex,
        view: Some(View::Bits64),
        values_key: "values".to_string(),
    };
    let call = Options::new().format(Format::Simple).bits(32);
    let request = normalize(
        CallKind::Read,
        args!["HKCU\\Software", "Name", Options::new().bits(64)],
        Some(&call),
        &defaults,
    )
    .unwrap();

    assert!(!request.lowercase);
    assert_eq!(request.format, Format::Simple);
    assert_eq!(request.view, Some(View::Bits64));
    assert_eq!(request.values_key, "values");
}

#[test]
fn test_last_record_wins() {
    let request = read(args![
        Options::new().path("HKCU\\Software").recursive(true),
        Options::new().recursive(false)
    ])
    .unwrap();
    assert!(!request.recursive);
}

#[test]
fn test_positional_beats_call_options() {
    let call = Options::new().path("HKCU\\Software\\Base").name("fromCall");
    let request = normalize(
        CallKind::Read,
        args!["HKCU\\Software\\Base", "fromArgs"],
        Some(&call),
        &ClientOptions::default(),
    )
    .unwrap();
    assert_eq!(request.name.as_deref(), Some("fromArgs"));
}

#[test]
fn test_unknown_bits_fall_back_to_default_view() {
    let request = read(args!["HKLM\\SOFTWARE", Options::new().bits(16)]).unwrap();
    assert_eq!(request.view, None);
    assert_eq!(request.view_flag(), None);
}

#[test]
fn test_custom_fields_pass_through() {
    let options = record(&[("timeoutHint", Data::Integer(5))]);
    let request = read(args!["HKLM\\SOFTWARE", options]).unwrap();
    assert_eq!(request.custom.get("timeoutHint"), Some(&Data::Integer(5)));
}

#[test]
fn test_configuration_errors() {
    assert!(read(args!["HKXX\\Software"]).unwrap_err().is_configuration());
    assert!(write(args!["HKCU\\Software", "Name", "x", "REG_FOO"])
        .unwrap_err()
        .is_configuration());

    let bad = record(&[("recursive", Data::from("yes"))]);
    assert!(read(args!["HKCU\\Software", bad]).unwrap_err().is_configuration());

    assert!(read(args![true]).unwrap_err().is_configuration());
    assert!(
        read(args!["HKCU\\Software", "Name", "data", "sz", "extra"])
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn test_missing_path_is_reported_lazily() {
    let request = read(args![Options::new().name("x")]).unwrap();
    assert!(request.key_path().unwrap_err().is_configuration());
}

#[test]
fn test_explicit_data_argument_is_never_options() {
    let payload = data_map([("bits", Data::Integer(32))]);
    let request = read(args!["HKCU\\Software", payload.clone()]).unwrap();
    assert_eq!(request.data, Some(payload));
    assert_eq!(request.view, None);
}
