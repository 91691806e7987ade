use super::*;
use crate::test_utils::{FakeRegExe, Locale, MockSpawner};

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn english_executor(spawner: MockSpawner) -> Executor {
    Executor::new(Arc::new(spawner)).with_calibration(Calibration::english())
}

#[tokio::test]
async fn test_success_returns_stdout() {
    let spawner = MockSpawner::new();
    spawner.push_output(ProcessOutput::success("\r\nHKEY_CURRENT_USER\\Software\r\n"));
    let executor = english_executor(spawner.clone());

    let output = executor.execute(&args(&["query", "HKCU\\Software"])).await.unwrap();
    assert_eq!(output.as_deref(), Some("\r\nHKEY_CURRENT_USER\\Software\r\n"));

    let calls = spawner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "reg.exe");
    assert!(calls[0].matches(&["query", "HKCU\\Software"]));
}

#[tokio::test]
async fn test_not_found_is_absent() {
    let spawner = MockSpawner::new();
    spawner.push_output(ProcessOutput::failure(format!("{}\r\n", DEFAULT_NOT_FOUND)));
    let executor = english_executor(spawner);

    let output = executor.execute(&args(&["query", "HKCU\\Missing"])).await.unwrap();
    assert_eq!(output, None);
}

#[tokio::test]
async fn test_other_stderr_is_external_error() {
    let spawner = MockSpawner::new();
    spawner.push_output(ProcessOutput::failure("ERROR: Access is denied.\r\n"));
    let executor = english_executor(spawner);

    let err = executor
        .execute(&args(&["delete", "HKLM\\SOFTWARE\\Locked", "/f"]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Access is denied. - Command 'reg delete HKLM\\SOFTWARE\\Locked /f'"
    );
}

#[tokio::test]
async fn test_nonzero_status_without_stderr_is_error() {
    let spawner = MockSpawner::new();
    spawner.push_output(ProcessOutput {
        stdout: String::new(),
        stderr: String::new(),
        status: Some(5),
    });
    let executor = english_executor(spawner);

    let err = executor.execute(&args(&["query", "HKCU"])).await.unwrap_err();
    assert!(matches!(err, RegError::ExternalTool { .. }));
    assert!(err.to_string().contains("status 5"));
}

#[tokio::test]
async fn test_spawn_failure_is_process_error() {
    let spawner = MockSpawner::new();
    spawner.push_error(RegError::process("Failed to execute reg.exe: not found"));
    let executor = english_executor(spawner);

    let err = executor.execute(&args(&["query", "HKCU"])).await.unwrap_err();
    assert!(matches!(err, RegError::Process { .. }));
}

#[test]
fn test_error_message_prefix() {
    assert_eq!(error_message("ERROR: Access is denied."), "Access is denied.");
    assert_eq!(error_message("FEHLER: Zugriff verweigert"), "Zugriff verweigert");
    assert_eq!(error_message("Something: else"), "Something: else");
}

#[test]
fn test_calibration_from_probes() {
    let calibration = Calibration::from_probes(
        "FEHLER: Der angegebene Registrierungsschlüssel bzw. Wert wurde nicht gefunden.\r\n",
        "\r\nHKEY_CLASSES_ROOT\r\n    (Standard)    REG_SZ    (Wert nicht festgelegt)\r\n\r\n",
    );
    assert_eq!(
        calibration.not_found,
        "FEHLER: Der angegebene Registrierungsschlüssel bzw. Wert wurde nicht gefunden."
    );
    assert_eq!(calibration.default_name, "(Standard)");
    assert_eq!(calibration.value_not_set, "(Wert nicht festgelegt)");
}

#[test]
fn test_calibration_falls_back_to_english() {
    let calibration = Calibration::from_probes("", "");
    assert_eq!(calibration, Calibration::english());

    // HKCR default value set on this machine: the not-set marker is unknown.
    let calibration = Calibration::from_probes(
        "ERROR: nope\r\n",
        "\r\nHKEY_CLASSES_ROOT\r\n    (Default)    REG_SZ    something\r\n",
    );
    assert_eq!(calibration.not_found, "ERROR: nope");
    assert_eq!(calibration.default_name, "(Default)");
    assert_eq!(calibration.value_not_set, DEFAULT_VALUE_NOT_SET);
}

#[tokio::test]
async fn test_calibration_runs_probes_once() {
    let spawner = MockSpawner::new().with_english_probes();
    let executor = Executor::new(Arc::new(spawner.clone()));

    executor.execute(&args(&["query", "HKCU"])).await.unwrap();
    executor.execute(&args(&["query", "HKCU"])).await.unwrap();

    assert_eq!(spawner.count_calls(&["QUERY", "HKLM\\NONEXISTENT"]), 1);
    assert_eq!(spawner.count_calls(&["QUERY", "HKCR", "/ve"]), 1);
    assert_eq!(spawner.count_calls(&["query", "HKCU"]), 2);
}

#[tokio::test]
async fn test_failed_calibration_is_retried() {
    let spawner = MockSpawner::new();
    spawner.push_error(RegError::process("spawn failed"));
    let executor = Executor::new(Arc::new(spawner.clone()));

    assert!(executor.calibration().await.is_err());
    // Queue is drained; both probes now answer with empty output.
    let calibration = executor.calibration().await.unwrap();
    assert_eq!(calibration, &Calibration::english());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_share_calibration() {
    let fake = FakeRegExe::new().with_latency(Duration::from_millis(20));
    let executor = Arc::new(Executor::new(Arc::new(fake.clone())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(&args(&["query", "HKCU"])).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    assert_eq!(fake.count_calls(&["QUERY", "HKLM\\NONEXISTENT"]), 1);
    assert_eq!(fake.count_calls(&["QUERY", "HKCR", "/ve"]), 1);
}

#[tokio::test]
async fn test_localized_not_found() {
    let fake = FakeRegExe::new().with_locale(Locale::german());
    let executor = Executor::new(Arc::new(fake));

    let output = executor.execute(&args(&["query", "HKCU\\Missing"])).await.unwrap();
    assert_eq!(output, None);
    assert_eq!(executor.calibration().await.unwrap().default_name, "(Standard)");
}

#[tokio::test]
async fn test_code_page_toggle() {
    let fake = FakeRegExe::new();
    let executor = Executor::new(Arc::new(fake.clone()));

    assert_eq!(executor.code_page().await.unwrap(), 437);
    assert!(executor.enable_unicode().await.unwrap());
    assert_eq!(fake.code_page(), 65001);
    assert!(!executor.enable_unicode().await.unwrap());

    assert!(executor.disable_unicode().await.unwrap());
    assert_eq!(fake.code_page(), 437);
    assert!(!executor.disable_unicode().await.unwrap());
}

#[tokio::test]
async fn test_invalid_code_page() {
    let executor = Executor::new(Arc::new(FakeRegExe::new()));
    let err = executor.set_code_page(12345).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "Configuration error: Invalid code page: 12345");
}

#[test]
fn test_parse_code_page() {
    assert_eq!(parse_code_page("Active code page: 437\r\n"), Some(437));
    assert_eq!(parse_code_page("Aktive Codepage: 850.\r\n"), Some(850));
    assert_eq!(parse_code_page("garbage"), None);
}

#[cfg(unix)]
#[tokio::test]
async fn test_tokio_spawner_runs_process() {
    let spawner = TokioSpawner::new();
    let output = spawner
        .run("sh", &args(&["-c", "echo 'Hello World'"]))
        .await
        .unwrap();

    assert!(output.succeeded());
    assert!(output.stdout.contains("Hello World"));
    assert!(output.stderr.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_tokio_spawner_timeout() {
    let spawner = TokioSpawner::with_timeout(Duration::from_secs(1));
    let result = spawner.run("sh", &args(&["-c", "sleep 3"])).await;

    assert!(matches!(result, Err(RegError::Process { .. })));
}

#[tokio::test]
async fn test_tokio_spawner_missing_program() {
    let spawner = TokioSpawner::new();
    let result = spawner
        .run("regkit-definitely-missing-binary", &args(&[]))
        .await;

    assert!(matches!(result, Err(RegError::Process { .. })));
}
