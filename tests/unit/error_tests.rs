//! Unit tests for `AppError` display format and conversions.

use console_worker::AppError;

#[test]
fn every_variant_is_prefixed_with_its_kind() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::Ipc("bad".into()), "ipc: bad"),
        (AppError::Io("bad".into()), "io: bad"),
        (AppError::Handler("bad".into()), "handler: bad"),
        (AppError::Worker("bad".into()), "worker: bad"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn error_message_no_trailing_period() {
    let err = AppError::Worker("command queue closed".into());
    let s = err.to_string();
    assert!(
        !s.ends_with('.'),
        "error message must not end with a period: {s}"
    );
}

#[test]
fn io_error_converts_to_io_variant() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
    let err = AppError::from(io);
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.to_string().contains("missing file"));
}

#[test]
fn toml_error_converts_to_config_variant() {
    let parse = toml::from_str::<toml::Value>("name = ").expect_err("invalid toml");
    let err = AppError::from(parse);
    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn debug_representation_names_the_variant() {
    let err = AppError::Handler("timeout".into());
    let debug = format!("{err:?}");
    assert!(debug.contains("Handler"));
    assert!(debug.contains("timeout"));
}
