use docs_changelog::log_warn;
use docs_changelog::logger;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_logger_init_is_idempotent() {
    assert!(logger::init().is_ok());
    assert!(logger::init().is_ok());
}

#[test]
fn test_warnings_reach_the_log_file() {
    let _ = logger::init();
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let log_path = temp_dir.path().join("debug.log");

    logger::enable_logging();
    logger::set_log_file(log_path.to_str().expect("utf-8 path")).expect("Failed to open log file");
    log_warn!("#42 names unknown category '{}'", "Gadgets");

    let content = fs::read_to_string(&log_path).expect("Failed to read log file");
    assert!(content.contains("#42 names unknown category 'Gadgets'"));
}
