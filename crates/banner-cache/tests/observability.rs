use banner_cache::{init_tracing_with_level, set_log_level};

#[test]
fn log_level_cannot_be_changed_under_foreign_subscriber() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init()
        .expect("install embedder subscriber");

    init_tracing_with_level("debug");

    let err = set_log_level("banner_cache=trace").expect_err("filter is not ours to reload");
    assert!(err.contains("not initialized"));
}
