//! Failure containment: one bad entry never aborts the build.

mod helpers;

use std::sync::Arc;

use helpers::{RecordingHooks, ScriptedFactory, fixture};
use weft::{Config, Hooks, Weft};

#[tokio::test]
async fn a_compile_failure_is_reported_and_contained() {
    let fix = fixture();
    fix.fs.write("/src/good.js", "good();");
    fix.fs.write("/src/bad.js", "// !error unexpected token\nbad();");

    let hooks = RecordingHooks::new();
    let config = fix
        .config()
        .entry("good", "good.js")
        .entry("bad", "bad.js")
        .hooks(Arc::clone(&hooks) as Arc<dyn Hooks>);
    let report = Weft::new(config).build().await.unwrap();

    assert_eq!(report.tasks, 2);
    assert_eq!(report.failed_tasks, 1);

    let errors = hooks.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("unexpected token"));

    // The healthy entry still produced its bundle; the failed one wrote
    // nothing.
    assert!(fix.read_output("good.js").contains("good();"));
    assert!(!fix.output_exists("bad.js"));
}

#[tokio::test]
async fn a_missing_entry_file_is_a_contained_failure() {
    let fix = fixture();
    fix.fs.write("/src/app.js", "main();");

    let hooks = RecordingHooks::new();
    let config = fix
        .config()
        .entry("app", "app.js")
        .entry("ghost", "ghost.js")
        .hooks(Arc::clone(&hooks) as Arc<dyn Hooks>);
    let report = Weft::new(config).build().await.unwrap();

    assert_eq!(report.failed_tasks, 1);
    assert!(hooks.errors()[0].contains("module not found"));
    assert!(fix.output_exists("app.js"));
}

#[tokio::test]
async fn a_traversal_filename_is_a_contained_write_failure() {
    let fix = fixture();
    fix.fs.write("/src/app.js", "main();");

    let hooks = RecordingHooks::new();
    let config = fix
        .config()
        .entry("app", "app.js")
        .filename(|key, _file| format!("../{key}.js"))
        .hooks(Arc::clone(&hooks) as Arc<dyn Hooks>);
    let report = Weft::new(config).build().await.unwrap();

    assert_eq!(report.failed_tasks, 1);
    assert!(hooks.errors()[0].contains("escapes output directory"));
    assert!(!fix.out.path().parent().unwrap().join("app.js").exists());
}

#[tokio::test]
async fn chunks_emitted_before_a_failure_are_not_written() {
    let fix = fixture();
    let hooks = RecordingHooks::new();
    let config = Config::new(ScriptedFactory::new(vec![
        Ok(b"partial();\n".to_vec()),
        Err("ran out of memory".to_string()),
    ]))
    .cwd("/src")
    .entry("app", "app.js")
    .output_dir(fix.out.path())
    .hooks(Arc::clone(&hooks) as Arc<dyn Hooks>);
    let report = Weft::new(config).build().await.unwrap();

    assert_eq!(report.failed_tasks, 1);
    assert!(hooks.errors()[0].contains("ran out of memory"));
    assert!(!fix.output_exists("app.js"));
}

#[tokio::test]
async fn failure_counts_reset_between_builds() {
    let fix = fixture();
    fix.fs.write("/src/bad.js", "// !error boom");

    let weft = Weft::new(fix.config().entry("bad", "bad.js"));
    assert_eq!(weft.build().await.unwrap().failed_tasks, 1);
    assert_eq!(weft.build().await.unwrap().failed_tasks, 1);
}

#[tokio::test]
async fn a_failing_async_sub_bundle_is_contained_too() {
    let fix = fixture();
    fix.fs.write("/src/app.js", "require.async(\"./panel\");\nmain();");
    fix.fs.write("/src/panel.js", "// !error broken panel");

    let hooks = RecordingHooks::new();
    let config = fix.config().entry("app", "app.js").hooks(Arc::clone(&hooks) as Arc<dyn Hooks>);
    let report = Weft::new(config).build().await.unwrap();

    assert_eq!(report.tasks, 1);
    assert_eq!(report.subtasks, 1);
    assert_eq!(report.failed_tasks, 1);
    assert!(fix.output_exists("app.js"));
    assert_eq!(fix.output_files().len(), 1);
}
