//! End-to-end ingestion scenarios for the output file registry.

use ngbuild_core::registry::{normalize_virtual_path, OutputFile, OutputFileRegistry};
use ngbuild_core::reload::compute_reload_actions;
use std::collections::BTreeSet;

fn main_js(contents: &str) -> OutputFile {
    OutputFile::new("/main.js", contents)
}

#[test]
fn scenario_first_build_registers_updated_entry() {
    let mut registry = OutputFileRegistry::new();
    registry.ingest(vec![main_js("console.log(1)")]);

    assert_eq!(registry.len(), 1);
    assert!(registry.get("/main.js").unwrap().updated);
}

#[test]
fn scenario_unchanged_rebuild_is_not_updated() {
    let mut registry = OutputFileRegistry::new();
    registry.ingest(vec![main_js("console.log(1)")]);
    registry.ingest(vec![main_js("console.log(1)")]);

    assert_eq!(registry.len(), 1);
    assert!(!registry.get("/main.js").unwrap().updated);
}

#[test]
fn scenario_same_length_substitution_is_updated() {
    let mut registry = OutputFileRegistry::new();
    registry.ingest(vec![main_js("console.log(1)")]);
    registry.ingest(vec![main_js("console.log(7)")]);

    let record = registry.get("/main.js").unwrap();
    assert!(record.updated);
    assert_eq!(record.contents, b"console.log(7)");
}

#[test]
fn scenario_sourcemap_churn_does_not_mark_anything_updated() {
    let mut registry = OutputFileRegistry::new();
    registry.ingest(vec![
        main_js("console.log(1)"),
        OutputFile::new("/main.js.map", r#"{"version":3,"mappings":"AAAA"}"#),
    ]);
    registry.ingest(vec![
        main_js("console.log(1)"),
        OutputFile::new("/main.js.map", r#"{"version":3,"mappings":"AACA,CAAC"}"#),
    ]);

    assert!(!registry.get("/main.js.map").unwrap().updated);
    assert!(!registry.get("/main.js").unwrap().updated);
    assert!(compute_reload_actions(&registry).invalidate_paths.is_empty());
}

#[test]
fn key_set_always_equals_last_input() {
    let builds: Vec<Vec<OutputFile>> = vec![
        vec![
            OutputFile::new("main.js", "a"),
            OutputFile::new("polyfills.js", "b"),
            OutputFile::new("styles.css", "c"),
        ],
        vec![OutputFile::new("main.js", "a2"), OutputFile::new("chunk-1.js", "d")],
        vec![],
        vec![OutputFile::new("./media/font.woff2", "e")],
    ];

    let mut registry = OutputFileRegistry::new();
    for build in builds {
        let expected: BTreeSet<String> = build
            .iter()
            .map(|f| normalize_virtual_path(&f.path))
            .collect();
        registry.ingest(build);
        let actual: BTreeSet<String> = registry.paths().map(str::to_string).collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn size_change_is_always_updated() {
    let mut registry = OutputFileRegistry::new();
    for contents in ["a", "aa", "aaa", "aa", "a"] {
        registry.ingest(vec![main_js(contents)]);
        assert!(registry.get("/main.js").unwrap().updated, "contents {contents:?}");
    }
}

#[test]
fn identical_ingest_twice_clears_every_flag() {
    let build = || {
        vec![
            OutputFile::new("/main.js", "main"),
            OutputFile::new("/styles.css", "body{}"),
            OutputFile::new("/index.html", "<html></html>"),
            OutputFile::new("/main.js.map", "{}"),
        ]
    };

    let mut registry = OutputFileRegistry::new();
    registry.ingest(build());
    registry.ingest(build());

    assert!(registry.iter().all(|(_, record)| !record.updated));
}

#[test]
fn evicted_paths_are_gone() {
    let mut registry = OutputFileRegistry::new();
    registry.ingest(vec![main_js("x"), OutputFile::new("/lazy-chunk.js", "y")]);
    let summary = registry.ingest(vec![main_js("x")]);

    assert!(registry.get("/lazy-chunk.js").is_none());
    assert_eq!(summary.removed, vec!["/lazy-chunk.js".to_string()]);
}

#[test]
fn duplicate_paths_in_one_build_are_stable_across_rebuilds() {
    let build = || {
        vec![
            OutputFile::new("styles.css", "a{}"),
            OutputFile::new("/styles.css", "b{}"),
        ]
    };
    let mut registry = OutputFileRegistry::new();
    let first = registry.ingest(build());
    assert_eq!(first.added, vec!["/styles.css".to_string()]);
    assert_eq!(registry.get("/styles.css").unwrap().contents, b"b{}");

    let second = registry.ingest(build());
    assert!(!second.has_changes());
    assert_eq!(second.unchanged, vec!["/styles.css".to_string()]);
    assert!(!registry.get("/styles.css").unwrap().updated);
    assert!(!compute_reload_actions(&registry).full_reload);
}
