use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use tempfile::{TempDir, tempdir};
use xpack_core::patterns::{PatternMatcher, normalize_pattern};
use xpack_core::{
    CollectingSink, DiagnosticKind, OutputFormat, PackRequest, build_tree, load_files, pack_at,
    render_tree, scan,
};

fn fixture(files: &[(&str, &str)]) -> TempDir {
    let root = tempdir().unwrap();
    for (rel, content) in files {
        let path = root.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    root
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
}

fn packed_paths(request: &PackRequest) -> Vec<String> {
    pack_at(request, &CollectingSink::new(), at(9)).unwrap().paths
}

#[test]
fn default_patterns_drop_dependency_directories() {
    let root = fixture(&[
        ("src/a.ts", "export const a = 1;\n"),
        ("node_modules/pkg/index.js", "module.exports = {};\n"),
    ]);
    assert_eq!(packed_paths(&PackRequest::new(root.path())), vec!["src/a.ts"]);
}

#[test]
fn nested_rule_files_accumulate_downward() {
    let root = fixture(&[
        (".gitignore", "*.log\n"),
        ("logs/.gitignore", "# scratch files\n*.tmp\n"),
        ("logs/old.log", "old"),
        ("logs/cache.tmp", "cache"),
        ("other/keep.txt", "keep"),
    ]);
    let request = PackRequest::new(root.path())
        .with_default_patterns(false)
        .with_ignore(".gitignore");
    let output = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
    assert_eq!(output.paths, vec!["other/keep.txt"]);
    assert_eq!(
        output.ignore_report.rule_file_patterns,
        vec!["*.log", "logs/*.tmp"]
    );
    assert_eq!(output.ignore_report.caller_patterns, vec![".gitignore"]);
    assert!(output.ignore_report.default_patterns.is_empty());
}

#[test]
fn include_patterns_restrict_output() {
    let root = fixture(&[("readme.md", "# Readme\n"), ("notes.txt", "notes\n")]);
    let request = PackRequest::new(root.path()).with_include("*.md");
    assert_eq!(packed_paths(&request), vec!["readme.md"]);
}

#[test]
fn oversized_file_is_dropped_with_a_diagnostic() {
    let root = fixture(&[
        ("big.txt", &"x".repeat(2048)),
        ("a.txt", "a"),
        ("z/b.txt", "b"),
    ]);
    let request = PackRequest::new(root.path()).with_max_file_size(1024);
    let sink = CollectingSink::new();
    let output = pack_at(&request, &sink, at(9)).unwrap();
    assert_eq!(output.paths, vec!["a.txt", "z/b.txt"]);
    assert_eq!(sink.count_of(DiagnosticKind::SizeLimit), 1);
    assert_eq!(sink.diagnostics()[0].path, "big.txt");
}

#[test]
fn read_limit_is_enforced_independently() {
    let root = fixture(&[("mid.txt", &"y".repeat(600)), ("small.txt", "s")]);
    let request = PackRequest::new(root.path())
        .with_max_file_size(1024)
        .with_max_read_size(512);
    let sink = CollectingSink::new();
    let output = pack_at(&request, &sink, at(9)).unwrap();
    assert_eq!(output.paths, vec!["small.txt"]);
    assert_eq!(sink.count_of(DiagnosticKind::SizeLimit), 1);
}

#[test]
fn empty_tree_produces_well_formed_documents() {
    let root = fixture(&[("debug.log", "noise")]);
    for format in OutputFormat::ALL {
        let request = PackRequest::new(root.path()).with_format(format);
        let output = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
        assert_eq!(output.file_count, 0, "{}", format);
        match format {
            OutputFormat::Xml => {
                assert!(output.document.contains("<directory_structure><![CDATA[]]></directory_structure>"));
                assert!(output.document.contains("<files>"));
                assert!(output.document.trim_end().ends_with("</xpack>"));
            }
            OutputFormat::Json => {
                let value: serde_json::Value = serde_json::from_str(&output.document).unwrap();
                assert_eq!(value["files"].as_array().map(Vec::len), Some(0));
            }
            OutputFormat::Markdown => assert!(output.document.contains("# Files")),
            OutputFormat::Plain => assert!(output.document.contains("Files\n")),
        }
    }
}

#[test]
fn sibling_rule_files_do_not_leak() {
    let root = fixture(&[
        ("a/.xpackignore", "*.dat\n"),
        ("a/x.dat", "x"),
        ("a/y.txt", "y"),
        ("b/x.dat", "x"),
        ("b/sub/z.dat", "z"),
    ]);
    let request = PackRequest::new(root.path()).with_ignore(".xpackignore");
    assert_eq!(
        packed_paths(&request),
        vec!["a/y.txt", "b/sub/z.dat", "b/x.dat"]
    );
}

#[test]
fn packed_files_respect_ignore_include_and_size() {
    let root = fixture(&[
        (".gitignore", "/generated/\n*.bak\n"),
        ("generated/out.rs", "fn gen() {}"),
        ("src/lib.rs", "pub fn lib() {}"),
        ("src/lib.rs.bak", "old"),
        ("src/deep/mod.rs", "mod deep;"),
        ("docs/guide.md", "guide"),
        ("target/debug/app.rs", "fn app() {}"),
        ("huge.rs", &"/".repeat(4096)),
    ]);
    let request = PackRequest::new(root.path())
        .with_include("*.rs")
        .with_max_file_size(1024);
    let output = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
    assert_eq!(output.paths, vec!["src/deep/mod.rs", "src/lib.rs"]);

    let mut ignores: Vec<String> = output
        .ignore_report
        .default_patterns
        .iter()
        .filter_map(|p| normalize_pattern(p, ""))
        .collect();
    ignores.extend(
        output
            .ignore_report
            .rule_file_patterns
            .iter()
            .filter_map(|p| normalize_pattern(p, "")),
    );
    let ignore = PatternMatcher::new(&ignores).unwrap();
    let include = PatternMatcher::new(&[normalize_pattern("*.rs", "").unwrap()]).unwrap();
    for path in &output.paths {
        assert!(!ignore.is_match(path), "{} should have been ignored", path);
        assert!(include.is_match(path), "{} should not have been included", path);
        let size = fs::metadata(root.path().join(path)).unwrap().len();
        assert!(size <= 1024);
    }
}

#[test]
fn tree_matches_packed_files_and_stays_sorted() {
    let root = fixture(&[
        ("z.txt", "z"),
        ("a/b/c.txt", "c"),
        ("a/a.txt", "a"),
        ("m/n.txt", "n"),
        ("b.txt", "b"),
    ]);
    let request = PackRequest::new(root.path()).validate().unwrap();
    let sink = CollectingSink::new();
    let outcome = scan(&request, &sink).unwrap();
    let files = load_files(&request, &outcome.paths, &sink).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

    let tree = build_tree(&paths);
    assert!(tree.is_sorted());
    let mut leaves = tree.file_paths();
    leaves.sort();
    let mut expected: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    expected.sort();
    assert_eq!(leaves, expected);
    assert_eq!(
        render_tree(&tree),
        "a/\n  b/\n    c.txt\n  a.txt\nm/\n  n.txt\nb.txt\nz.txt\n"
    );
}

#[test]
fn repeated_runs_differ_only_in_timestamp() {
    let root = fixture(&[("src/main.rs", "fn main() {}\n"), ("README.md", "# Demo\n")]);
    for format in OutputFormat::ALL {
        let request = PackRequest::new(root.path()).with_format(format);
        let first = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
        let same = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
        let later = pack_at(&request, &CollectingSink::new(), at(17)).unwrap();
        assert_eq!(first.document, same.document, "{}", format);
        assert_ne!(first.document, later.document, "{}", format);
        assert_eq!(
            first.document.replace("2025-03-14T09:00:00", "<ts>"),
            later.document.replace("2025-03-14T17:00:00", "<ts>"),
            "{}",
            format
        );
    }
}

#[test]
fn content_transforms_apply_before_serialization() {
    let root = fixture(&[("src/lib.rs", "// header\n\npub fn a() {} // trailing\n\n\n")]);
    let request = PackRequest::new(root.path())
        .with_format(OutputFormat::Json)
        .with_remove_comments(true)
        .with_remove_empty_lines(true);
    let output = pack_at(&request, &CollectingSink::new(), at(9)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output.document).unwrap();
    assert_eq!(value["files"][0]["content"], "pub fn a() {}\n");
}
