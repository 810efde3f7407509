//! End-to-end scenarios through the action driver
//!
//! Each test runs Load plus Tangle/Weave against real files in a temporary
//! directory, the way the CLI does.

use std::fs;
use std::path::Path;

use weft::actions::{load, process, Options};
use weft::weave::TemplateSet;

fn options(dir: &Path, source: &str) -> Options {
    let web_path = dir.join("doc.w");
    fs::write(&web_path, source).unwrap();
    Options {
        web_path,
        output_dir: dir.join("out"),
        template_set: TemplateSet::md(),
        ..Options::default()
    }
}

#[test]
fn minimal_tangle_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), "@o out.txt @{hello@}");
    process(&opts, true, false).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("out/out.txt")).unwrap(),
        "hello"
    );
}

#[test]
fn reference_expansion_with_indentation_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(
        dir.path(),
        "@o out.py @{def f():\n    @<body@>\n@}\n@d body @{x = 1\ny = 2@}",
    );
    process(&opts, true, false).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("out/out.py")).unwrap(),
        "def f():\n    x = 1\n    y = 2\n"
    );
}

#[test]
fn second_tangle_preserves_modification_times() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), "@o out.txt @{stable@}");
    process(&opts, true, false).unwrap();
    let path = dir.path().join("out/out.txt");
    let first = fs::metadata(&path).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    process(&opts, true, false).unwrap();
    let second = fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(first, second);
}

#[test]
fn abbreviation_resolves_and_duplicates_are_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(
        dir.path(),
        "@d long chunk name @{X@}\n@o out @{@<long chunk...@>@}",
    );
    process(&opts, true, false).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("out/out")).unwrap(),
        "X"
    );

    let ambiguous = options(
        dir.path(),
        "@d long chunk name @{X@}\n@d long chunk other @{Y@}\n@o out @{@<long chunk...@>@}",
    );
    let err = process(&ambiguous, true, false).unwrap_err();
    assert!(err.to_string().contains("ambiguous-abbreviation"));
}

#[test]
fn permit_list_downgrades_missing_include() {
    let dir = tempfile::tempdir().unwrap();
    let source = "@i missing.w\n@o out @{x@}";

    let strict_opts = options(dir.path(), source);
    let err = load(&strict_opts).unwrap_err();
    assert!(err.to_string().contains("missing-include"));

    let permissive = Options {
        permitted: vec!['i'],
        ..options(dir.path(), source)
    };
    let (web, _) = load(&permissive).unwrap();
    assert_eq!(web.output_files(), ["out"]);
}

#[test]
fn tangle_and_weave_from_one_load() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(
        dir.path(),
        "The program.\n\n@o hi.txt @{hi there@}\n\nThe end.\n",
    );
    let summaries = process(&opts, true, true).unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries[0].contains("1 output files"));
    assert_eq!(
        fs::read_to_string(dir.path().join("out/hi.txt")).unwrap(),
        "hi there"
    );
    let woven = fs::read_to_string(dir.path().join("out/doc.md")).unwrap();
    assert!(woven.starts_with("The program.\n"));
    assert!(woven.contains("hi there"));
}

#[test]
fn line_number_comments_are_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let opts = Options {
        comment_style: Some(("#".to_string(), "".to_string())),
        ..options(dir.path(), "@o out.sh @{echo hi\n@}")
    };
    process(&opts, true, false).unwrap();
    let content = fs::read_to_string(dir.path().join("out/out.sh")).unwrap();
    assert!(content.starts_with("# line 1 of"));
    assert!(content.ends_with("echo hi\n"));
}
