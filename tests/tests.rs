//! Integration tests for the CLI interface of sift.

mod testenv;

use std::io::Write;

use testenv::TestEnv;

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Literal match in a small file.
#[test]
fn test_simple_match() {
    let te = TestEnv::new();
    te.create_file("a.txt", b"hello\nworld\n");

    te.assert_output(
        &["world"],
        "a.txt
        2:world",
    );
}

#[test]
fn test_exit_codes() {
    let te = TestEnv::new();
    te.create_file("a.txt", b"hello\n");

    te.assert_exit_code(&["hello"], 0);
    te.assert_exit_code(&["absent"], 1);
    te.assert_exit_code(&["a(b"], 2);
}

#[test]
fn test_bad_regex_diagnostic_names_offset() {
    let te = TestEnv::new();
    let output = te.run(&["a(b"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("byte offset"), "stderr was: {}", stderr);
}

/// A `*.png` rule in the root .gitignore prunes the file before it is read.
#[test]
fn test_ignored_by_extension() {
    let te = TestEnv::new();
    te.create_file(".gitignore", b"*.png\n");
    te.create_file("keep.c", b"content\n");
    te.create_file("skip.png", b"content\n");

    let output = te.run(&["--stats", "content"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("1 files searched"), "stdout was: {}", stdout);
    assert!(stdout.contains("keep.c"));
    assert!(!stdout.contains("skip.png"));
}

/// `/build` only anchors at the directory holding the ignore file.
#[test]
fn test_anchored_slash_ignore() {
    let te = TestEnv::new();
    te.create_file(".gitignore", b"/build\n");
    te.create_file("build/mark", b"beacon\n");
    te.create_file("src/build/mark", b"beacon\n");

    te.assert_output(
        &["beacon"],
        "src/build/mark
        1:beacon",
    );
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_terminates() {
    let te = TestEnv::new();
    te.create_file("a/f.txt", b"marker\n");
    te.create_symlink("a", "a/loop");

    te.assert_output(
        &["--follow", "marker"],
        "a/f.txt
        1:marker",
    );
}

/// A NUL byte in the first 512 bytes classifies the file as binary.
#[test]
fn test_binary_skip() {
    let te = TestEnv::new();
    te.create_file("b.dat", b"x\x00yz\n");

    let output = te.run(&["x"]);
    assert_eq!(stdout_of(&output), "Binary file b.dat matches.\n");

    let output = te.run(&["--search-binary", "x"]);
    let stdout = stdout_of(&output);
    assert!(!stdout.contains("Binary file"));
    assert!(stdout.contains("1:x"));
}

#[test]
fn test_invert_match() {
    let te = TestEnv::new();
    te.create_file("three.txt", b"a\nb\nc\n");

    te.assert_output(
        &["-v", "b"],
        "three.txt
        1:a
        3:c",
    );
}

/// Before/after context with `-` prefixes.
#[test]
fn test_before_after_context() {
    let te = TestEnv::new();
    te.create_file("ctx.txt", b"l1\nl2\nl3\nl4\nl5\n");

    te.assert_output(
        &["-B", "1", "-A", "1", "l3"],
        "ctx.txt
        2-l2
        3:l3
        4-l4",
    );
}

#[test]
fn test_ackmate_row() {
    let te = TestEnv::new();
    te.create_file("foo.txt", b"foo bar foo\n");

    let output = te.run(&["--ackmate", "foo"]);
    assert_eq!(stdout_of(&output), ":foo.txt\n1;0 3,8 3:foo bar foo\n");
}

#[test]
fn test_vimgrep_format() {
    let te = TestEnv::new();
    te.create_file("foo.txt", b"foo bar foo\n");

    te.assert_output(
        &["--vimgrep", "foo"],
        "foo.txt:1:1:foo bar foo
        foo.txt:1:9:foo bar foo",
    );
}

#[test]
fn test_count_mode() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"a b a\nc a\n");

    te.assert_output(&["-c", "a"], "f.txt:3");
}

#[test]
fn test_files_with_and_without_matches() {
    let te = TestEnv::new();
    te.create_file("hit.txt", b"needle\n");
    te.create_file("miss.txt", b"hay\n");

    te.assert_output(&["-l", "needle"], "hit.txt");
    te.assert_output(&["-L", "needle"], "miss.txt");
}

#[test]
fn test_only_matching() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"foo bar foo\n");

    te.assert_output(
        &["-o", "foo"],
        "f.txt
        1:foo
        1:foo",
    );
}

#[test]
fn test_match_files_mode() {
    let te = TestEnv::new();
    te.create_file("code.rs", b"whatever\n");
    te.create_file("notes.md", b"whatever\n");

    te.assert_output(&["-g", r"\.rs$"], "code.rs");
}

#[test]
fn test_file_search_regex() {
    let te = TestEnv::new();
    te.create_file("code.rs", b"marker\n");
    te.create_file("notes.md", b"marker\n");

    te.assert_output(
        &["-G", r"\.rs$", "marker"],
        "code.rs
        1:marker",
    );
}

#[test]
fn test_stream_mode() {
    let te = TestEnv::new();
    te.assert_stream_output(&["world"], b"hello\nworld\n", "2:world");
}

#[test]
fn test_stream_passthrough() {
    let te = TestEnv::new();
    let output = te.run_with_stdin(&["--passthrough", "world"], b"hello\nworld\ntail\n");
    assert_eq!(stdout_of(&output), "hello\n2:world\ntail\n");
}

#[test]
fn test_hidden_files() {
    let te = TestEnv::new();
    te.create_file(".secret", b"marker\n");
    te.create_file("open.txt", b"marker\n");

    te.assert_output(
        &["marker"],
        "open.txt
        1:marker",
    );
    te.assert_output(
        &["--hidden", "marker"],
        ".secret
        1:marker
        open.txt
        1:marker",
    );
}

#[test]
fn test_depth_limit() {
    let te = TestEnv::new();
    te.create_file("top.txt", b"marker\n");
    te.create_file("deep/nested.txt", b"marker\n");

    te.assert_output(
        &["--depth", "0", "marker"],
        "top.txt
        1:marker",
    );
}

#[test]
fn test_unrestricted_search() {
    let te = TestEnv::new();
    te.create_file(".gitignore", b"ignored.txt\n");
    te.create_file("ignored.txt", b"marker\n");
    te.create_file(".hidden", b"marker\n");

    let output = te.run(&["-u", "--stats", "marker"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("3 files searched"), "stdout was: {}", stdout);
}

#[test]
fn test_ignore_flag_adds_root_patterns() {
    let te = TestEnv::new();
    te.create_file("trace.log", b"marker\n");
    te.create_file("note.txt", b"marker\n");

    te.assert_output(
        &["--ignore", "*.log", "marker"],
        "note.txt
        1:marker",
    );
}

#[test]
fn test_single_file_has_no_heading() {
    let te = TestEnv::new();
    te.create_file("single.txt", b"alpha\nbeta\n");

    te.assert_output(&["beta", "single.txt"], "2:beta");
}

#[test]
fn test_noheading_prints_path_on_each_line() {
    let te = TestEnv::new();
    te.create_file("a.txt", b"m\n");

    te.assert_output(&["--noheading", "m"], "a.txt:1:m");
}

#[test]
fn test_column_numbers() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"foo bar\n");

    te.assert_output(
        &["--column", "bar"],
        "f.txt
        1:5:foo bar",
    );
}

#[test]
fn test_width_truncation() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"aaaaaaaaaa\n");

    te.assert_output(
        &["-W", "4", "a+"],
        "f.txt
        1:aaaa [...]",
    );
}

#[test]
fn test_max_count_caps_matches() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"a a a\n");

    te.assert_output(
        &["-m", "2", "-o", "a"],
        "f.txt
        1:a
        1:a",
    );
}

#[test]
fn test_word_regexp() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"cat concatenate\n");

    te.assert_output(
        &["-w", "-o", "cat"],
        "f.txt
        1:cat",
    );
}

#[test]
fn test_smart_case() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"Needle needle\n");

    // Lowercase query matches both.
    te.assert_output(
        &["-o", "needle"],
        "f.txt
        1:Needle
        1:needle",
    );
    // Uppercase query is case-sensitive.
    te.assert_output(
        &["-o", "Needle"],
        "f.txt
        1:Needle",
    );
}

#[test]
fn test_gzip_contents_searched() {
    let te = TestEnv::new();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"needle in the haystack\n").unwrap();
    let compressed = encoder.finish().unwrap();
    te.create_file("data.gz", &compressed);

    te.assert_output(
        &["-z", "needle"],
        "data.gz
        1:needle in the haystack",
    );

    // Without -z the file is skipped by its extension.
    te.assert_exit_code(&["needle"], 1);
}

#[test]
fn test_null_separator() {
    let te = TestEnv::new();
    te.create_file("hit.txt", b"needle\n");

    let output = te.run(&["-0", "-l", "needle"]);
    assert_eq!(output.stdout, b"hit.txt\0");
}

#[test]
fn test_literal_mode() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"a.b axb\n");

    te.assert_output(
        &["-Q", "-o", "a.b"],
        "f.txt
        1:a.b",
    );
}

#[test]
fn test_multiline_match_spans_lines() {
    let te = TestEnv::new();
    te.create_file("f.txt", b"one\ntwo\n");

    te.assert_output(
        &[r"one\ntwo", "f.txt"],
        "1:one
        2:two",
    );
    te.assert_exit_code(&["--nomultiline", r"one\ntwo", "f.txt"], 1);
}

#[test]
fn test_path_to_ignore_file() {
    let te = TestEnv::new();
    te.create_file("rules", b"*.tmp\n");
    te.create_file("keep.txt", b"marker\n");
    te.create_file("drop.tmp", b"marker\n");

    te.assert_output(
        &["-p", "rules", "marker"],
        "keep.txt
        1:marker",
    );
}

#[test]
fn test_break_between_files() {
    let te = TestEnv::new();
    te.create_file("a.txt", b"m\n");
    te.create_file("b.txt", b"m\n");

    let output = te.run(&["m"]);
    let stdout = stdout_of(&output);
    // Exactly one blank separator line between the two file blocks.
    assert_eq!(stdout.matches("\n\n").count(), 1);

    let output = te.run(&["--nobreak", "m"]);
    assert_eq!(stdout_of(&output).matches("\n\n").count(), 0);
}
