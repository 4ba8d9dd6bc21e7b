use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use tempfile::TempDir;

/// Environment for the integration tests: a scratch directory tree and the
/// path to the compiled binary.
pub struct TestEnv {
    temp_dir: TempDir,
    exe: PathBuf,
}

/// Format an error message for when the binary did not exit as expected.
fn format_exit_error(args: &[&str], output: &process::Output) -> String {
    format!(
        "`sift {}` did not exit as expected.\nstdout:\n---\n{}---\nstderr:\n---\n{}---",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Format an error message for when the output did not match the expectation.
fn format_output_error(args: &[&str], expected: &str, actual: &str) -> String {
    let diff_text = diff::lines(expected, actual)
        .into_iter()
        .map(|diff| match diff {
            diff::Result::Left(l) => format!("-{}", l),
            diff::Result::Both(l, _) => format!(" {}", l),
            diff::Result::Right(r) => format!("+{}", r),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        concat!(
            "`sift {}` did not produce the expected output.\n",
            "Showing diff between expected and actual:\n{}\n"
        ),
        args.join(" "),
        diff_text
    )
}

/// Normalize output for comparison: trim leading whitespace from the
/// expectation literal, sort lines (inter-file order is unspecified).
fn normalize_output(s: &str, trim_start: bool) -> String {
    let mut lines = s
        .lines()
        .map(|line| if trim_start { line.trim_start() } else { line })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    lines.sort_unstable();
    lines.join("\n")
}

impl TestEnv {
    pub fn new() -> TestEnv {
        TestEnv {
            temp_dir: TempDir::new().expect("working directory"),
            exe: PathBuf::from(env!("CARGO_BIN_EXE_sift")),
        }
    }

    pub fn create_file(&self, path: &str, contents: &[u8]) -> &Self {
        let full = self.temp_dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(full, contents).expect("create file");
        self
    }

    #[cfg(unix)]
    pub fn create_symlink(&self, target: &str, link: &str) -> &Self {
        std::os::unix::fs::symlink(
            self.temp_dir.path().join(target),
            self.temp_dir.path().join(link),
        )
        .expect("create symlink");
        self
    }

    /// Run the binary in the scratch directory and return its output.
    pub fn run(&self, args: &[&str]) -> process::Output {
        process::Command::new(&self.exe)
            .current_dir(self.temp_dir.path())
            .args(args)
            .output()
            .expect("sift output")
    }

    /// Run the binary with the given bytes piped to stdin.
    pub fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> process::Output {
        let mut child = process::Command::new(&self.exe)
            .current_dir(self.temp_dir.path())
            .args(args)
            .stdin(process::Stdio::piped())
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped())
            .spawn()
            .expect("spawn sift");
        child
            .stdin
            .take()
            .expect("stdin handle")
            .write_all(input)
            .expect("write stdin");
        child.wait_with_output().expect("sift output")
    }

    /// Assert that the output lines (sorted) match the expectation.
    pub fn assert_output(&self, args: &[&str], expected: &str) {
        let output = self.run(args);
        if !output.status.success() {
            panic!("{}", format_exit_error(args, &output));
        }
        self.compare(args, expected, &output.stdout);
    }

    /// Assert output for a run whose stdin is the given bytes.
    pub fn assert_stream_output(&self, args: &[&str], input: &[u8], expected: &str) {
        let output = self.run_with_stdin(args, input);
        self.compare(args, expected, &output.stdout);
    }

    /// Assert the process exit code.
    pub fn assert_exit_code(&self, args: &[&str], code: i32) {
        let output = self.run(args);
        if output.status.code() != Some(code) {
            panic!(
                "expected exit code {}, got {:?}\n{}",
                code,
                output.status.code(),
                format_exit_error(args, &output)
            );
        }
    }

    fn compare(&self, args: &[&str], expected: &str, actual: &[u8]) {
        let expected = normalize_output(expected, true);
        let actual = normalize_output(&String::from_utf8_lossy(actual), false);
        if expected != actual {
            panic!("{}", format_output_error(args, &expected, &actual));
        }
    }
}
