//! Line-oriented file-management script interpreter.
//!
//! Scripts are the text of a script-runner widget. Each line is split on
//! whitespace; the first word selects a command or declares a variable.
//! Variables are written `$name value` and referenced as `$name$` inside
//! later words. A faulty line is logged and skipped, never fatal: the rest
//! of the script still runs.
//!
//! Commands: `copy src dest`, `move src dest`, `remove path`,
//! `rename src dest` (arguments taken literally), `sync a b`.

mod fs;

pub use fs::{FileSystem, FsError, MemoryFileSystem, StdFileSystem};

use log::{error, info};
use std::collections::HashMap;
use std::path::Path;

/// Outcome tally of one script run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    /// Commands that ran to completion.
    pub executed: usize,
    /// Lines with an unrecognized command word, echoed and skipped.
    pub ignored: usize,
    /// Lines that failed (wrong argument count or a filesystem error).
    pub failed: usize,
}

/// Interpreter over an injected filesystem.
///
/// Variables live only for the duration of a single [`run`](Self::run);
/// consecutive runs of the same script start from a clean slate.
#[derive(Debug)]
pub struct ScriptInterpreter<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> ScriptInterpreter<F> {
    /// Create an interpreter over the given filesystem.
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Borrow the underlying filesystem.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Consume the interpreter, returning the filesystem.
    pub fn into_fs(self) -> F {
        self.fs
    }

    /// Run a script, line by line.
    pub fn run(&mut self, source: &str) -> ScriptReport {
        let mut vars: HashMap<String, String> = HashMap::new();
        let mut report = ScriptReport::default();

        for line in source.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some(&first) = words.first() else {
                continue;
            };

            if let Some(name) = variable_name(first) {
                // `$name value` declares or reassigns; a line with no usable
                // value is silently skipped.
                let value = words[1..]
                    .iter()
                    .find(|word| **word != "=" && **word != ":")
                    .map(|word| substitute(word, &vars));
                if let Some(value) = value {
                    vars.insert(name.to_owned(), value);
                }
                continue;
            }

            match first.to_ascii_lowercase().as_str() {
                "copy" => self.binary_command(&words, &vars, &mut report, |fs, a, b| {
                    fs.copy_overwrite(a, b)
                }),
                "move" => self.binary_command(&words, &vars, &mut report, |fs, a, b| {
                    fs.move_overwrite(a, b)
                }),
                "remove" => {
                    if words.len() != 2 {
                        error!("remove takes one argument, got {}: {line:?}", words.len() - 1);
                        report.failed += 1;
                        continue;
                    }
                    let target = substitute(words[1], &vars);
                    match self.fs.remove(Path::new(&target)) {
                        Ok(()) => report.executed += 1,
                        Err(err) => {
                            error!("remove {target:?} failed: {err}");
                            report.failed += 1;
                        }
                    }
                }
                "rename" => {
                    // rename arguments are taken verbatim, no substitution
                    if words.len() != 3 {
                        error!("rename takes two arguments, got {}: {line:?}", words.len() - 1);
                        report.failed += 1;
                        continue;
                    }
                    match self.fs.rename(Path::new(words[1]), Path::new(words[2])) {
                        Ok(()) => report.executed += 1,
                        Err(err) => {
                            error!("rename {:?} failed: {err}", words[1]);
                            report.failed += 1;
                        }
                    }
                }
                "sync" => {
                    if words.len() != 3 {
                        error!("sync takes two arguments, got {}: {line:?}", words.len() - 1);
                        report.failed += 1;
                        continue;
                    }
                    let a = substitute(words[1], &vars);
                    let b = substitute(words[2], &vars);
                    match self.sync(Path::new(&a), Path::new(&b)) {
                        Ok(()) => report.executed += 1,
                        Err(err) => {
                            error!("sync {a:?} {b:?} failed: {err}");
                            report.failed += 1;
                        }
                    }
                }
                _ => {
                    let echoed: Vec<String> =
                        words.iter().map(|word| substitute(word, &vars)).collect();
                    info!("ignored unknown command: {}", echoed.join(" "));
                    report.ignored += 1;
                }
            }
        }

        report
    }

    fn binary_command(
        &mut self,
        words: &[&str],
        vars: &HashMap<String, String>,
        report: &mut ScriptReport,
        op: impl FnOnce(&mut F, &Path, &Path) -> Result<(), FsError>,
    ) {
        if words.len() != 3 {
            error!(
                "{} takes two arguments, got {}",
                words[0],
                words.len() - 1
            );
            report.failed += 1;
            return;
        }
        let src = substitute(words[1], vars);
        let dest = substitute(words[2], vars);
        match op(&mut self.fs, Path::new(&src), Path::new(&dest)) {
            Ok(()) => report.executed += 1,
            Err(err) => {
                error!("{} {src:?} {dest:?} failed: {err}", words[0]);
                report.failed += 1;
            }
        }
    }

    /// Make `a` and `b` identical, newer side winning.
    fn sync(&mut self, a: &Path, b: &Path) -> Result<(), FsError> {
        match (self.fs.exists(a), self.fs.exists(b)) {
            (false, false) => {
                info!("sync: neither {} nor {} exists", a.display(), b.display());
                Ok(())
            }
            (false, true) => {
                self.fs.create(a)?;
                self.fs.copy_overwrite(b, a)
            }
            (true, false) => {
                self.fs.create(b)?;
                self.fs.copy_overwrite(a, b)
            }
            (true, true) => {
                let a_time = self.fs.last_write_time(a)?;
                let b_time = self.fs.last_write_time(b)?;
                if a_time < b_time {
                    self.fs.copy_overwrite(b, a)
                } else if b_time < a_time {
                    self.fs.copy_overwrite(a, b)
                } else {
                    info!("sync: {} and {} already synchronized", a.display(), b.display());
                    Ok(())
                }
            }
        }
    }
}

/// Variable declaration check: a word starting with exactly one `$`
/// introduces the variable named by the rest of the word.
fn variable_name(word: &str) -> Option<&str> {
    let rest = word.strip_prefix('$')?;
    if rest.starts_with('$') {
        return None;
    }
    Some(rest)
}

/// Expand `$name$` references in a word, left to right, one pass.
///
/// An unknown variable expands to the empty string; a trailing `$` with no
/// closing partner stays literal.
fn substitute(word: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::new();
    let mut rest = word;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('$') {
            Some(end) => {
                if let Some(value) = vars.get(&after[..end]) {
                    out.push_str(value);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> ScriptInterpreter<MemoryFileSystem> {
        ScriptInterpreter::new(MemoryFileSystem::new())
    }

    #[test]
    fn test_substitute_expands_known_vars() {
        let mut vars = HashMap::new();
        vars.insert("a".to_owned(), "src.txt".to_owned());
        assert_eq!(substitute("$a$", &vars), "src.txt");
        assert_eq!(substitute("pre-$a$-post", &vars), "pre-src.txt-post");
    }

    #[test]
    fn test_substitute_unknown_var_is_empty() {
        let vars = HashMap::new();
        assert_eq!(substitute("$missing$", &vars), "");
        assert_eq!(substitute("x$missing$y", &vars), "xy");
    }

    #[test]
    fn test_substitute_trailing_dollar_stays_literal() {
        let mut vars = HashMap::new();
        vars.insert("a".to_owned(), "v".to_owned());
        assert_eq!(substitute("$a$$tail", &vars), "v$tail");
        assert_eq!(substitute("price$", &vars), "price$");
    }

    #[test]
    fn test_substitute_is_single_pass() {
        let mut vars = HashMap::new();
        vars.insert("a".to_owned(), "$b$".to_owned());
        vars.insert("b".to_owned(), "never".to_owned());
        // expansion output is not re-scanned
        assert_eq!(substitute("$a$", &vars), "$b$");
    }

    #[test]
    fn test_copy_with_variables() {
        // $a = src.txt / $b = out.txt / copy $a$ $b$
        let mut interp = interpreter();
        interp.fs.write_file("src.txt", b"content".to_vec());

        let report = interp.run("$a = src.txt\n$b = out.txt\ncopy $a$ $b$\n");

        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            interp.fs().read_file("out.txt"),
            Some(b"content".as_slice())
        );
        assert!(interp.fs().exists(Path::new("src.txt")));
    }

    #[test]
    fn test_move_and_remove() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"1".to_vec());
        interp.fs.write_file("b.txt", b"2".to_vec());

        let report = interp.run("move a.txt moved.txt\nremove b.txt\n");

        assert_eq!(report.executed, 2);
        assert!(!interp.fs().exists(Path::new("a.txt")));
        assert!(interp.fs().exists(Path::new("moved.txt")));
        assert!(!interp.fs().exists(Path::new("b.txt")));
    }

    #[test]
    fn test_rename_takes_arguments_literally() {
        let mut interp = interpreter();
        interp.fs.write_file("$a$", b"weird name".to_vec());

        let report = interp.run("$a literal.txt\nrename $a$ $b$\n");

        assert_eq!(report.executed, 1);
        assert!(!interp.fs().exists(Path::new("$a$")));
        assert_eq!(interp.fs().read_file("$b$"), Some(b"weird name".as_slice()));
        assert!(!interp.fs().exists(Path::new("literal.txt")));
    }

    #[test]
    fn test_sync_creates_missing_side() {
        // only left.txt exists; sync must create right.txt with its content
        let mut interp = interpreter();
        interp.fs.write_file("left.txt", b"payload".to_vec());

        let report = interp.run("sync left.txt right.txt");

        assert_eq!(report.executed, 1);
        assert_eq!(
            interp.fs().read_file("right.txt"),
            Some(b"payload".as_slice())
        );
        assert_eq!(
            interp.fs().read_file("left.txt"),
            Some(b"payload".as_slice())
        );
    }

    #[test]
    fn test_sync_newer_side_wins() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"old".to_vec());
        interp.fs.write_file("b.txt", b"new".to_vec());
        interp.fs.set_mtime("a.txt", 1);
        interp.fs.set_mtime("b.txt", 50);

        let report = interp.run("sync a.txt b.txt");

        assert_eq!(report.executed, 1);
        assert_eq!(interp.fs().read_file("a.txt"), Some(b"new".as_slice()));

        // and the other direction
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"new".to_vec());
        interp.fs.write_file("b.txt", b"old".to_vec());
        interp.fs.set_mtime("a.txt", 50);
        interp.fs.set_mtime("b.txt", 1);

        interp.run("sync a.txt b.txt");
        assert_eq!(interp.fs().read_file("b.txt"), Some(b"new".as_slice()));
    }

    #[test]
    fn test_sync_equal_times_is_noop() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"aaa".to_vec());
        interp.fs.write_file("b.txt", b"bbb".to_vec());
        interp.fs.set_mtime("a.txt", 7);
        interp.fs.set_mtime("b.txt", 7);

        let report = interp.run("sync a.txt b.txt");

        assert_eq!(report.executed, 1);
        assert_eq!(interp.fs().read_file("a.txt"), Some(b"aaa".as_slice()));
        assert_eq!(interp.fs().read_file("b.txt"), Some(b"bbb".as_slice()));
    }

    #[test]
    fn test_sync_both_missing_is_noop() {
        let mut interp = interpreter();
        let report = interp.run("sync a.txt b.txt");
        assert_eq!(report.executed, 1);
        assert!(interp.fs().is_empty());
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        let report = interp.run("$t a.txt\nfrobnicate $t$ now\ncopy a.txt b.txt\n");

        assert_eq!(report.ignored, 1);
        assert_eq!(report.executed, 1);
        assert!(interp.fs().exists(Path::new("b.txt")));
    }

    #[test]
    fn test_wrong_arity_fails_but_continues() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        let report = interp.run("copy a.txt\nremove a.txt b.txt\ncopy a.txt b.txt\n");

        assert_eq!(report.failed, 2);
        assert_eq!(report.executed, 1);
        assert!(interp.fs().exists(Path::new("b.txt")));
    }

    #[test]
    fn test_filesystem_error_fails_line_only() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        let report = interp.run("copy missing.txt out.txt\ncopy a.txt b.txt\n");

        assert_eq!(report.failed, 1);
        assert_eq!(report.executed, 1);
        assert!(interp.fs().exists(Path::new("b.txt")));
    }

    #[test]
    fn test_assignment_separators_and_reassignment() {
        let mut interp = interpreter();
        interp.fs.write_file("one.txt", b"1".to_vec());
        interp.fs.write_file("two.txt", b"2".to_vec());

        let script = "$a : one.txt\ncopy $a$ first.txt\n$a = two.txt\ncopy $a$ second.txt\n";
        let report = interp.run(script);

        assert_eq!(report.executed, 2);
        assert_eq!(interp.fs().read_file("first.txt"), Some(b"1".as_slice()));
        assert_eq!(interp.fs().read_file("second.txt"), Some(b"2".as_slice()));
    }

    #[test]
    fn test_assignment_without_value_is_skipped() {
        let mut interp = interpreter();
        interp.fs.write_file("kept.txt", b"k".to_vec());

        // `$a =` has no value word, so $a$ stays undefined and expands empty
        let report = interp.run("$a =\ncopy kept.txt $a$out.txt\n");

        assert_eq!(report.executed, 1);
        assert_eq!(interp.fs().read_file("out.txt"), Some(b"k".as_slice()));
    }

    #[test]
    fn test_assignment_value_is_substituted() {
        let mut interp = interpreter();
        interp.fs.write_file("base.txt", b"b".to_vec());

        let report = interp.run("$a base.txt\n$b $a$\ncopy $b$ out.txt\n");

        assert_eq!(report.executed, 1);
        assert_eq!(interp.fs().read_file("out.txt"), Some(b"b".as_slice()));
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        let report = interp.run("COPY a.txt b.txt\nMove b.txt c.txt\n");

        assert_eq!(report.executed, 2);
        assert!(interp.fs().exists(Path::new("c.txt")));
    }

    #[test]
    fn test_blank_lines_and_extra_whitespace() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        let report = interp.run("\n\n   \n  copy   a.txt    b.txt  \n");

        assert_eq!(report.executed, 1);
        assert_eq!(report.ignored, 0);
        assert!(interp.fs().exists(Path::new("b.txt")));
    }

    #[test]
    fn test_variables_do_not_leak_between_runs() {
        let mut interp = interpreter();
        interp.fs.write_file("a.txt", b"x".to_vec());

        interp.run("$src a.txt");
        let report = interp.run("copy $src$ out.txt");

        // $src$ expands to "" in the second run, so the copy fails
        assert_eq!(report.failed, 1);
        assert!(!interp.fs().exists(Path::new("out.txt")));
    }
}
