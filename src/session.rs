//! One generator run: pick the tests, emit them in order, and publish the
//! script together with its total clock count.
//!
//! The whole script is built in memory. Nothing is written unless every
//! selected test translated, so a failed run never leaves a partial
//! include behind.

use std::io::Write as _;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{GenError, Result, Stream};
use crate::parser::{check_names, parse_expected_outcome, parse_test_case};
use crate::script::{Hierarchy, ScriptWriter};
use crate::stimulus;
use crate::vectors::{first_token, VectorCursor};

/// How many tests to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Bounded(usize),
    /// Until the input vectors run out.
    Unbounded,
}

impl Count {
    /// `-1` means unbounded; anything below that is rejected.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Count::Unbounded),
            n => usize::try_from(n).ok().map(Count::Bounded),
        }
    }

    fn allows_more(self) -> bool {
        self != Count::Bounded(0)
    }

    fn take_one(self) -> Self {
        match self {
            Count::Bounded(n) => Count::Bounded(n.saturating_sub(1)),
            Count::Unbounded => Count::Unbounded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// First test to run; `None` starts at the top of the files.
    pub start: Option<String>,
    pub count: Count,
}

impl Selection {
    pub fn new(start: Option<String>, count: Count) -> Self {
        Self { start, count }
    }

    /// Every test, from the first one.
    pub fn all() -> Self {
        Self::new(None, Count::Unbounded)
    }
}

/// A generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub script: String,
    /// Value of the `TOTAL_CLKS` define.
    pub total_clks: u64,
    /// Number of tests emitted.
    pub tests: usize,
}

pub const TOTAL_CLKS: &str = "TOTAL_CLKS";
pub const COMPLETED: &str = "=== Tests completed ===";
const BANNER: &str = " Automatically generated by fusegen";

fn separator() -> String {
    "-".repeat(80)
}

/// Translate the selected tests of a pair of vector texts.
pub fn generate(
    input: &str,
    expected: &str,
    selection: &Selection,
    hier: &Hierarchy,
) -> Result<Generated> {
    let mut tests_in = VectorCursor::new(input, Stream::Input);
    let mut tests_out = VectorCursor::new(expected, Stream::Expected);

    if let Some(start) = &selection.start {
        info!("starting at test `{start}`");
        tests_in.seek_to(start)?;
        tests_out.seek_to(start)?;
    }

    let mut w = ScriptWriter::new(hier);
    let mut clock = Clock::new();
    w.comment(BANNER);
    w.blank();

    let setup = stimulus::setup();
    clock.add(setup.ticks());
    w.ops(setup.ops());

    let mut remaining = selection.count;
    let mut tests = 0;
    loop {
        w.comment(&separator());
        if !remaining.allows_more() || !tests_in.has_more() {
            break;
        }
        remaining = remaining.take_one();
        let index = tests + 1;
        let name = tests_in
            .peek_line()
            .and_then(first_token)
            .unwrap_or_default()
            .to_string();

        let stim = parse_test_case(&mut tests_in)
            .and_then(|case| {
                let expected = parse_expected_outcome(&mut tests_out)?;
                check_names(&case, &expected)?;
                stimulus::emit_test(&case, &expected)
            })
            .map_err(|e| e.at_test(index, &name))?;

        debug!("test #{index} `{name}`: {} ticks", stim.ticks());
        clock.add(stim.ticks());
        w.ops(stim.ops());
        tests += 1;
    }

    let total_clks = clock.finish();
    w.define(TOTAL_CLKS, total_clks);
    w.display(COMPLETED);
    info!("emitted {tests} tests, {total_clks} clocks");

    Ok(Generated {
        script: w.finish(),
        total_clks,
        tests,
    })
}

fn io_err(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> GenError + '_ {
    move |source| GenError::Io {
        path: path.to_owned(),
        source,
    }
}

pub fn read_vectors(path: &Utf8Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(io_err(path))
}

/// Replace `path` with `script` in one step.
///
/// The text goes to a temporary file next to `path` first, so a reader
/// sees either the old include or the complete new one.
pub fn write_output(path: &Utf8Path, script: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(path))?;
    tmp.write_all(script.as_bytes()).map_err(io_err(path))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| io_err(path)(e.error))?;
    Ok(())
}

/// Bump the modification time of `path` so the build that `include`s the
/// script recompiles.
///
/// Returns `false` if there was nothing to touch.
pub fn touch(path: &Utf8Path) -> Result<bool> {
    if !path.exists() {
        warn!("`{path}` does not exist, not touching it");
        return Ok(false);
    }
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(io_err(path))?;
    file.set_modified(SystemTime::now()).map_err(io_err(path))?;
    Ok(true)
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: Utf8PathBuf,
    pub expected: Utf8PathBuf,
    pub output: Utf8PathBuf,
    /// File that includes the output.
    pub touch: Option<Utf8PathBuf>,
    pub selection: Selection,
    pub hierarchy: Hierarchy,
}

impl Config {
    /// Vector files inside `dir`: `regress.*` for regression runs, `tests.*`
    /// otherwise.
    pub fn vector_paths(dir: &Utf8Path, regress: bool) -> (Utf8PathBuf, Utf8PathBuf) {
        let stem = if regress { "regress" } else { "tests" };
        (
            dir.join(format!("{stem}.in")),
            dir.join(format!("{stem}.expected")),
        )
    }
}

/// Read the vectors, generate, write the script, then touch the includer.
pub fn run(config: &Config) -> Result<Generated> {
    let input = read_vectors(&config.input)?;
    let expected = read_vectors(&config.expected)?;
    let generated = generate(&input, &expected, &config.selection, &config.hierarchy)?;

    write_output(&config.output, &generated.script)?;
    info!("wrote `{}`", config.output);

    if let Some(includer) = &config.touch {
        if touch(includer)? {
            debug!("touched `{includer}`");
        }
    }
    Ok(generated)
}
