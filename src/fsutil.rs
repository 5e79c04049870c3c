use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use yarn_cgroup_usage::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/cgroup")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Feeds every line of `reader` to `visit` until it returns [`ControlFlow::Break`]
/// or the input is exhausted.
///
/// Lines are passed without their trailing newline. The 1-based line number is
/// passed along for error reporting. A `Break` value is returned as `Some`.
///
/// # Errors
///
/// Returns the I/O error of the first failing read. Errors produced by the
/// visitor itself are carried inside the `Break` value.
pub fn for_each_line<R, B>(
    mut reader: R,
    mut visit: impl FnMut(&str, usize) -> ControlFlow<B>,
) -> io::Result<Option<B>>
where
    R: BufRead,
{
    let mut line = String::with_capacity(128);
    let mut lineno = 0;

    while reader.read_line(&mut line)? != 0 {
        lineno += 1;
        if let ControlFlow::Break(value) = visit(line.trim_end_matches(['\n', '\r']), lineno) {
            return Ok(Some(value));
        }
        line.clear();
    }

    Ok(None)
}
