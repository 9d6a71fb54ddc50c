use std::{
    borrow::Borrow,
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::warn;

fn numbered_name(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_owned();
    }
    match file_name.rfind('.') {
        Some(i) if i > 0 => format!("{} ({}){}", &file_name[..i], n, &file_name[i..]),
        _ => format!("{} ({})", file_name, n),
    }
}

/// Creates a new file for `file_name` inside `dir` without touching existing ones.
///
/// `clip.mp4` becomes `clip (1).mp4`, `clip (2).mp4`, ... when taken. The
/// name is claimed atomically, so concurrent downloads never share a file.
pub fn create_download_file(dir: &Path, file_name: &str) -> io::Result<(PathBuf, File)> {
    let mut n = 0;
    loop {
        let path = dir.join(numbered_name(file_name, n));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

async fn copy_stream<S>(file: File, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
{
    let mut writer = BufWriter::new(file);
    let mut stream = Box::pin(stream);
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(chunk.borrow())?;
        written += chunk.len() as u64;
    }
    writer.flush()?;
    Ok(written)
}

/// Writes every chunk of `stream` into `file`, returning the byte count.
///
/// On failure the partial file at `path` is removed.
pub async fn write_file_from_stream<S>(path: &Path, file: File, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
{
    match copy_stream(file, stream).await {
        Ok(written) => Ok(written),
        Err(e) => {
            if let Err(rm) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %rm, "Couldn't remove partial download");
            }
            Err(e)
        }
    }
}
