//! Filesystem checks for command inputs and outputs, via `cap-std`.

use std::io;
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Whether `path` exists and is a regular file.
///
/// # Errors
/// Returns `NotFound` when the path or its parent is missing, and any other
/// I/O error raised while inspecting it.
pub(crate) fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = parent_or_current(path);
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path has no file name"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.metadata(name).map(|meta| meta.is_file())
}

/// Whether `path` names an existing directory. Missing paths are not.
pub(crate) fn is_existing_dir(path: &Utf8Path) -> bool {
    fs_utf8::Dir::open_ambient_dir(path, ambient_authority()).is_ok()
}

/// Create the parent directory of `path` and its ancestors.
///
/// # Errors
/// Returns the I/O error raised while creating a directory.
pub(crate) fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_base(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?.create_dir_all(&relative)
}

fn parent_or_current(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

/// Split a directory path into an ambient base the process may open and the
/// relative remainder cap-std creates beneath it.
fn split_base(dir: &Utf8Path) -> io::Result<(Utf8PathBuf, Utf8PathBuf)> {
    let mut components = dir.as_std_path().components();
    match components.next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(format!("{prefix}{}", std::path::MAIN_SEPARATOR));
            Ok((base, relative_rest(components)?))
        }
        Some(Component::RootDir) => Ok((
            Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
            relative_rest(components)?,
        )),
        _ => Ok((Utf8PathBuf::from("."), dir.to_path_buf())),
    }
}

fn relative_rest(components: std::path::Components<'_>) -> io::Result<Utf8PathBuf> {
    let rest: std::path::PathBuf = components
        .filter(|component| !matches!(component, Component::RootDir))
        .collect();
    Utf8PathBuf::from_path_buf(rest).map_err(|_| io::Error::other("non-UTF-8 path"))
}
