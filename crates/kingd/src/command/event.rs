//! Events injected alongside a pill.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// One file captured for the initial filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededFile {
    /// Path relative to the captured root, `/`-separated.
    pub path: Utf8PathBuf,
    /// File contents.
    pub contents: Vec<u8>,
}

/// An event applied to a freshly booted instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Replaces the instance's initial filesystem with a captured directory.
    InitialFilesystem {
        /// Directory the files were captured from.
        root: Utf8PathBuf,
        /// Captured files, sorted by path.
        files: Vec<SeededFile>,
    },
    /// Event whose payload this daemon does not interpret.
    Opaque {
        /// Routing path of the event.
        wire: Vec<String>,
        /// Serialized event body.
        payload: Vec<u8>,
    },
}

impl Event {
    /// Captures every non-hidden file under `root`.
    ///
    /// Entries whose name starts with `.` are skipped, as are their
    /// descendants. Files are returned sorted by relative path.
    ///
    /// # Errors
    ///
    /// Fails when a directory cannot be listed or a file cannot be read.
    pub fn initial_filesystem(root: &Utf8Path) -> io::Result<Self> {
        let mut files = Vec::new();
        collect(root, Utf8Path::new(""), &mut files)?;
        files.sort_by(|left, right| left.path.cmp(&right.path));
        Ok(Self::InitialFilesystem {
            root: root.to_path_buf(),
            files,
        })
    }
}

fn collect(root: &Utf8Path, relative: &Utf8Path, files: &mut Vec<SeededFile>) -> io::Result<()> {
    for entry in root.join(relative).read_dir_utf8()? {
        let entry = entry?;
        if entry.file_name().starts_with('.') {
            continue;
        }
        let child = relative.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect(root, &child, files)?;
        } else if file_type.is_file() {
            let contents = std::fs::read(entry.path())?;
            files.push(SeededFile {
                path: child,
                contents,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn captures_visible_files_in_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 temp dir");
        fs::create_dir_all(root.join("sys/vane")).expect("create tree");
        fs::create_dir_all(root.join(".git")).expect("create hidden dir");
        fs::write(root.join("sys/vane/ames.hoon"), b"ames").expect("write file");
        fs::write(root.join("app.hoon"), b"app").expect("write file");
        fs::write(root.join(".hidden"), b"x").expect("write hidden file");
        fs::write(root.join(".git/HEAD"), b"ref").expect("write git file");

        let Event::InitialFilesystem { files, .. } =
            Event::initial_filesystem(root).expect("capture succeeds")
        else {
            panic!("expected filesystem event");
        };
        let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(paths, vec!["app.hoon", "sys/vane/ames.hoon"]);
        assert_eq!(files.first().map(|file| file.contents.as_slice()), Some(&b"app"[..]));
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(Event::initial_filesystem(Utf8Path::new("/nonexistent/kingd/root")).is_err());
    }
}
