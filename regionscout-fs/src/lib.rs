//! Filesystem helpers built on `cap-std` and `camino`, and a download target
//! that saves artifacts into a directory.
#![forbid(unsafe_code)]

use std::io;
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::{debug, warn};
use regionscout_core::download::{DownloadError, DownloadTarget, ExportArtifact};

/// Create `path` and any missing parents, handling absolute paths safely for
/// cap-std.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    if path.as_os_str().is_empty() || path == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Split a path into an ambient base directory and the relative remainder.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;
    Ok((dir, relative))
}

/// Reduce `name` to a single path component.
///
/// Separators and control characters become `_`, and names that would
/// address the directory itself or its parent are refused.
///
/// # Examples
/// ```
/// use regionscout_fs::sanitize_filename;
///
/// assert_eq!(sanitize_filename("cafes/bars.kmz").as_deref(), Some("cafes_bars.kmz"));
/// assert_eq!(sanitize_filename(".."), None);
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| {
            if matches!(ch, '/' | '\\' | ':') || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|ch| ch == '.') {
        return None;
    }
    Some(cleaned)
}

/// Payload staged in the output directory, awaiting its final name.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
}

impl StagedFile {
    /// Name of the staging file inside the output directory.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Saves artifacts as files in one directory.
///
/// The payload is first written to a hidden staging file and renamed into
/// place on save, so a failed save never leaves a partial artifact under the
/// final name. Releasing a reference removes any staging file left behind.
#[derive(Debug)]
pub struct DirectoryTarget {
    dir: fs_utf8::Dir,
    root: Utf8PathBuf,
    next_stage: u64,
    saved: Vec<Utf8PathBuf>,
}

impl DirectoryTarget {
    /// Open `root` for saving, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created or opened.
    pub fn open(root: &Utf8Path) -> io::Result<Self> {
        ensure_dir(root)?;
        let dir = fs_utf8::Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            dir,
            root: root.to_path_buf(),
            next_stage: 0,
            saved: Vec::new(),
        })
    }

    /// Directory artifacts are saved into.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Paths of saved files, in save order.
    #[must_use]
    pub fn saved(&self) -> &[Utf8PathBuf] {
        &self.saved
    }
}

impl DownloadTarget for DirectoryTarget {
    type Reference = StagedFile;

    fn create_reference(
        &mut self,
        artifact: &ExportArtifact,
    ) -> Result<Self::Reference, DownloadError> {
        self.next_stage += 1;
        let name = format!(".regionscout-{}-{}.part", std::process::id(), self.next_stage);
        self.dir
            .write(&name, &artifact.payload)
            .map_err(|err| DownloadError::Reference {
                filename: artifact.suggested_filename.clone(),
                message: err.to_string(),
            })?;
        Ok(StagedFile { name })
    }

    fn trigger_save(
        &mut self,
        reference: &Self::Reference,
        filename: &str,
    ) -> Result<(), DownloadError> {
        let save_error = |message: String| DownloadError::Save {
            filename: filename.to_owned(),
            message,
        };
        let target = sanitize_filename(filename)
            .ok_or_else(|| save_error("filename has no usable characters".to_owned()))?;
        self.dir
            .rename(&reference.name, &self.dir, &target)
            .map_err(|err| save_error(err.to_string()))?;
        let path = self.root.join(&target);
        debug!("saved {path}");
        self.saved.push(path);
        Ok(())
    }

    fn release(&mut self, reference: Self::Reference) {
        match self.dir.remove_file(&reference.name) {
            Ok(()) => debug!("discarded staged {}", reference.name),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove staged {}: {err}", reference.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regionscout_core::download::trigger_download;
    use regionscout_core::query::ExportFormat;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("tempdir should be created")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("tempdir path is UTF-8")
    }

    fn artifact(filename: &str, payload: &[u8]) -> ExportArtifact {
        ExportArtifact {
            format: ExportFormat::Kmz,
            payload: payload.to_vec(),
            suggested_filename: filename.to_owned(),
        }
    }

    fn entries(root: &Utf8Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .expect("directory should be readable")
            .map(|entry| {
                entry
                    .expect("entry should be readable")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[rstest]
    #[case("coffee_shops.kmz", Some("coffee_shops.kmz"))]
    #[case("../../etc/passwd", Some(".._.._etc_passwd"))]
    #[case("a\\b:c.xlsx", Some("a_b_c.xlsx"))]
    #[case("tab\there.json", Some("tab_here.json"))]
    #[case("  spaced.json  ", Some("spaced.json"))]
    #[case("", None)]
    #[case(".", None)]
    #[case("..", None)]
    fn sanitises_filenames(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(sanitize_filename(input).as_deref(), expected);
    }

    #[rstest]
    fn saves_artifacts_under_their_names(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        let mut target = DirectoryTarget::open(&root).expect("target should open");

        trigger_download(&mut target, &artifact("coffee.kmz", b"kmz-bytes"))
            .expect("save should succeed");

        let saved = std::fs::read(root.join("coffee.kmz")).expect("file should exist");
        assert_eq!(saved, b"kmz-bytes");
        assert_eq!(target.saved(), &[root.join("coffee.kmz")]);
        assert_eq!(entries(&root), vec!["coffee.kmz".to_owned()]);
    }

    #[rstest]
    fn later_saves_replace_earlier_files(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        let mut target = DirectoryTarget::open(&root).expect("target should open");

        trigger_download(&mut target, &artifact("response.json", b"[1]")).expect("first save");
        trigger_download(&mut target, &artifact("response.json", b"[2]")).expect("second save");

        let saved = std::fs::read(root.join("response.json")).expect("file should exist");
        assert_eq!(saved, b"[2]");
    }

    #[rstest]
    fn failed_save_leaves_no_staging_file(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        let mut target = DirectoryTarget::open(&root).expect("target should open");

        let err = trigger_download(&mut target, &artifact("..", b"bytes"))
            .expect_err("save should fail");

        assert!(matches!(err, DownloadError::Save { ref filename, .. } if filename == ".."));
        assert!(entries(&root).is_empty(), "staging file should be released");
        assert!(target.saved().is_empty());
    }

    #[rstest]
    fn open_creates_nested_directories(temp_dir: TempDir) {
        let root = utf8(&temp_dir).join("exports/today");
        let target = DirectoryTarget::open(&root).expect("target should open");

        assert_eq!(target.root(), root.as_path());
        assert!(root.is_dir());
    }

    #[rstest]
    fn ensure_dir_accepts_existing_directories(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        ensure_dir(&root).expect("existing directory is fine");
        ensure_dir(&root).expect("repeated calls are fine");
    }
}
