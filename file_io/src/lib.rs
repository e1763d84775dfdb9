use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub fn create_file_buf_write<P: AsRef<Path>>(path: P) -> io::Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}

pub fn open_file_buf_read<P: AsRef<Path>>(path: P) -> io::Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

// same as the unstable BufRead::has_data_left
pub fn has_data_left<R: BufRead>(mut reader: R) -> io::Result<bool> {
    reader.fill_buf().map(|b| !b.is_empty())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("unnamed"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Files written beside their destinations and moved into place together.
///
/// Each [`StagedFiles::stage`] writes to a sibling temporary path. Nothing is
/// visible at the destinations until [`StagedFiles::commit`]; dropping an
/// uncommitted stage removes its temporary files.
#[derive(Debug, Default)]
pub struct StagedFiles {
    files: Vec<(PathBuf, PathBuf)>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn stage<P, F, E>(&mut self, path: P, write: F) -> Result<(), E>
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> Result<(), E>,
        E: From<io::Error>,
    {
        let path = path.as_ref().to_path_buf();
        let tmp = with_suffix(&path, ".staged");
        self.files.push((tmp.clone(), path));
        write(&tmp)
    }

    /// Renames every staged file over its destination.
    pub fn commit(mut self) -> io::Result<()> {
        for (tmp, path) in &self.files {
            fs::rename(tmp, path)?;
        }
        self.files.clear();
        Ok(())
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (tmp, _) in &self.files {
            let _ = fs::remove_file(tmp);
        }
    }
}

/// Copies the regular files of `src` (non-recursively) into `dst`, creating
/// `dst` if needed.
pub fn copy_dir_files<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> io::Result<()> {
    fs::create_dir_all(dst.as_ref())?;
    for entry in fs::read_dir(src.as_ref())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Replaces the directory `dst` with a staged directory filled by `fill`.
///
/// The staged directory is built next to `dst` and swapped in with a rename,
/// so a failure while filling leaves the previous `dst` untouched.
pub fn replace_dir_with<P, F, E>(dst: P, fill: F) -> Result<(), E>
where
    P: AsRef<Path>,
    F: FnOnce(&Path) -> Result<(), E>,
    E: From<io::Error>,
{
    let dst = dst.as_ref();
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let staged = with_suffix(dst, ".staged");
    let retired = with_suffix(dst, ".retired");
    if staged.exists() {
        fs::remove_dir_all(&staged)?;
    }
    fs::create_dir_all(&staged)?;
    if let Err(err) = fill(&staged) {
        let _ = fs::remove_dir_all(&staged);
        return Err(err);
    }
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    if dst.exists() {
        fs::rename(dst, &retired)?;
    }
    fs::rename(&staged, dst)?;
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn staged_files_appear_only_on_commit() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::write(&first, b"old").unwrap();

        let mut staged = StagedFiles::new();
        staged
            .stage::<_, _, io::Error>(&first, |tmp| {
                let mut file = create_file_buf_write(tmp)?;
                file.write_all(b"new")?;
                file.flush()
            })
            .unwrap();
        staged
            .stage::<_, _, io::Error>(&second, |tmp| fs::write(tmp, b"2"))
            .unwrap();
        assert_eq!(staged.len(), 2);
        assert_eq!(fs::read(&first).unwrap(), b"old");
        assert!(!second.exists());

        staged.commit().unwrap();
        let mut contents = String::new();
        open_file_buf_read(&first)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "new");
        assert_eq!(fs::read(&second).unwrap(), b"2");
        assert!(!with_suffix(&first, ".staged").exists());
    }

    #[test]
    fn failed_stage_leaves_destinations_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::write(&first, b"old-1").unwrap();
        fs::write(&second, b"old-2").unwrap();

        let mut staged = StagedFiles::new();
        staged
            .stage::<_, _, io::Error>(&first, |tmp| fs::write(tmp, b"new-1"))
            .unwrap();
        let res: io::Result<()> = staged.stage(&second, |tmp| {
            fs::write(tmp, b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });
        assert!(res.is_err());
        drop(staged);

        assert_eq!(fs::read(&first).unwrap(), b"old-1");
        assert_eq!(fs::read(&second).unwrap(), b"old-2");
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn replace_dir_swaps_in_copied_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("policy"), b"p").unwrap();
        fs::write(src.join("target"), b"t").unwrap();

        let dst = dir.path().join("active");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale"), b"x").unwrap();

        replace_dir_with::<_, _, io::Error>(&dst, |staged| copy_dir_files(&src, staged)).unwrap();

        assert_eq!(fs::read(dst.join("policy")).unwrap(), b"p");
        assert_eq!(fs::read(dst.join("target")).unwrap(), b"t");
        assert!(!dst.join("stale").exists());
        assert!(!with_suffix(&dst, ".staged").exists());
        assert!(!with_suffix(&dst, ".retired").exists());
    }

    #[test]
    fn has_data_left_detects_eof() {
        let empty: &[u8] = &[];
        assert!(!has_data_left(empty).unwrap());
        let some: &[u8] = &[1];
        assert!(has_data_left(some).unwrap());
    }
}
