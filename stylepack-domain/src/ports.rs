use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use fs_err as fs;

/// Scratch area that receives relocated package assets during planning.
pub trait StagingArea {
    fn root(&self) -> &Utf8Path;

    /// Writes `bytes` at `rel` under the root and returns the absolute path.
    fn stage(&self, rel: &Utf8Path, bytes: &[u8]) -> anyhow::Result<Utf8PathBuf>;
}

/// File-system backed `StagingArea`.
#[derive(Debug, Clone)]
pub struct FsStagingArea {
    root: Utf8PathBuf,
}

impl FsStagingArea {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }
}

impl StagingArea for FsStagingArea {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn stage(&self, rel: &Utf8Path, bytes: &[u8]) -> anyhow::Result<Utf8PathBuf> {
        if rel.as_str().is_empty() || !rel.components().all(|c| matches!(c, Utf8Component::Normal(_))) {
            anyhow::bail!("refusing to stage outside the staging root: {rel}");
        }
        let dest = self.root.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&dest, bytes).with_context(|| format!("write {dest}"))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let area = FsStagingArea::new(root.clone());

        assert!(area.stage(Utf8Path::new("../x"), b"1").is_err());
        assert!(area.stage(Utf8Path::new("/abs"), b"1").is_err());

        let staged = area.stage(Utf8Path::new("p/fonts/a.ttf"), b"font").unwrap();
        assert_eq!(staged, root.join("p/fonts/a.ttf"));
        assert_eq!(fs::read(&staged).unwrap(), b"font");
    }
}
