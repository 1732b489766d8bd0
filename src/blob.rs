use std::path::PathBuf;

use bytes::Bytes;
use futures::future::BoxFuture;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, AppResult};

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3",
];

/// Somewhere to put uploaded files. `save` returns the path the stored file
/// should be referenced by from the database.
pub trait BlobStore: Send + Sync {
    fn save<'a>(&'a self, bytes: Bytes, suggested_name: &'a str) -> BoxFuture<'a, AppResult<String>>;

    /// Deletes a blob previously returned by `save`. Missing blobs are not an error.
    fn remove<'a>(&'a self, stored_path: &'a str) -> BoxFuture<'a, AppResult<()>>;
}

/// Writes blobs into `root` and hands back `"<prefix>/<filename>"`.
pub struct FsBlobStore {
    root: PathBuf,
    prefix: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self { root: root.into(), prefix: prefix.into() }
    }
}

impl BlobStore for FsBlobStore {
    fn save<'a>(&'a self, bytes: Bytes, suggested_name: &'a str) -> BoxFuture<'a, AppResult<String>> {
        Box::pin(async move {
            let filename = secure_filename(suggested_name);
            if filename.is_empty() {
                return Err(AppError::Validation(format!(
                    "unusable file name {suggested_name:?}"
                )));
            }

            tokio::fs::create_dir_all(&self.root).await?;
            let target = self.root.join(&filename);
            tokio::fs::write(&target, &bytes).await?;
            tracing::debug!(path = %target.display(), size = bytes.len(), "stored upload");

            Ok(format!("{}/{}", self.prefix.trim_end_matches('/'), filename))
        })
    }

    fn remove<'a>(&'a self, stored_path: &'a str) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let filename = stored_path
                .strip_prefix(self.prefix.trim_end_matches('/'))
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|name| !name.is_empty() && secure_filename(name) == *name)
                .ok_or_else(|| {
                    AppError::Validation(format!("{stored_path:?} is not a stored blob"))
                })?;

            let target = self.root.join(filename);
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {
                    tracing::debug!(path = %target.display(), "removed upload");
                    Ok(())
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }
}

/// Reduces a client-supplied file name to something safe to join onto a
/// directory: NFKD-folded to ASCII, no separators, no leading dots. On
/// Windows, reserved device names get a leading underscore.
pub fn secure_filename(name: &str) -> String {
    let flattened: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if cfg!(windows) && is_device_name(trimmed) {
        return format!("_{trimmed}");
    }
    trimmed.to_string()
}

fn is_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or_default().to_ascii_uppercase();
    WINDOWS_DEVICE_NAMES.contains(&stem.as_str())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn secure_filename_strips_paths_and_odd_characters() {
        assert_eq!(secure_filename("My cool movie.jpg"), "My_cool_movie.jpg");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\posters\\alien.png"), "C_posters_alien.png");
        assert_eq!(secure_filename(".hidden"), "hidden");
    }

    #[test]
    fn secure_filename_folds_accents_to_ascii() {
        assert_eq!(
            secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"),
            "i_contain_cool_umlauts.txt"
        );
        assert_eq!(secure_filename("\u{dc}ber Alles.jpg"), "Uber_Alles.jpg");
        assert_eq!(secure_filename("Am\u{e9}lie (2001).png"), "Amelie_2001.png");
    }

    #[test]
    fn secure_filename_device_names_only_matter_on_windows() {
        assert!(is_device_name("con.txt"));
        assert!(is_device_name("NUL"));
        assert!(!is_device_name("console.txt"));
        if cfg!(windows) {
            assert_eq!(secure_filename("con.txt"), "_con.txt");
        } else {
            assert_eq!(secure_filename("con.txt"), "con.txt");
        }
    }

    #[test]
    fn secure_filename_can_come_out_empty() {
        assert_eq!(secure_filename("..."), "");
        assert_eq!(secure_filename("\u{6d77}\u{5831}"), "");
    }

    #[tokio::test]
    async fn fs_store_writes_file_and_returns_prefixed_path() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("static").join("movie");
        let store = FsBlobStore::new(&root, "movie");

        let stored = store.save(Bytes::from_static(b"poster"), "the thing.jpg").await.unwrap();
        assert_eq!(stored, "movie/the_thing.jpg");
        assert_eq!(std::fs::read(root.join("the_thing.jpg")).unwrap(), b"poster");
    }

    #[tokio::test]
    async fn fs_store_rejects_names_that_sanitize_to_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "movie");

        let err = store.save(Bytes::from_static(b"x"), "///").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn fs_store_removes_what_it_saved() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "movie");

        let stored = store.save(Bytes::from_static(b"poster"), "heat.jpg").await.unwrap();
        assert!(dir.path().join("heat.jpg").exists());

        store.remove(&stored).await.unwrap();
        assert!(!dir.path().join("heat.jpg").exists());

        // Already gone.
        store.remove(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn fs_store_refuses_paths_outside_its_prefix() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "movie");

        for bad in ["other/heat.jpg", "movie/../secret", "movie/", "movie"] {
            let err = store.remove(bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{bad}: {err:?}");
        }
    }
}
