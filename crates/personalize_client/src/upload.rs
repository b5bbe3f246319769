//! Uploads local dataset files to the object store.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use tracing::info;

/// Uploads a local file under `key` and returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the upload fails.
pub async fn upload_file(store: &dyn ObjectStore, local_path: &Path, key: &str) -> Result<usize> {
    let data = Bytes::from(
        tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?,
    );

    if data.is_empty() {
        anyhow::bail!("Refusing to upload empty file {}", local_path.display());
    }

    let size = data.len();
    let object_path = ObjectStorePath::from(key);

    store
        .put(&object_path, data.into())
        .await
        .with_context(|| format!("Failed to write {key} to object store"))?;

    info!(file = %local_path.display(), key, bytes = size, "Uploaded dataset file");

    Ok(size)
}

/// Returns the `s3://` URI the service reads an uploaded object from.
#[must_use]
pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{}", key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use object_store::memory::InMemory;

    use super::*;

    #[tokio::test]
    async fn test_upload_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ITEM_ID,CATEGORY,STYLE,DESCRIPTION").unwrap();
        writeln!(file, "1,jewelry,earrings,Gold hoops").unwrap();

        let store = InMemory::new();
        let size = upload_file(&store, file.path(), "retaildemo/items.csv")
            .await
            .unwrap();

        let stored = store
            .get(&ObjectStorePath::from("retaildemo/items.csv"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.len(), size);
        assert!(stored.starts_with(b"ITEM_ID"));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = InMemory::new();

        assert!(upload_file(&store, file.path(), "empty.csv").await.is_err());
    }

    #[test]
    fn test_s3_uri() {
        assert_eq!(s3_uri("bucket", "retaildemo/items.csv"), "s3://bucket/retaildemo/items.csv");
        assert_eq!(s3_uri("bucket", "/items.csv"), "s3://bucket/items.csv");
    }
}
