//! Atomic placement of downloaded bytes.
//!
//! Downloaded bytes never touch the final output path directly. They stream
//! into `<output_dir>/.tmp/<base>.part` and are promoted with a single
//! rename, so a crash or failed download leaves at most a stale part-file in
//! the hidden subdirectory and never a half-written output file.

use crate::error::ConvertError;
use crate::remote::ByteStream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Name of the hidden staging subdirectory inside the output directory.
pub const TMP_DIR_NAME: &str = ".tmp";

/// Stream `bytes` into a part-file under the output directory's staging
/// subdirectory, overwriting any stale part-file of the same name.
///
/// Part-file names derive from the input's base name, so two inputs sharing
/// a base name can collide; an accepted limitation of the staging scheme.
pub(crate) async fn write_part(
    mut bytes: ByteStream,
    output_dir: &Path,
    base_name: &str,
) -> Result<PathBuf, ConvertError> {
    let tmp_dir = output_dir.join(TMP_DIR_NAME);
    tokio::fs::create_dir_all(&tmp_dir).await?;
    let part_path = tmp_dir.join(format!("{base_name}.part"));

    let mut part = tokio::fs::File::create(&part_path).await?;
    while let Some(chunk) = bytes.next().await {
        part.write_all(&chunk?).await?;
    }
    part.flush().await?;
    debug!("wrote part-file {}", part_path.display());
    Ok(part_path)
}

/// Promote a finished part-file to its final path, replacing any
/// pre-existing file at the destination.
pub(crate) async fn promote(part_path: &Path, output_path: &Path) -> Result<(), ConvertError> {
    tokio::fs::rename(part_path, output_path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn stream_of(chunks: Vec<Result<Bytes, ConvertError>>) -> ByteStream {
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn part_file_lands_in_hidden_subdir_then_promotes() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = stream_of(vec![
            Ok(Bytes::from_static(b"conv")),
            Ok(Bytes::from_static(b"erted")),
        ]);

        let part = write_part(bytes, dir.path(), "holiday").await.unwrap();
        assert_eq!(part, dir.path().join(".tmp/holiday.part"));
        assert_eq!(std::fs::read(&part).unwrap(), b"converted");

        let output = dir.path().join("holiday.mov");
        promote(&part, &output).await.unwrap();
        assert!(output.exists());
        assert!(!part.exists());
        assert_eq!(std::fs::read(&output).unwrap(), b"converted");
    }

    #[tokio::test]
    async fn promote_replaces_an_existing_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("holiday.mov");
        std::fs::write(&output, b"old contents").unwrap();

        let bytes = stream_of(vec![Ok(Bytes::from_static(b"new contents"))]);
        let part = write_part(bytes, dir.path(), "holiday").await.unwrap();
        promote(&part, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"new contents");
    }

    #[tokio::test]
    async fn stale_part_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(".tmp");
        std::fs::create_dir_all(&tmp).unwrap();
        std::fs::write(tmp.join("holiday.part"), b"stale leftover bytes").unwrap();

        let bytes = stream_of(vec![Ok(Bytes::from_static(b"fresh"))]);
        let part = write_part(bytes, dir.path(), "holiday").await.unwrap();
        assert_eq!(std::fs::read(&part).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_output_only_a_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = stream_of(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(ConvertError::JobFailed),
        ]);

        let result = write_part(bytes, dir.path(), "holiday").await;
        assert!(result.is_err());
        // nothing outside the staging subdirectory
        let visible: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != ".tmp")
            .collect();
        assert!(visible.is_empty());
    }
}
