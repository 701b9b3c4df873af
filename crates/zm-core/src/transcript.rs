//! Transcript loading
//!
//! Reads every `.txt` file directly under a directory and joins them into one
//! corpus used to prime a conversation.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::{Error, Result};

/// File name suffix that marks a transcript
pub const TRANSCRIPT_EXTENSION: &str = ".txt";

/// Separator appended after each transcript
pub const TRANSCRIPT_SEPARATOR: &str = "\n\n";

/// Concatenated transcripts loaded from a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptCorpus {
    /// Files that were loaded, in enumeration order
    pub files: Vec<PathBuf>,
    /// Contents of every file, each followed by a blank line
    pub text: String,
}

impl TranscriptCorpus {
    /// Number of transcript files in the corpus
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn is_transcript(name: &str) -> bool {
    name.ends_with(TRANSCRIPT_EXTENSION)
}

/// Load all transcripts directly under `dir`
///
/// Files are read in directory enumeration order. Any read failure aborts the
/// whole load so a conversation is never primed with a partial corpus.
pub async fn load_transcripts(dir: impl AsRef<Path>) -> Result<TranscriptCorpus> {
    let dir = dir.as_ref();
    let access_error = |source| Error::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(access_error)?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(access_error)? {
        let name = entry.file_name();
        if is_transcript(&name.to_string_lossy()) {
            files.push(entry.path());
        }
    }

    if files.is_empty() {
        return Err(Error::NoTranscripts(dir.to_path_buf()));
    }

    let mut text = String::new();
    for path in &files {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| Error::TranscriptRead {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = content.len(), "Read transcript");
        text.push_str(&content);
        text.push_str(TRANSCRIPT_SEPARATOR);
    }

    info!(
        dir = %dir.display(),
        files = files.len(),
        bytes = text.len(),
        "Loaded transcripts"
    );

    Ok(TranscriptCorpus { files, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_order(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| is_transcript(&e.file_name().to_string_lossy()))
            .map(|e| e.path())
            .collect()
    }

    #[tokio::test]
    async fn test_concatenates_in_listing_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Hello").unwrap();
        std::fs::write(dir.path().join("b.txt"), "World").unwrap();

        let corpus = load_transcripts(dir.path()).await.unwrap();

        let expected: String = listing_order(dir.path())
            .iter()
            .map(|p| format!("{}\n\n", std::fs::read_to_string(p).unwrap()))
            .collect();
        assert_eq!(corpus.text, expected);
        assert_eq!(corpus.files, listing_order(dir.path()));
    }

    #[tokio::test]
    async fn test_skips_other_files_and_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("call.txt"), "Alice: hi").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        std::fs::write(dir.path().join("CALL.TXT"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.txt"), "ignored").unwrap();

        let corpus = load_transcripts(dir.path()).await.unwrap();
        assert_eq!(corpus.file_count(), 1);
        assert_eq!(corpus.text, "Alice: hi\n\n");
    }

    #[tokio::test]
    async fn test_no_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audio.m4a"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("summary.doc"), "x").unwrap();

        let err = load_transcripts(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NoTranscripts(_)));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_transcripts(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NoTranscripts(_)));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = load_transcripts(&missing).await.unwrap_err();
        assert!(matches!(err, Error::DirectoryAccess { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "fine").unwrap();
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0xfd]).unwrap();

        let err = load_transcripts(dir.path()).await.unwrap_err();
        match err {
            Error::TranscriptRead { path, .. } => assert!(path.ends_with("bad.txt")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_directory_named_like_transcript_fails_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive.txt")).unwrap();

        let err = load_transcripts(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::TranscriptRead { .. }));
    }
}
