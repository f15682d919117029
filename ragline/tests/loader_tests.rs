//! Loader tests against files on disk.

use ragline::{DocumentLoader, RagError, TextLoader, loader_for};

fn write(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn text_file_is_one_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "notes.md", "# Notes\n\nMars is red.\n".as_bytes());

    let documents = loader_for(&path).unwrap().load().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, format!("{path}#0"));
    assert_eq!(documents[0].text, "# Notes\n\nMars is red.\n");
    assert_eq!(documents[0].metadata["source"].as_str(), Some(path.as_str()));
}

#[tokio::test]
async fn empty_text_file_loads_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "empty.txt", b"");

    let documents = TextLoader::new(&path).load().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(documents[0].text.is_empty());
}

#[tokio::test]
async fn missing_file_is_unavailable() {
    let err = TextLoader::new("/no/such/dir/notes.txt").load().await.unwrap_err();
    assert!(matches!(err, RagError::SourceUnavailable { ref source_name, .. } if source_name == "/no/such/dir/notes.txt"));
}

#[tokio::test]
async fn invalid_utf8_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "binary.txt", &[0x66, 0x6f, 0xff, 0xfe, 0x6f]);

    let err = TextLoader::new(&path).load().await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat { .. }));
}

#[cfg(feature = "csv")]
mod csv {
    use super::*;
    use ragline::CsvLoader;

    #[tokio::test]
    async fn one_document_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "planets.csv", b"name, moons\nMars, 2\nEarth, 1\n");

        let documents = loader_for(&path).unwrap().load().await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].text, "name: Mars\nmoons: 2");
        assert_eq!(documents[1].text, "name: Earth\nmoons: 1");
        assert_eq!(documents[1].id, format!("{path}#1"));
        assert_eq!(documents[1].metadata["row"].as_i64(), Some(1));
    }

    #[tokio::test]
    async fn custom_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "planets.csv", b"name;moons\nMars;2\n");

        let documents = CsvLoader::new(&path).with_delimiter(b';').load().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "name: Mars\nmoons: 2");
    }

    #[tokio::test]
    async fn ragged_rows_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.csv", b"a,b\n1,2,3\n");

        let err = CsvLoader::new(&path).load().await.unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn header_only_has_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "empty.csv", b"name,moons\n");

        assert!(CsvLoader::new(&path).load().await.unwrap().is_empty());
    }
}

#[cfg(feature = "pdf")]
#[tokio::test]
async fn garbage_pdf_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "fake.pdf", b"this is not a pdf");

    let err = ragline::PdfLoader::new(&path).load().await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat { .. }));
}
