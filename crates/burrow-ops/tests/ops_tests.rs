use std::fs;
use std::io::Write;

use burrow_core::{PathResolver, StoreError};
use burrow_ops::{
    ArchiveSupport, FileOperation, FileOperationEngine, OperationType, reduce_to_top_level,
};
use tempfile::TempDir;

fn engine() -> (TempDir, FileOperationEngine) {
    let dir = TempDir::new().unwrap();
    let resolver = PathResolver::new(dir.path()).unwrap();
    let engine = FileOperationEngine::new(resolver, ArchiveSupport::detect(true));
    (dir, engine)
}

fn paths(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_top_level_reduction() {
    let reduced = reduce_to_top_level(&["/a/b", "/a", "/c", "/a/b/c", "/ab"]);
    assert_eq!(reduced, ["/a", "/c", "/ab"]);
}

#[tokio::test]
async fn test_repeated_copies_are_numbered() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/a.txt"), b"alpha").unwrap();

    engine.copy(&paths(&["/docs/a.txt"]), "/docs").await.unwrap();
    engine.copy(&paths(&["/docs/a.txt"]), "/docs").await.unwrap();

    assert_eq!(fs::read(dir.path().join("docs/a (1).txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(dir.path().join("docs/a (2).txt")).unwrap(), b"alpha");
}

#[tokio::test]
async fn test_delete_overlapping_selection() {
    let (dir, engine) = engine();
    fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
    fs::write(dir.path().join("docs/a.txt"), b"a").unwrap();
    fs::write(dir.path().join("docs/sub/b.txt"), b"b").unwrap();
    fs::write(dir.path().join("keep.txt"), b"k").unwrap();

    let complete = engine
        .delete(&paths(&["/docs", "/docs/a.txt", "/docs/sub/b.txt"]))
        .await
        .unwrap();

    assert_eq!(complete.operation_type, OperationType::Delete);
    assert_eq!(complete.succeeded, 1);
    assert!(!dir.path().join("docs").exists());
    assert!(dir.path().join("keep.txt").exists());
}

#[tokio::test]
async fn test_delete_partial_failure() {
    let (dir, engine) = engine();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let err = engine
        .delete(&paths(&["/a.txt", "/missing.txt"]))
        .await
        .unwrap_err();

    match err {
        StoreError::PartialFailure {
            succeeded, failed, ..
        } => assert_eq!((succeeded, failed), (1, 1)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_rename_conflicts_leave_store_untouched() {
    let (dir, engine) = engine();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    for name in ["b.txt", "a.txt"] {
        let err = engine.rename("/a.txt", name).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "{name}");
    }
    assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"a");
    assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"b");

    let entry = engine.rename("/a.txt", "c.txt").await.unwrap();
    assert_eq!(entry.path, "/c.txt");
}

#[tokio::test]
async fn test_rename_root_is_rejected() {
    let (_dir, engine) = engine();
    let err = engine.rename("/", "other").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_move_conflict_and_success() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("dest")).unwrap();
    fs::write(dir.path().join("dest/a.txt"), b"old").unwrap();
    fs::write(dir.path().join("a.txt"), b"new").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let err = engine.move_to(&paths(&["/a.txt"]), "/dest").await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    engine.move_to(&paths(&["/b.txt"]), "/dest").await.unwrap();
    assert!(dir.path().join("dest/b.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert_eq!(fs::read(dir.path().join("dest/a.txt")).unwrap(), b"old");
}

#[tokio::test]
async fn test_move_folder_into_itself() {
    let (dir, engine) = engine();
    fs::create_dir_all(dir.path().join("docs/inner")).unwrap();

    let err = engine
        .move_to(&paths(&["/docs"]), "/docs/inner")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput { .. }));
    assert!(dir.path().join("docs/inner").is_dir());
}

#[tokio::test]
async fn test_categorize_moves_by_extension() {
    let (dir, engine) = engine();
    fs::write(dir.path().join("photo.JPG"), b"jpg").unwrap();
    fs::write(dir.path().join("song.mp3"), b"mp3").unwrap();
    fs::write(dir.path().join("Makefile"), b"all:").unwrap();
    fs::create_dir(dir.path().join("folder.zip")).unwrap();

    let complete = engine
        .categorize(
            &paths(&["/photo.JPG", "/song.mp3", "/Makefile", "/folder.zip"]),
            "/",
        )
        .await
        .unwrap();

    assert_eq!(complete.succeeded, 2);
    assert_eq!(complete.skipped, 2);
    assert!(dir.path().join("Pictures/photo.JPG").exists());
    assert!(dir.path().join("Music/song.mp3").exists());
    assert!(dir.path().join("Makefile").exists());
    assert!(dir.path().join("folder.zip").is_dir());
}

#[tokio::test]
async fn test_categorize_conflict() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("Documents")).unwrap();
    fs::write(dir.path().join("Documents/notes.txt"), b"old").unwrap();
    fs::write(dir.path().join("notes.txt"), b"new").unwrap();

    let err = engine
        .categorize(&paths(&["/notes.txt"]), "/")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"new");
}

#[tokio::test]
async fn test_upload_and_create_folder() {
    let (dir, engine) = engine();

    let folder = engine.create_folder("/", "inbox").await.unwrap();
    assert!(folder.is_folder());

    let entry = engine
        .upload("/inbox", "hello.txt", &b"hello world"[..], Some(11), None)
        .await
        .unwrap();
    assert_eq!(entry.path, "/inbox/hello.txt");
    assert_eq!(entry.size, 11);
    assert_eq!(
        fs::read(dir.path().join("inbox/hello.txt")).unwrap(),
        b"hello world"
    );

    let err = engine
        .upload("/", "inbox", &b"x"[..], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let err = engine
        .upload("/", "../escape.txt", &b"x"[..], None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_decompress_zip() {
    let (dir, engine) = engine();
    let file = fs::File::create(dir.path().join("bundle.zip")).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("readme.txt", options).unwrap();
    zip.write_all(b"read me").unwrap();
    zip.add_directory("nested/", options).unwrap();
    zip.start_file("nested/data.txt", options).unwrap();
    zip.write_all(b"data").unwrap();
    zip.finish().unwrap();

    let entry = engine.decompress("/bundle.zip").await.unwrap();
    assert_eq!(entry.path, "/bundle");
    assert_eq!(
        fs::read(dir.path().join("bundle/nested/data.txt")).unwrap(),
        b"data"
    );

    let again = engine.decompress("/bundle.zip").await.unwrap();
    assert_eq!(again.path, "/bundle (1)");
}

#[tokio::test]
async fn test_decompress_tar_gz() {
    let (dir, engine) = engine();
    let file = fs::File::create(dir.path().join("src.tar.gz")).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let data = b"fn main() {}";
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "src/main.rs", &data[..])
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    let entry = engine.decompress("/src.tar.gz").await.unwrap();
    assert_eq!(entry.path, "/src");
    assert_eq!(
        fs::read(dir.path().join("src/src/main.rs")).unwrap(),
        data
    );
}

#[tokio::test]
async fn test_decompress_unknown_format() {
    let (dir, engine) = engine();
    fs::write(dir.path().join("notes.txt"), b"text").unwrap();

    let err = engine.decompress("/notes.txt").await.unwrap_err();
    assert!(matches!(err, StoreError::Unsupported { .. }));
}

#[tokio::test]
async fn test_execute_dispatches() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("dest")).unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let complete = engine
        .execute(FileOperation::copy(paths(&["/a.txt"]), "/dest"))
        .await
        .unwrap();
    assert_eq!(complete.summary(), "Copied 1 items");

    let complete = engine
        .execute(FileOperation::rename("/dest/a.txt", "b.txt"))
        .await
        .unwrap();
    assert_eq!(complete.operation_type, OperationType::Rename);
    assert!(dir.path().join("dest/b.txt").exists());
}

#[tokio::test]
async fn test_copies_of_same_name_from_many_folders_all_land() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("dest")).unwrap();
    let sources: Vec<String> = (0..6)
        .map(|i| {
            fs::create_dir(dir.path().join(format!("s{i}"))).unwrap();
            fs::write(dir.path().join(format!("s{i}/x.txt")), format!("copy {i}")).unwrap();
            format!("/s{i}/x.txt")
        })
        .collect();

    let complete = engine.copy(&sources, "/dest").await.unwrap();
    assert_eq!(complete.succeeded, 6);

    let mut contents: Vec<String> = fs::read_dir(dir.path().join("dest"))
        .unwrap()
        .map(|e| fs::read_to_string(e.unwrap().path()).unwrap())
        .collect();
    contents.sort();
    let expected: Vec<String> = (0..6).map(|i| format!("copy {i}")).collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn test_moves_onto_one_name_keep_every_file() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("dest")).unwrap();
    let sources: Vec<String> = (0..24)
        .map(|i| {
            fs::create_dir(dir.path().join(format!("s{i}"))).unwrap();
            fs::write(dir.path().join(format!("s{i}/x.txt")), format!("file {i}")).unwrap();
            format!("/s{i}/x.txt")
        })
        .collect();

    let err = engine.move_to(&sources, "/dest").await.unwrap_err();
    match err {
        StoreError::PartialFailure {
            succeeded, failed, ..
        } => assert_eq!((succeeded, failed), (1, 23)),
        other => panic!("unexpected error: {other:?}"),
    }

    let moved = fs::read_to_string(dir.path().join("dest/x.txt")).unwrap();
    let remaining: Vec<String> = (0..24)
        .map(|i| dir.path().join(format!("s{i}/x.txt")))
        .filter(|p| p.exists())
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(remaining.len(), 23);
    assert!(!remaining.contains(&moved));
    assert_eq!(fs::read_dir(dir.path().join("dest")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_overlap_is_detected_in_any_spelling() {
    let (dir, engine) = engine();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/a.txt"), b"a").unwrap();

    let complete = engine
        .delete(&paths(&["docs", "/docs//a.txt", "/docs/./a.txt"]))
        .await
        .unwrap();
    assert_eq!(complete.succeeded, 1);
    assert!(!dir.path().join("docs").exists());
}
