//! Integration tests for the virtual file system
//!
//! Exercises the public `FileProvider` surface end to end.

use pretty_assertions::assert_eq;
use scratchfs::{
    CopyOptions, DeleteOptions, EntryKind, Error, ErrorKind, FileProvider, FsLimits,
    RenameOptions, VirtualFileSystem,
};
use std::sync::Arc;

async fn listing(fs: &VirtualFileSystem, path: &str) -> Vec<String> {
    fs.read_directory(path)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

#[tokio::test]
async fn test_stat_after_write_reports_file_and_size() {
    let fs = VirtualFileSystem::new();
    fs.write_file("/notes.md", b"# title\n").await.unwrap();

    let stat = fs.stat("/notes.md").await.unwrap();
    assert_eq!(stat.kind, EntryKind::File);
    assert_eq!(stat.size, 8);
}

#[tokio::test]
async fn test_second_write_bumps_version_by_one() {
    let fs = VirtualFileSystem::new();
    fs.write_file("/a", b"first").await.unwrap();
    let v1 = fs.stat("/a").await.unwrap().version;
    fs.write_file("/a", b"2nd").await.unwrap();

    let stat = fs.stat("/a").await.unwrap();
    assert_eq!(stat.version, v1 + 1);
    assert_eq!(stat.size, 3);
}

#[tokio::test]
async fn test_create_directory_creates_missing_ancestors() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/a/b/c").await.unwrap();

    for path in ["/a", "/a/b", "/a/b/c"] {
        assert!(fs.stat(path).await.unwrap().is_dir(), "{path}");
    }
    assert_eq!(listing(&fs, "/a").await, vec!["b"]);
}

#[tokio::test]
async fn test_delete_requires_recursive_for_non_empty_directory() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/a/b").await.unwrap();

    let err = fs.delete("/a", DeleteOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotEmpty);
    assert!(fs.exists("/a/b").await.unwrap());

    fs.delete("/a", DeleteOptions::recursive()).await.unwrap();
    assert!(fs.stat("/a").await.unwrap_err().is_not_found());
    assert!(fs.stat("/a/b").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_missing_entry_fails() {
    let fs = VirtualFileSystem::new();
    let err = fs.delete("/ghost", DeleteOptions::default()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rename_file() {
    let fs = VirtualFileSystem::new();
    fs.write_file("/x.txt", b"hi").await.unwrap();
    fs.rename("/x.txt", "/y.txt", RenameOptions::default())
        .await
        .unwrap();

    assert_eq!(fs.read_text_file("/y.txt").await.unwrap(), "hi");
    assert!(fs.stat("/x.txt").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rename_directory_moves_subtree() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/d").await.unwrap();
    fs.write_file("/d/f.txt", b"v1").await.unwrap();
    fs.create_directory("/d/sub").await.unwrap();
    fs.write_file("/d/sub/g.txt", b"deep").await.unwrap();
    fs.write_file("/d-sibling", b"stays").await.unwrap();

    fs.rename("/d", "/e", RenameOptions::default()).await.unwrap();

    assert_eq!(fs.read_text_file("/e/f.txt").await.unwrap(), "v1");
    assert_eq!(fs.read_text_file("/e/sub/g.txt").await.unwrap(), "deep");
    assert!(fs.stat("/d").await.unwrap_err().is_not_found());
    assert!(fs.stat("/d/f.txt").await.unwrap_err().is_not_found());
    assert_eq!(fs.read_text_file("/d-sibling").await.unwrap(), "stays");
    assert_eq!(listing(&fs, "/").await, vec!["d-sibling", "e"]);
}

#[tokio::test]
async fn test_rename_onto_existing_requires_overwrite() {
    let fs = VirtualFileSystem::new();
    fs.write_file("/src", b"new").await.unwrap();
    fs.create_directory("/dst/inner").await.unwrap();

    let err = fs
        .rename("/src", "/dst", RenameOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
    assert!(fs.exists("/src").await.unwrap());

    fs.rename("/src", "/dst", RenameOptions::overwrite())
        .await
        .unwrap();
    assert_eq!(fs.read_file("/dst").await.unwrap(), b"new");
    assert!(!fs.exists("/dst/inner").await.unwrap());
    assert_eq!(fs.usage().dir_count, 1);
}

#[tokio::test]
async fn test_rename_missing_source_fails() {
    let fs = VirtualFileSystem::new();
    let err = fs
        .rename("/nope", "/other", RenameOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rename_root_rejected() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/d").await.unwrap();
    let err = fs
        .rename("/", "/d/root", RenameOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[tokio::test]
async fn test_copy_directory_tree() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/tpl/src").await.unwrap();
    fs.write_file("/tpl/src/main.rs", b"fn main() {}").await.unwrap();
    fs.write_file("/tpl/README", b"readme").await.unwrap();

    fs.copy("/tpl", "/app", CopyOptions::default()).await.unwrap();

    assert_eq!(listing(&fs, "/app").await, vec!["README", "src"]);
    assert_eq!(
        fs.read_text_file("/app/src/main.rs").await.unwrap(),
        "fn main() {}"
    );
    // The source is untouched.
    assert_eq!(listing(&fs, "/tpl").await, vec!["README", "src"]);
    assert_eq!(fs.usage().file_count, 4);
}

#[tokio::test]
async fn test_copy_into_own_subtree_rejected() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("/a").await.unwrap();
    let err = fs
        .copy("/a", "/a/again", CopyOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(listing(&fs, "/a").await, Vec::<String>::new());
}

#[tokio::test]
async fn test_equivalent_spellings_address_one_entry() {
    let fs = VirtualFileSystem::new();
    fs.create_directory("src").await.unwrap();
    fs.write_file("src//lib.rs", b"a").await.unwrap();
    fs.write_file("/src/./lib.rs/", b"b").await.unwrap();

    assert_eq!(listing(&fs, "/src").await, vec!["lib.rs"]);
    assert_eq!(fs.stat("/src/lib.rs").await.unwrap().version, 2);
}

#[tokio::test]
async fn test_empty_content_round_trips() {
    let fs = VirtualFileSystem::new();
    fs.write_file("/empty", b"").await.unwrap();
    assert_eq!(fs.read_file("/empty").await.unwrap(), Vec::<u8>::new());
    assert_eq!(fs.stat("/empty").await.unwrap().size, 0);
}

#[tokio::test]
async fn test_rejected_operation_leaves_state_unchanged() {
    let fs = VirtualFileSystem::with_limits(FsLimits::new().max_total_bytes(10));
    fs.write_file("/a", b"12345").await.unwrap();
    let before = fs.stat("/a").await.unwrap();
    let usage = fs.usage();

    let err = fs.write_file("/a", b"12345678901").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    let err = fs.append_file("/a", b"123456").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    assert_eq!(fs.stat("/a").await.unwrap(), before);
    assert_eq!(fs.read_file("/a").await.unwrap(), b"12345");
    assert_eq!(fs.usage(), usage);
}

#[tokio::test]
async fn test_overwrite_frees_replaced_bytes_for_limits() {
    let fs = VirtualFileSystem::with_limits(FsLimits::new().max_total_bytes(12));
    fs.write_file("/a", b"123456").await.unwrap();
    fs.write_file("/b", b"12345").await.unwrap();

    let err = fs
        .copy("/a", "/c", CopyOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);

    // Replacing /b releases its 5 bytes before the copy is counted.
    fs.copy("/a", "/b", CopyOptions::overwrite()).await.unwrap();
    assert_eq!(fs.read_file("/b").await.unwrap(), b"123456");
    assert_eq!(fs.usage().total_bytes, 12);
}

#[tokio::test]
async fn test_shared_across_tasks() {
    let fs = Arc::new(VirtualFileSystem::new());
    fs.create_directory("/jobs").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let fs = Arc::clone(&fs);
        tasks.push(tokio::spawn(async move {
            fs.write_file(&format!("/jobs/{i:02}"), format!("job {i}").as_bytes())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let names = listing(&fs, "/jobs").await;
    assert_eq!(names.len(), 16);
    assert_eq!(names.first().map(String::as_str), Some("00"));
    assert_eq!(names.last().map(String::as_str), Some("15"));
}

#[tokio::test]
async fn test_usable_as_trait_object() {
    let provider: Arc<dyn FileProvider> = Arc::new(VirtualFileSystem::new());
    provider.write_file("/f", b"dyn").await.unwrap();
    assert!(provider.exists("/f").await.unwrap());
    assert!(!provider.exists("/g").await.unwrap());
    assert_eq!(provider.read_text_file("/f").await.unwrap(), "dyn");
}

#[test]
fn test_operations_complete_on_first_poll() {
    let fs = VirtualFileSystem::new();
    let mut write = tokio_test::task::spawn(fs.write_file("/sync", b"now"));
    tokio_test::assert_ready_ok!(write.poll());
    drop(write);

    let mut read = tokio_test::task::spawn(fs.read_file("/sync"));
    let content = tokio_test::assert_ready_ok!(read.poll());
    assert_eq!(content, b"now");
}

#[test]
fn test_stat_and_listing_serialize() {
    let fs = VirtualFileSystem::new();
    tokio_test::block_on(async {
        fs.create_directory("/d").await.unwrap();
        fs.write_file("/d/f", b"abc").await.unwrap();
    });

    let listing = tokio_test::block_on(fs.read_directory("/d")).unwrap();
    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json, serde_json::json!([{ "name": "f", "kind": "file" }]));

    let stat = tokio_test::block_on(fs.stat("/d/f")).unwrap();
    let json = serde_json::to_value(&stat).unwrap();
    assert_eq!(json["kind"], "file");
    assert_eq!(json["version"], 1);
    assert_eq!(json["size"], 3);

    let usage = serde_json::to_value(fs.usage()).unwrap();
    assert_eq!(
        usage,
        serde_json::json!({ "total_bytes": 3, "file_count": 1, "dir_count": 2 })
    );
}

#[test]
fn test_errors_convert_to_io_errors() -> anyhow::Result<()> {
    let fs = VirtualFileSystem::new();
    tokio_test::block_on(fs.write_file("/present", b"x"))?;
    assert_eq!(tokio_test::block_on(fs.read_file("/present"))?, b"x");

    let result: std::io::Result<Vec<u8>> =
        tokio_test::block_on(fs.read_file("/missing")).map_err(Into::into);
    let err = result.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert!(err.to_string().contains("/missing"));
    Ok(())
}
