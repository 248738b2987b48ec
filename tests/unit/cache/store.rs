use super::*;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "depthflow_cache_{tag}_{}_{nanos}",
        std::process::id()
    ))
}

fn exercise(cache: &dyn WeightCache) {
    assert_eq!(cache.get("https://a/x.onnx").unwrap(), None);
    cache.put("https://b/y.onnx", b"bbb").unwrap();
    cache.put("https://a/x.onnx", b"aa").unwrap();
    assert_eq!(cache.get("https://a/x.onnx").unwrap().as_deref(), Some(&b"aa"[..]));
    assert_eq!(
        cache.keys().unwrap(),
        vec!["https://a/x.onnx".to_owned(), "https://b/y.onnx".to_owned()]
    );
    assert!(cache.contains("https://b/y.onnx").unwrap());

    cache.put("https://a/x.onnx", b"replaced").unwrap();
    assert_eq!(
        cache.get("https://a/x.onnx").unwrap().as_deref(),
        Some(&b"replaced"[..])
    );

    cache.delete(&["https://a/x.onnx", "https://missing"]).unwrap();
    assert_eq!(cache.keys().unwrap(), vec!["https://b/y.onnx".to_owned()]);
    assert!(!cache.contains("https://a/x.onnx").unwrap());

    cache.clear().unwrap();
    assert!(cache.keys().unwrap().is_empty());
}

#[test]
fn memory_cache_contract() {
    exercise(&MemoryCache::new());
}

#[test]
fn dir_cache_contract() {
    let dir = temp_dir("contract");
    exercise(&DirCache::open(&dir).unwrap());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn dir_cache_layout_and_reopen() {
    let dir = temp_dir("layout");
    let cache = DirCache::open(&dir).unwrap();
    cache.put("k", b"12345").unwrap();

    let stem = DirCache::stem("k");
    assert_eq!(stem.len(), 64);
    assert_eq!(fs::read(dir.join(format!("{stem}.bin"))).unwrap(), b"12345");
    let meta: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.join(format!("{stem}.json"))).unwrap()).unwrap();
    assert_eq!(meta["url"], "k");
    assert_eq!(meta["size"], 5);

    let reopened = DirCache::open(&dir).unwrap();
    assert_eq!(reopened.get("k").unwrap().as_deref(), Some(&b"12345"[..]));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn dir_cache_ignores_foreign_files() {
    let dir = temp_dir("foreign");
    let cache = DirCache::open(&dir).unwrap();
    fs::write(dir.join("notes.json"), b"{\"hello\": 1}").unwrap();
    fs::write(dir.join("readme.txt"), b"hi").unwrap();
    cache.put("k", b"v").unwrap();

    assert_eq!(cache.keys().unwrap(), vec!["k".to_owned()]);
    cache.clear().unwrap();
    assert!(dir.join("notes.json").exists());
    assert!(dir.join("readme.txt").exists());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn entry_without_blob_is_not_listed() {
    let dir = temp_dir("orphan");
    let cache = DirCache::open(&dir).unwrap();
    cache.put("https://a/x.onnx", b"aa").unwrap();
    cache.put("https://b/y.onnx", b"bbb").unwrap();
    fs::remove_file(cache.blob_path("https://a/x.onnx")).unwrap();

    assert_eq!(cache.keys().unwrap(), vec!["https://b/y.onnx".to_owned()]);
    assert!(!cache.contains("https://a/x.onnx").unwrap());
    assert_eq!(cache.get("https://a/x.onnx").unwrap(), None);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn clones_share_the_download_flag() {
    use std::sync::atomic::Ordering;

    let dir = temp_dir("flag");
    let cache = DirCache::open(&dir).unwrap();
    let clone = cache.clone();
    cache.download_flag().store(true, Ordering::Release);
    assert!(clone.download_flag().load(Ordering::Acquire));
    assert!(!DirCache::open(&dir).unwrap().download_flag().load(Ordering::Acquire));
    let _ = fs::remove_dir_all(&dir);
}
