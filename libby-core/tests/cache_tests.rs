use libby_core::cache::wishlist_key;
use libby_core::{
    Book, FileStore, InterestSelection, KeyValueStore, MemoryStore, PreferenceCache, WishlistEntry,
};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "libby_{}_{}",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    dir
}

fn book(id: &str) -> Book {
    Book {
        id: id.into(),
        title: format!("Book {id}"),
        ..Default::default()
    }
}

#[test]
fn load_of_unwritten_key_is_empty() {
    let cache = PreferenceCache::new(MemoryStore::new().shared());
    assert!(cache.load_wishlist("nobody").is_empty());
    assert!(cache.load_interests("nobody").is_empty());
}

#[test]
fn corrupt_entries_are_treated_as_absent() {
    let store = MemoryStore::new().shared();
    store.set(&wishlist_key("u1"), "{ this is not json ").unwrap();
    store.set("interests_u1", "[1, 2").unwrap();

    let cache = PreferenceCache::new(store);
    assert!(cache.load_wishlist("u1").is_empty());
    assert!(cache.load_interests("u1").is_empty());
}

#[test]
fn entries_are_keyed_per_user() {
    let store = MemoryStore::new().shared();
    let cache = PreferenceCache::new(store.clone());

    cache
        .save_wishlist("alice", &[WishlistEntry::new(book("1"))])
        .unwrap();
    cache
        .save_interests("bob", &InterestSelection::from_tags(["poetry"]))
        .unwrap();

    assert_eq!(cache.load_wishlist("alice").len(), 1);
    assert!(cache.load_wishlist("bob").is_empty());
    assert!(cache.load_interests("alice").is_empty());
    assert!(cache.load_interests("bob").contains("poetry"));

    let mut keys = store.keys();
    keys.sort();
    assert_eq!(keys, vec!["interests_bob".to_string(), "wishlist_alice".to_string()]);
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = temp_dir("store");
    {
        let cache = PreferenceCache::new(FileStore::open_in_dir(&dir).shared());
        cache
            .save_wishlist("u1", &[WishlistEntry::new(book("42"))])
            .unwrap();
    }

    let cache = PreferenceCache::new(FileStore::open_in_dir(&dir).shared());
    let entries = cache.load_wishlist("u1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].book.id, "42");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn file_store_uses_tmp_fallback_on_corrupted_json() {
    let dir = temp_dir("corrupt");
    std::fs::create_dir_all(&dir).unwrap();

    std::fs::write(dir.join("store.json"), b"{ this is not json ").unwrap();
    let tmp = serde_json::json!({ "token": "abc" });
    std::fs::write(dir.join("store.json.tmp"), serde_json::to_vec(&tmp).unwrap()).unwrap();

    let store = FileStore::open_in_dir(&dir);
    assert_eq!(store.get("token").as_deref(), Some("abc"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn file_store_starts_empty_when_both_files_are_corrupt() {
    let dir = temp_dir("corrupt_both");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("store.json"), b"nope").unwrap();
    std::fs::write(dir.join("store.json.tmp"), b"nope either").unwrap();

    let store = FileStore::open_in_dir(&dir);
    assert!(store.keys().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
