//! Integration tests for offimg-host
//!
//! These tests drive the editor end-to-end: drops, store round trips,
//! reopening saved markup and resolving it against the store.

use offimg_core::data_uri::DataUri;
use offimg_core::doc::Inline;
use offimg_core::placeholder;
use offimg_core::store::{Capability, CallbackStore, MemoryStore};
use offimg_core::{Config, ContentStore, HashAlgorithm, ImageAttrs, Selection, StoreHandle};
use offimg_host::{open_store, Coords, DropEvent, DropHandling, DroppedFile, Editor};
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);
const RED: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRred";
const BLUE: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRblue";

/// Helper to create an editor over a shared in-memory store
fn create_test_editor(content: &str) -> (Editor, Arc<MemoryStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store = StoreHandle::new(Arc::clone(&memory)).expect("memory store is complete");
    let mut editor = Editor::new(Config::default(), store).expect("Failed to create editor");
    editor.open_markup(content);
    (editor, memory)
}

fn drop_at(pos: usize) -> impl Fn(Coords) -> Option<usize> {
    move |_| Some(pos)
}

#[test]
fn integration_two_files_land_in_order_at_drop_position() {
    let (mut editor, memory) = create_test_editor("Hello world");
    let mut event = DropEvent::with_files(
        vec![
            DroppedFile::from_bytes("red.png", "image/png", RED.to_vec()),
            DroppedFile::from_bytes("blue.png", "image/png", BLUE.to_vec()),
        ],
        Coords::new(10.0, 10.0),
    );

    let handling = editor.handle_drop(&mut event, &drop_at(5));
    assert_eq!(handling, DropHandling::Intercepted { pos: 5, files: 2 });
    assert!(editor.wait_idle(WAIT));

    let images: Vec<_> = editor.doc.images().collect();
    assert_eq!(images.len(), 2);

    for (name, bytes) in [("red.png", RED), ("blue.png", BLUE)] {
        let node = images
            .iter()
            .find(|n| n.attrs.alt.as_deref() == Some(name))
            .expect("each file inserted once");
        let pos = editor.doc.position_of(node.id).unwrap();
        assert!(pos == 5 || pos == 6);
        assert_eq!(node.attrs.src, DataUri::new("image/png", bytes.to_vec()).to_string());

        let hash = HashAlgorithm::Sha512.digest(bytes);
        assert_eq!(node.attrs.content_hash.as_deref(), Some(hash.as_str()));
        assert_eq!(memory.get_item(&hash).unwrap().as_deref(), Some(bytes));
    }

    let text = editor.doc.text();
    assert!(text.starts_with("Hello\u{FFFC}\u{FFFC} world"));
}

#[test]
fn integration_non_image_drop_is_left_to_host() {
    let (mut editor, memory) = create_test_editor("Hello");
    let mut event = DropEvent::with_files(
        vec![DroppedFile::from_bytes("notes.txt", "text/plain", b"notes".to_vec())],
        Coords::default(),
    );

    assert_eq!(editor.handle_drop(&mut event, &drop_at(0)), DropHandling::PassThrough);
    assert!(editor.wait_idle(WAIT));
    assert_eq!(editor.doc.text(), "Hello");
    assert!(memory.is_empty());
}

#[test]
fn integration_saved_markup_resolves_in_new_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.dir = Some(tmp.path().to_path_buf());

    // Session one: drop an image and save
    let saved = {
        let store = open_store(&config).unwrap();
        let mut editor = Editor::new(config.clone(), store).unwrap();
        editor.open_markup("Intro\n");
        let mut event = DropEvent::with_files(
            vec![DroppedFile::from_bytes("red.png", "image/png", RED.to_vec())],
            Coords::default(),
        );
        editor.handle_drop(&mut event, &drop_at(5));
        assert!(editor.wait_idle(WAIT));
        editor.render_markup()
    };
    assert!(saved.contains("data-sha512="));

    // Session two: reopen from disk
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(saved.as_bytes()).unwrap();
    file.flush().unwrap();

    let store = open_store(&config).unwrap();
    let mut editor = Editor::new(config, store).unwrap();
    editor.open_path(file.path()).unwrap();

    let id = editor.doc.images().next().unwrap().id;
    assert!(placeholder::is_placeholder(&editor.doc.image(id).unwrap().attrs.src));

    assert!(editor.wait_idle(WAIT));
    let node = editor.doc.image(id).unwrap();
    assert_eq!(node.attrs.src, DataUri::new("image/png", RED.to_vec()).to_string());
    assert_eq!(node.attrs.alt.as_deref(), Some("red.png"));
}

#[test]
fn integration_missing_record_keeps_placeholder_and_hash() {
    let hash = HashAlgorithm::Sha512.digest(b"gone");
    let source = format!("<img data-sha512=\"{}\" alt=\"chart\">\n", hash);
    let (mut editor, _memory) = create_test_editor(&source);

    assert!(editor.wait_idle(WAIT));
    let node = editor.doc.images().next().unwrap();
    assert_eq!(node.attrs.src, placeholder::render("chart", 100, 100));
    assert_eq!(node.attrs.content_hash.as_deref(), Some(hash.as_str()));

    // Serializing the unresolved node keeps the reference
    assert!(editor.render_markup().contains(&hash));
}

#[test]
fn integration_plain_img_tags_stay_text() {
    let source = "before <img src=\"https://example.com/a.png\"> after\n";
    let (editor, _memory) = create_test_editor(source);
    assert_eq!(editor.doc.images().count(), 0);
    assert_eq!(editor.render_markup(), source);
}

#[test]
fn integration_insert_command_follows_selection() {
    let (mut editor, _memory) = create_test_editor("0123456789");
    let attrs = || ImageAttrs::new(DataUri::new("image/png", RED.to_vec()).to_string());

    editor.set_selection(Selection::cursor_at(5));
    let at_cursor = editor.insert_image(attrs()).unwrap();
    assert_eq!(editor.doc.position_of(at_cursor), Some(5));

    editor.set_selection(Selection::range(1, 3));
    let at_range = editor.insert_image(attrs()).unwrap();
    assert_eq!(editor.doc.position_of(at_range), Some(3));
    assert!(matches!(editor.doc.content()[0], Inline::Text(_)));
}

#[test]
fn integration_incomplete_store_rejected_up_front() {
    let store = CallbackStore::new()
        .on_get_item(|_| Ok(None))
        .on_set_item(|_, _| Ok(()));
    let err = StoreHandle::new(store).unwrap_err();
    assert_eq!(err.missing, Capability::Clear);
    assert!(err.to_string().contains("clear"));
}

#[test]
fn integration_release_orphans_after_removal() {
    let (mut editor, memory) = create_test_editor("");
    let mut event = DropEvent::with_files(
        vec![DroppedFile::from_bytes("red.png", "image/png", RED.to_vec())],
        Coords::default(),
    );
    editor.handle_drop(&mut event, &drop_at(0));
    assert!(editor.wait_idle(WAIT));
    assert_eq!(memory.len(), 1);

    // Still referenced: nothing to release
    assert_eq!(editor.release_orphans(), 0);

    let id = editor.doc.images().next().unwrap().id;
    editor.remove_image(id).unwrap();
    assert_eq!(editor.release_orphans(), 1);
    assert!(editor.wait_idle(WAIT));
    assert!(memory.is_empty());
}
