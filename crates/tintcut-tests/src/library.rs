//! Store, removal and project persistence across crates.

use crate::support::{session, touch};
use tintcut_media::MediaKind;
use tintcut_project::{ProjectLibrary, Selection};

#[tokio::test]
async fn removing_selected_media_clears_selection_and_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    let handles = session.store().handles().clone();
    session.select(Selection::Video(clip.id)).unwrap();
    assert!(handles.is_live(clip.source));

    session.remove_media(clip.id).unwrap();
    assert_eq!(session.selection(), Selection::None);
    assert!(session.selected_media().is_none());
    assert!(session.player().is_none());
    assert!(!handles.is_live(clip.source));
    assert_eq!(handles.revoked_count(), 1);

    // A second removal finds nothing and releases nothing.
    assert!(session.remove_media(clip.id).is_err());
    assert_eq!(handles.revoked_count(), 1);
}

#[tokio::test]
async fn failed_import_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());
    let before = session.store().revision();

    assert!(session.import(dir.path().join("missing.mp4")).await.is_err());
    assert!(session.import(touch(dir.path(), "readme.txt")).await.is_err());

    assert_eq!(session.store().revision(), before);
    assert_eq!(session.store().handles().live_count(), 0);
}

#[tokio::test]
async fn saved_project_keeps_media_and_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let still = session.import(touch(dir.path(), "photo.png")).await.unwrap();
    session.import(touch(dir.path(), "song.mp3")).await.unwrap();
    session.select(Selection::Image(still.id)).unwrap();
    session.store().set_show_media_tables(true);

    let library = ProjectLibrary::open_dir(&session.config().library_dir).unwrap();
    session.store().set_name("Trip");
    library.save(&session.store().snapshot()).unwrap();

    let reopened = library.open("Trip").unwrap();
    assert_eq!(reopened.selection, Selection::Image(still.id));
    assert_eq!(reopened.list(MediaKind::Audio).len(), 1);
    assert_eq!(reopened.list(MediaKind::Image)[0].name, "photo.png");
    assert!(reopened.show_media_tables);
}
