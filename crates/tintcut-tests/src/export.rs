//! Export command building and full export runs against an in-memory encoder.

use crate::support::{session, session_with, touch, MemoryEncoder};
use tintcut_core::TintcutError;
use tintcut_effects::AdjustmentField;
use tintcut_media::{AudioSource, Axis, ExportEvent, ExportStatus, FileType};
use tintcut_project::Selection;

const SCRIPT: &[&str] = &[
    "ffmpeg version 6.0 Copyright (c) 2000-2023 the FFmpeg developers",
    "frame=   24 fps=0.0 q=28.0 size=       0kB time=00:00:01.00 bitrate=   0.0kbits/s",
    "frame=   48 fps= 47 q=28.0 size=     256kB time=00:00:03.50 bitrate= 599.2kbits/s",
    "frame=   50 fps= 47 q=28.0 size=     256kB time=garbage!!!! bitrate= 599.2kbits/s",
    "frame=   10 fps= 47 q=28.0 size=     256kB time=00:00:02.00 bitrate= 599.2kbits/s",
    "frame=   60 fps= 46 q=28.0 size=     300kB time=N/A bitrate=N/A",
    "frame=   96 fps= 46 q=28.0 size=     512kB time=00:00:06.00 bitrate= 699.0kbits/s",
    "frame=  168 fps= 46 q=-1.0 Lsize=    900kB time=00:00:07.00 bitrate= 700.0kbits/s",
];

#[tokio::test]
async fn default_dimensions_skip_scale_and_odd_width_rounds_up() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let options = session.export_options_mut().unwrap();
    options.file_type = FileType::Mp4;
    assert!(options.uses_source_dimensions());
    let command = session.export_command().unwrap();
    assert!(!command.filters().unwrap().contains("scale="));
    assert!(command.args.iter().any(|a| a == "libx264"));

    let options = session.export_options_mut().unwrap();
    options.set_use_source_dimensions(false);
    assert!(options.set_dimension_input(Axis::Width, "641"));
    assert_eq!(options.dimensions(), (641, 720));
    options.commit_dimensions();
    assert_eq!(options.dimensions(), (642, 720));

    let command = session.export_command().unwrap();
    assert!(command.filters().unwrap().ends_with(",scale=642x720"));
}

#[tokio::test]
async fn export_runs_trimmed_with_monotonic_progress() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = MemoryEncoder::new(SCRIPT);
    let log = encoder.log.clone();
    let mut session = session_with(dir.path(), encoder);
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();
    session.adjust(|a| a.set(AdjustmentField::Contrast, 150.0));

    let player = session.player_mut().unwrap();
    player.set_pending(5.0, 12.0);
    player.commit().unwrap();

    let events = session.subscribe_export();
    let artifact = session.export().await.unwrap();
    assert_eq!(artifact.file_name, "clip.mp4");
    assert_eq!(artifact.mime_type, "video/mp4");
    assert_eq!(artifact.bytes, b"encoded");

    let progress: Vec<f64> = events
        .try_iter()
        .filter_map(|e| match e {
            ExportEvent::Progress(p) => Some(p),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert!(progress.iter().all(|p| (0.0..=100.0).contains(p)));
    assert_eq!(progress.last().copied(), Some(100.0));

    let snapshot = session.export_snapshot();
    assert_eq!(snapshot.status, ExportStatus::Finished);
    assert_eq!(snapshot.progress_percent, 100.0);

    let log = log.lock();
    let args = &log.runs[0];
    assert_eq!(&args[..4], &["-ss", "5", "-i", "clip.mp4"]);
    assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "7"));
    assert!(args.iter().any(|a| a.contains("contrast=1.5")));
    assert_eq!(args.last().map(String::as_str), Some("clip_temp.mp4"));
    // Every staged input and the output are released.
    assert!(log.unlinked.contains(&"clip.mp4".to_string()));
    assert!(log.unlinked.contains(&"clip_temp.mp4".to_string()));
}

#[tokio::test]
async fn replacement_audio_is_staged_and_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = MemoryEncoder::new(&[]);
    let log = encoder.log.clone();
    let mut session = session_with(dir.path(), encoder);
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    let song = session.import(touch(dir.path(), "song.mp3")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();
    session.export_options_mut().unwrap().audio = AudioSource::Replacement(song.id);

    session.export().await.unwrap();
    let log = log.lock();
    assert_eq!(log.written, vec!["clip.mp4", "temp_audio"]);
    let args = &log.runs[0];
    assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
}

#[tokio::test]
async fn failed_export_returns_to_finished_and_can_retry() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(dir.path(), MemoryEncoder::new(SCRIPT).failing());
    let clip = session.import(touch(dir.path(), "clip.mp4")).await.unwrap();
    session.select(Selection::Video(clip.id)).unwrap();

    let events = session.subscribe_export();
    assert!(session.export().await.is_err());
    assert_eq!(session.export_snapshot().status, ExportStatus::Finished);
    assert!(session.export_disabled_reason().is_none());
    assert!(events
        .try_iter()
        .any(|e| matches!(e, ExportEvent::Failed(_))));

    // The gate is open again: the retry reaches the encoder.
    assert!(matches!(
        session.export().await,
        Err(TintcutError::Encoder(_))
    ));
}

#[tokio::test]
async fn still_exports_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = MemoryEncoder::new(&[]);
    let log = encoder.log.clone();
    let mut session = session_with(dir.path(), encoder);
    let still = session.import(touch(dir.path(), "photo.png")).await.unwrap();
    session.select(Selection::Image(still.id)).unwrap();
    session.adjust(|a| a.set_greyscale(true));
    session.export_options_mut().unwrap().file_type = FileType::Jpg;

    let artifact = session.export().await.unwrap();
    assert_eq!(artifact.file_name, "photo.jpg");
    assert_eq!(artifact.mime_type, "image/jpeg");

    let log = log.lock();
    let args = &log.runs[0];
    assert!(args.windows(2).any(|w| w[0] == "-frames:v" && w[1] == "1"));
    assert!(args.iter().any(|a| a.ends_with("format=gray")));
}
