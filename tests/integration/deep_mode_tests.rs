use image::{GrayImage, Luma};
use mediadupe::config::ScanConfig;
use mediadupe::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig};
use mediadupe::scanner::external::{AcousticFingerprinter, FrameDecoder, ToolError};
use mediadupe::scanner::{FingerprintDomain, FingerprintMode, FingerprintPolicy, GrayGrid};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Acoustic stand-in: the "recording" is everything before the first `|`.
struct TagAcoustic;

impl AcousticFingerprinter for TagAcoustic {
    fn fingerprint(&self, path: &Path) -> Result<String, ToolError> {
        let content = fs::read_to_string(path).map_err(|e| ToolError::Unavailable {
            tool: "tag".into(),
            reason: e.to_string(),
        })?;
        match content.split_once('|') {
            Some((tag, _)) => Ok(tag.to_string()),
            None => Err(ToolError::BadOutput {
                tool: "tag".into(),
                reason: "no tag".into(),
            }),
        }
    }
}

/// Frame stand-in: the first byte picks a rising or falling gradient.
struct GradientFrames;

impl FrameDecoder for GradientFrames {
    fn decode_frame(&self, path: &Path, _offset_secs: f64) -> Result<GrayGrid, ToolError> {
        let first = fs::read(path)
            .ok()
            .and_then(|bytes| bytes.first().copied())
            .ok_or_else(|| ToolError::BadOutput {
                tool: "frames".into(),
                reason: "empty".into(),
            })?;
        let samples: Vec<u8> = (0..72u8)
            .map(|i| {
                let x = (i % 9) * 20;
                if first == b'R' {
                    x
                } else {
                    200 - x
                }
            })
            .collect();
        GrayGrid::from_raw(&samples).map_err(|e| ToolError::BadOutput {
            tool: "frames".into(),
            reason: e.to_string(),
        })
    }
}

fn gradient(rising: bool) -> GrayImage {
    GrayImage::from_fn(64, 48, |x, _| {
        let v = (x * 4) as u8;
        Luma([if rising { v } else { 255 - v }])
    })
}

fn deep() -> ScanConfig {
    ScanConfig::default().with_mode(FingerprintMode::Deep)
}

fn scan(root: &Path, config: FinderConfig) -> Vec<DuplicateGroup> {
    DuplicateFinder::new(config).find_duplicates(root).unwrap().0
}

fn names(group: &DuplicateGroup) -> Vec<String> {
    group.members.iter().map(|m| m.file_name()).collect()
}

#[test]
fn test_same_picture_in_two_formats() {
    let dir = tempdir().unwrap();
    gradient(true).save(dir.path().join("photo.png")).unwrap();
    gradient(true).save(dir.path().join("photo.bmp")).unwrap();
    gradient(false).save(dir.path().join("other.png")).unwrap();

    let fast = scan(
        dir.path(),
        FinderConfig::default().with_scan_config(ScanConfig::default()),
    );
    assert!(fast.is_empty(), "encodings differ byte-wise");

    let groups = scan(dir.path(), FinderConfig::default().with_scan_config(deep()));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.domain(), FingerprintDomain::Image);
    assert_eq!(names(&groups[0]), ["photo.bmp", "photo.png"]);
}

#[test]
fn test_jpeg_matches_png_of_same_picture() {
    let dir = tempdir().unwrap();
    gradient(true).save(dir.path().join("shot.jpg")).unwrap();
    gradient(true).save(dir.path().join("shot.png")).unwrap();
    gradient(false).save(dir.path().join("other.jpeg")).unwrap();

    let groups = scan(dir.path(), FinderConfig::default().with_scan_config(deep()));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.domain(), FingerprintDomain::Image);
    assert!(groups[0].fingerprint.to_string().starts_with("perc-image:"));
    assert_eq!(names(&groups[0]), ["shot.jpg", "shot.png"]);
}

#[test]
fn test_audio_groups_by_acoustic_fingerprint() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"AQAAtune|128kbps").unwrap();
    fs::write(dir.path().join("b.flac"), b"AQAAtune|lossless").unwrap();
    fs::write(dir.path().join("c.ogg"), b"AQAAother|q5").unwrap();

    let policy = FingerprintPolicy::exact_only().with_acoustic(Arc::new(TagAcoustic));
    let groups = scan(
        dir.path(),
        FinderConfig::default().with_scan_config(deep()).with_policy(policy),
    );

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.to_string(), "perc-audio:AQAAtune");
    assert_eq!(names(&groups[0]), ["a.mp3", "b.flac"]);
}

#[test]
fn test_acoustic_failure_falls_back_to_exact() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"no tag here").unwrap();
    fs::write(dir.path().join("b.mp3"), b"no tag here").unwrap();

    let policy = FingerprintPolicy::exact_only().with_acoustic(Arc::new(TagAcoustic));
    let (groups, summary) = DuplicateFinder::new(
        FinderConfig::default().with_scan_config(deep()).with_policy(policy),
    )
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(summary.failed_files, 0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.domain(), FingerprintDomain::Exact);
}

#[test]
fn test_video_groups_by_frame_hash() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("clip.mp4"), b"R-720p").unwrap();
    fs::write(dir.path().join("clip.mkv"), b"R-1080p").unwrap();
    fs::write(dir.path().join("other.mov"), b"F-720p").unwrap();

    let policy = FingerprintPolicy::exact_only().with_frame_decoder(Arc::new(GradientFrames));
    let groups = scan(
        dir.path(),
        FinderConfig::default().with_scan_config(deep()).with_policy(policy),
    );

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].fingerprint.domain(), FingerprintDomain::Video);
    assert_eq!(names(&groups[0]), ["clip.mkv", "clip.mp4"]);
}

#[test]
fn test_domains_never_merge() {
    let dir = tempdir().unwrap();
    // Rising gradients hash to all ones in both domains.
    gradient(true).save(dir.path().join("still.png")).unwrap();
    gradient(true).save(dir.path().join("still.bmp")).unwrap();
    fs::write(dir.path().join("clip.mp4"), b"R1").unwrap();
    fs::write(dir.path().join("clip.avi"), b"R2").unwrap();
    fs::write(dir.path().join("a.wav"), b"ffffffffffffffff|1").unwrap();
    fs::write(dir.path().join("b.wav"), b"ffffffffffffffff|2").unwrap();

    let policy = FingerprintPolicy::exact_only()
        .with_acoustic(Arc::new(TagAcoustic))
        .with_frame_decoder(Arc::new(GradientFrames));
    let groups = scan(
        dir.path(),
        FinderConfig::default().with_scan_config(deep()).with_policy(policy),
    );

    assert_eq!(groups.len(), 3);
    let mut domains: Vec<FingerprintDomain> =
        groups.iter().map(|g| g.fingerprint.domain()).collect();
    domains.sort();
    domains.dedup();
    assert_eq!(domains.len(), 3);
    for group in &groups {
        assert_eq!(group.len(), 2);
        assert!(group.fingerprint.to_string().ends_with("ffffffffffffffff"));
    }
}

#[test]
fn test_fast_mode_ignores_collaborators() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"tune|1").unwrap();
    fs::write(dir.path().join("b.mp3"), b"tune|2").unwrap();

    let policy = FingerprintPolicy::exact_only().with_acoustic(Arc::new(TagAcoustic));
    let groups = scan(
        dir.path(),
        FinderConfig::default()
            .with_scan_config(ScanConfig::default())
            .with_policy(policy),
    );
    assert!(groups.is_empty());
}
