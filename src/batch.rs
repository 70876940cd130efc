// src/batch.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::drivers::{
    image_path_for, FigureViewer, FileSelector, PlotPipeline, PlotterError, RunOutcome,
    CAPTURE_EXTENSION,
};

/// Directory swept when no root is given on the command line.
pub const DEFAULT_ROOT: &str = "./DB/Noise";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum DriveOutcome {
    Batch(BatchReport),
    Single(RunOutcome),
}

/// Every capture file below `root`, sorted by path.
///
/// Directory symlinks are not followed. Only an unreadable `root` is an error; a
/// nested directory that cannot be listed is logged and left out.
pub fn find_capture_files(root: &Path) -> Result<Vec<PathBuf>, PlotterError> {
    walk_captures(root, list_dir)
}

/// Entries of `dir` with whether each one is a real directory (symlinks are not).
fn list_dir(dir: &Path) -> io::Result<Vec<(PathBuf, bool)>> {
    let mut listed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
        listed.push((entry.path(), is_dir));
    }
    Ok(listed)
}

fn walk_captures<L>(root: &Path, mut list: L) -> Result<Vec<PathBuf>, PlotterError>
where
    L: FnMut(&Path) -> io::Result<Vec<(PathBuf, bool)>>,
{
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match list(&dir) {
            Ok(entries) => entries,
            Err(source) if dir == root => {
                return Err(PlotterError::Load { path: dir, source });
            }
            Err(err) => {
                warn!("skipping unreadable directory {}: {err}", dir.display());
                continue;
            }
        };
        for (path, is_dir) in entries {
            if is_dir {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == CAPTURE_EXTENSION) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// A capture counts as rendered once its png sibling exists.
pub fn image_already_exists(capture: &Path) -> bool {
    image_path_for(capture).exists()
}

/// Renders every capture below `root` that has no image yet.
///
/// One file failing is logged and counted; the sweep carries on with the next one.
pub fn run_directory<S: FileSelector, V: FigureViewer>(
    root: &Path,
    pipeline: &mut PlotPipeline<'_, S, V>,
) -> Result<BatchReport, PlotterError> {
    let mut report = BatchReport::default();
    for capture in find_capture_files(root)? {
        if image_already_exists(&capture) {
            report.skipped += 1;
            continue;
        }
        match pipeline.run_one(Some(&capture)) {
            Ok(_) => report.processed += 1,
            Err(err) => {
                error!("{} ({:?} error): {err}", capture.display(), err.kind());
                report.failed += 1;
            }
        }
    }
    info!(
        "batch over {} done: {} processed, {} skipped, {} failed",
        root.display(),
        report.processed,
        report.skipped,
        report.failed
    );
    Ok(report)
}

/// Sweeps `root` when it is a directory, otherwise falls back to one interactive run.
pub fn drive<S: FileSelector, V: FigureViewer>(
    root: &Path,
    pipeline: &mut PlotPipeline<'_, S, V>,
) -> Result<DriveOutcome, PlotterError> {
    if root.is_dir() {
        return run_directory(root, pipeline).map(DriveOutcome::Batch);
    }
    info!("{} is not a directory, asking for a capture", root.display());
    pipeline.run_one(None).map(DriveOutcome::Single)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;
    use crate::drivers::error::ErrorKind;
    use crate::drivers::{Figure, FixedSelector};
    use tempfile::tempdir;

    struct Headless;

    impl FigureViewer for Headless {
        fn show(&mut self, _figure: &Figure, _hide_toolbar: bool) -> Result<(), PlotterError> {
            Ok(())
        }
    }

    fn batch_config() -> DisplayConfig {
        DisplayConfig {
            show_figure: false,
            sampling_rate_msps: 1.0,
            ..Default::default()
        }
    }

    fn write_capture(path: &Path) {
        let bytes: Vec<u8> = (0..256i16)
            .map(|i| (i * 97) % 4000 - 2000)
            .flat_map(|s| s.to_le_bytes())
            .collect();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn finds_captures_recursively_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("day1/run2")).unwrap();
        write_capture(&dir.path().join("z.bin"));
        write_capture(&dir.path().join("day1/run2/a.bin"));
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("day1/a.bin.bak"), "x").unwrap();
        let found = find_capture_files(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("day1/run2/a.bin"), dir.path().join("z.bin")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn directory_symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write_capture(&dir.path().join("a.bin"));
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();
        let found = find_capture_files(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.bin")]);
    }

    #[test]
    fn unreadable_subdirectory_is_left_out() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("locked")).unwrap();
        write_capture(&dir.path().join("locked/hidden.bin"));
        write_capture(&dir.path().join("b.bin"));
        let found = walk_captures(dir.path(), |path| {
            if path.ends_with("locked") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                list_dir(path)
            }
        })
        .unwrap();
        assert_eq!(found, vec![dir.path().join("b.bin")]);
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dir = tempdir().unwrap();
        let err = find_capture_files(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }

    #[test]
    fn existing_image_is_skipped() {
        let dir = tempdir().unwrap();
        write_capture(&dir.path().join("a.bin"));
        fs::write(dir.path().join("a.png"), b"already rendered").unwrap();
        let config = batch_config();
        let mut pipeline = PlotPipeline::new(&config, FixedSelector::new(None), Headless);
        let report = run_directory(dir.path(), &mut pipeline).unwrap();
        assert_eq!(
            report,
            BatchReport {
                processed: 0,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(fs::read(dir.path().join("a.png")).unwrap(), b"already rendered");
    }

    #[test]
    fn missing_image_is_produced() {
        let dir = tempdir().unwrap();
        write_capture(&dir.path().join("b.bin"));
        let config = batch_config();
        let mut pipeline = PlotPipeline::new(&config, FixedSelector::new(None), Headless);
        let report = run_directory(dir.path(), &mut pipeline).unwrap();
        assert_eq!(report.processed, 1);
        assert!(dir.path().join("b.png").exists());

        // a second sweep has nothing left to do
        let report = run_directory(dir.path(), &mut pipeline).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn one_bad_capture_does_not_stop_the_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a_empty.bin"), b"").unwrap();
        write_capture(&dir.path().join("b_good.bin"));
        let config = batch_config();
        let mut pipeline = PlotPipeline::new(&config, FixedSelector::new(None), Headless);
        let report = run_directory(dir.path(), &mut pipeline).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 1);
        assert!(dir.path().join("b_good.png").exists());
    }

    #[test]
    fn missing_root_falls_back_to_selection() {
        let dir = tempdir().unwrap();
        let capture = dir.path().join("picked.bin");
        write_capture(&capture);
        let config = batch_config();
        let root = dir.path().join("no_such_dir");

        let mut pipeline =
            PlotPipeline::new(&config, FixedSelector::new(Some(capture.clone())), Headless);
        match drive(&root, &mut pipeline).unwrap() {
            DriveOutcome::Single(outcome) => assert_eq!(outcome.source, capture),
            other => panic!("expected a single run, got {other:?}"),
        }

        let mut pipeline = PlotPipeline::new(&config, FixedSelector::new(None), Headless);
        let err = drive(&root, &mut pipeline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }
}
