//! Resumable archive downloads with checkpoint rollback.
//!
//! One `download()` call drives a [`DownloadSession`] through up to
//! `max_retries` attempts:
//!
//! ```text
//!   existing file validates? ──yes──► done (no request)
//!           │ no
//!           ▼
//!   stat size  ─► GET [Range: bytes=n-] ─► 206 append / 200 overwrite / 416 discard
//!           ▲                                   │
//!           │                         stream, checkpoint per chunk
//!           │                                   │
//!           │                          length check, validate, sha256
//!           │                                   │
//!      sleep ◄── rollback / discard ◄── error ──┴── ok ─► ArchiveArtifact
//! ```
//!
//! On a network or HTTP failure the file is truncated back to the last
//! checkpoint. On corruption the file is deleted; a corrupt archive is never
//! repaired in place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::checksum::verify_sha256;
use super::progress::{DownloadEvent, DownloadEventCallback, PercentTracker};
use super::session::DownloadSession;
use crate::manager::config::{
    ManagerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
use crate::manager::error::{ErrorKind, ManagerError, ManagerResult};
use crate::manager::traits::{ArchiveValidator, HttpTransport};
use crate::manager::validator::ArchiveArtifact;

/// Outcome of a successful download.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// Final session state.
    pub session: DownloadSession,
    /// The validated archive.
    pub artifact: ArchiveArtifact,
    /// True when a valid archive was already on disk and nothing was fetched.
    pub reused_existing: bool,
}

/// Downloads an archive over an [`HttpTransport`], resuming partial files.
#[derive(Debug)]
pub struct ResumableDownloader<T, V> {
    transport: T,
    validator: V,
    max_retries: u32,
    retry_delay: Duration,
    chunk_size: usize,
    expected_sha256: Option<String>,
}

impl<T: HttpTransport, V: ArchiveValidator> ResumableDownloader<T, V> {
    /// Create a downloader with default retry and chunk settings.
    pub fn new(transport: T, validator: V) -> Self {
        Self {
            transport,
            validator,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            expected_sha256: None,
        }
    }

    /// Create a downloader using the retry, chunk and checksum settings of
    /// `config`.
    pub fn from_config(transport: T, validator: V, config: &ManagerConfig) -> Self {
        Self {
            transport,
            validator,
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay,
            chunk_size: config.chunk_size.max(1),
            expected_sha256: config.expected_sha256.clone(),
        }
    }

    /// Set the maximum number of attempts (at least one).
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max.max(1);
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the read size and checkpoint granularity.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Require the archive to match a SHA-256 digest.
    pub fn with_expected_sha256(mut self, digest: Option<String>) -> Self {
        self.expected_sha256 = digest;
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download `url` into `dest`, resuming any partial file already there.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        on_event: Option<DownloadEventCallback<'_>>,
    ) -> ManagerResult<DownloadReport> {
        let mut session = DownloadSession::new(url, dest);

        if let Some(artifact) = self.existing_artifact(dest) {
            let bytes = file_len(dest).unwrap_or(0);
            session.resume_from(bytes);
            session.declared_total_size = bytes;
            info!(path = %dest.display(), bytes, "Archive already downloaded");
            emit(on_event, DownloadEvent::AlreadyComplete { bytes });
            return Ok(DownloadReport {
                session,
                artifact,
                reused_existing: true,
            });
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut tracker = PercentTracker::new();

        loop {
            session.attempt_count += 1;
            let attempt = session.attempt_count;

            let existing = file_len(dest).unwrap_or(0);
            session.resume_from(existing);
            if existing > 0 {
                info!(url, offset = existing, attempt, "Resuming download");
            } else {
                info!(url, attempt, "Starting download");
            }
            emit(
                on_event,
                DownloadEvent::AttemptStarted {
                    attempt,
                    max_attempts: self.max_retries,
                    resume_from: existing,
                },
            );

            match self.attempt(&mut session, &mut tracker, on_event) {
                Ok(artifact) => {
                    info!(
                        url,
                        bytes = session.bytes_downloaded,
                        attempts = attempt,
                        "Download complete"
                    );
                    emit(
                        on_event,
                        DownloadEvent::Completed {
                            bytes: session.bytes_downloaded,
                        },
                    );
                    return Ok(DownloadReport {
                        session,
                        artifact,
                        reused_existing: false,
                    });
                }
                Err(err) => {
                    self.recover(&mut session, &err, on_event);

                    let retryable = err.is_retryable();
                    let retry_in = (retryable && attempt < self.max_retries)
                        .then_some(self.retry_delay);

                    warn!(
                        url,
                        attempt,
                        max_attempts = self.max_retries,
                        kind = err.kind().name(),
                        checkpoint = session.last_valid_offset,
                        error = %err,
                        "Download attempt failed"
                    );
                    emit(
                        on_event,
                        DownloadEvent::AttemptFailed {
                            attempt,
                            error: err.to_string(),
                            retry_in,
                        },
                    );

                    if !retryable {
                        return Err(err);
                    }
                    match retry_in {
                        Some(delay) => thread::sleep(delay),
                        None => {
                            return Err(ManagerError::RetriesExhausted {
                                url: url.to_string(),
                                attempts: attempt,
                                last: Box::new(err),
                            })
                        }
                    }
                }
            }
        }
    }

    /// A complete archive already at `dest`, if it passes every check.
    fn existing_artifact(&self, dest: &Path) -> Option<ArchiveArtifact> {
        if file_len(dest).unwrap_or(0) == 0 {
            return None;
        }
        let entries = self.validator.validate(dest).ok()?;

        if let Some(expected) = &self.expected_sha256 {
            if let Err(e) = verify_sha256(dest, expected) {
                warn!(path = %dest.display(), error = %e, "Discarding archive with wrong checksum");
                remove_if_exists(dest);
                return None;
            }
        }

        Some(ArchiveArtifact::validated(dest.to_path_buf(), entries))
    }

    /// One request-stream-validate cycle.
    fn attempt(
        &self,
        session: &mut DownloadSession,
        tracker: &mut PercentTracker,
        on_event: Option<DownloadEventCallback<'_>>,
    ) -> ManagerResult<ArchiveArtifact> {
        let url = session.url.clone();
        let dest = session.destination.clone();
        let offset = session.bytes_downloaded;

        let response = self
            .transport
            .get(&url, (offset > 0).then_some(offset))?;

        let append = match response.status {
            206 => {
                let start = response.content_range.map_or(offset, |r| r.start);
                if start != offset {
                    return Err(ManagerError::UnexpectedRange {
                        url,
                        requested: offset,
                        actual: start,
                    });
                }
                session.declared_total_size = response
                    .content_range
                    .and_then(|r| r.total)
                    .or_else(|| response.content_length.map(|len| offset + len))
                    .unwrap_or(0);
                true
            }
            200 => {
                if offset > 0 {
                    info!(url = %url, discarded = offset, "Server ignored range request, restarting");
                    emit(on_event, DownloadEvent::ResumeUnsupported { discarded: offset });
                    session.reset();
                }
                session.declared_total_size = response.content_length.unwrap_or(0);
                false
            }
            416 => {
                remove_if_exists(&dest);
                session.reset();
                emit(on_event, DownloadEvent::Discarded);
                return Err(ManagerError::RangeNotSatisfiable { url, offset });
            }
            status => return Err(ManagerError::HttpStatus { url, status }),
        };

        let write_err = |e| ManagerError::WriteFailed {
            path: dest.clone(),
            source: e,
        };

        let file = if append {
            OpenOptions::new().create(true).append(true).open(&dest)
        } else {
            File::create(&dest)
        }
        .map_err(write_err)?;

        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut body = response.body;
        let mut buffer = vec![0u8; self.chunk_size];

        self.report_progress(session, tracker, on_event);

        loop {
            let n = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ManagerError::Network {
                        url,
                        reason: format!("read failed at byte {}: {}", session.bytes_downloaded, e),
                    })
                }
            };

            writer.write_all(&buffer[..n]).map_err(write_err)?;
            session.record_bytes(n as u64);

            if session.unverified_bytes() >= self.chunk_size as u64 {
                writer.flush().map_err(write_err)?;
                session.checkpoint();
                debug!(offset = session.last_valid_offset, "Checkpoint");
            }

            self.report_progress(session, tracker, on_event);
        }

        writer.flush().map_err(write_err)?;
        let file = writer
            .into_inner()
            .map_err(|e| write_err(e.into_error()))?;
        file.sync_all().map_err(write_err)?;

        if session.declared_total_size > 0
            && session.bytes_downloaded < session.declared_total_size
        {
            return Err(ManagerError::TruncatedBody {
                url,
                received: session.bytes_downloaded,
                expected: session.declared_total_size,
            });
        }

        let entries = self.validator.validate(&dest)?;
        if let Some(expected) = &self.expected_sha256 {
            verify_sha256(&dest, expected)?;
        }

        session.checkpoint();
        Ok(ArchiveArtifact::validated(dest, entries))
    }

    /// Bring the file back in line with the session after a failed attempt.
    fn recover(
        &self,
        session: &mut DownloadSession,
        err: &ManagerError,
        on_event: Option<DownloadEventCallback<'_>>,
    ) {
        let dest = session.destination.clone();

        if err.kind() == ErrorKind::Corruption {
            warn!(path = %dest.display(), "Discarding corrupt archive");
            remove_if_exists(&dest);
            session.reset();
            emit(on_event, DownloadEvent::Discarded);
            return;
        }

        let on_disk = match file_len(&dest) {
            Some(len) => len,
            None => {
                session.reset();
                return;
            }
        };

        let checkpoint = session.last_valid_offset;
        if on_disk == checkpoint {
            session.rollback();
            return;
        }

        let truncated = on_disk > checkpoint
            && OpenOptions::new()
                .write(true)
                .open(&dest)
                .and_then(|f| f.set_len(checkpoint))
                .is_ok();

        if truncated {
            session.rollback();
            warn!(
                path = %dest.display(),
                from = on_disk,
                to = checkpoint,
                "Rolled back partial download"
            );
            emit(on_event, DownloadEvent::RolledBack { offset: checkpoint });
        } else {
            warn!(path = %dest.display(), "Could not roll back, discarding partial download");
            remove_if_exists(&dest);
            session.reset();
            emit(on_event, DownloadEvent::Discarded);
        }
    }

    fn report_progress(
        &self,
        session: &DownloadSession,
        tracker: &mut PercentTracker,
        on_event: Option<DownloadEventCallback<'_>>,
    ) {
        let percent = tracker.observe(session.bytes_downloaded, session.declared_total_size);
        emit(
            on_event,
            DownloadEvent::Progress {
                bytes_downloaded: session.bytes_downloaded,
                total_size: session.declared_total_size,
                percent,
            },
        );
    }
}

fn emit(on_event: Option<DownloadEventCallback<'_>>, event: DownloadEvent) {
    if let Some(cb) = on_event {
        cb(&event);
    }
}

fn file_len(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len())
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Reply, ScriptedTransport};
    use super::*;
    use crate::manager::validator::test_support::{corrupt_payload, nconvert_zip_bytes};
    use crate::manager::validator::ZipValidator;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const URL: &str = "http://mirror.test/NConvert-win64.zip";
    const CHUNK: usize = 256;

    fn archive(dir: &Path) -> Vec<u8> {
        let payload: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
        nconvert_zip_bytes(dir, &payload)
    }

    fn downloader(replies: Vec<Reply>) -> ResumableDownloader<ScriptedTransport, ZipValidator> {
        ResumableDownloader::new(ScriptedTransport::new(replies), ZipValidator::new())
            .with_chunk_size(CHUNK)
            .with_retry_delay(Duration::ZERO)
    }

    fn run(
        dl: &ResumableDownloader<ScriptedTransport, ZipValidator>,
        dest: &Path,
    ) -> (ManagerResult<DownloadReport>, Vec<DownloadEvent>) {
        let events = Mutex::new(Vec::new());
        let cb = |e: &DownloadEvent| events.lock().unwrap().push(e.clone());
        let result = dl.download(URL, dest, Some(&cb));
        (result, events.into_inner().unwrap())
    }

    fn percents(events: &[DownloadEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::Progress {
                    percent: Some(p), ..
                } => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fresh_download() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("staging/NConvert-win64.zip");
        let dl = downloader(vec![Reply::Serve(zip.clone())]);

        let (result, events) = run(&dl, &dest);
        let report = result.unwrap();

        assert!(!report.reused_existing);
        assert_eq!(report.session.attempt_count, 1);
        assert_eq!(report.session.bytes_downloaded, zip.len() as u64);
        assert_eq!(report.session.last_valid_offset, zip.len() as u64);
        assert_eq!(report.artifact.path(), dest.as_path());
        assert_eq!(fs::read(&dest).unwrap(), zip);
        assert_eq!(dl.transport().requests(), vec![None]);
        assert_eq!(percents(&events).last(), Some(&100));
        assert!(matches!(events.last(), Some(DownloadEvent::Completed { .. })));
    }

    #[test]
    fn test_resume_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        let k = 1234;
        fs::write(&dest, &zip[..k]).unwrap();

        let dl = downloader(vec![Reply::Serve(zip.clone())]);
        let (result, events) = run(&dl, &dest);
        result.unwrap();

        assert_eq!(dl.transport().requests(), vec![Some(k as u64)]);
        assert_eq!(fs::read(&dest).unwrap(), zip);
        assert!(events.contains(&DownloadEvent::AttemptStarted {
            attempt: 1,
            max_attempts: DEFAULT_MAX_RETRIES,
            resume_from: k as u64,
        }));
    }

    #[test]
    fn test_ignored_range_restarts_from_zero() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip[..3000]).unwrap();

        let dl = downloader(vec![Reply::IgnoreRange(zip.clone())]);
        let (result, events) = run(&dl, &dest);
        let report = result.unwrap();

        assert_eq!(report.session.attempt_count, 1);
        assert_eq!(fs::read(&dest).unwrap(), zip);
        assert!(events.contains(&DownloadEvent::ResumeUnsupported { discarded: 3000 }));

        let seen = percents(&events);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
    }

    #[test]
    fn test_interrupted_transfer_rolls_back_and_resumes() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![
            Reply::Cut {
                data: zip.clone(),
                cut: 1000,
                error: true,
            },
            Reply::Serve(zip.clone()),
        ]);
        let (result, events) = run(&dl, &dest);
        let report = result.unwrap();

        // 1000 bytes read in 256-byte chunks: checkpoints at 256, 512, 768.
        assert_eq!(dl.transport().requests(), vec![None, Some(768)]);
        assert!(events.contains(&DownloadEvent::RolledBack { offset: 768 }));
        assert_eq!(report.session.attempt_count, 2);
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_failed_rollback_discards_and_restarts() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip[..1000]).unwrap();

        // 700 bytes appended from 1000: checkpoints at 1256 and 1512, then the
        // file is emptied so only the 188 buffered bytes land on disk.
        let dl = downloader(vec![
            Reply::Shrink {
                data: zip.clone(),
                cut: 700,
                path: dest.clone(),
            },
            Reply::Serve(zip.clone()),
        ]);
        let (result, events) = run(&dl, &dest);
        let report = result.unwrap();

        assert_eq!(dl.transport().requests(), vec![Some(1000), None]);
        assert!(events.contains(&DownloadEvent::Discarded));
        assert!(!events
            .iter()
            .any(|e| matches!(e, DownloadEvent::RolledBack { .. })));
        assert_eq!(report.session.attempt_count, 2);
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_failed_rollback_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip[..1000]).unwrap();

        let dl = downloader(vec![Reply::Shrink {
            data: zip.clone(),
            cut: 700,
            path: dest.clone(),
        }])
        .with_max_retries(1);
        let (result, events) = run(&dl, &dest);

        assert!(matches!(
            result.unwrap_err(),
            ManagerError::RetriesExhausted { attempts: 1, .. }
        ));
        assert!(events.contains(&DownloadEvent::Discarded));
        assert!(!dest.exists());
    }

    #[test]
    fn test_short_body_is_truncation() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![Reply::Cut {
            data: zip.clone(),
            cut: 600,
            error: false,
        }])
        .with_max_retries(1);
        let (result, _) = run(&dl, &dest);

        match result.unwrap_err() {
            ManagerError::RetriesExhausted { last, attempts, .. } => {
                assert_eq!(attempts, 1);
                assert!(matches!(*last, ManagerError::TruncatedBody { received: 600, .. }));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(fs::metadata(&dest).unwrap().len(), 512);
    }

    #[test]
    fn test_retry_bound() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("NConvert-win64.zip");
        let dl = downloader(vec![Reply::Refused; 10]);

        let (result, events) = run(&dl, &dest);
        let err = result.unwrap_err();

        assert_eq!(dl.transport().requests().len(), DEFAULT_MAX_RETRIES as usize);
        assert!(matches!(
            err,
            ManagerError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.is_retryable());

        let failures: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::AttemptFailed { retry_in, .. } => Some(*retry_in),
                _ => None,
            })
            .collect();
        assert_eq!(
            failures,
            vec![Some(Duration::ZERO), Some(Duration::ZERO), None]
        );
    }

    #[test]
    fn test_http_error_status_is_retried() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![Reply::Status(503), Reply::Serve(zip.clone())]);
        let (result, _) = run(&dl, &dest);

        assert_eq!(result.unwrap().session.attempt_count, 2);
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_idempotent_rerun_makes_no_request() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip).unwrap();

        let dl = downloader(vec![]);
        let (result, events) = run(&dl, &dest);
        let report = result.unwrap();

        assert!(report.reused_existing);
        assert_eq!(report.session.attempt_count, 0);
        assert!(dl.transport().requests().is_empty());
        assert_eq!(
            events,
            vec![DownloadEvent::AlreadyComplete {
                bytes: zip.len() as u64
            }]
        );
    }

    #[test]
    fn test_range_not_satisfiable_discards_file() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip[..2000]).unwrap();

        let dl = downloader(vec![Reply::Status(416), Reply::Serve(zip.clone())]);
        let (result, events) = run(&dl, &dest);
        result.unwrap();

        assert_eq!(dl.transport().requests(), vec![Some(2000), None]);
        assert!(events.contains(&DownloadEvent::Discarded));
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_unexpected_range_keeps_checkpoint() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, &zip[..2000]).unwrap();

        let dl = downloader(vec![
            Reply::WrongStart {
                data: zip.clone(),
                start: 1000,
            },
            Reply::Serve(zip.clone()),
        ]);
        let (result, _) = run(&dl, &dest);
        result.unwrap();

        assert_eq!(dl.transport().requests(), vec![Some(2000), Some(2000)]);
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_corrupt_archive_is_discarded_and_refetched() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let mut bad = zip.clone();
        corrupt_payload(&mut bad, b"NConvert readme");
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![Reply::Serve(bad), Reply::Serve(zip.clone())]);
        let (result, events) = run(&dl, &dest);
        result.unwrap();

        // The second attempt starts from scratch, not from the bad file.
        assert_eq!(dl.transport().requests(), vec![None, None]);
        assert!(events.contains(&DownloadEvent::Discarded));
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    #[test]
    fn test_persistent_corruption_exhausts_retries() {
        let temp = TempDir::new().unwrap();
        let mut bad = archive(temp.path());
        corrupt_payload(&mut bad, b"NConvert readme");
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![Reply::Serve(bad); 3]);
        let (result, _) = run(&dl, &dest);
        let err = result.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(!dest.exists());
    }

    #[test]
    fn test_checksum_mismatch_is_corruption() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let dest = temp.path().join("NConvert-win64.zip");

        let dl = downloader(vec![Reply::Serve(zip.clone())])
            .with_max_retries(1)
            .with_expected_sha256(Some("00".repeat(32)));
        let (result, _) = run(&dl, &dest);

        match result.unwrap_err() {
            ManagerError::RetriesExhausted { last, .. } => {
                assert!(matches!(*last, ManagerError::ChecksumMismatch { .. }))
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_valid_archive_with_wrong_checksum_is_not_reused() {
        let temp = TempDir::new().unwrap();
        let zip = archive(temp.path());
        let reference = temp.path().join("reference.zip");
        fs::write(&reference, &zip).unwrap();
        let digest = crate::manager::download::sha256_file(&reference).unwrap();

        // A structurally valid archive, but not the pinned one.
        let dest = temp.path().join("NConvert-win64.zip");
        fs::write(&dest, nconvert_zip_bytes(temp.path(), b"older release")).unwrap();

        let dl = downloader(vec![Reply::Serve(zip.clone())]).with_expected_sha256(Some(digest));
        let (result, _) = run(&dl, &dest);
        let report = result.unwrap();

        assert!(!report.reused_existing);
        assert_eq!(dl.transport().requests(), vec![None]);
        assert_eq!(fs::read(&dest).unwrap(), zip);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_failed_attempt_leaves_file_at_checkpoint(
            prefix in 0usize..600,
            cut in 0usize..3000,
        ) {
            let temp = TempDir::new().unwrap();
            let zip = archive(temp.path());
            let dest = temp.path().join("NConvert-win64.zip");
            fs::write(&dest, &zip[..prefix]).unwrap();

            let served = zip.len() - prefix;
            let cut = cut.min(served - 1);
            let dl = downloader(vec![Reply::Cut { data: zip.clone(), cut, error: true }])
                .with_max_retries(1);

            let (result, _) = run(&dl, &dest);
            prop_assert!(result.is_err());

            let expected = (prefix + (cut / CHUNK) * CHUNK) as u64;
            prop_assert_eq!(fs::metadata(&dest).unwrap().len(), expected);
            prop_assert_eq!(&fs::read(&dest).unwrap()[..], &zip[..expected as usize]);
        }
    }
}
