//! Tesseract command-line OCR provider.

use rollcall_core::{Error, OcrOutput, OcrProvider, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Characters Tesseract is allowed to emit for flight boards.
pub const DEFAULT_WHITELIST: &str =
    "1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ,:=().*";

/// How often a running Tesseract process is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Settings for invoking the `tesseract` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Binary name or path.
    pub binary: String,
    /// Language pack passed with `-l`.
    pub language: String,
    /// Page segmentation mode passed with `--psm`.
    pub psm: u32,
    /// Allowed output characters; empty disables the whitelist.
    pub whitelist: String,
    /// Seconds a single invocation may run before it is killed.
    pub timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            psm: 6,
            whitelist: DEFAULT_WHITELIST.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Recognizes images by running the Tesseract CLI.
#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    config: TesseractConfig,
}

impl TesseractOcr {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Arguments for one run writing to stdout; `hocr` selects markup output.
    fn args(&self, image: &Path, hocr: bool) -> Vec<String> {
        let mut args = vec![
            image.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            "--psm".to_string(),
            self.config.psm.to_string(),
        ];
        if !self.config.whitelist.is_empty() {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", self.config.whitelist));
        }
        if hocr {
            args.push("hocr".to_string());
        }
        args
    }

    fn run(&self, image: &Path, hocr: bool) -> Result<String> {
        let mut command = Command::new(&self.config.binary);
        command.args(self.args(image, hocr));
        let stdout = run_with_timeout(command, self.timeout()).map_err(|e| match e {
            Error::OcrTimeout { timeout, .. } => Error::OcrTimeout {
                image: image.display().to_string(),
                timeout,
            },
            other => other,
        })?;
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }
}

impl OcrProvider for TesseractOcr {
    fn recognize(&self, image: &Path) -> Result<OcrOutput> {
        log::debug!("Running {} on {}", self.config.binary, image.display());

        let plain_text = self.run(image, false)?;
        if plain_text.trim().is_empty() {
            log::debug!("No plain text extracted from {}", image.display());
        }

        let hocr = self.run(image, true)?;
        if hocr.trim().is_empty() {
            log::debug!("No hOCR text extracted from {}", image.display());
        }

        Ok(OcrOutput { plain_text, hocr })
    }
}

/// Run `command` to completion and return its stdout, killing it once
/// `timeout` has elapsed.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Vec<u8>> {
    let program = command.get_program().to_string_lossy().to_string();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Ocr(format!("Failed to run {} (is it installed?): {}", program, e)))?;

    // Drain both pipes on their own threads so a chatty child cannot block.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill {}: {}", program, e);
                }
                // Reap the killed process.
                let _ = child.wait();
                return Err(Error::OcrTimeout {
                    image: program,
                    timeout,
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let stdout = collect(stdout)?;
    let stderr = collect(stderr)?;
    if !status.success() {
        return Err(Error::Ocr(format!(
            "{} failed ({}): {}",
            program,
            status,
            String::from_utf8_lossy(&stderr).trim()
        )));
    }
    Ok(stdout)
}

type Drained = thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drained {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<Drained>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| Error::Ocr("Output reader thread panicked".to_string()))?
            .map_err(Error::from),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_plain_text_args() {
        let ocr = TesseractOcr::default();
        let args = ocr.args(&PathBuf::from("/work/board-gray.png"), false);
        assert_eq!(
            args,
            vec![
                "/work/board-gray.png".to_string(),
                "stdout".to_string(),
                "-l".to_string(),
                "eng".to_string(),
                "--psm".to_string(),
                "6".to_string(),
                "-c".to_string(),
                format!("tessedit_char_whitelist={}", DEFAULT_WHITELIST),
            ]
        );
    }

    #[test]
    fn test_hocr_args_without_whitelist() {
        let ocr = TesseractOcr::new(TesseractConfig {
            whitelist: String::new(),
            psm: 4,
            ..Default::default()
        });
        let args = ocr.args(&PathBuf::from("board.png"), true);
        assert_eq!(args, vec!["board.png", "stdout", "-l", "eng", "--psm", "4", "hocr"]);
    }

    #[test]
    fn test_missing_binary_is_ocr_error() {
        let ocr = TesseractOcr::new(TesseractConfig {
            binary: "rollcall-no-such-tesseract".to_string(),
            ..Default::default()
        });
        let err = ocr.recognize(Path::new("board.png")).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert!(!err.is_recoverable());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(command, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, Error::OcrTimeout { .. }));
        assert!(err.is_recoverable());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let mut command = Command::new("echo");
        command.arg("14 JAN 2024");
        let out = run_with_timeout(command, Duration::from_secs(5)).unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "14 JAN 2024");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status() {
        let command = Command::new("false");
        let err = run_with_timeout(command, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }
}
