use crate::domain::model::{
    is_selectable_port, FlashCommand, FlashEvent, FlashRequest, FlashResult, ToolchainInfo,
};
use crate::domain::ports::ProcessRunner;
use crate::utils::error::{FlasherError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const TARGET_PART: &str = "attiny85";
pub const PROGRAMMER_ID: &str = "stk500v1";
pub const BAUD_RATE: u32 = 19200;
pub const LOW_FUSE: &str = "0xe1";
pub const HIGH_FUSE: &str = "0xdd";
pub const EXTENDED_FUSE: &str = "0xfe";

pub const FAILURE_HINTS: [&str; 4] = [
    "    - Wrong serial port selected",
    "    - Arduino not running ArduinoISP sketch",
    "    - Incorrect wiring between Arduino and ATtiny85",
    "    - Insufficient permissions (try running as admin/sudo)",
];

const SEPARATOR_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    #[error("Hex file not found: {}", .0.display())]
    MissingHexFile(PathBuf),

    #[error("Avrdude not found. Please install Arduino IDE.")]
    MissingToolchain,

    #[error("Avrdude configuration file not found: {}", .0.display())]
    MissingToolchainConfig(PathBuf),

    #[error("Please select a valid serial port.")]
    InvalidPort,
}

/// Checks every precondition of a flash and returns all failures found.
pub fn preflight(hex_file: &Path, toolchain: &ToolchainInfo, port: &str) -> Vec<PreflightError> {
    let mut errors = Vec::new();

    if !hex_file.is_file() {
        errors.push(PreflightError::MissingHexFile(hex_file.to_path_buf()));
    }

    match (&toolchain.executable, &toolchain.config) {
        (Some(executable), Some(config)) if executable.is_file() => {
            if !config.is_file() {
                errors.push(PreflightError::MissingToolchainConfig(config.clone()));
            }
        }
        _ => errors.push(PreflightError::MissingToolchain),
    }

    if !is_selectable_port(port) {
        errors.push(PreflightError::InvalidPort);
    }

    errors
}

pub fn validate(hex_file: &Path, toolchain: &ToolchainInfo, port: &str) -> Vec<String> {
    preflight(hex_file, toolchain, port)
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub fn build_command(request: &FlashRequest) -> Result<FlashCommand> {
    let (Some(executable), Some(config)) = (&request.toolchain.executable, &request.toolchain.config)
    else {
        return Err(FlasherError::ValidationError {
            errors: vec![PreflightError::MissingToolchain.to_string()],
        });
    };

    Ok(FlashCommand {
        program: executable.clone(),
        args: vec![
            format!("-C{}", config.display()),
            "-F".to_string(),
            "-v".to_string(),
            format!("-p{}", TARGET_PART),
            format!("-c{}", PROGRAMMER_ID),
            format!("-P{}", request.port),
            format!("-b{}", BAUD_RATE),
            format!("-Uflash:w:{}:i", request.hex_file.display()),
            "-U".to_string(),
            format!("lfuse:w:{}:m", LOW_FUSE),
            "-U".to_string(),
            format!("hfuse:w:{}:m", HIGH_FUSE),
            "-U".to_string(),
            format!("efuse:w:{}:m", EXTENDED_FUSE),
        ],
    })
}

/// Runs avrdude on a blocking worker, one flash at a time.
pub struct Flasher<R: ProcessRunner> {
    runner: Arc<R>,
    busy: Arc<AtomicBool>,
}

impl<R: ProcessRunner> Clone for Flasher<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            busy: Arc::clone(&self.busy),
        }
    }
}

impl<R: ProcessRunner> Flasher<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Validates `request` and starts flashing on a blocking worker.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`FlasherError::FlashInProgress`] while another flash is running and
    /// with [`FlasherError::ValidationError`] if any precondition is unmet;
    /// nothing is spawned in either case.
    pub fn start(&self, request: FlashRequest) -> Result<FlashSession> {
        let guard = BusyGuard::acquire(&self.busy).ok_or(FlasherError::FlashInProgress)?;

        let errors = validate(&request.hex_file, &request.toolchain, &request.port);
        if !errors.is_empty() {
            return Err(FlasherError::ValidationError { errors });
        }
        let command = build_command(&request)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Arc::clone(&self.runner);
        let worker = tokio::task::spawn_blocking(move || {
            run_worker(runner.as_ref(), &request, &command, guard, &tx);
        });

        Ok(FlashSession { events: rx, worker })
    }
}

/// Clears the in-flight flag when dropped, on every exit path.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn run_worker<R: ProcessRunner + ?Sized>(
    runner: &R,
    request: &FlashRequest,
    command: &FlashCommand,
    guard: BusyGuard,
    tx: &mpsc::UnboundedSender<FlashEvent>,
) {
    let emit = |line: String| {
        // The receiver may be gone; the flash still runs to completion.
        let _ = tx.send(FlashEvent::Line(line));
    };
    let separator = "=".repeat(SEPARATOR_WIDTH);

    emit(separator.clone());
    emit("[*] Starting bootloader flash process...".to_string());
    emit("[*] Target: ATtiny85".to_string());
    emit(format!("[*] Port: {}", request.port));
    emit(format!("[*] Hex file: {}", request.hex_file.display()));
    emit(separator.clone());
    emit(format!("[*] Executing: {}", command));
    emit(String::new());

    tracing::info!("Flashing {} via {}", request.hex_file.display(), request.port);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runner.run(command, &mut |line| emit(line))
    }));

    let result = match outcome {
        Ok(Ok(exit_code)) => {
            emit(String::new());
            emit(separator.clone());
            if exit_code == 0 {
                tracing::info!("avrdude finished successfully");
                emit("[+] SUCCESS! Bootloader flashed successfully!".to_string());
            } else {
                tracing::warn!("avrdude exited with code {}", exit_code);
                emit(format!(
                    "[!] ERROR: Flashing failed with error code {}",
                    exit_code
                ));
                emit("[!] Common issues:".to_string());
                for hint in FAILURE_HINTS {
                    emit(hint.to_string());
                }
            }
            emit(separator);
            FlashResult::from_exit_code(exit_code)
        }
        Ok(Err(e)) => {
            tracing::error!("Flash orchestration failed: {}", e);
            emit(format!("[!] Exception occurred: {}", e));
            FlashResult::fault()
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Process runner panicked: {}", message);
            emit(format!("[!] Exception occurred: {}", message));
            FlashResult::fault()
        }
    };

    drop(guard);
    let _ = tx.send(FlashEvent::Done(result));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Handle to a running flash: an ordered stream of [`FlashEvent`]s.
pub struct FlashSession {
    events: mpsc::UnboundedReceiver<FlashEvent>,
    worker: JoinHandle<()>,
}

impl FlashSession {
    /// Next event, or `None` once the terminal `Done` has been consumed.
    pub async fn next_event(&mut self) -> Option<FlashEvent> {
        self.events.recv().await
    }

    /// Feeds every output line to `on_line`, then the result to `on_done`
    /// exactly once.
    pub async fn drain<L, D>(mut self, mut on_line: L, on_done: D) -> FlashResult
    where
        L: FnMut(String),
        D: FnOnce(FlashResult),
    {
        let mut result = None;
        while let Some(event) = self.events.recv().await {
            match event {
                FlashEvent::Line(line) => on_line(line),
                FlashEvent::Done(done) => {
                    result = Some(done);
                    break;
                }
            }
        }

        if let Err(e) = self.worker.await {
            tracing::error!("Flash worker did not finish cleanly: {}", e);
        }

        let result = result.unwrap_or_else(FlashResult::fault);
        on_done(result);
        result
    }

    pub async fn wait(self) -> FlashResult {
        self.drain(|_| {}, |_| {}).await
    }
}
