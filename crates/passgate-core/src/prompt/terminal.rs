//! Terminal password prompt.
//!
//! Reads a secret from the controlling terminal with echo disabled. The
//! terminal configuration captured before the read is restored on every
//! way out of the call: normal return, error, dropped future, and
//! interrupt signal. On an interrupt the process exits after restoring.
//!
//! SIGINT, SIGTERM and SIGHUP are only taken over while a read is in
//! progress. Their previous dispositions are put back when the call ends,
//! so a later Ctrl-C behaves as it did before the prompt.

use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::ptr;
use std::sync::OnceLock;

use secrecy::SecretString;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, warn};

use crate::traits::{PasswordPrompt, PromptError};

/// Exit status used when the operator interrupts secret entry.
const INTERRUPTED_EXIT_CODE: i32 = 1;

/// Signals that abort secret entry.
const INTERRUPT_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

/// The handlers tokio installs for [`INTERRUPT_SIGNALS`], recorded on first
/// registration. tokio registers with the OS only once per signal, so later
/// prompts reinstall these after the previous call reset them.
static LISTENER_ACTIONS: OnceLock<[libc::sigaction; 3]> = OnceLock::new();

/// Snapshot of a terminal's termios configuration.
pub struct TerminalState {
    fd: RawFd,
    termios: libc::termios,
}

impl TerminalState {
    /// Capture the current configuration of the terminal behind `fd`.
    ///
    /// Fails if `fd` is not a terminal.
    pub fn capture(fd: RawFd) -> io::Result<Self> {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr writes a complete termios on success and the
        // value is only read after the return code is checked.
        let termios = unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios.assume_init()
        };
        Ok(Self { fd, termios })
    }

    /// Write the captured configuration back to the terminal.
    pub fn restore(&self) -> io::Result<()> {
        // SAFETY: `self.termios` was filled in by tcgetattr.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Whether input echo was enabled when the snapshot was taken.
    pub fn echo_enabled(&self) -> bool {
        self.termios.c_lflag & libc::ECHO != 0
    }
}

// termios only implements Debug behind a libc feature flag
impl fmt::Debug for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalState")
            .field("fd", &self.fd)
            .field("echo", &self.echo_enabled())
            .finish()
    }
}

fn restore_or_warn(state: &TerminalState) {
    if let Err(e) = state.restore() {
        warn!(error = %e, "Failed to restore terminal");
    }
}

/// Restores a [`TerminalState`] when dropped.
struct RestoreGuard<'a> {
    state: &'a TerminalState,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        restore_or_warn(self.state);
    }
}

fn current_action(signum: libc::c_int) -> io::Result<libc::sigaction> {
    let mut action = MaybeUninit::<libc::sigaction>::uninit();
    // SAFETY: with a null new action sigaction only writes the current one,
    // which is read after the return code is checked.
    unsafe {
        if libc::sigaction(signum, ptr::null(), action.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(action.assume_init())
    }
}

fn set_action(signum: libc::c_int, action: &libc::sigaction) -> io::Result<()> {
    // SAFETY: `action` is a complete sigaction obtained from the kernel.
    if unsafe { libc::sigaction(signum, action, ptr::null_mut()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn current_actions() -> io::Result<[libc::sigaction; 3]> {
    Ok([
        current_action(INTERRUPT_SIGNALS[0])?,
        current_action(INTERRUPT_SIGNALS[1])?,
        current_action(INTERRUPT_SIGNALS[2])?,
    ])
}

/// Puts the interrupt signal dispositions from before the call back on drop.
struct SignalScope {
    previous: [libc::sigaction; 3],
}

impl Drop for SignalScope {
    fn drop(&mut self) {
        for (signum, action) in INTERRUPT_SIGNALS.iter().zip(&self.previous) {
            if let Err(e) = set_action(*signum, action) {
                warn!(signal = signum, error = %e, "Failed to reset signal disposition");
            }
        }
    }
}

/// Listener for the signals that abort secret entry.
///
/// Only one prompt should hold this at a time; dispositions are process
/// wide.
struct InterruptSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    // dropped last, after the listeners
    _scope: SignalScope,
}

impl InterruptSignals {
    fn register() -> io::Result<Self> {
        let scope = SignalScope {
            previous: current_actions()?,
        };

        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        let hangup = signal(SignalKind::hangup())?;

        let listener = match LISTENER_ACTIONS.get() {
            Some(actions) => *actions,
            None => {
                let actions = current_actions()?;
                *LISTENER_ACTIONS.get_or_init(|| actions)
            }
        };
        for (signum, action) in INTERRUPT_SIGNALS.iter().zip(&listener) {
            set_action(*signum, action)?;
        }

        Ok(Self {
            interrupt,
            terminate,
            hangup,
            _scope: scope,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
        }
    }
}

/// How a secret read ended.
enum Entry<T> {
    Completed(T),
    Interrupted,
}

/// Race a read against an interrupt. The interrupt wins ties.
async fn wait_for_entry<F, I>(read: F, interrupted: I) -> Entry<F::Output>
where
    F: Future,
    I: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = interrupted => Entry::Interrupted,
        out = read => Entry::Completed(out),
    }
}

/// Terminal-based secret prompt.
///
/// The terminal checked and restored is the one behind standard input;
/// the secret itself is read with `rpassword`.
#[derive(Debug)]
pub struct TerminalPasswordPrompt {
    fd: RawFd,
    read: fn() -> io::Result<String>,
}

impl TerminalPasswordPrompt {
    /// Create a prompt on standard input.
    pub fn new() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
            read: rpassword::read_password,
        }
    }

    /// Prompt for a password with echo disabled.
    ///
    /// The signal listener and the interrupt signal dispositions only last
    /// for the duration of this call.
    pub async fn prompt_pass(&self, text: &str) -> Result<SecretString, PromptError> {
        let state = TerminalState::capture(self.fd).map_err(PromptError::Terminal)?;
        let _restore = RestoreGuard { state: &state };

        let mut signals = InterruptSignals::register()?;

        print!("{}: ", text);
        io::stdout().flush()?;

        let read = tokio::task::spawn_blocking(self.read);
        let entry = wait_for_entry(read, signals.recv()).await;
        println!();

        match entry {
            Entry::Interrupted => {
                restore_or_warn(&state);
                debug!("Secret entry interrupted, exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            Entry::Completed(joined) => {
                let password = joined.map_err(|e| PromptError::Task(e.to_string()))??;
                Ok(SecretString::from(password))
            }
        }
    }
}

impl Default for TerminalPasswordPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordPrompt for TerminalPasswordPrompt {
    fn prompt<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SecretString, PromptError>> + Send + 'a>> {
        Box::pin(self.prompt_pass(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    /// Carries the pty slave to the child process in the interrupt test.
    const CHILD_PTY_ENV: &str = "PASSGATE_TEST_PTY_FD";

    /// Open a pseudo terminal, returning (master, slave).
    fn open_pty() -> (OwnedFd, OwnedFd) {
        let mut master: libc::c_int = -1;
        let mut slave: libc::c_int = -1;
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        assert_eq!(rc, 0, "openpty failed: {}", io::Error::last_os_error());
        unsafe { (OwnedFd::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) }
    }

    fn disable_echo(fd: RawFd) {
        let mut termios = TerminalState::capture(fd).unwrap().termios;
        termios.c_lflag &= !libc::ECHO;
        let rc = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
        assert_eq!(rc, 0);
    }

    fn echo_now(fd: RawFd) -> bool {
        TerminalState::capture(fd).unwrap().echo_enabled()
    }

    fn handlers() -> Vec<libc::sighandler_t> {
        INTERRUPT_SIGNALS
            .iter()
            .map(|s| current_action(*s).unwrap().sa_sigaction)
            .collect()
    }

    /// Stands in for the terminal read and reports who handles SIGINT.
    fn report_sigint_handler() -> io::Result<String> {
        let handler = current_action(libc::SIGINT)?.sa_sigaction;
        let owner = if handler == libc::SIG_DFL || handler == libc::SIG_IGN {
            "untouched"
        } else {
            "listening"
        };
        Ok(owner.to_string())
    }

    /// Turns echo off like a password read would, then never returns.
    fn read_until_interrupted() -> io::Result<String> {
        let fd: RawFd = std::env::var(CHILD_PTY_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no pty"))?;
        disable_echo(fd);
        loop {
            std::thread::park();
        }
    }

    #[test]
    fn capture_fails_on_non_terminal() {
        let file = tempfile::tempfile().unwrap();
        let result = TerminalState::capture(file.as_raw_fd());
        assert!(result.is_err());
    }

    #[test]
    fn restore_brings_echo_back() {
        let (_master, slave) = open_pty();
        let fd = slave.as_raw_fd();

        let state = TerminalState::capture(fd).unwrap();
        assert!(state.echo_enabled());

        disable_echo(fd);
        assert!(!echo_now(fd));

        state.restore().unwrap();
        assert!(echo_now(fd));
    }

    #[test]
    fn guard_restores_on_drop() {
        let (_master, slave) = open_pty();
        let fd = slave.as_raw_fd();

        let state = TerminalState::capture(fd).unwrap();
        {
            let _guard = RestoreGuard { state: &state };
            disable_echo(fd);
            assert!(!echo_now(fd));
        }
        assert!(echo_now(fd));
    }

    #[test]
    fn debug_does_not_dump_termios() {
        let (_master, slave) = open_pty();
        let state = TerminalState::capture(slave.as_raw_fd()).unwrap();
        let debug = format!("{:?}", state);
        assert!(debug.contains("echo: true"));
    }

    #[tokio::test]
    async fn interrupt_wins_over_pending_read() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        let entry = wait_for_entry(std::future::pending::<()>(), async move {
            let _ = rx.await;
        })
        .await;
        assert!(matches!(entry, Entry::Interrupted));
    }

    #[tokio::test]
    async fn completed_read_is_returned() {
        let entry = wait_for_entry(async { 42 }, std::future::pending()).await;
        match entry {
            Entry::Completed(value) => assert_eq!(value, 42),
            Entry::Interrupted => panic!("Expected completed read"),
        }
    }

    #[tokio::test]
    async fn prompt_fails_fast_without_terminal() {
        let file = tempfile::tempfile().unwrap();
        let prompt = TerminalPasswordPrompt {
            fd: file.as_raw_fd(),
            read: report_sigint_handler,
        };

        let result = prompt.prompt("Password").await;
        assert!(matches!(result, Err(PromptError::Terminal(_))));
    }

    #[tokio::test]
    async fn signals_are_only_taken_over_during_entry() {
        let (_master, slave) = open_pty();
        let prompt = TerminalPasswordPrompt {
            fd: slave.as_raw_fd(),
            read: report_sigint_handler,
        };
        let before = handlers();

        // Twice, so the second call has to reinstall the listener
        for _ in 0..2 {
            let seen = prompt.prompt_pass("Password").await.unwrap();
            assert_eq!(seen.expose_secret(), "listening");
            assert_eq!(handlers(), before);
        }
    }

    #[test]
    #[ignore = "child process of interrupt_restores_terminal_and_exits"]
    fn interrupted_entry_child() {
        let Some(fd) = std::env::var(CHILD_PTY_ENV)
            .ok()
            .and_then(|v| v.parse::<RawFd>().ok())
        else {
            return;
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let prompt = TerminalPasswordPrompt {
            fd,
            read: read_until_interrupted,
        };
        let result = runtime.block_on(prompt.prompt_pass("Password"));
        panic!("entry returned instead of exiting: {:?}", result.err());
    }

    #[test]
    fn interrupt_restores_terminal_and_exits() {
        let (_master, slave) = open_pty();
        let fd = slave.as_raw_fd();
        assert!(echo_now(fd));
        // the child reaches the terminal through the inherited descriptor
        assert_eq!(unsafe { libc::fcntl(fd, libc::F_SETFD, 0) }, 0);

        let mut child = Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "prompt::terminal::tests::interrupted_entry_child",
                "--ignored",
                "--nocapture",
            ])
            .env(CHILD_PTY_ENV, fd.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        // Wait until the child's read has turned echo off
        let deadline = Instant::now() + Duration::from_secs(10);
        while echo_now(fd) {
            if Instant::now() > deadline {
                let _ = child.kill();
                let _ = child.wait();
                panic!("child never disabled echo");
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
        assert_eq!(rc, 0);

        let status = child.wait().unwrap();
        assert_eq!(status.code(), Some(INTERRUPTED_EXIT_CODE));
        assert!(echo_now(fd));
    }
}
