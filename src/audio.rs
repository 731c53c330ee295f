use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr, eyre};

use crate::logging;
use crate::settings::Settings;

/// Notifications an audio resource sends back to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// The clip at `source` played to its end.
    Ended { source: String },
    /// The clip at `source` could not be played.
    Failed { source: String, reason: String },
}

impl AudioEvent {
    pub fn source(&self) -> &str {
        match self {
            AudioEvent::Ended { source } | AudioEvent::Failed { source, .. } => source,
        }
    }
}

/// A single playable handle that can be re-pointed at new clips.
pub trait AudioResource {
    fn source(&self) -> &str;
    /// Point the resource at a new clip. Playback stops until `play` is called.
    fn set_source(&mut self, url: &str) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    /// Move the play head by `seconds`; out-of-range targets are clamped by the resource.
    fn seek_by(&mut self, seconds: f64) -> Result<()>;
    fn current_time(&self) -> f64;
    /// `None` while the clip length is unknown.
    fn duration(&self) -> Option<f64>;
    fn release(&mut self);
}

/// Creates audio resources. `events` is where the resource reports completion.
pub trait AudioBackend {
    fn create(&mut self, url: &str, events: Sender<AudioEvent>) -> Result<Box<dyn AudioResource>>;
}

/// Plays clips through an external command line player (mpv by default).
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: String,
    args: Vec<String>,
    start_arg: Option<String>,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>, start_arg: Option<String>) -> Self {
        Self {
            command: command.into(),
            args,
            start_arg,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.player_command.clone(),
            settings.player_args.clone(),
            settings.player_start_arg.clone(),
        )
    }

    /// Argument list for playing `url` from `start` seconds.
    pub fn build_args(&self, url: &str, start: f64) -> Vec<String> {
        let mut args = self.args.clone();
        if start > 0.0 {
            if let Some(template) = &self.start_arg {
                args.extend(
                    template
                        .replace("{}", &format!("{start:.1}"))
                        .split_whitespace()
                        .map(str::to_string),
                );
            }
        }
        args.push(url.to_string());
        args
    }
}

impl AudioBackend for ProcessBackend {
    fn create(&mut self, url: &str, events: Sender<AudioEvent>) -> Result<Box<dyn AudioResource>> {
        if self.command.trim().is_empty() {
            return Err(eyre!("No audio player command configured"));
        }
        Ok(Box::new(ProcessPlayer {
            backend: self.clone(),
            source: url.to_string(),
            events,
            child: None,
            offset: 0.0,
            started_at: None,
        }))
    }
}

struct RunningChild {
    child: Arc<Mutex<Child>>,
    pid: u32,
    cancelled: Arc<AtomicBool>,
    /// Set by the waiter once the process is gone.
    exited: Arc<AtomicBool>,
    suspended: bool,
}

const WAIT_POLL: Duration = Duration::from_millis(100);

pub struct ProcessPlayer {
    backend: ProcessBackend,
    source: String,
    events: Sender<AudioEvent>,
    child: Option<RunningChild>,
    /// Clip position at which the current child started (or was paused).
    offset: f64,
    started_at: Option<Instant>,
}

impl ProcessPlayer {
    fn position(&self) -> f64 {
        match self.started_at {
            Some(started) => self.offset + started.elapsed().as_secs_f64(),
            None => self.offset,
        }
    }

    fn spawn(&mut self) -> Result<()> {
        let args = self.backend.build_args(&self.source, self.offset);
        let mut cmd = Command::new(&self.backend.command);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Own process group so the whole player tree can be signalled.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let child = cmd
            .spawn()
            .wrap_err_with(|| format!("Failed to start audio player `{}`", self.backend.command))?;
        let pid = child.id();
        let child = Arc::new(Mutex::new(child));
        let cancelled = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(AtomicBool::new(false));

        let waiter_child = Arc::clone(&child);
        let waiter_cancelled = Arc::clone(&cancelled);
        let waiter_exited = Arc::clone(&exited);
        let events = self.events.clone();
        let source = self.source.clone();
        thread::spawn(move || {
            loop {
                if waiter_cancelled.load(Ordering::SeqCst) {
                    return;
                }
                let status = match waiter_child.lock() {
                    Ok(mut child) => child.try_wait(),
                    Err(_) => return,
                };
                match status {
                    Ok(Some(status)) => {
                        waiter_exited.store(true, Ordering::SeqCst);
                        if waiter_cancelled.load(Ordering::SeqCst) {
                            return;
                        }
                        let event = if status.success() {
                            AudioEvent::Ended { source }
                        } else {
                            AudioEvent::Failed {
                                source,
                                reason: format!("player exited with {status}"),
                            }
                        };
                        let _ = events.send(event);
                        return;
                    }
                    Ok(None) => thread::sleep(WAIT_POLL),
                    Err(err) => {
                        waiter_exited.store(true, Ordering::SeqCst);
                        let _ = events.send(AudioEvent::Failed {
                            source,
                            reason: err.to_string(),
                        });
                        return;
                    }
                }
            }
        });

        logging::debug(format!("audio player pid {pid} started for {}", self.source));
        self.child = Some(RunningChild {
            child,
            pid,
            cancelled,
            exited,
            suspended: false,
        });
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop_child(&mut self) {
        let Some(running) = self.child.take() else {
            return;
        };
        running.cancelled.store(true, Ordering::SeqCst);
        #[cfg(unix)]
        {
            if !running.exited.load(Ordering::SeqCst) {
                unsafe {
                    if running.suspended {
                        libc::kill(-(running.pid as i32), libc::SIGCONT);
                    }
                    libc::kill(-(running.pid as i32), libc::SIGKILL);
                }
            }
        }
        if let Ok(mut child) = running.child.lock() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn child_exited(&self) -> bool {
        self.child
            .as_ref()
            .is_some_and(|running| running.exited.load(Ordering::SeqCst))
    }

    fn set_suspended(&mut self, suspended: bool) -> bool {
        #[cfg(unix)]
        {
            if let Some(running) = self.child.as_mut() {
                let signal = if suspended { libc::SIGSTOP } else { libc::SIGCONT };
                unsafe {
                    libc::kill(-(running.pid as i32), signal);
                }
                running.suspended = suspended;
                return true;
            }
        }
        let _ = suspended;
        false
    }
}

impl AudioResource for ProcessPlayer {
    fn source(&self) -> &str {
        &self.source
    }

    fn set_source(&mut self, url: &str) -> Result<()> {
        self.stop_child();
        self.source = url.to_string();
        self.offset = 0.0;
        self.started_at = None;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.child_exited() {
            // Finished or failed on its own: start the clip over.
            self.stop_child();
            self.offset = 0.0;
            self.started_at = None;
        }
        if self.started_at.is_some() {
            return Ok(());
        }
        let resumable = self.child.as_ref().is_some_and(|c| c.suspended);
        if resumable && self.set_suspended(false) {
            self.started_at = Some(Instant::now());
            return Ok(());
        }
        self.stop_child();
        self.spawn()
    }

    fn pause(&mut self) -> Result<()> {
        if self.started_at.is_none() {
            return Ok(());
        }
        if self.child_exited() {
            self.stop_child();
            self.offset = 0.0;
            self.started_at = None;
            return Ok(());
        }
        self.offset = self.position();
        self.started_at = None;
        if !self.set_suspended(true) {
            // No job control: stop now and restart from `offset` on play.
            self.stop_child();
        }
        Ok(())
    }

    fn seek_by(&mut self, seconds: f64) -> Result<()> {
        let target = (self.position() + seconds).max(0.0);
        let was_playing = self.started_at.is_some();
        self.stop_child();
        self.offset = target;
        self.started_at = None;
        if was_playing {
            self.spawn()?;
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position()
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn release(&mut self) {
        self.stop_child();
        self.started_at = None;
        self.offset = 0.0;
    }
}

impl Drop for ProcessPlayer {
    fn drop(&mut self) {
        self.stop_child();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn backend() -> ProcessBackend {
        ProcessBackend::new(
            "mpv",
            vec!["--no-video".to_string(), "--really-quiet".to_string()],
            Some("--start={}".to_string()),
        )
    }

    #[test]
    fn test_build_args_from_start() {
        let args = backend().build_args("https://a/001001.mp3", 0.0);
        assert_eq!(
            args,
            vec!["--no-video", "--really-quiet", "https://a/001001.mp3"]
        );
    }

    #[test]
    fn test_build_args_with_offset() {
        let args = backend().build_args("u.mp3", 12.5);
        assert_eq!(args, vec!["--no-video", "--really-quiet", "--start=12.5", "u.mp3"]);
    }

    #[test]
    fn test_build_args_split_start_template() {
        let backend = ProcessBackend::new("ffplay", vec!["-nodisp".into()], Some("-ss {}".into()));
        let args = backend.build_args("u.mp3", 3.0);
        assert_eq!(args, vec!["-nodisp", "-ss", "3.0", "u.mp3"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let mut backend = ProcessBackend::new("  ", Vec::new(), None);
        let (tx, _rx) = mpsc::channel();
        assert!(backend.create("u.mp3", tx).is_err());
    }

    #[test]
    fn test_missing_player_reports_error_on_play() {
        let mut backend = ProcessBackend::new("tilawa-no-such-player", Vec::new(), None);
        let (tx, _rx) = mpsc::channel();
        let mut resource = backend.create("u.mp3", tx).unwrap();
        assert!(resource.play().is_err());
        assert_eq!(resource.current_time(), 0.0);
        assert_eq!(resource.duration(), None);
    }

    /// Player stand-in: `sh -c <script> <url>`, so `$0` is the clip.
    #[cfg(unix)]
    fn shell_backend(script: &str) -> ProcessBackend {
        ProcessBackend::new("sh", vec!["-c".to_string(), script.to_string()], None)
    }

    #[cfg(unix)]
    #[test]
    fn test_player_exit_reports_ended_for_its_source() {
        let mut backend = shell_backend("exit 0");
        let (tx, rx) = mpsc::channel();
        let mut resource = backend.create("https://a/001001.mp3", tx).unwrap();
        resource.play().unwrap();

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            AudioEvent::Ended {
                source: "https://a/001001.mp3".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_play_after_failed_exit_spawns_again() {
        let dir = tempfile::tempdir().unwrap();
        let spawns = dir.path().join("spawns.txt");
        let script = format!("echo \"$0\" >> '{}'; exit 1", spawns.display());
        let mut backend = shell_backend(&script);
        let (tx, rx) = mpsc::channel();
        let mut resource = backend.create("u.mp3", tx).unwrap();

        resource.play().unwrap();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, AudioEvent::Failed { .. }));

        resource.play().unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            AudioEvent::Failed { .. }
        ));
        let lines = std::fs::read_to_string(&spawns).unwrap();
        assert_eq!(lines.lines().collect::<Vec<_>>(), vec!["u.mp3", "u.mp3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_pause_and_resume_keep_one_process() {
        let mut backend = shell_backend("sleep 5");
        let (tx, rx) = mpsc::channel();
        let mut resource = backend.create("u.mp3", tx).unwrap();
        resource.play().unwrap();
        resource.pause().unwrap();
        let paused_at = resource.current_time();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(resource.current_time(), paused_at);

        resource.play().unwrap();
        resource.release();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_seek_while_stopped_moves_offset_and_clamps() {
        let mut backend = backend();
        let (tx, _rx) = mpsc::channel();
        let mut resource = backend.create("u.mp3", tx).unwrap();
        resource.seek_by(10.0).unwrap();
        assert_eq!(resource.current_time(), 10.0);
        resource.seek_by(-30.0).unwrap();
        assert_eq!(resource.current_time(), 0.0);
        resource.set_source("v.mp3").unwrap();
        assert_eq!(resource.source(), "v.mp3");
    }
}
