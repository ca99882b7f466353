use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::Mutex;

use log::{info, warn};

use crate::common::CameraId;
use crate::config::StreamerSettings;



// The override goes after the default; the streamer decides which one wins.
pub fn command_args(settings: &StreamerSettings, rtsp_url: &str, output: &Path, max_playback_minutes: Option<u32>) -> Vec<OsString> {
	let mut args: Vec<OsString> = vec![
		rtsp_url.into(),
		output.into(),
		"--encode-hls-time".into(),
		settings.encode_hls_time.to_string().into(),
		"--copy-hls-time".into(),
		settings.copy_hls_time.to_string().into(),
		"--encode-max-keep-minutes".into(),
		settings.encode_keep_minutes.to_string().into(),
		"--copy-max-keep-minutes".into(),
		settings.copy_keep_minutes.to_string().into(),
	];

	if let Some(minutes) = max_playback_minutes {
		args.push("--encode-max-keep-minutes".into());
		args.push(minutes.to_string().into());
	}
	args
}

/// Starts one streamer per camera and tracks the running ones by camera id.
/// Each child gets a task that reaps it on exit; nothing is signalled or restarted.
pub struct Launcher {
	settings: StreamerSettings,
	running: Arc<Mutex<HashMap<CameraId, Option<u32>>>>,
}

impl Launcher {
	pub fn new(settings: StreamerSettings) -> Launcher {
		Launcher {
			settings,
			running: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	pub async fn launch(&self, camera_id: &str, rtsp_url: &str, output: &Path, max_playback_minutes: Option<u32>) -> Option<u32> {
		let binary = &self.settings.binary;
		if !binary.exists() {
			warn!("Streamer binary {} not found; camera {} registered without a stream", binary.display(), camera_id);
			return None;
		}

		let mut command = Command::new(binary);
		command
			.args(command_args(&self.settings, rtsp_url, output, max_playback_minutes))
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null());
		if let Some(workdir) = &self.settings.workdir {
			command.current_dir(workdir);
		}

		let mut child = match command.spawn() {
			Ok(child) => child,
			Err(err) => {
				warn!("Failed to start streamer for camera {}; error was {}", camera_id, err);
				return None;
			}
		};

		let pid = child.id();
		info!("Started streamer for camera {} with pid {:?}", camera_id, pid);
		self.running.lock().await.insert(camera_id.to_string(), pid);

		let table = self.running.clone();
		let camera_id = camera_id.to_string();
		tokio::spawn(async move {
			match child.wait().await {
				Ok(status) => warn!("Streamer for camera {} (pid {:?}) exited with {}", camera_id, pid, status),
				Err(err) => warn!("Failed to wait on streamer for camera {}; error was {}", camera_id, err),
			}
			table.lock().await.remove(&camera_id);
		});
		pid
	}

	pub async fn release(&self, camera_id: &str) -> Option<u32> {
		self.running.lock().await.remove(camera_id).flatten()
	}

	#[cfg(test)]
	pub async fn is_tracked(&self, camera_id: &str) -> bool {
		self.running.lock().await.contains_key(camera_id)
	}
}



#[cfg(test)]
pub(crate) mod tests {
	use crate::config::Settings;

	use super::*;

	fn settings(binary: &str) -> StreamerSettings {
		Settings::for_root(Path::new("."), binary).streamer
	}

	fn strings(args: Vec<OsString>) -> Vec<String> {
		args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
	}

	#[test]
	fn defaults_follow_positional_arguments() {
		let args = command_args(&settings("streamer"), "rtsp://cam/1", Path::new("/s/c/index.m3u8"), None);
		assert_eq!(strings(args), vec![
			"rtsp://cam/1", "/s/c/index.m3u8",
			"--encode-hls-time", "4",
			"--copy-hls-time", "0",
			"--encode-max-keep-minutes", "1",
			"--copy-max-keep-minutes", "0",
		]);
	}

	#[test]
	fn retention_override_is_appended_after_defaults() {
		let args = strings(command_args(&settings("streamer"), "rtsp://cam/1", Path::new("out.m3u8"), Some(90)));
		assert_eq!(args.len(), 12);
		assert_eq!(&args[10..], ["--encode-max-keep-minutes", "90"]);
	}

	#[rocket::async_test]
	async fn missing_binary_launches_nothing() {
		let launcher = Launcher::new(settings("/nonexistent/streamer"));
		let pid = launcher.launch("cam", "rtsp://cam/1", Path::new("out.m3u8"), None).await;
		assert_eq!(pid, None);
		assert!(!launcher.is_tracked("cam").await);
	}

	// sh runs its first argument as a script path, so "rtsp://cam/1" resolves to
	// "<workdir>/rtsp:/cam/1" and the child lives as long as that script does.
	#[cfg(unix)]
	pub(crate) fn sleeping_streamer(workdir: &Path, seconds: u32) -> StreamerSettings {
		let script_dir = workdir.join("rtsp:").join("cam");
		std::fs::create_dir_all(&script_dir).unwrap();
		std::fs::write(script_dir.join("1"), format!("sleep {}\n", seconds)).unwrap();

		let mut streamer = settings("/bin/sh");
		streamer.workdir = Some(workdir.to_path_buf());
		streamer
	}

	async fn wait_until_untracked(launcher: &Launcher, camera_id: &str) {
		for _ in 0..100 {
			if !launcher.is_tracked(camera_id).await {
				return;
			}
			tokio::time::sleep(std::time::Duration::from_millis(100)).await;
		}
		panic!("streamer for {} was never reaped", camera_id);
	}

	#[cfg(unix)]
	#[rocket::async_test]
	async fn running_streamer_is_tracked_until_it_exits() {
		let workdir = tempfile::tempdir().unwrap();
		let launcher = Launcher::new(sleeping_streamer(workdir.path(), 1));

		let pid = launcher.launch("cam", "rtsp://cam/1", Path::new("out.m3u8"), None).await;
		assert!(pid.is_some());
		assert!(launcher.is_tracked("cam").await);

		wait_until_untracked(&launcher, "cam").await;
	}

	#[cfg(target_os = "linux")]
	#[rocket::async_test]
	async fn exited_streamer_is_reaped() {
		let launcher = Launcher::new(settings("/bin/sh"));
		let pid = launcher.launch("cam", "rtsp://cam/1", Path::new("out.m3u8"), None).await
			.expect("sh should start");

		wait_until_untracked(&launcher, "cam").await;

		// Once reaped the pid is gone from /proc, or belongs to some other live process.
		if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
			assert!(!status.lines().any(|line| line.starts_with("State:") && line.contains("zombie")), "{}", status);
		}
	}

	#[cfg(unix)]
	#[rocket::async_test]
	async fn release_forgets_the_streamer() {
		let workdir = tempfile::tempdir().unwrap();
		let launcher = Launcher::new(sleeping_streamer(workdir.path(), 1));

		let pid = launcher.launch("cam", "rtsp://cam/1", Path::new("out.m3u8"), None).await;
		assert_eq!(launcher.release("cam").await, pid);
		assert!(!launcher.is_tracked("cam").await);
		assert_eq!(launcher.release("cam").await, None);
	}
}
