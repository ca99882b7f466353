use std::io;
use std::path::{Path, PathBuf};

use crate::common::Quality;



pub const STREAMS_MOUNT: &str = "/streams";

/// Output locations for one camera, all under `<streams root>/<camera id>/`.
#[derive(Clone)]
#[derive(Debug)]
#[derive(PartialEq)]
pub struct StreamPaths {
	pub stream_dir: PathBuf,
	pub copy_playlist: PathBuf,
	pub low_playlist: PathBuf,
	pub mid_playlist: PathBuf,
	pub high_playlist: PathBuf,
}

impl StreamPaths {
	pub fn resolve(streams_root: &Path, camera_id: &str) -> StreamPaths {
		let stream_dir = streams_root.join(camera_id);
		StreamPaths {
			copy_playlist: stream_dir.join(playlist_file_name(Quality::Copy)),
			low_playlist: stream_dir.join(playlist_file_name(Quality::Low)),
			mid_playlist: stream_dir.join(playlist_file_name(Quality::Mid)),
			high_playlist: stream_dir.join(playlist_file_name(Quality::High)),
			stream_dir,
		}
	}

	pub async fn prepare(streams_root: &Path, camera_id: &str) -> io::Result<StreamPaths> {
		let paths = StreamPaths::resolve(streams_root, camera_id);
		tokio::fs::create_dir_all(&paths.stream_dir).await?;
		Ok(paths)
	}

	pub fn playlist(&self, quality: Quality) -> &Path {
		match quality {
			Quality::Copy => &self.copy_playlist,
			Quality::Low => &self.low_playlist,
			Quality::Mid => &self.mid_playlist,
			Quality::High => &self.high_playlist,
		}
	}
}

pub fn playlist_file_name(quality: Quality) -> &'static str {
	match quality {
		Quality::Copy => "index.m3u8",
		Quality::Low => "index_low.m3u8",
		Quality::Mid => "index_mid.m3u8",
		Quality::High => "index_high.m3u8",
	}
}

pub fn playlist_url(camera_id: &str, quality: Quality) -> String {
	format!("{}/{}/{}", STREAMS_MOUNT, camera_id, playlist_file_name(quality))
}
