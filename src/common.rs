use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::paths::StreamPaths;



pub type CameraId = String;
pub type CameraList = Vec<Camera>;

/// A registered camera, as persisted in the store file and returned by the API.
///
/// The path fields are derived from `id` at creation time and kept for
/// compatibility; playlist lookups recompute them from the configured root.
#[derive(Clone)]
#[derive(Debug)]
#[derive(PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Camera {
	pub id: CameraId,
	pub name: String,
	pub rtsp_url: String,
	#[serde(default)]
	pub max_playback_minutes: Option<u32>,
	pub created_at: DateTime<Utc>,
	pub stream_dir: String,
	pub copy_playlist: String,
	pub low_playlist: String,
	pub mid_playlist: String,
	pub high_playlist: String,
	#[serde(default)]
	pub process_pid: Option<u32>,
}

impl Camera {
	pub fn new(id: CameraId, request: NewCamera, paths: &StreamPaths, process_pid: Option<u32>) -> Camera {
		Camera {
			id,
			name: request.name,
			rtsp_url: request.rtsp_url,
			max_playback_minutes: request.max_playback_minutes,
			created_at: Utc::now(),
			stream_dir: paths.stream_dir.to_string_lossy().into_owned(),
			copy_playlist: paths.copy_playlist.to_string_lossy().into_owned(),
			low_playlist: paths.low_playlist.to_string_lossy().into_owned(),
			mid_playlist: paths.mid_playlist.to_string_lossy().into_owned(),
			high_playlist: paths.high_playlist.to_string_lossy().into_owned(),
			process_pid,
		}
	}
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct NewCamera {
	pub name: String,
	pub rtsp_url: String,
	#[serde(default)]
	pub max_playback_minutes: Option<u32>,
}

impl NewCamera {
	pub fn validate(&self) -> Result<(), String> {
		if self.name.is_empty() {
			return Err("name must not be empty".to_string());
		}
		if self.rtsp_url.is_empty() {
			return Err("rtsp_url must not be empty".to_string());
		}
		if self.max_playback_minutes == Some(0) {
			return Err("max_playback_minutes must be at least 1".to_string());
		}
		Ok(())
	}
}

pub fn generate_camera_id() -> CameraId {
	let bits: u128 = rand::thread_rng().gen();
	format!("{:032x}", bits)
}



#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(PartialEq, Eq)]
pub enum Quality {
	Copy,
	Low,
	Mid,
	High,
}

impl Quality {
	pub const ALL: [Quality; 4] = [Quality::Copy, Quality::Low, Quality::Mid, Quality::High];

	pub fn as_str(&self) -> &'static str {
		match self {
			Quality::Copy => "copy",
			Quality::Low => "low",
			Quality::Mid => "mid",
			Quality::High => "high",
		}
	}

	/// Parses an optional query value, treating a missing or empty value as `default`.
	pub fn from_query(value: Option<&str>, default: Quality) -> Result<Quality, String> {
		match value {
			None => Ok(default),
			Some(v) if v.is_empty() => Ok(default),
			Some(v) => v.parse(),
		}
	}
}

impl FromStr for Quality {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.to_ascii_lowercase();
		Quality::ALL.iter()
			.find(|q| q.as_str() == lowered)
			.copied()
			.ok_or_else(|| format!("Unsupported quality '{}'", s))
	}
}

impl fmt::Display for Quality {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quality_parses_case_insensitively() {
		assert_eq!("HIGH".parse::<Quality>(), Ok(Quality::High));
		assert_eq!("Copy".parse::<Quality>(), Ok(Quality::Copy));
		assert!("bogus".parse::<Quality>().is_err());
	}

	#[test]
	fn empty_quality_falls_back_to_default() {
		assert_eq!(Quality::from_query(None, Quality::Copy), Ok(Quality::Copy));
		assert_eq!(Quality::from_query(Some(""), Quality::High), Ok(Quality::High));
		assert_eq!(Quality::from_query(Some("mid"), Quality::High), Ok(Quality::Mid));
		assert!(Quality::from_query(Some("4k"), Quality::High).is_err());
	}

	#[test]
	fn validation_rejects_empty_fields_and_zero_minutes() {
		let valid = NewCamera {
			name: "Front door".to_string(),
			rtsp_url: "rtsp://10.0.0.5/stream".to_string(),
			max_playback_minutes: Some(30),
		};
		assert!(valid.validate().is_ok());

		let no_name = NewCamera { name: String::new(), ..valid.clone() };
		assert!(no_name.validate().is_err());

		let no_url = NewCamera { rtsp_url: String::new(), ..valid.clone() };
		assert!(no_url.validate().is_err());

		let zero = NewCamera { max_playback_minutes: Some(0), ..valid };
		assert!(zero.validate().is_err());
	}

	#[test]
	fn generated_ids_are_hex_and_distinct() {
		let a = generate_camera_id();
		let b = generate_camera_id();
		assert_eq!(a.len(), 32);
		assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
		assert_ne!(a, b);
	}
}
