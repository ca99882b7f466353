use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};



#[derive(Clone)]
#[derive(Debug)]
pub struct StreamerSettings {
	pub binary: PathBuf,
	pub workdir: Option<PathBuf>,
	pub copy_hls_time: u32,
	pub encode_hls_time: u32,
	pub copy_keep_minutes: u32,
	pub encode_keep_minutes: u32,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct Settings {
	pub data_dir: PathBuf,
	pub streams_dir: PathBuf,
	pub streamer: StreamerSettings,
}

impl Settings {
	pub fn store_path(&self) -> PathBuf {
		self.data_dir.join("cameras.json")
	}

	/// Settings rooted in a scratch directory, as used by the HTTP tests.
	#[cfg(test)]
	pub fn for_root(root: &std::path::Path, binary: &str) -> Settings {
		Settings {
			data_dir: root.join("data"),
			streams_dir: root.join("streams"),
			streamer: StreamerSettings {
				binary: PathBuf::from(binary),
				workdir: None,
				copy_hls_time: 0,
				encode_hls_time: 4,
				copy_keep_minutes: 0,
				encode_keep_minutes: 1,
			},
		}
	}

	pub fn from_matches(matches: &ArgMatches) -> Settings {
		let path = |name: &str| matches.get_one::<PathBuf>(name).cloned().unwrap_or_default();
		let number = |name: &str| matches.get_one::<u32>(name).copied().unwrap_or_default();

		Settings {
			data_dir: path("data-dir"),
			streams_dir: path("streams-dir"),
			streamer: StreamerSettings {
				binary: path("streamer-bin"),
				workdir: matches.get_one::<PathBuf>("streamer-workdir").cloned(),
				copy_hls_time: number("copy-hls-time"),
				encode_hls_time: number("encode-hls-time"),
				copy_keep_minutes: number("copy-keep-min"),
				encode_keep_minutes: number("encode-keep-min"),
			},
		}
	}
}

fn path_arg(name: &'static str, env: &'static str, help: &'static str) -> Arg {
	Arg::new(name)
		.long(name)
		.env(env)
		.value_parser(value_parser!(PathBuf))
		.help(help)
}

fn number_arg(name: &'static str, env: &'static str, default: &'static str, help: &'static str) -> Arg {
	Arg::new(name)
		.long(name)
		.env(env)
		.value_parser(value_parser!(u32))
		.default_value(default)
		.help(help)
}

pub fn command() -> Command {
	Command::new("camera-hls-gateway")
		.version("0.1.0")
		.about("Camera registry and HLS playlist gateway.")
		.arg(path_arg("streamer-bin", "STREAMER_BIN", "Path to the streamer binary").default_value("build/streamer"))
		.arg(path_arg("streamer-workdir", "STREAMER_WORKDIR", "Working directory for launched streamers"))
		.arg(path_arg("data-dir", "DATA_DIR", "Directory holding cameras.json").default_value("data"))
		.arg(path_arg("streams-dir", "STREAMS_DIR", "Root directory of HLS output, served under /streams").default_value("streams"))
		.arg(number_arg("copy-hls-time", "COPY_HLS_TIME", "0", "Segment duration in seconds for the copy rendition"))
		.arg(number_arg("encode-hls-time", "ENCODE_HLS_TIME", "4", "Segment duration in seconds for encoded renditions"))
		.arg(number_arg("copy-keep-min", "COPY_KEEP_MIN", "0", "Minutes of copy segments to keep"))
		.arg(number_arg("encode-keep-min", "ENCODE_KEEP_MIN", "1", "Minutes of encoded segments to keep"))
}
