use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use log::info;

use crate::common::{Camera, CameraId, CameraList};



/// Reads the store file. A missing file is an empty store; a malformed one is an error.
pub async fn load(path: &Path) -> anyhow::Result<CameraList> {
	let bytes = match tokio::fs::read(path).await {
		Ok(bytes) => bytes,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
			return Ok(CameraList::new());
		},
		Err(err) => {
			return Err(err).with_context(|| format!("Failed to read camera store {}", path.display()));
		}
	};

	serde_json::from_slice(&bytes)
		.with_context(|| format!("Camera store {} is not a valid JSON array of cameras", path.display()))
}

pub async fn save(path: &Path, cameras: &[Camera]) -> anyhow::Result<()> {
	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}

	let json = serde_json::to_vec_pretty(cameras)?;
	let file = tokio::fs::File::create(path).await
		.with_context(|| format!("Failed to open camera store {} for writing", path.display()))?;
	let mut writer = tokio::io::BufWriter::new(file);
	writer.write_all(&json).await?;
	writer.flush().await?;
	Ok(())
}



#[derive(Default)]
struct CameraIndex {
	cameras: CameraList,
	positions: HashMap<CameraId, usize>,
}

impl CameraIndex {
	fn from_list(cameras: CameraList) -> anyhow::Result<CameraIndex> {
		let mut index = CameraIndex::default();
		for camera in cameras {
			index.push(camera)?;
		}
		Ok(index)
	}

	fn push(&mut self, camera: Camera) -> anyhow::Result<()> {
		if self.positions.contains_key(&camera.id) {
			bail!("Camera id {} already exists", camera.id);
		}
		self.positions.insert(camera.id.clone(), self.cameras.len());
		self.cameras.push(camera);
		Ok(())
	}

	fn pop(&mut self) {
		if let Some(camera) = self.cameras.pop() {
			self.positions.remove(&camera.id);
		}
	}
}

/// Camera records held in memory in insertion order, backed by a JSON file
/// that is rewritten wholesale on every insert.
pub struct CameraStore {
	path: PathBuf,
	// tokio's RwLock lets readers share the lock while a pending writer blocks new readers.
	inner: RwLock<CameraIndex>,
}

impl CameraStore {
	pub async fn open(path: PathBuf) -> anyhow::Result<CameraStore> {
		let cameras = load(&path).await?;
		info!("Loaded {} camera(s) from {}", cameras.len(), path.display());
		let index = CameraIndex::from_list(cameras)
			.with_context(|| format!("Camera store {} contains duplicate ids", path.display()))?;

		Ok(CameraStore {
			path,
			inner: RwLock::new(index),
		})
	}

	pub async fn list(&self) -> CameraList {
		self.inner.read().await.cameras.clone()
	}

	pub async fn get(&self, id: &str) -> Option<Camera> {
		let index = self.inner.read().await;
		index.positions.get(id).map(|&pos| index.cameras[pos].clone())
	}

	/// Appends a camera and rewrites the store file, all under the write lock.
	/// If the write fails the camera is removed again.
	pub async fn append_and_save(&self, camera: Camera) -> anyhow::Result<()> {
		let mut index = self.inner.write().await;
		index.push(camera)?;

		if let Err(err) = save(&self.path, &index.cameras).await {
			index.pop();
			return Err(err);
		}
		info!("Wrote camera store {} ({} camera(s))", self.path.display(), index.cameras.len());
		Ok(())
	}
}
