use anyhow::Context;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::fs::FileServer;
use rocket::http::{ContentType, Status};
use rocket::response::Redirect;
use rocket::serde::json::{json, Json, Value};
use rocket::{Request, Response, State};

use log::{info, warn, error};

use crate::common::{generate_camera_id, Camera, CameraList, NewCamera, Quality};
use crate::config::Settings;
use crate::launcher::Launcher;
use crate::paths::{playlist_url, StreamPaths, STREAMS_MOUNT};
use crate::store::CameraStore;



fn error_body(reason: &str) -> Value {
	json!({
		"status": "error",
		"reason": reason,
	})
}

#[derive(Responder)]
#[derive(Debug)]
pub enum ApiError {
	#[response(status = 400)]
	BadRequest(Value),
	#[response(status = 404)]
	NotFound(Value),
	#[response(status = 422)]
	Unprocessable(Value),
	#[response(status = 500)]
	Internal(Value),
}

impl ApiError {
	fn bad_request(reason: &str) -> ApiError {
		ApiError::BadRequest(error_body(reason))
	}

	fn not_found(reason: &str) -> ApiError {
		ApiError::NotFound(error_body(reason))
	}

	fn internal(err: anyhow::Error) -> ApiError {
		error!("Request failed; error was {:#}", err);
		ApiError::Internal(error_body("Internal server error."))
	}
}



#[get("/")]
async fn list_cameras(store: &State<CameraStore>) -> Json<CameraList> {
	Json(store.list().await)
}

#[get("/<id>")]
async fn get_camera(id: &str, store: &State<CameraStore>) -> Result<Json<Camera>, ApiError> {
	store.get(id).await
		.map(Json)
		.ok_or_else(|| ApiError::not_found("Camera not found"))
}

#[post("/", data="<camera_json>")]
async fn new_camera(
	camera_json: Json<NewCamera>,
	store: &State<CameraStore>,
	launcher: &State<Launcher>,
	settings: &State<Settings>,
) -> Result<Json<Camera>, ApiError> {
	let request = camera_json.into_inner();
	if let Err(reason) = request.validate() {
		return Err(ApiError::Unprocessable(error_body(&reason)));
	}

	let id = generate_camera_id();
	let paths = StreamPaths::prepare(&settings.streams_dir, &id).await
		.with_context(|| format!("Failed to create stream directory for camera {}", id))
		.map_err(ApiError::internal)?;

	// Launching happens outside the store lock; it never fails the request.
	let pid = launcher.launch(&id, &request.rtsp_url, &paths.copy_playlist, request.max_playback_minutes).await;

	let camera = Camera::new(id, request, &paths, pid);
	if let Err(err) = store.append_and_save(camera.clone()).await {
		if let Some(pid) = launcher.release(&camera.id).await {
			warn!("Streamer pid {} keeps running for unregistered camera {}", pid, camera.id);
		}
		return Err(ApiError::internal(err));
	}

	info!("Registered camera {} ({})", camera.id, camera.name);
	Ok(Json(camera))
}

async fn resolve_playlist(
	id: &str,
	quality: Option<&str>,
	default_quality: Quality,
	store: &CameraStore,
	settings: &Settings,
) -> Result<Redirect, ApiError> {
	let camera = store.get(id).await
		.ok_or_else(|| ApiError::not_found("Camera not found"))?;
	let quality = Quality::from_query(quality, default_quality)
		.map_err(|reason| ApiError::bad_request(&reason))?;

	let paths = StreamPaths::resolve(&settings.streams_dir, &camera.id);
	let target = paths.playlist(quality);
	if tokio::fs::metadata(target).await.is_err() {
		warn!("Playlist {} not available yet for camera {}", quality, camera.id);
		return Err(ApiError::not_found("Playlist not available"));
	}

	Ok(Redirect::found(playlist_url(&camera.id, quality)))
}

#[get("/<id>/live.m3u8?<quality>")]
async fn live_playlist(
	id: &str,
	quality: Option<&str>,
	store: &State<CameraStore>,
	settings: &State<Settings>,
) -> Result<Redirect, ApiError> {
	resolve_playlist(id, quality, Quality::Copy, store, settings).await
}

#[get("/<id>/playback.m3u8?<quality>")]
async fn playback_playlist(
	id: &str,
	quality: Option<&str>,
	store: &State<CameraStore>,
	settings: &State<Settings>,
) -> Result<Redirect, ApiError> {
	resolve_playlist(id, quality, Quality::High, store, settings).await
}



// FileServer has no mapping for HLS extensions, and native players check the type.
pub struct HlsContentTypes;

#[rocket::async_trait]
impl Fairing for HlsContentTypes {
	fn info(&self) -> Info {
		Info {
			name: "Set HLS content types on stream files",
			kind: Kind::Response
		}
	}

	async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
		let path = request.uri().path().as_str();
		if response.status() != Status::Ok || !path.starts_with(STREAMS_MOUNT) {
			return;
		}
		if path.ends_with(".m3u8") {
			response.set_header(ContentType::new("application", "vnd.apple.mpegurl"));
		} else if path.ends_with(".ts") {
			response.set_header(ContentType::new("video", "mp2t"));
		}
	}
}



#[catch(400)]
fn bad_request() -> Value {
	error_body("Request was malformed.")
}

#[catch(404)]
fn not_found(request: &Request) -> Value {
	warn!("No resource at {}", request.uri());
	error_body("Resource was not found.")
}

#[catch(422)]
fn unprocessable() -> Value {
	error_body("Request body was not a valid camera.")
}

#[catch(500)]
fn internal_error() -> Value {
	error_body("Internal server error.")
}

async fn open_store(settings: &Settings) -> anyhow::Result<CameraStore> {
	tokio::fs::create_dir_all(&settings.data_dir).await
		.with_context(|| format!("Failed to create data directory {}", settings.data_dir.display()))?;
	tokio::fs::create_dir_all(&settings.streams_dir).await
		.with_context(|| format!("Failed to create streams directory {}", settings.streams_dir.display()))?;
	CameraStore::open(settings.store_path()).await
}



pub fn stage(settings: Settings) -> rocket::fairing::AdHoc {
	rocket::fairing::AdHoc::try_on_ignite("Camera API", move |rocket| async move {
		// A corrupt store file stops ignition rather than being served or overwritten.
		let store = match open_store(&settings).await {
			Ok(store) => store,
			Err(err) => {
				error!("Failed to open camera store; error was {:#}", err);
				return Err(rocket);
			}
		};
		let launcher = Launcher::new(settings.streamer.clone());
		let streams = FileServer::from(&settings.streams_dir);

		Ok(rocket
			.manage(store)
			.manage(launcher)
			.manage(settings)
			.register("/", catchers![bad_request, not_found, unprocessable, internal_error])
			.mount("/api/cameras", routes![list_cameras, get_camera, new_camera, live_playlist, playback_playlist])
			.mount(STREAMS_MOUNT, streams)
			.attach(HlsContentTypes))
	})
}
