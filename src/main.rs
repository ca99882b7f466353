#[macro_use] extern crate rocket;
#[macro_use] extern crate serde_derive;

use rocket::{Request, Response};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;

mod common;
mod config;
mod launcher;
mod paths;
mod rest_api;
mod store;



// Players are usually served from another origin, so every response carries permissive CORS headers.
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
	fn info(&self) -> Info {
		Info {
			name: "Add CORS headers to responses",
			kind: Kind::Response
		}
	}

	async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
		response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
		response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
		response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
		response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
	}
}


#[rocket::main]
async fn main() -> anyhow::Result<()> {
	let matches = config::command().get_matches();
	let settings = config::Settings::from_matches(&matches);

	let _rocket = rocket::build()
		.attach(rest_api::stage(settings))
		.attach(CORS)
		.launch()
		.await?;

	anyhow::Ok(())
}
