#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod article;
pub mod comment;
pub mod config;
pub mod cors;
pub mod db;
pub mod errors;
pub mod favorite;
pub mod profile;
pub mod tag;
pub mod types;
pub mod users;
pub mod utils;

use config::Config;
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::{json, Value};
use rocket::{catch, catchers, routes, Build, Rocket};
use tracing::info;

#[catch(400)]
fn bad_request(_req: &Request) -> (Status, Value) {
    let json = json!({ "errors": { "body": ["could not be parsed"] } });
    (Status::BadRequest, json)
}

#[catch(401)]
fn unauthorized(_req: &Request) -> (Status, Value) {
    let json = json!({ "errors": { "token": ["is missing or invalid"] } });
    (Status::Unauthorized, json)
}

#[catch(404)]
fn not_found(_req: &Request) -> (Status, Value) {
    let json = json!({ "errors": { "entity": ["not found"] } });
    (Status::NotFound, json)
}

#[catch(422)]
fn handle_422(_req: &Request) -> (Status, Value) {
    let json = json!({ "errors": { "body": ["could not be parsed"] } });
    (Status::UnprocessableEntity, json)
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Value) {
    let json = json!({ "errors": { "server": [status.reason_lossy()] } });
    (status, json)
}

/// Builds the application: connection pool, migrations, managed state,
/// routes and catchers.
pub fn rocket(config: Config) -> errors::Result<Rocket<Build>> {
    let pool = db::init_pool(&config)?;
    db::run_migrations(&pool)?;
    info!(database = %config.database_url, "database ready");

    Ok(rocket::build()
        .manage(pool)
        .manage(config)
        .attach(cors::Cors)
        .mount("/", routes![cors::preflight])
        .mount("/api/users", routes![users::register, users::login])
        .mount(
            "/api",
            routes![
                users::current,
                users::update,
                profile::profile,
                profile::follow,
                profile::unfollow,
                tag::list,
            ],
        )
        .mount(
            "/api/articles",
            routes![
                article::list,
                article::feed,
                article::get,
                article::create,
                article::update,
                article::delete,
                favorite::favorite,
                favorite::unfavorite,
                comment::list,
                comment::add,
                comment::delete,
            ],
        )
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, handle_422, default_catcher],
        ))
}
