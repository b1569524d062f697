mod common;

use common::{app, body};
use rocket::http::Status;

#[test]
fn profile_following_is_relative_to_the_viewer() {
    let app = app();
    let jake = app.register("jake");
    let celeb = app.register("celeb");

    let response = app.get("/api/profiles/celeb", None);
    assert_eq!(response.status(), Status::Ok);
    let profile = &body(response)["profile"];
    assert_eq!(profile["username"], "celeb");
    assert_eq!(profile["following"], false);

    let response = app.post("/api/profiles/celeb/follow", Some(&jake));
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response)["profile"]["following"], true);

    // Following twice is harmless.
    let response = app.post("/api/profiles/celeb/follow", Some(&jake));
    assert_eq!(response.status(), Status::Ok);

    let response = app.get("/api/profiles/celeb", Some(&jake));
    assert_eq!(body(response)["profile"]["following"], true);

    // Nobody else sees jake's follow.
    let response = app.get("/api/profiles/celeb", Some(&celeb));
    assert_eq!(body(response)["profile"]["following"], false);
    let response = app.get("/api/profiles/jake", Some(&celeb));
    assert_eq!(body(response)["profile"]["following"], false);

    let response = app.delete("/api/profiles/celeb/follow", Some(&jake));
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response)["profile"]["following"], false);

    let response = app.get("/api/profiles/celeb", Some(&jake));
    assert_eq!(body(response)["profile"]["following"], false);
}

#[test]
fn unknown_profile_is_not_found() {
    let app = app();
    let jake = app.register("jake");

    let response = app.get("/api/profiles/nobody", None);
    assert_eq!(response.status(), Status::NotFound);
    assert!(body(response)["errors"]["profile"].is_array());

    let response = app.post("/api/profiles/nobody/follow", Some(&jake));
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn follow_requires_authentication() {
    let app = app();
    app.register("celeb");

    let response = app.post("/api/profiles/celeb/follow", None);
    assert_eq!(response.status(), Status::Unauthorized);
    assert!(body(response)["errors"]["token"].is_array());

    let response = app.delete("/api/profiles/celeb/follow", None);
    assert_eq!(response.status(), Status::Unauthorized);
}
