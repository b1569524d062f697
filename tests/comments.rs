mod common;

use common::{app, body};
use rocket::http::Status;
use serde_json::json;

#[test]
fn add_list_and_delete_comments() {
    let app = app();
    let jake = app.register("jake");
    let celeb = app.register("celeb");
    let slug = app.create_article(&jake, "Dragons", &[]);
    let uri = format!("/api/articles/{}/comments", slug);

    let response = app.post_json(&uri, Some(&celeb), json!({ "comment": { "body": "First!" } }));
    assert_eq!(response.status(), Status::Ok);
    let comment = &body(response)["comment"];
    let first_id = comment["id"].as_i64().expect("id");
    assert_eq!(comment["body"], "First!");
    assert_eq!(comment["author"]["username"], "celeb");
    assert_eq!(comment["createdAt"], comment["updatedAt"]);

    let response = app.post_json(&uri, Some(&jake), json!({ "comment": { "body": "Thanks" } }));
    assert_eq!(response.status(), Status::Ok);

    app.post("/api/profiles/celeb/follow", Some(&jake));

    let list = body(app.get(&uri, Some(&jake)));
    let comments = list["comments"].as_array().expect("comments");
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["body"], "First!");
    assert_eq!(comments[0]["author"]["following"], true);
    assert_eq!(comments[1]["body"], "Thanks");
    assert_eq!(comments[1]["author"]["following"], false);

    let list = body(app.get(&uri, None));
    assert_eq!(list["comments"][0]["author"]["following"], false);

    let delete_uri = format!("{}/{}", uri, first_id);
    assert_eq!(app.delete(&delete_uri, Some(&jake)).status(), Status::Forbidden);
    assert_eq!(app.delete(&delete_uri, None).status(), Status::Unauthorized);

    let response = app.delete(&delete_uri, Some(&celeb));
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response), json!({}));

    let list = body(app.get(&uri, None));
    assert_eq!(list["comments"].as_array().map(Vec::len), Some(1));
    assert_eq!(app.delete(&delete_uri, Some(&celeb)).status(), Status::NotFound);
}

#[test]
fn comment_must_belong_to_the_article() {
    let app = app();
    let jake = app.register("jake");
    let first = app.create_article(&jake, "First", &[]);
    let second = app.create_article(&jake, "Second", &[]);

    let response = app.post_json(
        &format!("/api/articles/{}/comments", first),
        Some(&jake),
        json!({ "comment": { "body": "On the first" } }),
    );
    let id = body(response)["comment"]["id"].as_i64().expect("id");

    let response = app.delete(&format!("/api/articles/{}/comments/{}", second, id), Some(&jake));
    assert_eq!(response.status(), Status::NotFound);
    assert!(body(response)["errors"]["comment"].is_array());
}

#[test]
fn comment_validation_and_missing_article() {
    let app = app();
    let jake = app.register("jake");
    let slug = app.create_article(&jake, "Dragons", &[]);

    let response = app.post_json(
        &format!("/api/articles/{}/comments", slug),
        Some(&jake),
        json!({ "comment": { "body": "   " } }),
    );
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert!(body(response)["errors"]["body"].is_array());

    let response = app.post_json(
        "/api/articles/missing-1/comments",
        Some(&jake),
        json!({ "comment": { "body": "Hello" } }),
    );
    assert_eq!(response.status(), Status::NotFound);

    assert_eq!(
        app.get("/api/articles/missing-1/comments", None).status(),
        Status::NotFound
    );

    let response = app.post_json(
        &format!("/api/articles/{}/comments", slug),
        None,
        json!({ "comment": { "body": "Hello" } }),
    );
    assert_eq!(response.status(), Status::Unauthorized);
}
