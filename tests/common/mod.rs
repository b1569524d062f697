#![allow(dead_code)]

use conduit::config::Config;
use conduit::users::models::User;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::{json, Value};
use tempfile::TempDir;

/// A client over a fresh database. The directory outlives the client.
pub struct TestApp {
    pub client: Client,
    _dir: TempDir,
}

pub fn app() -> TestApp {
    app_with(|_| {})
}

/// Like `app`, with `configure` applied to the configuration first.
pub fn app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("conduit-test.db");
    let mut config = Config::with_database(path.to_str().expect("utf-8 path"));
    configure(&mut config);
    let rocket = conduit::rocket(config).expect("valid rocket instance");
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestApp { client, _dir: dir }
}

/// A correctly signed token for `user_id`, whether or not that user exists.
pub fn token_for(user_id: i32) -> String {
    let user = User {
        id: user_id,
        email: "ghost@conduit.test".to_owned(),
        username: "ghost".to_owned(),
        password_hash: String::new(),
        bio: None,
        image: None,
    };
    let config = Config::with_database("unused");
    user.token(&config.jwt_secret, config.token_ttl_hours)
        .expect("token")
}

pub fn auth(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Token {}", token))
}

pub fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().expect("json body")
}

impl TestApp {
    /// Registers `username` with `<username>@conduit.test` and returns the token.
    pub fn register(&self, username: &str) -> String {
        let response = self
            .client
            .post("/api/users")
            .header(ContentType::JSON)
            .body(
                json!({ "user": {
                    "username": username,
                    "email": format!("{}@conduit.test", username),
                    "password": "password",
                }})
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        body(response)["user"]["token"]
            .as_str()
            .expect("token")
            .to_owned()
    }

    pub fn post_json(&self, uri: &str, token: Option<&str>, payload: Value) -> LocalResponse<'_> {
        let mut request = self
            .client
            .post(uri.to_owned())
            .header(ContentType::JSON)
            .body(payload.to_string());
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        request.dispatch()
    }

    pub fn put_json(&self, uri: &str, token: Option<&str>, payload: Value) -> LocalResponse<'_> {
        let mut request = self
            .client
            .put(uri.to_owned())
            .header(ContentType::JSON)
            .body(payload.to_string());
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        request.dispatch()
    }

    pub fn get(&self, uri: &str, token: Option<&str>) -> LocalResponse<'_> {
        let mut request = self.client.get(uri.to_owned());
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        request.dispatch()
    }

    pub fn post(&self, uri: &str, token: Option<&str>) -> LocalResponse<'_> {
        let mut request = self.client.post(uri.to_owned());
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        request.dispatch()
    }

    pub fn delete(&self, uri: &str, token: Option<&str>) -> LocalResponse<'_> {
        let mut request = self.client.delete(uri.to_owned());
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        request.dispatch()
    }

    /// Creates an article and returns its slug.
    pub fn create_article(&self, token: &str, title: &str, tags: &[&str]) -> String {
        let response = self.post_json(
            "/api/articles",
            Some(token),
            json!({ "article": {
                "title": title,
                "description": format!("About {}", title),
                "body": format!("All about {}", title),
                "tagList": tags,
            }}),
        );
        assert_eq!(response.status(), Status::Ok);
        body(response)["article"]["slug"]
            .as_str()
            .expect("slug")
            .to_owned()
    }
}
