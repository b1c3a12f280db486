//! End-to-end tests against the live mock service.
//!
//! # Design
//! Starts the mock server on a random port, then drives the client through
//! its default `ureq` transport over real HTTP. Covers Basic auth, form
//! bodies, query strings and the remote error contract.

use serde_json::Value;
use trestle_core::{ErrorKind, Params, Payload, ReturnFormat, Service, Trestle, TrestleError};

/// Bind the mock server to a random port on a background runtime and return
/// its API root.
fn start_server(key: &str, secret: &str) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let (key, secret) = (key.to_string(), secret.to_string());

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_credentials(listener, &key, &secret).await
        })
        .unwrap();
    });

    format!("http://{addr}/v1")
}

fn client(root: &str, format: ReturnFormat) -> Trestle {
    Trestle::builder(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET)
        .root(root)
        .return_format(format)
        .build()
        .unwrap()
}

fn field(payload: &Payload, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string field {key} in {payload:?}"))
        .to_string()
}

#[test]
fn user_lifecycle() {
    let root = start_server(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET);
    let c = client(&root, ReturnFormat::Structure);

    // Step 1: search, should be empty.
    let found = c.user_search(&Params::new()).unwrap();
    assert_eq!(found, Payload::Structure(Value::Array(Vec::new())));

    // Step 2: create.
    let created = c
        .user_create(&Params::from([
            ("username", "jane"),
            ("email", "jane@example.com"),
            ("password", "correct horse"),
        ]))
        .unwrap();
    let id = field(&created, "id");
    assert_eq!(id.len(), 15);
    assert_eq!(field(&created, "email"), "jane@example.com");

    // Step 3: info twice, identical.
    let first = c.user_info(&id).unwrap();
    let second = c.user_info(&id).unwrap();
    assert_eq!(first, second);
    assert_eq!(field(&first, "username"), "jane");

    // Step 4: search with a query that needs escaping.
    c.user_update(&id, &Params::from([("name", "Jane Doe")])).unwrap();
    let found = c.user_search(&Params::from([("name", "Jane Doe")])).unwrap();
    let Payload::Structure(Value::Array(users)) = found else {
        panic!("expected an array");
    };
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], id.as_str());

    // Step 5: login with the stored password.
    let session = c
        .user_login(&Params::from([("email", "jane@example.com"), ("password", "correct horse")]))
        .unwrap();
    assert_eq!(field(&session, "id"), id);

    let err = c
        .user_login(&Params::from([("username", "jane"), ("password", "wrong")]))
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid login");
    assert_eq!(err.status(), Some(401));

    // Step 6: delete, then info is a remote 404.
    c.user_delete(&id).unwrap();
    let err = c.user_info(&id).unwrap_err();
    assert_eq!(err.to_string(), "not found");
    assert_eq!(err.kind(), ErrorKind::Remote);

    assert_eq!(c.errors(), vec!["invalid login".to_string(), "not found".to_string()]);
}

#[test]
fn create_returns_raw_text_by_default() {
    let root = start_server(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET);
    let c = client(&root, ReturnFormat::Text);

    let created = c.object_create("notes", &Params::from([("title", "a b")])).unwrap();
    let text = created.as_text().unwrap().to_string();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["title"], "a b");

    let id = value["id"].as_str().unwrap();
    let info = c.object_info("notes", id).unwrap();
    assert_eq!(info, Payload::Text(text));
}

#[test]
fn object_format_yields_field_maps() {
    let root = start_server(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET);
    let mut c = client(&root, ReturnFormat::Object);

    let created = c.object_create("notes", &Params::from([("title", "x")])).unwrap();
    let Payload::Object(map) = created else {
        panic!("expected an object payload");
    };
    let id = map["id"].as_str().unwrap().to_string();

    // Arrays have no object form.
    let listed = c.object_search("notes", &Params::new()).unwrap();
    assert!(matches!(listed, Payload::Structure(Value::Array(ref a)) if a.len() == 1));

    c.set_return_format(ReturnFormat::Text);
    let deleted = c.object_delete("notes", &id).unwrap();
    assert!(deleted.as_text().unwrap().contains(&id));
}

#[test]
fn wrong_credentials_are_a_remote_error() {
    let root = start_server("real-key", "real-secret");
    let c = client(&root, ReturnFormat::Structure);

    let err = c.geo_info("8.8.8.8").unwrap_err();
    assert_eq!(
        err,
        TrestleError::Remote {
            status: 401,
            message: "invalid credentials".to_string(),
        }
    );
}

#[test]
fn mailbox_and_email_round_trips() {
    let root = start_server(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET);
    let c = client(&root, ReturnFormat::Structure);

    c.mailbox_create(&Params::from([("mailbox", "box@example.com"), ("password", "abc")]))
        .unwrap();
    let updated = c
        .mailbox_update("box@example.com", &Params::from([("forward", "me@example.com")]))
        .unwrap();
    assert_eq!(field(&updated, "forward"), "me@example.com");
    assert!(updated.get("password").is_none());

    let sent = c
        .email_send(&Params::from([
            ("to", "to@example.com"),
            ("from", "from@example.com"),
            ("subject", "hi"),
            ("message", "hello there"),
        ]))
        .unwrap();
    assert_eq!(sent.get("queued"), Some(&Value::Bool(true)));

    c.mailbox_delete("box@example.com").unwrap();
    assert_eq!(c.mailbox_info("box@example.com").unwrap_err().to_string(), "not found");
}

#[test]
fn validation_failures_skip_the_server() {
    // Nothing listens here; a request would fail with a transport error.
    let c = client("http://127.0.0.1:1/v1", ReturnFormat::Structure);

    let err = c.user_info("too-short").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = c.mailbox_create(&Params::from([("mailbox", "nope")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = c.stat_info(&Params::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(c.errors().len(), 3);
}

#[test]
fn redirects_are_remote_failures_and_never_followed() {
    let root = start_server(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET);
    let stat_at = |path: &str| {
        Trestle::builder(mock_server::DEFAULT_KEY, mock_server::DEFAULT_SECRET)
            .root(&root)
            .endpoint(Service::Stat, format!("{root}/{path}"))
            .return_format(ReturnFormat::Structure)
            .build()
            .unwrap()
    };

    let err = stat_at("redirect").stat_info(&Params::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status(), Some(302));
    assert_eq!(err.to_string(), "request failed with HTTP status 302");

    let hits = stat_at("redirect/hits").stat_info(&Params::new()).unwrap();
    assert_eq!(hits.get("hits"), Some(&Value::from(0)));
}
