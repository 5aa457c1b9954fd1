mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use peaklife::infra::http::build_router;

use common::{BOOTSTRAP_EMAIL, FakeImages, TestApp, app, app_with_images, token};

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn router(app: &TestApp) -> Router {
    build_router(app.state.clone())
}

#[tokio::test]
async fn health_without_database_is_no_content() {
    let app = app();
    let (status, body) = send(&router(&app), request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn admin_routes_require_an_admin_session() {
    let app = app();
    let router = router(&app);
    let body = json!({ "email": "someone@peaklife.test" });

    let (status, error) = send(
        &router,
        request(Method::POST, "/api/admin/getUserByEmail", None, Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(error["error"].is_string());

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/getUserByEmail",
            Some("not-a-token"),
            Some(body.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let guest = token("guest-1", false);
    let (status, error) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/getUserByEmail",
            Some(&guest),
            Some(body),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn create_guest_reports_missing_fields_and_provisions() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);

    let (status, error) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/create-guest",
            Some(&admin),
            Some(json!({ "name": "Dr. Rest", "email": "rest@peaklife.test" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, json!({ "error": "Missing required fields" }));
    assert_eq!(app.identity.count(), 0);

    let (status, created) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/create-guest",
            Some(&admin),
            Some(json!({
                "name": "Dr. Rest",
                "email": "rest@peaklife.test",
                "password": "hunter22",
                "imageUrl": "https://img.test/rest.png"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    let uid = created["uid"].as_str().unwrap().to_string();
    assert!(created["docId"].is_string());

    let (status, found) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/getUserByEmail",
            Some(&admin),
            Some(json!({ "email": "rest@peaklife.test" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!({ "uid": uid }));

    let (status, listing) = send(
        &router,
        request(Method::GET, "/api/admin/guests", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["items"][0]["name"], "Dr. Rest");
    assert_eq!(listing["items"][0]["uid"], uid);
    assert_eq!(listing["items"][0]["profilePicture"], "https://img.test/rest.png");
}

#[tokio::test]
async fn guest_registry_is_hidden_from_non_admins() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/create-guest",
            Some(&admin),
            Some(json!({
                "name": "Private Guest",
                "email": "private@peaklife.test",
                "password": "hunter22"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, request(Method::GET, "/api/guests", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.to_string().contains("private@peaklife.test"));

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/admin/guests", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.to_string().contains("private@peaklife.test"));

    let guest = token("guest-1", false);
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/admin/guests", Some(&guest), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);

    let (status, error) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/getUserByEmail",
            Some(&admin),
            Some(json!({ "email": "ghost@peaklife.test" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, json!({ "error": "User not found" }));

    let (status, error) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/setAdminClaim",
            Some(&admin),
            Some(json!({ "uid": "ghost", "isAdmin": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, json!({ "error": "User not found" }));
}

#[tokio::test]
async fn admin_claim_round_trips_through_the_provider() {
    let app = app();
    app.identity.insert("uid-editor", "editor@peaklife.test");
    let router = router(&app);
    let admin = token("admin-1", true);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/setAdminClaim",
            Some(&admin),
            Some(json!({ "uid": "uid-editor", "isAdmin": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert!(app.identity.user("uid-editor").unwrap().is_admin);
}

#[tokio::test]
async fn setup_is_limited_to_the_bootstrap_account() {
    let app = app();
    app.identity.insert("uid-owner", BOOTSTRAP_EMAIL);
    let router = router(&app);
    let caller = token("uid-owner", false);

    let (status, _) = send(&router, request(Method::GET, "/api/admin/setup", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/setup",
            Some(&caller),
            Some(json!({ "email": "intruder@peaklife.test" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, before) = send(
        &router,
        request(Method::GET, "/api/admin/setup", Some(&caller), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["isAdmin"], false);
    assert_eq!(before["user"]["uid"], "uid-owner");

    let (status, granted) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/setup",
            Some(&caller),
            Some(json!({ "email": BOOTSTRAP_EMAIL })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(granted, json!({ "success": true }));

    let (_, after) = send(
        &router,
        request(Method::GET, "/api/admin/setup", Some(&caller), None),
    )
    .await;
    assert_eq!(after["isAdmin"], true);
}

#[tokio::test]
async fn sleep_science_over_http() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);
    let guest = token("uid-guest", false);

    let (status, category) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/categories",
            Some(&admin),
            Some(json!({ "name": "Sleep" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, pending) = send(
        &router,
        request(
            Method::POST,
            "/api/submissions",
            Some(&guest),
            Some(json!({
                "title": "Sleep Science",
                "categoryId": category_id,
                "content": "# Hi"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pending["status"], "pending");
    let pending_id = pending["id"].as_str().unwrap().to_string();

    let (status, queue) = send(
        &router,
        request(
            Method::GET,
            "/api/admin/pending?status=pending",
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["items"][0]["id"], pending_id.as_str());
    assert_eq!(queue["items"][0]["categoryName"], "Sleep");
    assert_eq!(
        queue["items"][0]["contentHtml"].as_str().unwrap().trim_end(),
        "<h1>Hi</h1>"
    );

    let (status, published) = send(
        &router,
        request(
            Method::POST,
            &format!("/api/admin/pending/{pending_id}/approve"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["title"], "Sleep Science");
    assert_eq!(published["content"], "# Hi");

    let (status, listing) = send(&router, request(Method::GET, "/api/posts", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["items"][0]["id"], published["id"]);

    let (status, _) = send(
        &router,
        request(
            Method::GET,
            &format!("/api/admin/pending/{pending_id}"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, dashboard) = send(
        &router,
        request(Method::GET, "/api/dashboard", Some(&guest), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["counts"]["approved"], 1);
    assert_eq!(dashboard["posts"][0]["status"], "approved");
}

#[tokio::test]
async fn wellness_deletion_over_http() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);

    let (_, category) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/categories",
            Some(&admin),
            Some(json!({ "name": "Wellness" })),
        ),
    )
    .await;
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, duplicate) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/categories",
            Some(&admin),
            Some(json!({ "name": " wellness " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(duplicate["error"].is_string());

    for title in ["Breathe", "Stretch"] {
        let (status, _) = send(
            &router,
            request(
                Method::POST,
                "/api/admin/posts",
                Some(&admin),
                Some(json!({ "title": title, "content": "body", "categoryId": category_id })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, deleted) = send(
        &router,
        request(
            Method::DELETE,
            &format!("/api/admin/categories/{category_id}"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["reassignedPosts"], 2);

    let (_, categories) =
        send(&router, request(Method::GET, "/api/categories", None, None)).await;
    assert_eq!(categories, json!([]));

    let (_, orphans) = send(
        &router,
        request(Method::GET, "/api/categories/unknown/posts", None, None),
    )
    .await;
    let orphans = orphans.as_array().unwrap();
    assert_eq!(orphans.len(), 2);
    assert!(
        orphans
            .iter()
            .all(|post| post["categoryName"] == "Unknown" && post["categoryId"] == "unknown")
    );
}

#[tokio::test]
async fn public_posts_page_with_cursor() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);
    let (_, category) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/categories",
            Some(&admin),
            Some(json!({ "name": "Recovery" })),
        ),
    )
    .await;

    for n in 0..3 {
        send(
            &router,
            request(
                Method::POST,
                "/api/admin/posts",
                Some(&admin),
                Some(json!({
                    "title": format!("Post {n}"),
                    "content": "body",
                    "categoryId": category["id"]
                })),
            ),
        )
        .await;
    }

    // The configured page size is two.
    let (_, first) = send(&router, request(Method::GET, "/api/posts", None, None)).await;
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    let cursor = first["nextCursor"].as_str().unwrap().to_string();

    let (_, second) = send(
        &router,
        request(Method::GET, &format!("/api/posts?cursor={cursor}"), None, None),
    )
    .await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert!(second["nextCursor"].is_null());

    let (status, error) = send(
        &router,
        request(Method::GET, "/api/posts?cursor=garbage!", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, json!({ "error": "Invalid cursor" }));
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = app();
    let router = router(&app);
    let admin = token("admin-1", true);

    let (status, error) = send(
        &router,
        request(Method::GET, "/api/posts/not-a-uuid", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error, json!({ "error": "Invalid identifier" }));

    let (status, error) = send(&router, request(Method::GET, "/api/nowhere", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(error["error"].is_string());

    let (status, error) = send(
        &router,
        request(
            Method::GET,
            "/api/admin/pending?status=archived",
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].as_str().unwrap().contains("archived"));

    let (status, error) = send(
        &router,
        request(
            Method::POST,
            "/api/admin/setAdminClaim",
            Some(&admin),
            Some(json!({ "uid": "u", "isAdmin": "yes" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());

    let untyped = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/create-guest")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::from(r#"{"name":"Dr. Rest"}"#))
        .unwrap();
    let (status, error) = send(&router, untyped).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());
    assert_eq!(app.identity.count(), 0);

    let (status, error) = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/api/admin/create-guest")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());
}

fn multipart(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "peaklife-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn upload_request(bearer: &str, content_type: String, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn uploads_return_the_stored_url() {
    let app = app();
    let router = router(&app);
    let guest = token("uid-guest", false);

    let (content_type, body) = multipart("file", "cover.png", "image/png", b"png-bytes");
    let (status, stored) = send(&router, upload_request(&guest, content_type, body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored, json!({ "url": "https://img.test/cover.png" }));

    let (content_type, body) = multipart("file", "notes.txt", "text/plain", b"hello");
    let (status, _) = send(&router, upload_request(&guest, content_type, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (content_type, body) = multipart("other", "cover.png", "image/png", b"png-bytes");
    let (status, _) = send(&router, upload_request(&guest, content_type, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_upload_leaves_posts_alone() {
    let app = app_with_images(FakeImages { fail: true });
    let router = router(&app);
    let guest = token("uid-guest", false);

    let (content_type, body) = multipart("file", "cover.png", "image/png", b"png-bytes");
    let (status, error) = send(&router, upload_request(&guest, content_type, body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error, json!({ "error": "Image upload failed" }));

    let (_, dashboard) = send(
        &router,
        request(Method::GET, "/api/dashboard", Some(&guest), None),
    )
    .await;
    assert_eq!(dashboard["posts"], json!([]));
}
