//! Drives the full router in-process over the in-memory store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use school_records::{app_routes, AppState, MemoryStore, PagingConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), PagingConfig::default());
        TestApp {
            router: app_routes(state, 64 * 1024),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.raw(req).await
    }

    async fn raw(&self, req: Request<Body>) -> Reply {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let location = res
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply { status, location, body }
    }

    async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None).await
    }

    async fn create_course(&self, name: &str) -> i64 {
        let reply = self.send(Method::POST, "/courses", Some(json!({ "name": name }))).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        id_from_location(&reply)
    }

    async fn create_student(&self, body: Value) -> i64 {
        let reply = self.send(Method::POST, "/student", Some(body)).await;
        assert_eq!(reply.status, StatusCode::CREATED, "body: {}", reply.body);
        id_from_location(&reply)
    }
}

fn id_from_location(reply: &Reply) -> i64 {
    let location = reply.location.as_deref().expect("location header");
    location.rsplit('/').next().unwrap().parse().unwrap()
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array().unwrap().iter().map(|v| v["id"].as_i64().unwrap()).collect()
}

#[tokio::test]
async fn create_then_read_returns_same_student() {
    let app = TestApp::new();
    let math = app.create_course("Math").await;

    let reply = app
        .send(
            Method::POST,
            "/student",
            Some(json!({ "name": "Ada", "email": "ada@example.com", "courses": [{ "id": math }] })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body, Value::Null);
    let id = id_from_location(&reply);
    assert_eq!(reply.location.as_deref(), Some(format!("/student/{}", id).as_str()));

    let found = app.get(&format!("/student/{}", id)).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(
        found.body,
        json!({
            "id": id,
            "name": "Ada",
            "email": "ada@example.com",
            "courses": [{ "id": math, "name": "Math" }]
        })
    );
}

#[tokio::test]
async fn names_are_stored_exactly_as_sent() {
    let app = TestApp::new();
    let id = app.create_student(json!({ "name": "  Ada  " })).await;
    assert_eq!(app.get(&format!("/student/{}", id)).await.body["name"], "  Ada  ");

    let reply = app
        .send(Method::PUT, &format!("/student/{}", id), Some(json!({ "name": " Bo " })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/student/{}", id)).await.body["name"], " Bo ");

    let course = app.create_course(" Math ").await;
    assert_eq!(app.get(&format!("/courses/{}", course)).await.body["name"], " Math ");
}

#[tokio::test]
async fn create_with_unknown_course_is_not_found_and_stores_nothing() {
    let app = TestApp::new();
    let reply = app
        .send(Method::POST, "/student", Some(json!({ "name": "Ada", "courses": [{ "id": 99 }] })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/students").await.body, json!([]));
}

#[tokio::test]
async fn invalid_payloads_are_bad_requests_with_error_detail() {
    let app = TestApp::new();

    let reply = app.send(Method::POST, "/student", Some(json!({ "email": "a@b.io" }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["status"], 400);
    assert_eq!(reply.body["error"]["path"], "/student");
    assert!(reply.body["error"]["message"].as_str().unwrap().contains("name"));
    assert!(reply.body["error"]["timestamp"].is_string());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/student")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    assert_eq!(app.raw(req).await.status, StatusCode::BAD_REQUEST);

    let reply = app.send(Method::POST, "/student", Some(json!({ "name": 5 }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_update_keeps_unspecified_fields() {
    let app = TestApp::new();
    let math = app.create_course("Math").await;
    let id = app
        .create_student(json!({ "name": "Ada", "email": "ada@example.com", "courses": [{ "id": math }] }))
        .await;

    let reply = app
        .send(Method::PUT, &format!("/student/{}", id), Some(json!({ "name": "Grace" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let found = app.get(&format!("/student/{}", id)).await.body;
    assert_eq!(found["name"], "Grace");
    assert_eq!(found["email"], "ada@example.com");
    assert_eq!(ids(&found["courses"]), vec![math]);

    let reply = app
        .send(Method::PUT, &format!("/student/{}", id), Some(json!({ "name": "", "email": null, "courses": [] })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/student/{}", id)).await.body, found);
}

#[tokio::test]
async fn update_can_replace_enrollments() {
    let app = TestApp::new();
    let math = app.create_course("Math").await;
    let art = app.create_course("Art").await;
    let id = app.create_student(json!({ "name": "Ada", "courses": [{ "id": math }] })).await;

    let reply = app
        .send(Method::PUT, &format!("/student/{}", id), Some(json!({ "courses": [{ "id": art }] })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(ids(&app.get(&format!("/student/{}", id)).await.body["courses"]), vec![art]);

    let reply = app
        .send(Method::PUT, &format!("/student/{}", id), Some(json!({ "courses": [{ "id": 77 }] })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(ids(&app.get(&format!("/student/{}", id)).await.body["courses"]), vec![art]);
}

#[tokio::test]
async fn update_and_read_of_missing_student_are_not_found() {
    let app = TestApp::new();
    let reply = app.send(Method::PUT, "/student/5", Some(json!({ "name": "X" }))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"]["path"], "/student/5");
    assert_eq!(app.get("/student/5").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_twice_reports_not_found_the_second_time() {
    let app = TestApp::new();
    let id = app.create_student(json!({ "name": "Ada" })).await;
    let uri = format!("/student/{}", id);

    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::OK);
    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn name_search_handles_empty_and_unmatched_fragments() {
    let app = TestApp::new();
    let ada = app.create_student(json!({ "name": "Ada" })).await;
    let adam = app.create_student(json!({ "name": "adam" })).await;
    let bob = app.create_student(json!({ "name": "Bob" })).await;

    assert_eq!(ids(&app.get("/student/namelike/").await.body), vec![ada, adam, bob]);
    assert_eq!(ids(&app.get("/student/namelike").await.body), vec![ada, adam, bob]);
    assert_eq!(ids(&app.get("/student/namelike/da").await.body), vec![ada, adam]);
    assert_eq!(ids(&app.get("/student/namelike/Ad").await.body), vec![ada]);

    let none = app.get("/student/namelike/zzz").await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.body, json!([]));
}

#[tokio::test]
async fn paging_past_the_last_page_is_empty_with_totals() {
    let app = TestApp::new();
    for name in ["A", "B", "C", "D", "E"] {
        app.create_student(json!({ "name": name })).await;
    }

    let reply = app.get("/students/paging?page=9&size=2").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["content"], json!([]));
    assert_eq!(reply.body["totalElements"], 5);
    assert_eq!(reply.body["totalPages"], 3);
    assert_eq!(reply.body["number"], 9);
    assert_eq!(reply.body["size"], 2);

    let first = app.get("/students/paging").await.body;
    assert_eq!(first["number"], 0);
    assert_eq!(ids(&first["content"]), vec![1, 2, 3]);
}

#[tokio::test]
async fn paging_sorts_by_keys_in_priority_order() {
    let app = TestApp::new();
    let b1 = app.create_student(json!({ "name": "b" })).await;
    let a1 = app.create_student(json!({ "name": "a" })).await;
    let b2 = app.create_student(json!({ "name": "b" })).await;
    let a2 = app.create_student(json!({ "name": "a" })).await;

    let reply = app.get("/students/paging?size=10&sort=name,asc&sort=id,desc").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(ids(&reply.body["content"]), vec![a2, a1, b2, b1]);

    let reply = app.get("/students/paging?size=2&page=1&sort=name,desc").await;
    assert_eq!(ids(&reply.body["content"]), vec![a1, a2]);
}

#[tokio::test]
async fn paging_rejects_bad_parameters() {
    let app = TestApp::new();
    for uri in [
        "/students/paging?size=0",
        "/students/paging?size=-1",
        "/students/paging?page=-1",
        "/students/paging?page=x",
        "/students/paging?sort=age",
        "/courses/paging?sort=email",
    ] {
        let reply = app.get(uri).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(reply.body["error"]["status"], 400);
    }
}

#[tokio::test]
async fn deleting_course_drops_it_from_counts_but_keeps_students() {
    let app = TestApp::new();
    let math = app.create_course("Math").await;
    let art = app.create_course("Art").await;
    let ada = app
        .create_student(json!({ "name": "Ada", "courses": [{ "id": math }, { "id": art }] }))
        .await;
    let bob = app.create_student(json!({ "name": "Bob", "courses": [{ "id": math }] })).await;

    let counts = app.get("/studcount").await.body;
    assert_eq!(
        counts,
        json!([
            { "courseId": math, "courseName": "Math", "studentCount": 2 },
            { "courseId": art, "courseName": "Art", "studentCount": 1 }
        ])
    );

    let uri = format!("/courses/{}", math);
    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::OK);
    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::NOT_FOUND);

    let counts = app.get("/studcount").await.body;
    assert_eq!(counts, json!([{ "courseId": art, "courseName": "Art", "studentCount": 1 }]));

    let ada_now = app.get(&format!("/student/{}", ada)).await;
    assert_eq!(ada_now.status, StatusCode::OK);
    assert_eq!(ids(&ada_now.body["courses"]), vec![art]);
    let bob_now = app.get(&format!("/student/{}", bob)).await;
    assert_eq!(bob_now.status, StatusCode::OK);
    assert_eq!(bob_now.body["courses"], json!([]));
}

#[tokio::test]
async fn deleting_student_keeps_courses() {
    let app = TestApp::new();
    let math = app.create_course("Math").await;
    let ada = app.create_student(json!({ "name": "Ada", "courses": [{ "id": math }] })).await;

    assert_eq!(app.send(Method::DELETE, &format!("/student/{}", ada), None).await.status, StatusCode::OK);
    let course = app.get(&format!("/courses/{}", math)).await;
    assert_eq!(course.status, StatusCode::OK);
    assert_eq!(course.body["students"], json!([]));
    assert_eq!(app.get("/studcount").await.body, json!([]));
}

#[tokio::test]
async fn course_listing_and_lookup() {
    let app = TestApp::new();
    let reply = app
        .send(Method::POST, "/courses", Some(json!({ "name": "Math", "instructor": "Sally" })))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let math = id_from_location(&reply);
    let art = app.create_course("Art").await;

    assert_eq!(ids(&app.get("/courses").await.body), vec![math, art]);
    let page = app.get("/courses/paging?sort=name").await.body;
    assert_eq!(ids(&page["content"]), vec![art, math]);
    assert_eq!(app.get(&format!("/courses/{}", math)).await.body["instructor"], "Sally");
    assert_eq!(app.get("/courses/404").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.send(Method::POST, "/courses", Some(json!({ "name": " " }))).await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn malformed_ids_and_unknown_routes() {
    let app = TestApp::new();
    let reply = app.get("/student/abc").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["path"], "/student/abc");

    let reply = app.get("/nowhere").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"]["code"], "not_found");
    assert_eq!(reply.body["error"]["path"], "/nowhere");
}

#[tokio::test]
async fn health_and_readiness() {
    let app = TestApp::new();
    assert_eq!(app.get("/health").await.body, json!({ "status": "ok" }));
    let ready = app.get("/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["storage"], "ok");
}

#[tokio::test]
async fn undecodable_name_fragment_is_a_structured_bad_request() {
    let app = TestApp::new();
    let reply = app.get("/student/namelike/%FF").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"]["status"], 400);
    assert_eq!(reply.body["error"]["code"], "bad_request");
    assert_eq!(reply.body["error"]["path"], "/student/namelike/%FF");
}

#[tokio::test]
async fn unsupported_method_gets_error_detail() {
    let app = TestApp::new();
    let id = app.create_student(json!({ "name": "Ada" })).await;
    let reply = app
        .send(Method::PATCH, &format!("/student/{}", id), Some(json!({ "name": "Bo" })))
        .await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.body["error"]["status"], 405);
    assert_eq!(reply.body["error"]["code"], "method_not_allowed");
    assert_eq!(reply.body["error"]["path"], format!("/student/{}", id));
    assert_eq!(app.get(&format!("/student/{}", id)).await.body["name"], "Ada");
}

#[tokio::test]
async fn oversized_body_gets_error_detail() {
    let app = TestApp::new();
    let body = json!({ "name": "x".repeat(70 * 1024) }).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/student")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let reply = app.raw(req).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.body["error"]["code"], "payload_too_large");
    assert_eq!(reply.body["error"]["path"], "/student");
    assert_eq!(app.get("/students").await.body, json!([]));
}
