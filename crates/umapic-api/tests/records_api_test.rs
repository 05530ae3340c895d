//! End-to-end record API behavior over HTTP.

mod common;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use common::{expect_error, record_body, RecordingStorage, TestServer, BASE_URL};

fn parse_ts(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let server = TestServer::start().await;

    for resp in [
        server.client.get(server.url("/records")).send().await.unwrap(),
        server.client.get(server.url("/records/r1")).send().await.unwrap(),
        server.client.delete(server.url("/records/r1")).send().await.unwrap(),
        server.client.get(server.url("/s3-upload-url")).send().await.unwrap(),
    ] {
        expect_error(resp, 401, "UNAUTHORIZED").await;
    }

    let resp = server
        .client
        .post(server.url("/records"))
        .header("X-User-ID", "   ")
        .json(&record_body("Ramen Jiro", "2026-10-01"))
        .send()
        .await
        .unwrap();
    expect_error(resp, 401, "UNAUTHORIZED").await;
    assert!(server.records.is_empty().await);
}

#[tokio::test]
async fn test_header_name_is_case_insensitive() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .get(server.url("/records"))
        .header("x-user-id", "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_every_response_allows_any_origin() {
    let server = TestServer::start().await;

    let ok = server.get("/records", "u1").send().await.unwrap();
    assert_eq!(ok.headers()["access-control-allow-origin"], "*");

    let err = server.client.get(server.url("/records")).send().await.unwrap();
    assert_eq!(err.headers()["access-control-allow-origin"], "*");

    let health = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let server = TestServer::start().await;
    let resp = server.get("/records", "u1").send().await.unwrap();
    let id = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let server = TestServer::start().await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "ok");
    assert!(json["data"]["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let server = TestServer::start().await;
    let resp = server.get("/no-such-route", "u1").send().await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    expect_error(resp, 404, "NOT_FOUND").await;
}

#[tokio::test]
async fn test_wrong_method_uses_error_envelope() {
    let server = TestServer::start().await;
    let resp = server.delete("/records", "u1").send().await.unwrap();
    assert!(resp.headers().contains_key("allow"));
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    expect_error(resp, 405, "METHOD_NOT_ALLOWED").await;
}

#[tokio::test]
async fn test_oversized_body_uses_error_envelope() {
    let server = TestServer::start_with_body_limit(256).await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["note"] = json!("x".repeat(1024));

    let resp = server.post("/records", "u1").json(&body).send().await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    expect_error(resp, 413, "PAYLOAD_TOO_LARGE").await;
    assert!(server.records.is_empty().await);
}

#[tokio::test]
async fn test_create_returns_id_and_timestamp() {
    let server = TestServer::start().await;
    let resp = server
        .post("/records", "u1")
        .json(&record_body("Ramen Jiro", "2026-10-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let json: Value = resp.json().await.unwrap();
    let record_id = json["data"]["recordId"].as_str().unwrap();
    assert!(!record_id.is_empty());

    // RFC 3339, UTC, millisecond precision
    let created_at = json["data"]["createdAt"].as_str().unwrap();
    assert!(created_at.ends_with('Z'));
    assert_eq!(created_at.len(), "2026-10-16T09:30:00.123Z".len());

    let detail: Value = server
        .get(&format!("/records/{record_id}"), "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["createdAt"], created_at);
    assert_eq!(detail["data"]["updatedAt"], created_at);
    assert_eq!(detail["data"]["companions"], json!([]));
    assert_eq!(detail["data"]["photos"], json!([]));
}

#[tokio::test]
async fn test_create_missing_rating_is_rejected_without_write() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body.as_object_mut().unwrap().remove("rating");

    let resp = server.post("/records", "u1").json(&body).send().await.unwrap();
    let json = expect_error(resp, 400, "VALIDATION_ERROR").await;
    assert_eq!(json["error"]["details"]["missingFields"], json!(["rating"]));
    assert!(server.records.is_empty().await);
}

#[tokio::test]
async fn test_create_empty_store_name_is_rejected() {
    let server = TestServer::start().await;
    let resp = server
        .post("/records", "u1")
        .json(&record_body("", "2026-10-01"))
        .send()
        .await
        .unwrap();
    let json = expect_error(resp, 400, "VALIDATION_ERROR").await;
    assert_eq!(json["error"]["details"]["missingFields"], json!(["storeName"]));
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let server = TestServer::start().await;

    let resp = server
        .post("/records", "u1")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    expect_error(resp, 400, "VALIDATION_ERROR").await;

    let resp = server
        .post("/records", "u1")
        .json(&json!({"storeName": "Jiro", "latitude": "north", "longitude": 1.0,
                      "visitDate": "2026-10-01", "rating": 3}))
        .send()
        .await
        .unwrap();
    expect_error(resp, 400, "VALIDATION_ERROR").await;
    assert!(server.records.is_empty().await);
}

#[tokio::test]
async fn test_list_25_records_in_pages_of_20() {
    let server = TestServer::start().await;
    for day in 1..=25 {
        server
            .create("u1", record_body(&format!("Store {day}"), &format!("2026-09-{day:02}")))
            .await;
    }
    // Another user's records never show up.
    server.create("u2", record_body("Elsewhere", "2026-09-15")).await;

    let first: Value = server
        .get("/records?limit=20", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = first["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 20);
    assert_eq!(first["data"]["hasMore"], true);
    // Default order is newest visit first.
    assert_eq!(records[0]["visitDate"], "2026-09-25");
    assert!(records[0].get("updatedAt").is_none());
    let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();

    let second: Value = server
        .client
        .get(server.url("/records"))
        .header("X-User-ID", "u1")
        .query(&[("limit", "20"), ("cursor", cursor.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = second["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4]["visitDate"], "2026-09-01");
    assert_eq!(second["data"]["hasMore"], false);
    assert!(second["data"]["nextCursor"].is_null());
}

#[tokio::test]
async fn test_list_ascending_order() {
    let server = TestServer::start().await;
    for date in ["2026-09-03", "2026-09-01", "2026-09-02"] {
        server.create("u1", record_body("Store", date)).await;
    }

    let json: Value = server
        .get("/records?order=asc", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let dates: Vec<&str> = json["data"]["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["visitDate"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2026-09-01", "2026-09-02", "2026-09-03"]);
}

#[tokio::test]
async fn test_list_parameter_validation() {
    let server = TestServer::start().await;

    for query in ["limit=0", "limit=-5", "limit=lots", "sort=rating"] {
        let resp = server
            .get(&format!("/records?{query}"), "u1")
            .send()
            .await
            .unwrap();
        expect_error(resp, 400, "VALIDATION_ERROR").await;
    }

    // Oversized limits are clamped rather than rejected.
    for query in ["limit=1000", "limit=99999999999999999999"] {
        let resp = server
            .get(&format!("/records?{query}"), "u1")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "{query}");
    }
}

#[tokio::test]
async fn test_tampered_cursor_is_rejected() {
    let server = TestServer::start().await;
    for day in 1..=3 {
        server
            .create("u1", record_body("Store", &format!("2026-09-{day:02}")))
            .await;
    }
    let first: Value = server
        .get("/records?limit=1", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();

    let mut tampered = cursor.clone().into_bytes();
    let mid = tampered.len() / 2;
    tampered[mid] = if tampered[mid] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    for bad in [tampered.as_str(), "garbage", "v1.e30.AAAA"] {
        let resp = server
            .client
            .get(server.url("/records"))
            .header("X-User-ID", "u1")
            .query(&[("limit", "1"), ("cursor", bad)])
            .send()
            .await
            .unwrap();
        expect_error(resp, 400, "INVALID_CURSOR").await;
    }

    // A descending cursor cannot resume an ascending scan.
    let resp = server
        .client
        .get(server.url("/records"))
        .header("X-User-ID", "u1")
        .query(&[("order", "asc"), ("cursor", cursor.as_str())])
        .send()
        .await
        .unwrap();
    expect_error(resp, 400, "INVALID_CURSOR").await;
}

#[tokio::test]
async fn test_keyword_filter_matches_case_insensitively() {
    let server = TestServer::start().await;
    server.create("u1", record_body("Ramen Jiro", "2026-10-01")).await;
    let mut with_note = record_body("Sakura Cafe", "2026-10-02");
    with_note["note"] = json!("Matcha latte was great");
    with_note["companions"] = json!(["Hanako"]);
    server.create("u1", with_note).await;

    let names = |json: Value| -> Vec<String> {
        json["data"]["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["storeName"].as_str().unwrap().to_string())
            .collect()
    };

    let jiro: Value = server
        .get("/records?keyword=jiro", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(jiro), ["Ramen Jiro"]);

    let sushi: Value = server
        .get("/records?keyword=sushi", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(names(sushi).is_empty());

    let by_note: Value = server
        .get("/records?keyword=MATCHA", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(by_note), ["Sakura Cafe"]);

    let by_companion: Value = server
        .get("/records?keyword=hana", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(by_companion), ["Sakura Cafe"]);
}

#[tokio::test]
async fn test_keyword_filter_applies_to_fetched_page_only() {
    let server = TestServer::start().await;
    server.create("u1", record_body("Ramen Jiro", "2026-09-01")).await;
    server.create("u1", record_body("Sushi Dai", "2026-09-02")).await;
    server.create("u1", record_body("Tempura Kondo", "2026-09-03")).await;

    // The only match is the oldest record, outside the first page of 2.
    let first: Value = server
        .get("/records?limit=2&keyword=jiro", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["data"]["records"], json!([]));
    assert_eq!(first["data"]["hasMore"], true);

    let cursor = first["data"]["nextCursor"].as_str().unwrap();
    let second: Value = server
        .client
        .get(server.url("/records"))
        .header("X-User-ID", "u1")
        .query(&[("limit", "2"), ("keyword", "jiro"), ("cursor", cursor)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["data"]["records"][0]["storeName"], "Ramen Jiro");
    assert_eq!(second["data"]["hasMore"], false);
}

#[tokio::test]
async fn test_list_thumbnail_is_first_key_verbatim() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["photoKeys"] = json!(["photos/u1/r/original/1.jpg", "photos/u1/r/original/2.jpg"]);
    server.create("u1", body).await;
    server.create("u1", record_body("No Photos", "2026-09-01")).await;

    let json: Value = server
        .get("/records", "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = json["data"]["records"].as_array().unwrap();
    assert_eq!(
        records[0]["thumbnailUrl"],
        format!("{BASE_URL}photos/u1/r/original/1.jpg")
    );
    assert!(records[1]["thumbnailUrl"].is_null());
}

#[tokio::test]
async fn test_detail_projects_photo_urls() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["placeId"] = json!("ChIJ123");
    body["address"] = json!("Mita 2-16-4, Minato");
    body["photoKeys"] = json!(["photos/u/r/original/1.jpg", "legacy/u/r/2.jpg"]);
    let record_id = server.create("u1", body).await;

    let json: Value = server
        .get(&format!("/records/{record_id}"), "u1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail = &json["data"];
    assert_eq!(detail["recordId"], record_id.as_str());
    assert_eq!(detail["placeId"], "ChIJ123");
    assert_eq!(detail["address"], "Mita 2-16-4, Minato");
    assert_eq!(
        detail["photos"][0],
        json!({
            "key": "photos/u/r/original/1.jpg",
            "originalUrl": format!("{BASE_URL}photos/u/r/original/1.jpg"),
            "thumbnailUrl": format!("{BASE_URL}photos/u/r/thumbnail/1.jpg"),
        })
    );
    assert_eq!(detail["photos"][1]["thumbnailUrl"], detail["photos"][1]["originalUrl"]);
}

#[tokio::test]
async fn test_other_users_record_is_not_found() {
    let server = TestServer::start().await;
    let record_id = server.create("owner", record_body("Ramen Jiro", "2026-10-01")).await;

    let resp = server
        .get(&format!("/records/{record_id}"), "intruder")
        .send()
        .await
        .unwrap();
    expect_error(resp, 404, "RECORD_NOT_FOUND").await;

    let resp = server
        .patch(&format!("/records/{record_id}"), "intruder")
        .json(&json!({"note": "mine now"}))
        .send()
        .await
        .unwrap();
    expect_error(resp, 404, "RECORD_NOT_FOUND").await;

    // Delete by another user is a no-op.
    let resp = server
        .delete(&format!("/records/{record_id}"), "intruder")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let resp = server
        .get(&format!("/records/{record_id}"), "owner")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_update_note_leaves_other_fields() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["companions"] = json!(["Aki", "Ren"]);
    body["photoKeys"] = json!(["photos/u1/r/original/1.jpg"]);
    let record_id = server.create("u1", body).await;
    let path = format!("/records/{record_id}");

    let before: Value = server.get(&path, "u1").send().await.unwrap().json().await.unwrap();

    let resp = server
        .patch(&path, "u1")
        .json(&json!({"note": "Garlic, extra vegetables"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["recordId"], record_id.as_str());

    let after: Value = server.get(&path, "u1").send().await.unwrap().json().await.unwrap();
    assert_eq!(after["data"]["note"], "Garlic, extra vegetables");
    for field in ["storeName", "companions", "photos", "visitDate", "rating", "createdAt"] {
        assert_eq!(after["data"][field], before["data"][field], "{field} changed");
    }
    assert!(parse_ts(&after["data"]["updatedAt"]) > parse_ts(&before["data"]["updatedAt"]));
    assert_eq!(after["data"]["updatedAt"], updated["data"]["updatedAt"]);
}

#[tokio::test]
async fn test_put_and_patch_share_semantics() {
    let server = TestServer::start().await;
    let record_id = server.create("u1", record_body("Ramen Jiro", "2026-10-01")).await;
    let path = format!("/records/{record_id}");

    let resp = server
        .put(&path, "u1")
        .json(&json!({"rating": 2.5, "companions": ["Mei"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let after: Value = server.get(&path, "u1").send().await.unwrap().json().await.unwrap();
    assert_eq!(after["data"]["rating"], 2.5);
    assert_eq!(after["data"]["companions"], json!(["Mei"]));
    assert_eq!(after["data"]["storeName"], "Ramen Jiro");
}

#[tokio::test]
async fn test_update_explicit_null_clears() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["note"] = json!("temporary");
    body["companions"] = json!(["Aki"]);
    let record_id = server.create("u1", body).await;
    let path = format!("/records/{record_id}");

    let resp = server
        .patch(&path, "u1")
        .json(&json!({"note": null, "companions": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let after: Value = server.get(&path, "u1").send().await.unwrap().json().await.unwrap();
    assert!(after["data"]["note"].is_null());
    assert_eq!(after["data"]["companions"], json!([]));
}

#[tokio::test]
async fn test_update_cannot_clear_required_fields() {
    let server = TestServer::start().await;
    let record_id = server.create("u1", record_body("Ramen Jiro", "2026-10-01")).await;
    let path = format!("/records/{record_id}");

    for body in [
        json!({"storeName": null}),
        json!({"storeName": ""}),
        json!({"visitDate": null}),
        json!({"rating": null}),
    ] {
        let resp = server.patch(&path, "u1").json(&body).send().await.unwrap();
        expect_error(resp, 400, "VALIDATION_ERROR").await;
    }

    let after: Value = server.get(&path, "u1").send().await.unwrap().json().await.unwrap();
    assert_eq!(after["data"]["storeName"], "Ramen Jiro");
}

#[tokio::test]
async fn test_update_missing_record_is_not_created() {
    let server = TestServer::start().await;
    let resp = server
        .patch("/records/does-not-exist", "u1")
        .json(&json!({"storeName": "Ghost Ramen"}))
        .send()
        .await
        .unwrap();
    expect_error(resp, 404, "RECORD_NOT_FOUND").await;
    assert!(server.records.is_empty().await);
}

#[tokio::test]
async fn test_delete_returns_no_content_and_reclaims_photos() {
    let server = TestServer::start().await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["photoKeys"] = json!([
        "photos/u1/r1/original/1.jpg",
        "photos/u1/r1/original/2.jpg",
        "photos/someone-else/r9/original/1.jpg",
    ]);
    let record_id = server.create("u1", body).await;
    let path = format!("/records/{record_id}");

    let resp = server.delete(&path, "u1").send().await.unwrap();
    assert_eq!(resp.status(), 204);
    assert!(resp.bytes().await.unwrap().is_empty());

    let resp = server.get(&path, "u1").send().await.unwrap();
    expect_error(resp, 404, "RECORD_NOT_FOUND").await;

    // Originals and thumbnails in the owner's namespace only.
    assert_eq!(
        server.photos.deleted_keys(),
        [
            "photos/u1/r1/original/1.jpg",
            "photos/u1/r1/original/2.jpg",
            "photos/u1/r1/thumbnail/1.jpg",
            "photos/u1/r1/thumbnail/2.jpg",
        ]
    );

    // Deleting again is still a success.
    let resp = server.delete(&path, "u1").send().await.unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn test_delete_succeeds_when_photo_cleanup_fails() {
    let server = TestServer::start_with(RecordingStorage {
        fail_delete: true,
        ..Default::default()
    })
    .await;
    let mut body = record_body("Ramen Jiro", "2026-10-01");
    body["photoKeys"] = json!(["photos/u1/r1/original/1.jpg"]);
    let record_id = server.create("u1", body).await;

    let resp = server
        .delete(&format!("/records/{record_id}"), "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert!(server.records.is_empty().await);
}
