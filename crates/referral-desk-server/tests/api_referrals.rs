mod support;

use serde_json::Value;
use support::{encode, header_value, send_json, send_raw, send_raw_with_method, spawn_app, test_config};

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

#[tokio::test]
async fn referral_crud_round_trip() {
    let addr = spawn_app(test_config()).await;

    let (status, head, body) = send_json(
        addr,
        "POST",
        "/v1/referrals",
        &[("x-actor", "alice@example.org")],
        r#"{"first_name":" Ada ","last_name":"Lovelace","lead_source":"kaiser","program":"rtc","referral_source":"  "}"#,
    )
    .await;
    assert_eq!(status, 201, "{body}");
    assert!(header_value(&head, "x-request-id").is_some());
    let created = json(&body);
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(created["first_name"], "Ada");
    assert_eq!(created["lead_source"], "Kaiser");
    assert_eq!(created["program"], "RTC");
    assert_eq!(created["referral_source"], Value::Null);
    assert_eq!(created["created_by"], "alice@example.org");

    let (status, _, body) = send_raw(addr, &format!("/v1/referrals/{id}"), &[]).await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["last_name"], "Lovelace");

    let (status, _, body) = send_json(
        addr,
        "PATCH",
        &format!("/v1/referrals/{id}"),
        &[("x-actor", "bob@example.org")],
        r#"{"admitted":true,"program":""}"#,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let updated = json(&body);
    assert_eq!(updated["admitted"], true);
    assert_eq!(updated["program"], Value::Null);
    assert_eq!(updated["updated_by"], "bob@example.org");
    assert_eq!(updated["created_by"], "alice@example.org");

    let (status, _, body) = send_json(
        addr,
        "PATCH",
        &format!("/v1/referrals/{id}"),
        &[],
        r#"{"program":"Sober living"}"#,
    )
    .await;
    assert_eq!(status, 400, "{body}");
    assert_eq!(json(&body)["error"]["code"], "InvalidBody");

    let (status, _, body) =
        send_raw_with_method(addr, "DELETE", &format!("/v1/referrals/{id}"), &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["deleted"], true);

    let (status, head, body) = send_raw(addr, &format!("/v1/referrals/{id}"), &[]).await;
    assert_eq!(status, 404);
    let err = json(&body);
    assert_eq!(err["error"]["code"], "NotFound");
    assert_eq!(
        err["error"]["request_id"].as_str(),
        header_value(&head, "x-request-id")
    );
}

#[tokio::test]
async fn validation_errors_list_every_field() {
    let addr = spawn_app(test_config()).await;
    let (status, _, body) = send_json(
        addr,
        "POST",
        "/v1/referrals",
        &[("x-request-id", "req-client-1")],
        r#"{"first_name":"","last_name":"","lead_source":"Outreach"}"#,
    )
    .await;
    assert_eq!(status, 422);
    let err = json(&body);
    assert_eq!(err["error"]["code"], "ValidationFailed");
    assert_eq!(err["error"]["request_id"], "req-client-1");
    let fields: Vec<&str> = err["error"]["details"]["field_errors"]
        .as_array()
        .expect("field errors")
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["first_name", "last_name", "outreach_rep"]);

    let (status, _, body) = send_json(addr, "POST", "/v1/referrals", &[], r#"{"first_name":"A","shoe":1}"#).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidBody");

    let (status, _, body) = send_json(addr, "POST", "/v1/referrals", &[], r#"{"first_name":"A","last_name":"B","lead_source":"Billboard"}"#).await;
    assert_eq!(status, 400, "{body}");

    let (status, _, _) = send_raw(addr, "/v1/referrals/not-a-uuid", &[]).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let addr = spawn_app(test_config()).await;
    let (_, _, body) = send_json(
        addr,
        "POST",
        "/v1/referrals",
        &[],
        r#"{"first_name":"A","last_name":"B"}"#,
    )
    .await;
    let id = json(&body)["id"].as_str().expect("id").to_string();
    let (status, _, body) = send_json(addr, "PATCH", &format!("/v1/referrals/{id}"), &[], "{}").await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidBody");
}

#[tokio::test]
async fn list_pages_forward_and_back_with_filters() {
    let addr = spawn_app(test_config()).await;
    for i in 0..5 {
        let program = if i % 2 == 0 { "PHP" } else { "IOP" };
        let payload = format!(
            r#"{{"first_name":"P{i}","last_name":"Page","lead_source":"Direct","program":"{program}"}}"#
        );
        let (status, _, _) = send_json(addr, "POST", "/v1/referrals", &[], &payload).await;
        assert_eq!(status, 201);
    }

    let (status, _, body) = send_raw(addr, "/v1/referrals?limit=2&sort=name&direction=asc", &[]).await;
    assert_eq!(status, 200, "{body}");
    let first = json(&body);
    assert_eq!(first["total_count"], 5);
    assert_eq!(first["page"]["limit"], 2);
    assert_eq!(first["rows"][0]["first_name"], "P0");
    assert_eq!(first["page"]["prev_cursor"], Value::Null);
    let next = first["page"]["next_cursor"].as_str().expect("next").to_string();

    let (status, _, body) = send_raw(
        addr,
        &format!("/v1/referrals?limit=2&sort=name&direction=asc&cursor={}", encode(&next)),
        &[],
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let second = json(&body);
    assert_eq!(second["rows"][0]["first_name"], "P2");
    let prev = second["page"]["prev_cursor"].as_str().expect("prev").to_string();

    let (_, _, body) = send_raw(
        addr,
        &format!("/v1/referrals?limit=2&sort=name&direction=asc&cursor={}", encode(&prev)),
        &[],
    )
    .await;
    assert_eq!(json(&body)["rows"][0]["first_name"], "P0");

    // A cursor only continues the query it was issued for.
    let (status, _, body) = send_raw(
        addr,
        &format!("/v1/referrals?limit=3&sort=name&direction=asc&cursor={}", encode(&next)),
        &[],
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidCursor");

    let (_, _, body) = send_raw(addr, "/v1/referrals?program=php", &[]).await;
    assert_eq!(json(&body)["total_count"], 3);

    let (status, _, body) = send_raw(addr, "/v1/referrals?limit=0", &[]).await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidQueryParameter");
}

#[tokio::test]
async fn export_returns_csv_with_fixed_header() {
    let addr = spawn_app(test_config()).await;
    send_json(
        addr,
        "POST",
        "/v1/referrals",
        &[],
        r#"{"first_name":"Ada","last_name":"Lovelace","referral_source":"St. Mary's, North"}"#,
    )
    .await;
    let (status, head, body) = send_raw(addr, "/v1/referrals/export", &[]).await;
    assert_eq!(status, 200);
    assert!(header_value(&head, "content-type").is_some_and(|v| v.starts_with("text/csv")));
    assert!(header_value(&head, "content-disposition").is_some_and(|v| v.contains("referrals.csv")));
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("ID,First Name,Last Name,Lead Source,Referral Source,Referral Out,Insurance Company,Program,Referral Sent To,Admitted,Outreach Rep,Notes,Created At,Created By")
    );
    let row = lines.next().expect("row");
    assert!(row.contains(",Ada,Lovelace,Insurance,\"St. Mary's, North\","));
    assert!(row.contains(",No,"));
}

#[tokio::test]
async fn records_survive_a_restart_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("referrals.sqlite");
    let app_for = |path: &std::path::Path| {
        let store = referral_desk_store::ReferralStore::open(path).expect("open store");
        referral_desk_server::build_router(referral_desk_server::AppState::new(store, test_config()))
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = app_for(&path);
    let server = tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    let (status, _, body) = send_json(addr, "POST", "/v1/referrals", &[], r#"{"first_name":"Keep","last_name":"Me"}"#).await;
    assert_eq!(status, 201);
    let id = json(&body)["id"].as_str().expect("id").to_string();
    server.abort();
    let _ = server.await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = app_for(&path);
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    let (status, _, body) = send_raw(addr, &format!("/v1/referrals/{id}"), &[]).await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["first_name"], "Keep");
}
