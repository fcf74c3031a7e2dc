mod support;

use serde_json::Value;
use support::{send_json, send_raw, send_raw_with_method, spawn_app, test_config};

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

async fn create(addr: std::net::SocketAddr, partner: &str, rep: &str) -> String {
    let payload = format!(
        r#"{{"referral_partner":"{partner}","referral_rep":"{rep}","referral_contact_info":"555-0100"}}"#
    );
    let (status, _, body) = send_json(addr, "POST", "/v1/referent-contacts", &[("x-actor", "admin")], &payload).await;
    assert_eq!(status, 201, "{body}");
    json(&body)["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn contact_crud_and_filters() {
    let addr = spawn_app(test_config()).await;
    let harbor = create(addr, "Harbor Clinic", "Lee").await;
    create(addr, "Northside Recovery", "Kim").await;

    let (_, _, body) = send_raw(addr, "/v1/referent-contacts", &[]).await;
    assert_eq!(json(&body)["total_count"], 2);

    let (_, _, body) = send_raw(addr, "/v1/referent-contacts?referral_partner=harbor", &[]).await;
    let filtered = json(&body);
    assert_eq!(filtered["total_count"], 1);
    assert_eq!(filtered["rows"][0]["referral_rep"], "Lee");
    assert_eq!(filtered["rows"][0]["created_by"], "admin");

    let (status, _, body) = send_json(
        addr,
        "PATCH",
        &format!("/v1/referent-contacts/{harbor}"),
        &[],
        r#"{"referent_email":"lee@harbor.example"}"#,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(json(&body)["referent_email"], "lee@harbor.example");

    let (status, _, body) = send_json(
        addr,
        "PATCH",
        &format!("/v1/referent-contacts/{harbor}"),
        &[],
        r#"{"referent_email":"not-an-email"}"#,
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(json(&body)["error"]["details"]["field_errors"][0]["field"], "referent_email");

    let (status, _, _) =
        send_raw_with_method(addr, "DELETE", &format!("/v1/referent-contacts/{harbor}"), &[], None).await;
    assert_eq!(status, 200);
    let (status, _, body) = send_raw(addr, &format!("/v1/referent-contacts/{harbor}"), &[]).await;
    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"]["code"], "NotFound");
}

#[tokio::test]
async fn contact_requires_partner_rep_and_contact_info() {
    let addr = spawn_app(test_config()).await;
    let (status, _, body) = send_json(addr, "POST", "/v1/referent-contacts", &[], "{}").await;
    assert_eq!(status, 422);
    assert_eq!(
        json(&body)["error"]["details"]["field_errors"]
            .as_array()
            .map(Vec::len),
        Some(3)
    );

    let (status, _, _) = send_raw(addr, "/v1/referent-contacts?partner=x", &[]).await;
    assert_eq!(status, 400);
}
