mod support;

use serde_json::Value;
use support::{header_value, send_csv, send_raw, spawn_app, test_config};

const CSV: &str = "\
First Name,Last Name,Lead Source,Referral Source,Admitted,Program,Date,Shoe Size
Ana,Diaz,Insurance,Harbor Clinic,Yes,PHP,2024-01-15,9
Ben,Ortiz,insurance,harbor clinic,No,IOP,2024-02-01,10
Cy,Young,Kaiser,,yes,RTC,2024-04-03,
Dee,Lane,Billboard,Harbor Clinic,No,,2024-04-20,
,,,,,,,
Eve,Moss,Direct,St. Jude,no,PHP,2024-05-11,
";

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

#[tokio::test]
async fn import_then_report_metrics() {
    let addr = spawn_app(test_config()).await;

    let (status, _, body) = send_csv(
        addr,
        "/v1/referrals/import?batch_size=2",
        &[("x-actor", "importer@example.org")],
        CSV,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let report = json(&body);
    assert_eq!(report["rows_read"], 5);
    assert_eq!(report["written"], 4);
    assert_eq!(report["skipped_blank"], 1);
    assert_eq!(report["unmapped_headers"], serde_json::json!(["Shoe Size"]));
    assert_eq!(report["row_errors"][0]["line"], 5);
    assert_eq!(report["dry_run"], false);

    let (_, _, body) = send_raw(addr, "/v1/referrals?limit=10&sort=name&direction=asc", &[]).await;
    let list = json(&body);
    assert_eq!(list["total_count"], 4);
    assert_eq!(list["rows"][0]["created_by"], "importer@example.org");
    assert_eq!(list["rows"][0]["created_at"], "2024-01-15T00:00:00Z");

    let (status, _, body) = send_raw(addr, "/v1/metrics", &[]).await;
    assert_eq!(status, 200, "{body}");
    let metrics = json(&body);
    assert_eq!(metrics["report"]["overview"]["total"], 4);
    assert_eq!(metrics["report"]["overview"]["admitted"], 2);
    assert_eq!(metrics["report"]["overview"]["conversion_rate"], 50.0);
    assert!(metrics.get("groups").is_none());

    let (_, _, body) = send_raw(
        addr,
        "/v1/metrics?group_by=referral-source&sort=key&direction=asc",
        &[],
    )
    .await;
    let grouped = json(&body);
    assert_eq!(grouped["group_by"], "referral_source");
    let groups = grouped["groups"].as_array().expect("groups");
    assert_eq!(groups.len(), 3);
    let harbor = groups
        .iter()
        .find(|g| g["key"].as_str().is_some_and(|k| k.eq_ignore_ascii_case("harbor clinic")))
        .expect("case-folded group");
    assert_eq!(harbor["total"], 2);
    assert_eq!(harbor["admitted"], 1);

    let (_, _, body) = send_raw(addr, "/v1/metrics?lead_source=insurance", &[]).await;
    assert_eq!(json(&body)["report"]["overview"]["total"], 2);

    let (_, _, body) = send_raw(addr, "/v1/metrics?created_from=2024-04-01", &[]).await;
    assert_eq!(json(&body)["report"]["overview"]["total"], 2);

    let (status, _, _) = send_raw(addr, "/v1/metrics?created_from=2024-05-01&created_to=2024-04-01", &[]).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn two_digit_years_are_rejected() {
    let addr = spawn_app(test_config()).await;
    let csv = "First Name,Last Name,Lead Source,Date\nAna,Diaz,Kaiser,3/7/24\nBen,Ortiz,Kaiser,3/7/2024\n";
    let (status, _, body) = send_csv(addr, "/v1/referrals/import", &[], csv).await;
    assert_eq!(status, 200, "{body}");
    let report = json(&body);
    assert_eq!(report["written"], 1);
    assert_eq!(report["row_errors"][0]["line"], 2);

    let (status, _, body) = send_raw(addr, "/v1/metrics?created_from=24-01-01", &[]).await;
    assert_eq!(status, 400, "{body}");
    assert_eq!(json(&body)["error"]["code"], "InvalidQueryParameter");
}

#[tokio::test]
async fn dry_run_import_writes_nothing() {
    let addr = spawn_app(test_config()).await;
    let (status, _, body) = send_csv(addr, "/v1/referrals/import?dry_run=true", &[], CSV).await;
    assert_eq!(status, 200, "{body}");
    let report = json(&body);
    assert_eq!(report["rows_valid"], 4);
    assert_eq!(report["written"], 0);
    assert_eq!(report["dry_run"], true);

    let (_, _, body) = send_raw(addr, "/v1/referrals", &[]).await;
    assert_eq!(json(&body)["total_count"], 0);
}

#[tokio::test]
async fn import_rejects_files_without_name_columns() {
    let addr = spawn_app(test_config()).await;
    let (status, _, body) = send_csv(addr, "/v1/referrals/import", &[], "Program,Admitted\nPHP,Yes\n").await;
    assert_eq!(status, 400);
    assert_eq!(json(&body)["error"]["code"], "InvalidBody");

    let (status, _, body) = send_csv(addr, "/v1/referrals/import?batch_size=0", &[], CSV).await;
    assert_eq!(status, 400, "{body}");
}

#[tokio::test]
async fn metrics_export_is_csv() {
    let addr = spawn_app(test_config()).await;
    send_csv(addr, "/v1/referrals/import", &[], CSV).await;

    let (status, head, body) = send_raw(addr, "/v1/metrics/export", &[]).await;
    assert_eq!(status, 200);
    assert!(header_value(&head, "content-disposition").is_some_and(|v| v.contains("metrics-lead_source.csv")));
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "Group,Total,Admitted,Conversion Rate");
    assert_eq!(lines[1], "Insurance,2,1,50.0");

    let (status, head, body) = send_raw(addr, "/v1/metrics/export?group_by=program&sort=key&direction=asc", &[]).await;
    assert_eq!(status, 200);
    assert!(header_value(&head, "content-disposition").is_some_and(|v| v.contains("metrics-program.csv")));
    assert_eq!(body.lines().nth(1), Some("IOP,1,0,0.0"));
}
