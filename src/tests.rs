//! Integration tests for the directory backend.
//!
//! Each fixture starts a fake spreadsheet server plus the real router, both
//! on random local ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Form, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::directory::DirectoryCache;
use crate::fetch::DirectoryFetcher;
use crate::{create_router, AppState};

const SHEET_CSV: &str = "\
Name,Location,Expertise,Link,Show,Order
Ann,NYC,\"Branding,UX\",http://a,Yes,1
,LA,UX,http://b,Yes,2
Bo,LA,UX,http://c,No,3
Cy,LA,UX,http://d,Yes,4
Di,,Motion,http://e,Yes,5
";

const SHEET_GVIZ: &str = r#"/*O_o*/
google.visualization.Query.setResponse({"version":"0.6","reqId":"0","status":"ok","table":{"cols":[{"id":"A","label":"Name","type":"string"}],"rows":[{"c":[{"v":"Zed"},{"v":"Berlin"},{"v":"Type, Motion"},{"v":"http://z"},{"v":"Yes"},{"v":2.0,"f":"2"}]},{"c":[{"v":"Yan"},null,{"v":"Type"},null,{"v":"No"},null]}]}});"#;

const SERVICE_ACCOUNT_EMAIL: &str = "directory@test-project.iam.gserviceaccount.com";
const SERVICE_ACCOUNT_KEY: &str = include_str!("testdata/service_account.pem");
const SERVICE_ACCOUNT_PUBLIC_KEY: &str = include_str!("testdata/service_account.pub.pem");
const ACCESS_TOKEN: &str = "ya29.test-access-token";
const SHEET_ID: &str = "1AbCdEf-directory";

/// Fake spreadsheet host. The CSV body and status can be swapped mid-test.
#[derive(Clone)]
struct Upstream {
    csv: Arc<RwLock<String>>,
    csv_status: Arc<RwLock<StatusCode>>,
    /// Authorization header of the last `values` request.
    authorization: Arc<RwLock<Option<String>>>,
}

async fn serve_csv(State(upstream): State<Upstream>) -> (StatusCode, String) {
    let status = *upstream.csv_status.read().await;
    (status, upstream.csv.read().await.clone())
}

/// Token endpoint: checks the signed assertion like the real one would.
async fn issue_token(
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if form.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    let assertion = form.get("assertion").ok_or(StatusCode::BAD_REQUEST)?;

    let key = DecodingKey::from_rsa_pem(SERVICE_ACCOUNT_PUBLIC_KEY.as_bytes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let claims = decode::<Value>(assertion, &key, &validation)
        .map_err(|_| StatusCode::UNAUTHORIZED)?
        .claims;

    if claims["iss"] != SERVICE_ACCOUNT_EMAIL
        || claims["scope"] != "https://www.googleapis.com/auth/spreadsheets.readonly"
    {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3599
    })))
}

async fn serve_values(
    State(upstream): State<Upstream>,
    Path((sheet_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *upstream.authorization.write().await = authorization.clone();

    let expected = format!("Bearer {}", ACCESS_TOKEN);
    if authorization.as_deref() != Some(expected.as_str()) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if sheet_id != SHEET_ID || range != "Sheet1" {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({
        "range": "Sheet1!A1:Z1000",
        "majorDimension": "ROWS",
        "values": [
            ["Name", "Location", "Expertise", "Link", "Show", "Order"],
            ["Ann", "NYC", "Branding, UX", "http://a", "Yes", "1"],
            ["Bo", "LA", "UX", "http://c", "No", "3"],
            ["Cy", "LA", "UX", "http://d", "Yes"],
            ["Dot", "Oslo"]
        ]
    })))
}

async fn serve_gviz() -> &'static str {
    SHEET_GVIZ
}

async fn serve_garbage() -> &'static str {
    "<html>Sign in to continue</html>"
}

async fn serve_failure() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    upstream: Upstream,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_env(&[("DIRECTORY_SOURCE_URL", "{upstream}/sheet.csv")]).await
    }

    /// `{upstream}` in values is replaced by the fake sheet server address.
    async fn with_env(pairs: &[(&str, &str)]) -> Self {
        let upstream = Upstream {
            csv: Arc::new(RwLock::new(SHEET_CSV.to_string())),
            csv_status: Arc::new(RwLock::new(StatusCode::OK)),
            authorization: Arc::new(RwLock::new(None)),
        };
        let sheet_app = Router::new()
            .route("/sheet.csv", get(serve_csv))
            .route("/token", post(issue_token))
            .route(
                "/v4/spreadsheets/{sheet_id}/values/{range}",
                get(serve_values),
            )
            .route("/gviz", get(serve_gviz))
            .route("/garbage", get(serve_garbage))
            .route("/broken", get(serve_failure))
            .with_state(upstream.clone());
        let sheet_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind upstream");
        let sheet_url = format!(
            "http://{}",
            sheet_listener.local_addr().expect("Failed to get addr")
        );
        tokio::spawn(async move {
            axum::serve(sheet_listener, sheet_app).await.unwrap();
        });

        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.replace("{upstream}", &sheet_url)))
            .collect();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid config");

        let fetcher = DirectoryFetcher::new(Client::new(), config.source.clone());
        let state = AppState {
            directory: Arc::new(DirectoryCache::new(
                fetcher,
                config.display_order,
                config.revalidate,
            )),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for servers to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            upstream,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

fn names(designers: &Value) -> Vec<&str> {
    designers
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect()
}

fn labels(facets: &Value, category: &str) -> Vec<String> {
    facets
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["category"] == category)
        .map(|f| f["label"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_designers_drop_unnamed_and_unapproved_rows() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(names(&body["data"]), vec!["Ann", "Cy", "Di"]);

    let ann = &body["data"][0];
    assert_eq!(ann["expertise"], "Branding,UX");
    assert_eq!(ann["expertiseTags"], json!(["Branding", "UX"]));
    assert_eq!(ann["location"], "NYC");
    assert_eq!(ann["link"], "http://a");
    assert_eq!(ann["sortOrder"], 1);
    assert!(body["revisionId"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_directory_includes_facets() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/directory").await;

    assert_eq!(status, 200);
    let facets = &body["data"]["facets"];
    assert_eq!(labels(facets, "expertise"), vec!["Branding", "UX", "Motion"]);
    assert_eq!(labels(facets, "location"), vec!["LA", "NYC"]);
    assert!(facets
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["active"] == false));
    assert!(body["data"]["generatedAt"].is_string());
}

#[tokio::test]
async fn test_facets_by_category() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/facets?category=location").await;
    assert_eq!(status, 200);
    assert_eq!(labels(&body["data"], "location"), vec!["LA", "NYC"]);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, all) = fixture.get("/api/facets").await;
    assert_eq!(all["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_toggle_location_then_back() {
    let fixture = TestFixture::new().await;

    let (status, on) = fixture
        .post(
            "/api/filter/toggle",
            json!({ "toggle": { "category": "location", "label": "LA" } }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(on["data"]["cleared"], false);
    // LA or no location, any expertise
    assert_eq!(names(&on["data"]["designers"]), vec!["Cy", "Di"]);

    let (_, off) = fixture
        .post(
            "/api/filter/toggle",
            json!({
                "active": [{ "category": "location", "label": "LA" }],
                "toggle": { "category": "location", "label": "LA" }
            }),
        )
        .await;

    let (_, all) = fixture.get("/api/designers").await;
    assert_eq!(off["data"]["cleared"], true);
    assert_eq!(off["data"]["designers"], all["data"]);
}

#[tokio::test]
async fn test_apply_filter_combines_categories() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/filter",
            json!({ "active": [
                { "category": "expertise", "label": "UX" },
                { "category": "location", "label": "NYC" }
            ]}),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(names(&body["data"]["designers"]), vec!["Ann"]);

    let (_, nothing) = fixture
        .post(
            "/api/filter",
            json!({ "active": [
                { "category": "expertise", "label": "Motion" },
                { "category": "location", "label": "LA" }
            ]}),
        )
        .await;
    // Di has no location, which never excludes
    assert_eq!(names(&nothing["data"]["designers"]), vec!["Di"]);
}

#[tokio::test]
async fn test_clear_filter() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post("/api/filter/clear", json!({})).await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["cleared"], true);
    assert_eq!(names(&body["data"]["designers"]), vec!["Ann", "Cy", "Di"]);
}

#[tokio::test]
async fn test_unknown_facet_is_validation_error() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/filter/toggle",
            json!({ "toggle": { "category": "location", "label": "Mars" } }),
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_visualization_source() {
    let fixture = TestFixture::with_env(&[
        ("DIRECTORY_SOURCE", "gviz"),
        ("DIRECTORY_SOURCE_URL", "{upstream}/gviz"),
    ])
    .await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 200);
    assert_eq!(names(&body["data"]), vec!["Zed"]);
    assert_eq!(body["data"][0]["expertiseTags"], json!(["Type", "Motion"]));
    assert_eq!(body["data"][0]["sortOrder"], 2);
}

#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let fixture = TestFixture::with_env(&[
        ("DIRECTORY_SOURCE", "gviz"),
        ("DIRECTORY_SOURCE_URL", "{upstream}/garbage"),
    ])
    .await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 502);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UPSTREAM_MALFORMED");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let fixture =
        TestFixture::with_env(&[("DIRECTORY_SOURCE_URL", "{upstream}/broken")]).await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_missing_sheet_id_is_configuration_error() {
    let fixture = TestFixture::with_env(&[]).await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("DIRECTORY_SHEET_ID"));

    // Revision info still answers
    let (status, revision) = fixture.get("/api/directory/revision").await;
    assert_eq!(status, 200);
    assert!(revision["data"]["revisionId"].is_number());
}

#[tokio::test]
async fn test_stale_snapshot_is_revalidated() {
    let fixture = TestFixture::with_env(&[
        ("DIRECTORY_SOURCE_URL", "{upstream}/sheet.csv"),
        ("DIRECTORY_REVALIDATE_SECS", "0"),
    ])
    .await;

    let (_, first) = fixture.get("/api/designers").await;
    assert_eq!(names(&first["data"]), vec!["Ann", "Cy", "Di"]);

    *fixture.upstream.csv.write().await =
        "Name,Location,Expertise,Link,Show,Order\nEve,Oslo,Type,http://f,Yes,1\n".to_string();

    // Served from the old snapshot while a refresh runs in the background
    let (_, second) = fixture.get("/api/designers").await;
    assert_eq!(names(&second["data"]), vec!["Ann", "Cy", "Di"]);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (_, third) = fixture.get("/api/designers").await;
    assert_eq!(names(&third["data"]), vec!["Eve"]);
    assert!(third["revisionId"].as_u64().unwrap() > first["revisionId"].as_u64().unwrap());
}

#[tokio::test]
async fn test_failed_revalidation_keeps_loaded_directory() {
    let fixture = TestFixture::with_env(&[
        ("DIRECTORY_SOURCE_URL", "{upstream}/sheet.csv"),
        ("DIRECTORY_REVALIDATE_SECS", "0"),
    ])
    .await;

    let (_, first) = fixture.get("/api/designers").await;
    assert_eq!(names(&first["data"]), vec!["Ann", "Cy", "Di"]);

    *fixture.upstream.csv_status.write().await = StatusCode::SERVICE_UNAVAILABLE;

    // Starts a refresh that fails
    fixture.get("/api/designers").await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, during) = fixture.get("/api/designers").await;
    assert_eq!(status, 200);
    assert_eq!(names(&during["data"]), vec!["Ann", "Cy", "Di"]);
    assert_eq!(during["revisionId"], first["revisionId"]);

    // Recovers once the sheet answers again
    *fixture.upstream.csv.write().await =
        "Name,Location,Expertise,Link,Show,Order\nEve,Oslo,Type,http://f,Yes,1\n".to_string();
    *fixture.upstream.csv_status.write().await = StatusCode::OK;
    fixture.get("/api/designers").await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (_, after) = fixture.get("/api/designers").await;
    assert_eq!(names(&after["data"]), vec!["Eve"]);
}

#[tokio::test]
async fn test_selection_from_older_revision_is_cleared() {
    let fixture = TestFixture::with_env(&[
        ("DIRECTORY_SOURCE_URL", "{upstream}/sheet.csv"),
        ("DIRECTORY_REVALIDATE_SECS", "1"),
    ])
    .await;

    let (_, directory) = fixture.get("/api/directory").await;
    let revision = directory["revisionId"].as_u64().unwrap();

    let (_, on) = fixture
        .post(
            "/api/filter/toggle",
            json!({
                "revisionId": revision,
                "toggle": { "category": "location", "label": "LA" }
            }),
        )
        .await;
    assert_eq!(on["data"]["cleared"], false);
    assert_eq!(names(&on["data"]["designers"]), vec!["Cy", "Di"]);

    *fixture.upstream.csv.write().await = "\
Name,Location,Expertise,Link,Show,Order
Gus,Rome,Type,http://g,Yes,2
Fay,LA,UX,http://f,Yes,1
"
    .to_string();

    // Let the snapshot go stale, then refresh it in the background
    tokio::time::sleep(Duration::from_millis(1100)).await;
    fixture.get("/api/designers").await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = fixture
        .post(
            "/api/filter",
            json!({
                "revisionId": revision,
                "active": [{ "category": "location", "label": "LA" }]
            }),
        )
        .await;

    assert_eq!(status, 200);
    assert!(body["revisionId"].as_u64().unwrap() > revision);
    assert_eq!(body["data"]["cleared"], true);
    assert_eq!(names(&body["data"]["designers"]), vec!["Fay", "Gus"]);
    assert!(body["data"]["facets"]
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["active"] == false));

    // A facet that vanished with the refresh is not an error either
    let (status, gone) = fixture
        .post(
            "/api/filter/toggle",
            json!({
                "revisionId": revision,
                "active": [{ "category": "location", "label": "LA" }],
                "toggle": { "category": "location", "label": "NYC" }
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(gone["data"]["cleared"], true);
    assert_eq!(names(&gone["data"]["designers"]), vec!["Fay", "Gus"]);
}

fn sheets_api_env(client_email: &str, private_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("DIRECTORY_SOURCE", "sheets-api".to_string()),
        ("DIRECTORY_SHEET_ID", SHEET_ID.to_string()),
        ("GOOGLE_CLIENT_EMAIL", client_email.to_string()),
        ("GOOGLE_PRIVATE_KEY", private_key.to_string()),
        ("GOOGLE_TOKEN_URL", "{upstream}/token".to_string()),
        ("GOOGLE_SHEETS_API_BASE", "{upstream}/v4/spreadsheets".to_string()),
    ]
}

#[tokio::test]
async fn test_sheets_api_source() {
    // Keys usually arrive through the environment with escaped newlines
    let escaped_key = SERVICE_ACCOUNT_KEY.replace('\n', "\\n");
    let env = sheets_api_env(SERVICE_ACCOUNT_EMAIL, &escaped_key);
    let pairs: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let fixture = TestFixture::with_env(&pairs).await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 200);
    assert_eq!(names(&body["data"]), vec!["Ann", "Cy"]);
    assert_eq!(body["data"][0]["expertiseTags"], json!(["Branding", "UX"]));
    assert_eq!(body["data"][1]["sortOrder"], 0);
    assert_eq!(
        fixture.upstream.authorization.read().await.as_deref(),
        Some(format!("Bearer {}", ACCESS_TOKEN).as_str())
    );
}

#[tokio::test]
async fn test_sheets_api_rejected_assertion_is_reported() {
    let env = sheets_api_env(
        "someone-else@test-project.iam.gserviceaccount.com",
        SERVICE_ACCOUNT_KEY,
    );
    let pairs: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let fixture = TestFixture::with_env(&pairs).await;

    let (status, body) = fixture.get("/api/designers").await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    // the values endpoint was never reached
    assert!(fixture.upstream.authorization.read().await.is_none());
}
