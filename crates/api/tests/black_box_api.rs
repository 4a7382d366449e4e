use reqwest::StatusCode;
use serde_json::{json, Value};

use stockroom_api::config::ApiConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = stockroom_api::app::build_app(&ApiConfig::default())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn drill() -> Value {
    json!({
        "name": "Cordless Drill",
        "description": "18V, two batteries",
        "sku": "DRILL-001",
        "price": 129.99,
        "initialStock": 15,
        "reorderLevel": 5
    })
}

async fn create(client: &reqwest::Client, srv: &TestServer, body: Value) -> reqwest::Response {
    client
        .post(srv.url("/products"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn move_stock(
    client: &reqwest::Client,
    srv: &TestServer,
    id: &str,
    body: Value,
) -> reqwest::Response {
    client
        .put(srv.url(&format!("/products/{id}/stock")))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn get_json(client: &reqwest::Client, srv: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = client.get(srv.url(path)).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_healthy() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, &srv, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn drill_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // 1) Create.
    let res = create(&client, &srv, drill()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let product: Value = res.json().await.unwrap();
    let id = product["id"].as_str().unwrap().to_string();
    assert_eq!(product["stockQuantity"], 15);
    assert_eq!(product["isLowStock"], false);
    assert_eq!(product["isActive"], true);
    assert_eq!(product["price"], "129.99");

    let (status, history) = get_json(&client, &srv, &format!("/products/{id}/movements")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["movementType"], "StockIn");
    assert_eq!(history[0]["quantity"], 15);
    assert_eq!(history[0]["notes"], "Initial stock");
    assert_eq!(history[0]["productName"], "Cordless Drill");

    // 2) Sell 12 (movement type by name).
    let res = move_stock(
        &client,
        &srv,
        &id,
        json!({"movementType": "StockOut", "quantity": 12, "notes": "sale"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["product"]["stockQuantity"], 3);
    assert_eq!(body["product"]["isLowStock"], true);
    assert_eq!(body["movement"]["movementType"], "StockOut");
    assert_eq!(body["movement"]["quantity"], 12);

    // 3) Oversell (movement type by code).
    let res = move_stock(&client, &srv, &id, json!({"movementType": 2, "quantity": 10})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "negative_stock_result");
    let (_, product) = get_json(&client, &srv, &format!("/products/{id}")).await;
    assert_eq!(product["stockQuantity"], 3);

    // 4) Zero out.
    let res = move_stock(&client, &srv, &id, json!({"movementType": "adjustment", "quantity": 0})).await;
    assert_eq!(res.status(), StatusCode::OK);

    // 5) Low stock.
    let (status, low) = get_json(&client, &srv, "/products/low-stock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low.as_array().unwrap().len(), 1);
    assert_eq!(low[0]["id"], id.as_str());
    assert_eq!(low[0]["shortfall"], 5);

    // 6) Duplicate SKU.
    let res = create(&client, &srv, drill()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "duplicate_sku");

    let (_, all) = get_json(&client, &srv, "/products").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (_, movements) = get_json(&client, &srv, "/movements").await;
    let kinds: Vec<&str> = movements
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movementType"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["Adjustment", "StockOut", "StockIn"]);
}

#[tokio::test]
async fn stock_update_rejections_map_to_error_codes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = create(&client, &srv, drill()).await;
    let id = res.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();

    let cases = [
        (json!({"movementType": "Transfer", "quantity": 1}), "invalid_movement_type"),
        (json!({"movementType": 7, "quantity": 1}), "invalid_movement_type"),
        (json!({"movementType": "StockIn", "quantity": 0}), "invalid_quantity"),
        (json!({"movementType": "StockOut", "quantity": -3}), "invalid_quantity"),
        (json!({"movementType": "StockIn", "quantity": 1, "notes": "n".repeat(501)}), "validation_error"),
        (json!({"movementType": "StockIn"}), "validation_error"),
    ];
    for (body, code) in cases {
        let res = move_stock(&client, &srv, &id, body.clone()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], code, "{body}");
        assert!(err["message"].is_string());
    }

    let (_, history) = get_json(&client, &srv, &format!("/products/{id}/movements")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let unknown = "0190a5c8-0000-7000-8000-000000000000";

    for path in [format!("/products/{unknown}"), "/products/not-a-uuid".to_string()] {
        let (status, body) = get_json(&client, &srv, &path).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    let res = move_stock(&client, &srv, unknown, json!({"movementType": "StockIn", "quantity": 1})).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Unknown movement type is reported before the product lookup.
    let res = move_stock(&client, &srv, unknown, json!({"movementType": "Teleport", "quantity": 1})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (status, history) = get_json(&client, &srv, &format!("/products/{unknown}/movements")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn create_validation_errors_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut blank_name = drill();
    blank_name["name"] = json!("  ");
    let mut negative_price = drill();
    negative_price["price"] = json!(-1);
    let mut long_sku = drill();
    long_sku["sku"] = json!("S".repeat(51));
    let mut sub_cent_price = drill();
    sub_cent_price["price"] = json!("1.999");
    let mut huge_price = drill();
    huge_price["price"] = json!("10000000000000000");

    for body in [
        blank_name,
        negative_price,
        long_sku,
        sub_cent_price,
        huge_price,
        json!({"name": "no sku"}),
    ] {
        let res = create(&client, &srv, body.clone()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error", "{body}");
    }

    let (_, all) = get_json(&client, &srv, "/products").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn update_and_deactivate_product() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = create(&client, &srv, drill()).await;
    let id = res.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.url(&format!("/products/{id}")))
        .json(&json!({"name": "Hammer Drill", "description": "", "price": "149.00", "reorderLevel": 20}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let product: Value = res.json().await.unwrap();
    assert_eq!(product["name"], "Hammer Drill");
    assert_eq!(product["sku"], "DRILL-001");
    assert_eq!(product["stockQuantity"], 15);
    assert_eq!(product["isLowStock"], true);

    let res = client
        .delete(srv.url(&format!("/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&client, &srv, &format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let res = client
        .delete(srv.url(&format!("/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // History survives deactivation and still shows the product's name.
    let (_, movements) = get_json(&client, &srv, "/movements").await;
    assert_eq!(movements.as_array().unwrap().len(), 1);
    assert_eq!(movements[0]["productName"], "Hammer Drill");

    // The SKU stays taken.
    let res = create(&client, &srv, drill()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
