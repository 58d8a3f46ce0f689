use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_api::app::{AppServices, build_app};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client.delete(self.url(path)).send().await.unwrap().status()
    }

    async fn create_category(&self, name: &str) -> String {
        let (status, body) = self.post("/categories", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_product(&self, body: Value) -> String {
        let (status, body) = self.post("/products", body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn adjust_to_low_stock_then_reject_overdraw() {
    let srv = TestServer::spawn().await;
    let id = srv
        .create_product(json!({
            "sku": "A-1",
            "name": "Widget",
            "price": "2.50",
            "quantity": 10,
        }))
        .await;

    let (status, body) = srv
        .post(
            &format!("/products/{id}/adjust_stock"),
            json!({ "quantity_change": -7, "reason": "Sale" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["new_quantity"], 3);
    assert_eq!(body["status"], "low_stock");
    assert_eq!(body["is_low_stock"], true);

    let (status, body) = srv
        .post(
            &format!("/products/{id}/adjust_stock"),
            json!({ "quantity_change": -5, "reason": "Sale" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 3);

    let (_, product) = srv.get(&format!("/products/{id}")).await;
    assert_eq!(product["quantity"], 3);
}

#[tokio::test]
async fn adjustment_input_is_validated() {
    let srv = TestServer::spawn().await;
    let id = srv
        .create_product(json!({ "sku": "V-1", "name": "Valve", "price": "1.00", "quantity": 4 }))
        .await;

    let (status, body) = srv
        .post(
            &format!("/products/{id}/adjust_stock"),
            json!({ "quantity_change": 0, "reason": "Count" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "delta");

    let (status, body) = srv
        .post(
            &format!("/products/{id}/adjust_stock"),
            json!({ "quantity_change": 2, "reason": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "reason");

    let (status, body) = srv
        .post(
            "/products/not-a-uuid/adjust_stock",
            json!({ "quantity_change": 2, "reason": "Restock" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, _) = srv
        .post(&format!("/products/{id}/adjust_stock"), json!({ "reason": "Restock" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_defaults_and_uniqueness() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post("/products", json!({ "sku": " GL-1 ", "name": "Glue", "price": "3.10" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sku"], "GL-1");
    assert_eq!(body["quantity"], 0);
    assert_eq!(body["low_stock_threshold"], 5);
    assert_eq!(body["description"], "No description provided.");
    assert_eq!(body["price"], "3.10");
    assert_eq!(body["category_name"], Value::Null);

    let (status, body) = srv
        .post("/products", json!({ "sku": "GL-1", "name": "Other glue", "price": "1.00" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_sku");

    let (status, body) = srv
        .post("/products", json!({ "sku": "GL-2", "name": "Glue", "price": "1.005" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["field"], "price");

    let (status, body) = srv
        .post(
            "/products",
            json!({
                "sku": "GL-3",
                "name": "Glue",
                "price": "1.00",
                "category_id": "018f0000-0000-7000-8000-000000000000",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["entity"], "category");
}

#[tokio::test]
async fn negative_price_and_threshold_name_the_field() {
    let srv = TestServer::spawn().await;

    for price in [json!(-3), json!("-3.00")] {
        let (status, body) = srv
            .post("/products", json!({ "sku": "NEG-1", "name": "Nail", "price": price }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(body["field"], "price");
    }

    let (status, body) = srv
        .post(
            "/products",
            json!({ "sku": "NEG-2", "name": "Nail", "price": "1.00", "low_stock_threshold": -1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["field"], "low_stock_threshold");

    let id = srv
        .create_product(json!({ "sku": "NEG-3", "name": "Nail", "price": "1.00" }))
        .await;
    let (status, body) = srv
        .send(reqwest::Method::PATCH, &format!("/products/{id}"), json!({ "price": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["field"], "price");
}

#[tokio::test]
async fn category_names_collide_case_insensitively() {
    let srv = TestServer::spawn().await;
    srv.create_category("Tools").await;

    let (status, body) = srv.post("/categories", json!({ "name": " tools " })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_name");

    let (status, body) = srv.post("/categories", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "name");
}

#[tokio::test]
async fn batch_reports_each_outcome_in_order() {
    let srv = TestServer::spawn().await;
    let a = srv
        .create_product(json!({ "sku": "B-A", "name": "Alpha", "price": "1.00", "quantity": 10 }))
        .await;
    let b = srv
        .create_product(json!({ "sku": "B-B", "name": "Beta", "price": "1.00", "quantity": 1 }))
        .await;
    let missing = "018f0000-0000-7000-8000-000000000001";

    let (status, body) = srv
        .post(
            "/products/adjust_batch",
            json!({
                "adjustments": [
                    { "product_id": a, "quantity_change": -4, "reason": "Sale" },
                    { "product_id": b, "quantity_change": -2, "reason": "Sale" },
                    { "product_id": missing, "quantity_change": 1, "reason": "Restock" },
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["applied"], 1);
    assert_eq!(body["failed"], 2);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["outcome"], "applied");
    assert_eq!(items[0]["new_quantity"], 6);
    assert_eq!(items[1]["outcome"], "failed");
    assert_eq!(items[1]["kind"], "insufficient_stock");
    assert_eq!(items[2]["kind"], "not_found");
    assert_eq!(items[2]["product_id"], missing);

    let (_, product) = srv.get(&format!("/products/{b}")).await;
    assert_eq!(product["quantity"], 1);

    let (status, body) = srv
        .post(
            "/products/adjust_batch",
            json!({ "product_ids": [a, b], "quantity_change": 10, "reason": "Bulk restock" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 2);
    let (_, product) = srv.get(&format!("/products/{a}")).await;
    assert_eq!(product["quantity"], 16);
}

#[tokio::test]
async fn deleting_a_category_moves_its_products_to_uncategorized() {
    let srv = TestServer::spawn().await;
    let tools = srv.create_category("Tools").await;
    let hammer = srv
        .create_product(json!({
            "sku": "HAM",
            "name": "Hammer",
            "price": "12.00",
            "quantity": 3,
            "category_id": tools,
        }))
        .await;
    srv.create_product(json!({ "sku": "TAPE", "name": "Tape", "price": "0.50", "quantity": 40 }))
        .await;

    let (_, categories) = srv.get("/categories").await;
    assert_eq!(categories[0]["name"], "Tools");
    assert_eq!(categories[0]["product_count"], 1);

    let (_, report) = srv.get("/reports/summary").await;
    assert_eq!(report["total_value"], "56.00");
    assert_eq!(report["total_units"], 43);
    assert_eq!(report["low_stock_count"], 1);
    assert_eq!(report["category_count"], 1);
    let buckets = report["categories"].as_array().unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0]["name"], "Tools");
    assert_eq!(buckets[1]["name"], "Uncategorized");

    let (status, body) = srv
        .send(reqwest::Method::DELETE, &format!("/categories/{tools}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detached_products"], 1);

    let (_, product) = srv.get(&format!("/products/{hammer}")).await;
    assert_eq!(product["category"], Value::Null);
    assert_eq!(product["category_name"], Value::Null);

    let (_, report) = srv.get("/reports/summary").await;
    assert_eq!(report["category_count"], 0);
    let buckets = report["categories"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["name"], "Uncategorized");
    assert_eq!(buckets[0]["units"], 43);
    assert_eq!(buckets[0]["value"], "56.00");

    assert_eq!(srv.delete(&format!("/categories/{tools}")).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_and_orders_products() {
    let srv = TestServer::spawn().await;
    let garden = srv.create_category("Garden").await;
    srv.create_product(json!({
        "sku": "RAKE",
        "name": "Rake",
        "price": "15.00",
        "quantity": 2,
        "category_id": garden,
    }))
    .await;
    srv.create_product(json!({
        "sku": "HOSE",
        "name": "Hose",
        "price": "25.00",
        "quantity": 9,
        "category_id": garden,
    }))
    .await;
    srv.create_product(json!({ "sku": "NAIL", "name": "Nails", "price": "0.05", "quantity": 900 }))
        .await;

    let (status, body) = srv.get(&format!("/products?category={garden}&ordering=-price")).await;
    assert_eq!(status, StatusCode::OK);
    let skus: Vec<_> = body.as_array().unwrap().iter().map(|p| p["sku"].clone()).collect();
    assert_eq!(skus, [json!("HOSE"), json!("RAKE")]);
    assert_eq!(body[0]["category_name"], "Garden");

    let (_, body) = srv.get("/products?uncategorized=true").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["sku"], "NAIL");

    let (_, body) = srv.get("/products?search=ho").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = srv.get("/products?ordering=colour").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "ordering");

    let (_, low) = srv.get("/reports/low-stock").await;
    assert_eq!(low["count"], 1);
    assert_eq!(low["products"][0]["sku"], "RAKE");
}

#[tokio::test]
async fn update_and_delete_product() {
    let srv = TestServer::spawn().await;
    let tools = srv.create_category("Tools").await;
    let id = srv
        .create_product(json!({ "sku": "DRL", "name": "Drill", "price": "80.00", "quantity": 7 }))
        .await;

    let (status, body) = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/products/{id}"),
            json!({ "price": "75.50", "category_id": tools, "low_stock_threshold": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["price"], "75.50");
    assert_eq!(body["category_name"], "Tools");
    assert_eq!(body["quantity"], 7);
    assert_eq!(body["status"], "low_stock");

    let (status, body) = srv
        .send(reqwest::Method::PATCH, &format!("/products/{id}"), json!({ "category_id": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category_name"], Value::Null);

    assert_eq!(srv.delete(&format!("/products/{id}")).await, StatusCode::NO_CONTENT);
    let (status, body) = srv.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_lose_updates() {
    let srv = Arc::new(TestServer::spawn().await);
    let id = srv
        .create_product(json!({ "sku": "C-1", "name": "Counter", "price": "1.00", "quantity": 50 }))
        .await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let srv = srv.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            let delta = if i % 2 == 0 { 3 } else { -1 };
            let (status, _) = srv
                .post(
                    &format!("/products/{id}/adjust_stock"),
                    json!({ "quantity_change": delta, "reason": "Concurrent" }),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let (_, product) = srv.get(&format!("/products/{id}")).await;
    // 50 + 20 * 3 - 20
    assert_eq!(product["quantity"], 90);
}
