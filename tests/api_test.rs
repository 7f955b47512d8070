//! HTTP boundary tests against the in-memory repository and a recording
//! payment processor. No external services are needed.

mod common;

use std::sync::atomic::Ordering;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use checkout_service::application::payment_service::{OrphanedCustomerPolicy, PaymentSettings};
use checkout_service::configure;
use checkout_service::domain::money::Currency;
use checkout_service::domain::order::{Order, OrderStatus};
use checkout_service::handlers::orders::CreateOrderRequest;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{settings, test_app, FailAt, RecordingProcessor, TestApp};

macro_rules! init_app {
    ($app:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($app.state.clone()))
                .configure(configure),
        )
        .await
    };
}

fn order_body() -> Value {
    json!({
        "userId": "user-1",
        "items": [
            { "productId": "couscous", "name": "Couscous Royal", "price": "70.00", "quantity": 2,
              "imageUrl": "https://cdn.example.com/couscous.png" },
            { "productId": "atay", "name": "Mint Tea", "price": "7.50", "quantity": 2 }
        ],
        "subtotal": "155.00",
        "deliveryFee": "15.00",
        "total": "170.00",
        "restaurant": "Dar Zitoun",
        "deliveryOption": "homeDelivery",
        "address": { "street": "Avenue Hassan II", "city": "Rabat", "label": "Work" },
        "paymentMethod": "card",
        "paymentIntentId": "pi_42"
    })
}

fn app() -> TestApp {
    test_app(RecordingProcessor::default(), settings("MAD"))
}

// ── Payment intents ──────────────────────────────────────────────────────────

#[actix_web::test]
async fn mad_amount_is_sent_in_minor_units() {
    let app = app();
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({ "amount": 1000, "userId": "user-1" }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentIntent"], "pi_1_secret_test");
    assert_eq!(body["ephemeralKey"], "ek_test_cus_1");
    assert_eq!(body["customer"], "cus_1");
    assert_eq!(body["publishableKey"], "pk_test_integration");

    let intent = app.processor.last_intent().expect("intent created");
    assert_eq!(intent.amount, 100_000);
    assert_eq!(intent.currency.processor_code(), "mad");
    assert_eq!(intent.customer_id, "cus_1");
    assert_eq!(
        *app.processor.ephemeral_key_versions.lock().unwrap(),
        vec!["2022-11-15".to_string()]
    );
}

#[actix_web::test]
async fn zero_decimal_currency_is_not_multiplied() {
    let app = test_app(RecordingProcessor::default(), settings("JPY"));
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({ "amount": 10 }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    for field in ["paymentIntent", "ephemeralKey", "customer"] {
        assert!(
            body[field].as_str().is_some_and(|v| !v.is_empty()),
            "{field} should be non-empty"
        );
    }
    let intent = app.processor.last_intent().expect("intent created");
    assert_eq!(intent.amount, 10);
    assert_eq!(intent.currency.processor_code(), "jpy");
}

#[actix_web::test]
async fn bad_amounts_are_rejected_without_processor_calls() {
    let app = app();
    let svc = init_app!(app);

    for body in [
        json!({}),
        json!({ "amount": null }),
        json!({ "amount": "1000" }),
        json!({ "amount": "abc" }),
        json!({ "amount": 0 }),
        json!({ "amount": -25 }),
    ] {
        let req = test::TestRequest::post()
            .uri("/create-payment-intent")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
        let err: Value = test::read_body_json(resp).await;
        assert!(err["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.processor.total_calls(), 0);
}

#[actix_web::test]
async fn placeholder_amount_is_used_only_when_enabled() {
    let mut s = settings("MAD");
    s.allow_placeholder_amount = true;
    let app = test_app(RecordingProcessor::default(), s);
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.processor.last_intent().map(|i| i.amount), Some(100_000));
}

#[actix_web::test]
async fn missing_secret_key_is_500_without_customer_creation() {
    let app = test_app(
        RecordingProcessor::default(),
        PaymentSettings::new(Currency::new("MAD").unwrap()),
    );
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({ "amount": 1000 }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let err: Value = test::read_body_json(resp).await;
    assert!(err["error"].as_str().unwrap().contains("secret key"));
    assert_eq!(app.processor.customer_calls(), 0);
}

#[actix_web::test]
async fn ephemeral_key_failure_is_500_after_one_customer() {
    let app = test_app(
        RecordingProcessor::failing_at(FailAt::EphemeralKey),
        settings("MAD"),
    );
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({ "amount": 1000 }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let err: Value = test::read_body_json(resp).await;
    assert!(err.get("paymentIntent").is_none());
    assert!(err["error"]
        .as_str()
        .unwrap()
        .contains("Stripe-Version header is invalid"));
    assert_eq!(app.processor.customer_calls(), 1);
    assert_eq!(app.processor.intents.load(Ordering::SeqCst), 0);
    assert_eq!(app.processor.deletes.load(Ordering::SeqCst), 0);
    assert!(app.repo.is_empty());
}

#[actix_web::test]
async fn delete_policy_removes_orphaned_customer() {
    let mut s = settings("MAD");
    s.orphaned_customer_policy = OrphanedCustomerPolicy::Delete;
    let app = test_app(RecordingProcessor::failing_at(FailAt::Intent), s);
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/create-payment-intent")
        .set_json(json!({ "amount": 1 }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.processor.deletes.load(Ordering::SeqCst), 1);
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[actix_web::test]
async fn create_then_read_order() {
    let app = app();
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(order_body())
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["statusLabel"], "Pending");
    assert_eq!(created["total"], "170.00");
    assert_eq!(created["currency"], "MAD");
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", id))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(fetched["items"][0]["name"], "Couscous Royal");
    assert_eq!(fetched["items"][1]["price"], "7.50");
    assert_eq!(fetched["address"]["city"], "Rabat");
    assert_eq!(fetched["paymentIntentId"], "pi_42");

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}/tracking", id))
        .to_request();
    let tracking: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(tracking["status"], "pending");
    assert_eq!(tracking["steps"][0]["completed"], true);
    assert_eq!(tracking["steps"][1]["completed"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/reorder", id))
        .to_request();
    let reorder: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(reorder["items"].as_array().unwrap().len(), 2);
    assert_eq!(app.repo.len(), 1);
}

#[actix_web::test]
async fn invalid_orders_are_rejected() {
    let app = app();
    let svc = init_app!(app);

    let mut wrong_total = order_body();
    wrong_total["total"] = json!("171.00");
    let mut card_without_intent = order_body();
    card_without_intent["paymentIntentId"] = Value::Null;
    let mut no_address = order_body();
    no_address["address"] = Value::Null;
    let mut bad_decimal = order_body();
    bad_decimal["deliveryFee"] = json!("fifteen");
    let mut unknown_method = order_body();
    unknown_method["paymentMethod"] = json!("bitcoin");
    let mut huge_exponent = order_body();
    huge_exponent["deliveryFee"] = json!("1e10000000");
    let mut long_restaurant = order_body();
    long_restaurant["restaurant"] = json!("R".repeat(300));

    for body in [
        wrong_total,
        card_without_intent,
        no_address,
        bad_decimal,
        unknown_method,
        huge_exponent,
        long_restaurant,
    ] {
        let req = test::TestRequest::post().uri("/orders").set_json(&body).to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
    }
    assert!(app.repo.is_empty());
}

#[actix_web::test]
async fn missing_order_is_404() {
    let app = app();
    let svc = init_app!(app);

    for uri in [
        format!("/orders/{}", Uuid::new_v4()),
        format!("/orders/{}/tracking", Uuid::new_v4()),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&svc, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Not found");
    }
}

#[actix_web::test]
async fn status_updates_follow_the_lifecycle() {
    let app = app();
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(order_body())
        .to_request();
    let created: Value = test::call_and_read_body_json(&svc, req).await;
    let uri = format!("/orders/{}/status", created["id"].as_str().unwrap());

    let patch = |status: &str| {
        test::TestRequest::patch()
            .uri(&uri)
            .set_json(json!({ "status": status }))
            .to_request()
    };

    let resp = test::call_service(&svc, patch("processing")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["status"], "processing");
    assert_eq!(updated["total"], created["total"]);

    let resp = test::call_service(&svc, patch("pending")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(&svc, patch("shipped")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&svc, patch("delivered")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&svc, patch("cancelled")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unknown_stored_status_is_shown_as_unknown() {
    let app = app();
    let svc = init_app!(app);

    let request: CreateOrderRequest = serde_json::from_value(order_body()).unwrap();
    let mut order = Order::place(request.try_into().unwrap(), "MAD", Utc::now());
    order.status = OrderStatus::parse("weird_value");
    let id = order.id;
    app.repo.seed(order).unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", id))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "weird_value");
    assert_eq!(body["statusLabel"], "Unknown status");
    assert_ne!(body["statusLabel"], "Pending");

    let req = test::TestRequest::patch()
        .uri(&format!("/orders/{}/status", id))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn list_filters_by_user_and_clamps_limit() {
    let app = app();
    let svc = init_app!(app);

    for user in ["user-1", "user-1", "user-2"] {
        let mut body = order_body();
        body["userId"] = json!(user);
        let req = test::TestRequest::post().uri("/orders").set_json(&body).to_request();
        assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/orders?userId=user-1&limit=500")
        .to_request();
    let page: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["limit"], 100);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/orders?page=2&limit=2").to_request();
    let page: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn page_far_beyond_the_end_is_empty() {
    let app = app();
    let svc = init_app!(app);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(order_body())
        .to_request();
    assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/orders?page=9223372036854775807&limit=100")
        .to_request();
    let resp = test::call_service(&svc, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["page"], i64::MAX);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn health_is_ok() {
    let app = app();
    let svc = init_app!(app);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&svc, req).await;
    assert_eq!(body, json!({ "status": "ok" }));
}
