//! End-to-end order fulfillment scenarios. Most run against an in-memory
//! database; the contention test uses a file with a real connection pool.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use retail_core::{
    CreateOrderRequest, Customer, DiscountType, OrderLineRequest, OrderStatus, PaymentMethod,
    Product, Promotion, PromotionStatus,
};
use retail_db::{Database, DbConfig};
use retail_orders::{ErrorCode, OrderService, PaymentRequest, ServiceConfig};
use uuid::Uuid;

struct Shop {
    db: Database,
    service: OrderService,
    customer_id: String,
}

impl Shop {
    async fn open() -> Self {
        Shop::with_config(DbConfig::in_memory()).await
    }

    async fn with_config(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let service = OrderService::with_database(&db, ServiceConfig::default());

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Ana Souza".to_string(),
            phone: None,
            email: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        db.customers().insert(&customer).await.unwrap();

        Shop {
            db,
            service,
            customer_id: customer.id,
        }
    }

    async fn product(&self, name: &str, price_cents: i64, stock: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            barcode: None,
            price_cents,
            category_id: None,
            supplier_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.db.products().insert(&product).await.unwrap();
        self.db.inventory().init(&product.id, stock).await.unwrap();
        product.id
    }

    async fn promotion(&self, code: &str, min_order_cents: i64, usage_limit: i64) -> String {
        let now = Utc::now();
        let today = now.date_naive();
        let promotion = Promotion {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            description: Some("10% off".to_string()),
            discount_type: DiscountType::Percent,
            discount_value: 1_000,
            start_date: today - Duration::days(7),
            end_date: today + Duration::days(7),
            min_order_cents,
            usage_limit,
            used_count: 0,
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.db.promotions().insert(&promotion).await.unwrap();
        promotion.id
    }

    fn request(&self, items: Vec<OrderLineRequest>, promo: Option<&str>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: self.customer_id.clone(),
            user_id: "staff-7".to_string(),
            items,
            promo_code: promo.map(str::to_string),
        }
    }

    async fn stock(&self, product_id: &str) -> i64 {
        self.db
            .inventory()
            .get(product_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    async fn used(&self, promo_id: &str) -> i64 {
        self.db
            .promotions()
            .get_by_id(promo_id)
            .await
            .unwrap()
            .unwrap()
            .used_count
    }
}

#[tokio::test]
async fn test_percent_promotion_on_order_total() {
    let shop = Shop::open().await;
    let monitor = shop.product("Monitor 27in", 50_000, 10).await;
    let promo = shop.promotion("SAVE10", 100_000, 100).await;

    let result = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&monitor, 3)], Some(" save10 ")))
        .await
        .unwrap();

    assert_eq!(result.order.status, OrderStatus::Pending);
    assert_eq!(result.order.total_cents, 150_000);
    assert_eq!(result.order.discount_cents, 15_000);
    assert_eq!(result.final_amount_cents, 135_000);
    assert_eq!(result.order.promo_id.as_deref(), Some(promo.as_str()));
    assert_eq!(shop.stock(&monitor).await, 7);
    assert_eq!(shop.used(&promo).await, 1);

    let history = shop.db.inventory().history(&monitor, 10).await.unwrap();
    assert_eq!(history[0].quantity_change, -3);
    assert_eq!(history[0].quantity_after, 7);
    assert_eq!(history[0].user_id, "staff-7");
}

#[tokio::test]
async fn test_below_minimum_leaves_no_trace() {
    let shop = Shop::open().await;
    let mouse = shop.product("Mouse", 2_500, 10).await;
    let promo = shop.promotion("SAVE10", 100_000, 100).await;

    let err = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&mouse, 2)], Some("SAVE10")))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PromotionBelowMinimum);
    assert_eq!(err.promo_code.as_deref(), Some("SAVE10"));
    assert_eq!(shop.stock(&mouse).await, 10);
    assert_eq!(shop.used(&promo).await, 0);
}

#[tokio::test]
async fn test_rollback_when_second_line_short() {
    let shop = Shop::open().await;
    let chair = shop.product("Office Chair", 80_000, 5).await;
    let lamp = shop.product("Desk Lamp", 6_000, 1).await;

    let err = shop
        .service
        .create_order(shop.request(
            vec![OrderLineRequest::new(&chair, 2), OrderLineRequest::new(&lamp, 2)],
            None,
        ))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(err.line, Some(1));
    assert!(!err.retryable);
    assert_eq!(shop.stock(&chair).await, 5);
    assert_eq!(shop.stock(&lamp).await, 1);

    // Reserve then release, both audited.
    let history = shop.db.inventory().history(&chair, 10).await.unwrap();
    assert_eq!(history[0].quantity_change, 2);
    assert_eq!(history[1].quantity_change, -2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell() {
    let shop = Arc::new(Shop::open().await);
    let router = shop.product("Router", 9_000, 5).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let shop = shop.clone();
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            shop.service
                .create_order(shop.request(vec![OrderLineRequest::new(&router, 3)], None))
                .await
        }));
    }

    let mut created = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => {
                assert_eq!(e.code, ErrorCode::InsufficientStock);
                short += 1;
            }
        }
    }

    assert_eq!((created, short), (1, 1));
    assert_eq!(shop.stock(&router).await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_promotion_limit_holds_under_contention() {
    let shop = Arc::new(Shop::open().await);
    let cable = shop.product("Patch Cable", 1_000, 100).await;
    let promo = shop.promotion("FLASH", 0, 2).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let shop = shop.clone();
        let cable = cable.clone();
        handles.push(tokio::spawn(async move {
            shop.service
                .create_order(shop.request(vec![OrderLineRequest::new(&cable, 1)], Some("flash")))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => {
                assert_eq!(result.order.discount_cents, 100);
                created += 1;
            }
            Err(e) => assert_eq!(e.code, ErrorCode::PromotionLimitReached),
        }
    }

    assert_eq!(created, 2);
    assert_eq!(shop.used(&promo).await, 2);
    // Losers got their stock back.
    assert_eq!(shop.stock(&cable).await, 98);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_pooled_file_database_holds_stock_and_promotion_limits() {
    let dir = tempfile::tempdir().unwrap();
    let shop = Arc::new(
        Shop::with_config(DbConfig::new(dir.path().join("shop.db")).max_connections(8)).await,
    );
    let adapter = shop.product("USB-C Adapter", 2_000, 5).await;
    let promo = shop.promotion("LAUNCH", 0, 3).await;

    let mut handles = Vec::new();
    for _ in 0..40 {
        let shop = shop.clone();
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move {
            shop.service
                .create_order(shop.request(vec![OrderLineRequest::new(&adapter, 1)], Some("LAUNCH")))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => {
                assert_eq!(result.order.discount_cents, 200);
                created += 1;
            }
            Err(e) => assert!(
                matches!(
                    e.code,
                    ErrorCode::InsufficientStock | ErrorCode::PromotionLimitReached
                ),
                "unexpected error: {:?}",
                e
            ),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(shop.used(&promo).await, 3);
    // Promotion losers gave their unit back.
    assert_eq!(shop.stock(&adapter).await, 2);
}

#[tokio::test]
async fn test_cancel_with_promotion_restores_everything() {
    let shop = Shop::open().await;
    let desk = shop.product("Standing Desk", 120_000, 3).await;
    let promo = shop.promotion("SAVE10", 100_000, 1).await;

    let created = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&desk, 1)], Some("SAVE10")))
        .await
        .unwrap();
    assert_eq!(shop.used(&promo).await, 1);

    let canceled = shop.service.cancel_order(&created.order.id).await.unwrap();
    assert_eq!(canceled.order.status, OrderStatus::Canceled);
    assert_eq!(canceled.items.len(), 1);
    assert_eq!(shop.stock(&desk).await, 3);
    assert_eq!(shop.used(&promo).await, 0);

    // The freed use is available again.
    shop.service
        .create_order(shop.request(vec![OrderLineRequest::new(&desk, 1)], Some("SAVE10")))
        .await
        .unwrap();
    assert_eq!(shop.used(&promo).await, 1);
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let shop = Shop::open().await;
    let laptop = shop.product("Laptop Pro", 250_000, 2).await;

    let created = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&laptop, 1)], None))
        .await
        .unwrap();
    let id = created.order.id.clone();

    let paid = shop
        .service
        .pay_order(
            &id,
            Some(PaymentRequest {
                amount_cents: None,
                method: Some(PaymentMethod::Card),
            }),
        )
        .await
        .unwrap();
    assert_eq!(paid.order.status, OrderStatus::Paid);

    let payments = shop.service.payments(&id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_cents, 250_000);
    assert_eq!(payments[0].method, PaymentMethod::Card);

    let again = shop.service.pay_order(&id, None).await.unwrap_err();
    assert_eq!(again.code, ErrorCode::InvalidTransition);

    let cancel = shop.service.cancel_order(&id).await.unwrap_err();
    assert_eq!(cancel.code, ErrorCode::InvalidTransition);
    assert_eq!(shop.stock(&laptop).await, 1);

    // Only one payment: the refused pay didn't record another.
    assert_eq!(shop.service.payments(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_soft_deleted_product_is_not_found() {
    let shop = Shop::open().await;
    let webcam = shop.product("Webcam", 7_500, 4).await;
    shop.db.products().soft_delete(&webcam).await.unwrap();

    let err = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&webcam, 1)], None))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.line, Some(0));
}

#[tokio::test]
async fn test_validation_rejects_before_touching_storage() {
    let shop = Shop::open().await;
    let hub = shop.product("USB Hub", 3_000, 4).await;

    let empty = shop
        .service
        .create_order(shop.request(vec![], None))
        .await
        .unwrap_err();
    assert_eq!(empty.code, ErrorCode::ValidationError);

    let zero = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&hub, 0)], None))
        .await
        .unwrap_err();
    assert_eq!(zero.code, ErrorCode::ValidationError);
    assert_eq!(shop.stock(&hub).await, 4);
}

#[tokio::test]
async fn test_record_payment_and_lookup() {
    let shop = Shop::open().await;
    let switch = shop.product("Switch 8-Port", 15_000, 4).await;

    let created = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&switch, 2)], None))
        .await
        .unwrap();
    let id = created.order.id.clone();

    // Partial payment on a pending order; status stays put.
    let payment = shop.service.record_payment(&id, 10_000, None).await.unwrap();
    assert_eq!(payment.method, PaymentMethod::Cash);

    let fetched = shop.service.get_order(&id).await.unwrap();
    assert_eq!(fetched.order.status, OrderStatus::Pending);
    assert_eq!(fetched.final_amount_cents, 30_000);

    let bad = shop.service.record_payment(&id, 0, None).await.unwrap_err();
    assert_eq!(bad.code, ErrorCode::ValidationError);

    let missing = shop
        .service
        .record_payment("no-such-order", 1_000, None)
        .await
        .unwrap_err();
    assert_eq!(missing.code, ErrorCode::NotFound);

    let missing = shop.service.get_order("no-such-order").await.unwrap_err();
    assert_eq!(missing.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_canceled_order_takes_no_payment() {
    let shop = Shop::open().await;
    let speaker = shop.product("Speaker", 9_000, 4).await;

    let created = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&speaker, 1)], None))
        .await
        .unwrap();
    let id = created.order.id.clone();
    shop.service.cancel_order(&id).await.unwrap();

    let err = shop.service.record_payment(&id, 9_000, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransition);
    assert!(shop.service.payments(&id).await.unwrap().is_empty());

    // A paid order can still get a late record.
    let paid = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&speaker, 1)], None))
        .await
        .unwrap();
    shop.service.pay_order(&paid.order.id, None).await.unwrap();
    shop.service
        .record_payment(&paid.order.id, 9_000, Some(PaymentMethod::Card))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_low_stock_uses_configured_threshold() {
    let shop = Shop::open().await;
    let projector = shop.product("Projector", 60_000, 12).await;
    shop.product("Keyboard", 4_000, 40).await;

    shop.service
        .create_order(shop.request(vec![OrderLineRequest::new(&projector, 3)], None))
        .await
        .unwrap();

    let low = shop.service.low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product_id, projector);
    assert_eq!(low[0].quantity, 9);
}

#[tokio::test]
async fn test_expired_promotion() {
    let shop = Shop::open().await;
    let tablet = shop.product("Tablet", 40_000, 3).await;

    let now = Utc::now();
    let past = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    shop.db
        .promotions()
        .insert(&Promotion {
            id: Uuid::new_v4().to_string(),
            code: "OLD".to_string(),
            description: None,
            discount_type: DiscountType::Fixed,
            discount_value: 5_000,
            start_date: past,
            end_date: past + Duration::days(30),
            min_order_cents: 0,
            usage_limit: 0,
            used_count: 0,
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await
        .unwrap();

    let err = shop
        .service
        .create_order(shop.request(vec![OrderLineRequest::new(&tablet, 1)], Some("OLD")))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PromotionExpired);
    assert_eq!(shop.stock(&tablet).await, 3);
}
