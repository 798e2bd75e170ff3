mod common;

use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use common::*;
use fractic_store_billing::{
    ActivityResult, BillingError, BillingEvent, BillingRepository, BillingRepositoryImpl,
    BillingStatus, BroadcastRegistry, Bundle, ChannelListener, HostBindings, ItemType,
    PurchaseClient, PurchaseLauncher, PurchaseRequest, Receipt, ResponseCode, SetupPhase,
};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    client: PurchaseClient<BillingRepositoryImpl>,
    events: UnboundedReceiver<BillingEvent>,
    service: Arc<FakeStoreService>,
    env: Arc<FakeEnvironment>,
    launcher: Arc<RecordingLauncher>,
    keys: TestKeys,
}

fn host(
    service: &Arc<FakeStoreService>,
    env: &Arc<FakeEnvironment>,
    launcher: &Arc<dyn PurchaseLauncher>,
) -> HostBindings {
    HostBindings::new(env.clone(), launcher)
        .with_service(service.clone())
        .with_registry(Arc::new(BroadcastRegistry::new()))
}

async fn configured(service: FakeStoreService, keys: TestKeys) -> Harness {
    let service = Arc::new(service);
    let env = FakeEnvironment::new(900_000);
    let launcher = Arc::new(RecordingLauncher::default());
    let launcher_dyn: Arc<dyn PurchaseLauncher> = launcher.clone();
    let client = PurchaseClient::new(keys.config(), host(&service, &env, &launcher_dyn)).unwrap();

    let (listener, mut events) = ChannelListener::new();
    client.configure(listener).await;
    assert_eq!(
        next_event(&mut events).await,
        BillingEvent::Status(BillingStatus::SetupSuccess)
    );
    assert!(matches!(
        next_event(&mut events).await,
        BillingEvent::InventoryFinished(_)
    ));
    Harness {
        client,
        events,
        service,
        env,
        launcher,
        keys,
    }
}

#[tokio::test]
async fn purchase_round_trip_with_auto_consume() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    assert_eq!(h.client.phase(), SetupPhase::Ready);
    assert!(h.client.subscriptions_supported());

    h.client
        .launch_purchase(PurchaseRequest::new("gas").auto_consume(true))
        .await;
    assert_eq!(h.launcher.count(), 1);
    assert_eq!(h.service.calls_named("get_buy_intent"), 1);
    assert!(h.client.is_purchase_in_flight());

    let data = purchase_result(&h.keys, "gas", "tok-1");
    assert!(h.client.handle_purchase_result(ActivityResult::Ok, Some(data.clone())));

    match next_event(&mut h.events).await {
        BillingEvent::BillingSuccess(receipt) => {
            assert_eq!(receipt.sku(), "gas");
            assert_eq!(receipt.token(), "tok-1");
        }
        other => panic!("expected success, got {other:?}"),
    }
    match next_event(&mut h.events).await {
        BillingEvent::ConsumeFinished { receipt, success } => {
            assert_eq!(receipt.sku(), "gas");
            assert!(success);
        }
        other => panic!("expected consume, got {other:?}"),
    }
    assert_eq!(h.service.calls_named("consume_purchase"), 1);
    assert!(!h.client.is_purchase_in_flight());

    // The flow already finished; a replayed result is ignored.
    assert!(!h.client.handle_purchase_result(-1, Some(data)));
    assert_no_event(&mut h.events).await;
}

#[tokio::test]
async fn buy_intent_v2_is_used_when_advertised() {
    let service = FakeStoreService {
        intent_v2: true,
        ..Default::default()
    };
    let h = configured(service, TestKeys::generate()).await;
    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    assert_eq!(h.service.calls_named("get_buy_intent_v2"), 1);
    assert_eq!(h.service.calls_named("get_buy_intent"), 0);
    let token = h.launcher.presented.lock().unwrap()[0].clone();
    assert_eq!(token.value(), "intent-v2:gas");
}

#[tokio::test]
async fn refused_buy_intent_fails_without_presenting() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    *h.service.buy_intent_code.lock().unwrap() = ResponseCode::ItemAlreadyOwned.code();

    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Failed)
    );
    assert_eq!(h.launcher.count(), 0);
    assert!(!h.client.is_purchase_in_flight());

    // The single-flight guard was released.
    *h.service.buy_intent_code.lock().unwrap() = 0;
    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    assert_eq!(h.launcher.count(), 1);
}

#[tokio::test]
async fn second_launch_is_rejected_without_touching_pending_sku() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    h.client.launch_purchase(PurchaseRequest::new("gold")).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::InProgress)
    );
    assert_eq!(h.launcher.count(), 1);

    h.client
        .handle_purchase_result(ActivityResult::Ok, Some(purchase_result(&h.keys, "GAS", "t")));
    assert!(matches!(
        next_event(&mut h.events).await,
        BillingEvent::BillingSuccess(_)
    ));
}

#[tokio::test]
async fn sku_mismatch_fails_and_skips_auto_consume() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    h.client
        .launch_purchase(PurchaseRequest::new("gas").auto_consume(true))
        .await;
    h.client
        .handle_purchase_result(ActivityResult::Ok, Some(purchase_result(&h.keys, "gold", "t")));
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Failed)
    );
    assert_no_event(&mut h.events).await;
    assert_eq!(h.service.calls_named("consume_purchase"), 0);
}

#[tokio::test]
async fn cancelled_and_forged_purchases_fail() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;

    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    h.client
        .handle_purchase_result(ActivityResult::Canceled, Some(Bundle::new()));
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Failed)
    );

    let forger = TestKeys::generate();
    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    h.client
        .handle_purchase_result(ActivityResult::Ok, Some(purchase_result(&forger, "gas", "t")));
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Failed)
    );
}

#[tokio::test]
async fn consume_without_token_never_reaches_the_store() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    let receipt = Receipt::parse(ItemType::Inapp, r#"{"productId":"gas"}"#, "").unwrap();

    h.client.consume(&receipt).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::ConsumeFinished {
            receipt,
            success: false
        }
    );
    assert_eq!(h.service.calls_named("consume_purchase"), 0);
}

#[tokio::test]
async fn inventory_pages_and_batches_details() {
    let keys = TestKeys::generate();
    let service = FakeStoreService::default();
    {
        let owned = |sku: &str| {
            let data = purchase_json(sku, &format!("tok-{sku}"));
            let signature = keys.sign(&data);
            (sku.to_string(), data, signature)
        };
        *service.owned_pages.lock().unwrap() =
            vec![vec![owned("gas"), owned("premium")], vec![owned("coin")]];
        let mut catalog = service.catalog.lock().unwrap();
        for sku in ["gas", "premium", "coin", "extra-3"] {
            catalog.insert(sku.to_string(), details_json(sku));
        }
    }
    let mut h = configured(service, keys).await;
    h.service.detail_batches.lock().unwrap().clear();

    let more: Vec<String> = (0..22).map(|i| format!("extra-{i}")).collect();
    h.client.query_inventory(more).await;

    let inventory = match next_event(&mut h.events).await {
        BillingEvent::InventoryFinished(inventory) => inventory,
        other => panic!("expected inventory, got {other:?}"),
    };
    assert_eq!(inventory.all_owned_skus(), vec!["coin", "gas", "premium"]);
    assert_eq!(inventory.purchase("coin").unwrap().token(), "tok-coin");
    assert!(inventory.has_details("extra-3"));
    assert!(!inventory.has_details("extra-4"));
    assert_eq!(*h.service.detail_batches.lock().unwrap(), vec![20, 5]);
    assert!(!h.client.is_inventory_in_flight());
    assert_no_event(&mut h.events).await;
}

#[tokio::test]
async fn failed_inventory_query_is_not_reported() {
    let keys = TestKeys::generate();
    let forger = TestKeys::generate();
    let service = FakeStoreService::default();
    let mut h = configured(service, keys).await;
    let data = purchase_json("gas", "tok");
    let signature = forger.sign(&data);
    *h.service.owned_pages.lock().unwrap() = vec![vec![("gas".to_string(), data, signature)]];

    h.client.query_inventory(Vec::new()).await;
    assert_no_event(&mut h.events).await;
    assert!(!h.client.is_inventory_in_flight());
}

#[tokio::test]
async fn launch_rejections_follow_a_fixed_order() {
    let service = FakeStoreService {
        subs_support: ResponseCode::BillingUnavailable.code(),
        ..Default::default()
    };
    let mut h = configured(service, TestKeys::generate()).await;
    assert!(!h.client.subscriptions_supported());

    h.client
        .launch_purchase(PurchaseRequest::new("premium").item_type(ItemType::Subs))
        .await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::SubscriptionsNotSupported)
    );

    *h.env.online.lock().unwrap() = false;
    h.client
        .launch_purchase(PurchaseRequest::new("premium").item_type(ItemType::Subs))
        .await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::NoNetwork)
    );

    *h.env.installed.lock().unwrap() = false;
    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::StoreNotInstalled)
    );
    assert_eq!(h.launcher.count(), 0);
}

#[tokio::test]
async fn dispose_unbinds_and_rejects_further_calls() {
    let mut h = configured(FakeStoreService::default(), TestKeys::generate()).await;
    h.client.dispose().await;
    assert!(h.client.is_disposed());
    assert_eq!(h.service.calls_named("unbind"), 1);

    h.client.launch_purchase(PurchaseRequest::new("gas")).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Disposed)
    );
    h.client.query_inventory(Vec::new()).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::Status(BillingStatus::Disposed)
    );

    let receipt = Receipt::parse(ItemType::Inapp, purchase_json("gas", "tok"), "").unwrap();
    h.client.consume(&receipt).await;
    assert_eq!(
        next_event(&mut h.events).await,
        BillingEvent::ConsumeFinished {
            receipt,
            success: false
        }
    );
    assert_eq!(h.service.calls_named("consume_purchase"), 0);
    assert_eq!(h.launcher.count(), 0);
}

#[tokio::test]
async fn dispose_during_buy_intent_presents_nothing() {
    let service = FakeStoreService::default();
    service.hold_buy_intent.store(true, Ordering::SeqCst);
    let mut h = configured(service, TestKeys::generate()).await;

    let client = h.client.clone();
    let launching =
        tokio::spawn(async move { client.launch_purchase(PurchaseRequest::new("gas")).await });
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.service.calls_named("get_buy_intent") == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    h.client.dispose().await;
    h.service.buy_intent_gate.notify_one();
    launching.await.unwrap();

    assert_eq!(h.launcher.count(), 0);
    assert!(!h.client.is_purchase_in_flight());
    assert_no_event(&mut h.events).await;
    assert!(!h
        .client
        .handle_purchase_result(ActivityResult::Ok, Some(purchase_result(&h.keys, "gas", "t"))));
}

#[tokio::test]
async fn unreachable_service_fails_setup_and_disposes() {
    let keys = TestKeys::generate();
    let service = Arc::new(FakeStoreService {
        bind_ok: false,
        ..Default::default()
    });
    let env = FakeEnvironment::new(1);
    let launcher: Arc<dyn PurchaseLauncher> = Arc::new(RecordingLauncher::default());
    let client = PurchaseClient::new(keys.config(), host(&service, &env, &launcher)).unwrap();
    let (listener, mut events) = ChannelListener::new();

    client.configure(listener).await;
    assert_eq!(
        next_event(&mut events).await,
        BillingEvent::Status(BillingStatus::SetupFailed)
    );
    assert!(client.is_disposed());
    assert!(!client.is_setup_done());
}

#[tokio::test]
async fn missing_store_is_reported_at_configure() {
    let keys = TestKeys::generate();
    let service = Arc::new(FakeStoreService::default());
    let env = FakeEnvironment::new(1);
    *env.installed.lock().unwrap() = false;
    let launcher: Arc<dyn PurchaseLauncher> = Arc::new(RecordingLauncher::default());
    let client = PurchaseClient::new(keys.config(), host(&service, &env, &launcher)).unwrap();
    let (listener, mut events) = ChannelListener::new();

    client.configure(listener).await;
    assert_eq!(
        next_event(&mut events).await,
        BillingEvent::Status(BillingStatus::StoreNotInstalled)
    );
    assert_eq!(service.calls_named("bind"), 0);
}

async fn set_up_repository(
    service: &Arc<FakeStoreService>,
) -> (BillingRepositoryImpl, Arc<dyn PurchaseLauncher>) {
    let keys = TestKeys::generate();
    let env = FakeEnvironment::new(1);
    let launcher: Arc<dyn PurchaseLauncher> = Arc::new(RecordingLauncher::default());
    let repository =
        BillingRepositoryImpl::new(keys.config(), host(service, &env, &launcher)).unwrap();
    assert!(repository.start_setup().await.is_success());
    (repository, launcher)
}

#[tokio::test]
#[cfg_attr(
    debug_assertions,
    should_panic(expected = "another async operation (launchPurchaseFlow) is in progress")
)]
async fn overlapping_bound_operations_are_a_contract_violation() {
    let service = Arc::new(FakeStoreService::default());
    let (repository, _launcher) = set_up_repository(&service).await;

    repository
        .launch_purchase_flow("gas", ItemType::Inapp, "", Box::new(|_, _| {}))
        .await
        .unwrap();
    let receipt = Receipt::parse(ItemType::Inapp, purchase_json("gas", "t"), "").unwrap();
    let err = repository.consume(&receipt).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::OperationInProgress {
            requested: "consume",
            active: "launchPurchaseFlow"
        }
    ));
    assert_eq!(err.response_code(), ResponseCode::DeveloperError);
    assert_eq!(service.calls_named("consume_purchase"), 0);
}

#[tokio::test]
async fn finished_launch_releases_the_operation_guard() {
    let service = Arc::new(FakeStoreService::default());
    let (repository, _launcher) = set_up_repository(&service).await;

    repository
        .launch_purchase_flow("gas", ItemType::Inapp, "", Box::new(|_, _| {}))
        .await
        .unwrap();
    assert!(repository.handle_purchase_result(ActivityResult::Canceled, Some(Bundle::new())));

    let receipt = Receipt::parse(ItemType::Inapp, purchase_json("gas", "t"), "").unwrap();
    repository.consume(&receipt).await.unwrap();
    assert_eq!(service.calls_named("consume_purchase"), 1);
}
