#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use std::sync::Arc;

use stockcat_lib::id::SequentialIds;
use stockcat_lib::model::{Category, StockCardDraft};
use stockcat_lib::stock_cards::StockCardService;
use util::{repository, FlakyRemote};

fn service(remote: Arc<FlakyRemote>) -> (StockCardService, stockcat_lib::cache::CacheHandle) {
    let (repo, cache) = repository(remote.clone());
    let service = StockCardService::with_id_source(
        remote,
        cache.clone(),
        repo,
        Arc::new(SequentialIds::starting_at(500)),
    );
    (service, cache)
}

#[tokio::test]
async fn create_checks_barcode_then_writes() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    let (cards, _) = service(remote.clone());

    let card = cards
        .create(StockCardDraft::new("8690000000011", "Ayran").with_category("1"))
        .await
        .unwrap();
    assert_eq!(card.id, "500");
    assert_eq!(card.category_id.as_deref(), Some("1"));
    let calls = remote.calls();
    let lookup = calls.iter().position(|c| c == "find_barcode 8690000000011");
    let write = calls.iter().position(|c| c == "create_stock_card 500");
    assert!(lookup.unwrap() < write.unwrap());
}

#[tokio::test]
async fn duplicate_barcode_is_rejected_before_write() {
    let remote = FlakyRemote::reachable();
    remote.seed_stock_card("p1", "8690000000011", None);
    let (cards, _) = service(remote.clone());

    let err = cards
        .create(StockCardDraft::new("8690000000011", "Ayran"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/DUPLICATE_BARCODE");
    assert!(remote.mutations().is_empty());
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    let (cards, _) = service(remote.clone());

    let err = cards
        .create(StockCardDraft::new("8690000000011", "Ayran").with_category("9"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/CATEGORY_NOT_FOUND");
    assert!(remote.mutations().is_empty());
}

#[tokio::test]
async fn writes_need_the_remote_store() {
    let remote = FlakyRemote::unreachable();
    let (cards, _) = service(remote);

    let err = cards
        .create(StockCardDraft::new("8690000000011", "Ayran"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/REMOTE_UNAVAILABLE");
}

#[tokio::test]
async fn list_refreshes_cache_and_serves_it_offline() {
    let remote = FlakyRemote::reachable();
    remote.seed_stock_card("p1", "111", Some("1"));
    let (cards, cache) = service(remote.clone());

    cards.list().await.unwrap();
    assert_eq!(cache.read_stock_cards().unwrap().len(), 1);

    remote.go_down();
    let offline = cards.list().await.unwrap();
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0].id, "p1");
}

#[tokio::test]
async fn list_with_nothing_cached_fails_offline() {
    let (cards, _) = service(FlakyRemote::unreachable());
    let err = cards.list().await.unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/REMOTE_UNAVAILABLE");
}

#[tokio::test]
async fn update_moves_card_between_categories() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    remote.seed_category(Category::child("2", "Süt Ürünleri", "1"));
    remote.seed_stock_card("p1", "111", Some("1"));
    let (cards, cache) = service(remote.clone());
    cards.list().await.unwrap();

    let updated = cards
        .update("p1", StockCardDraft::new("111", "Ayran").with_category("2"))
        .await
        .unwrap();
    assert_eq!(updated.category_id.as_deref(), Some("2"));
    let cached = cache.read_stock_cards().unwrap();
    assert_eq!(cached[0].category_id.as_deref(), Some("2"));
}

#[tokio::test]
async fn update_cannot_take_another_cards_barcode() {
    let remote = FlakyRemote::reachable();
    remote.seed_stock_card("p1", "111", None);
    remote.seed_stock_card("p2", "222", None);
    let (cards, _) = service(remote.clone());

    let err = cards
        .update("p2", StockCardDraft::new("111", "Kola"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/DUPLICATE_BARCODE");

    let kept = cards
        .update("p2", StockCardDraft::new("222", "Kola"))
        .await
        .unwrap();
    assert_eq!(kept.name, "Kola");
}

#[tokio::test]
async fn update_missing_card_is_not_found() {
    let remote = FlakyRemote::reachable();
    let (cards, _) = service(remote);
    let err = cards
        .update("nope", StockCardDraft::new("111", "Kola"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STOCK_CARD/NOT_FOUND");
}
