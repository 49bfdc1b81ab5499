#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use stockcat_lib::consumer::{CategoryConsumer, CategoryDraft, ConsumerState};
use stockcat_lib::model::Category;
use util::{repository_with_ids, FlakyRemote};

#[tokio::test]
async fn open_syncs_then_loads() {
    let remote = FlakyRemote::reachable();
    remote.seed_inventory_category("Kırtasiye");
    let (repo, _) = repository_with_ids(remote.clone(), 1);
    let mut screen = CategoryConsumer::new(repo);
    assert_eq!(screen.state(), &ConsumerState::Idle);

    let state = screen.open().await;
    let tree = state.tree().expect("ready");
    assert_eq!(tree.label("cat-kirtasiye").as_deref(), Some("Kırtasiye"));
    assert_eq!(remote.calls()[..2], ["sync".to_string(), "list_categories".to_string()]);
}

#[tokio::test]
async fn screens_converge_after_a_mutation() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    let (repo, _) = repository_with_ids(remote, 2);
    let mut product_groups = CategoryConsumer::new(repo.clone());
    let mut stock_card_form = CategoryConsumer::new(repo.clone());
    product_groups.open().await;
    stock_card_form.open().await;

    let state = product_groups
        .create(CategoryDraft::sub("Süt Ürünleri", Some("1".into())))
        .await;
    assert!(state.is_ready());
    assert_eq!(
        state.tree().unwrap().label("2").as_deref(),
        Some("Gıda › Süt Ürünleri")
    );

    let state = stock_card_form.open().await;
    assert_eq!(state.tree().unwrap().children_of("1").len(), 1);
}

#[tokio::test]
async fn sub_category_without_parent_is_an_error_state() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    let (repo, _) = repository_with_ids(remote.clone(), 2);
    let mut screen = CategoryConsumer::new(repo);
    screen.open().await;
    remote.clear_calls();

    let state = screen.create(CategoryDraft::sub("Süt Ürünleri", None)).await;
    assert_eq!(
        state.error().map(|e| e.code()),
        Some("CATEGORY/PARENT_REQUIRED")
    );
    assert_eq!(state.tree().unwrap().len(), 1);
    assert!(remote.mutations().is_empty());
}

#[tokio::test]
async fn blocked_delete_reports_usage_and_keeps_tree() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    remote.seed_stock_card("p1", "111", Some("1"));
    let (repo, _) = repository_with_ids(remote, 2);
    let mut screen = CategoryConsumer::new(repo);
    screen.open().await;

    let state = screen.delete("1").await;
    match state {
        ConsumerState::Error { error, tree } => {
            assert_eq!(error.code(), "CATEGORY/IN_USE");
            assert_eq!(error.usage(), Some(1));
            assert!(tree.find("1").is_some());
        }
        other => panic!("expected error state, got {other:?}"),
    }
}

#[tokio::test]
async fn parent_options_only_offer_roots() {
    let remote = FlakyRemote::reachable();
    remote.seed_category(Category::root("1", "Gıda"));
    remote.seed_category(Category::child("2", "Süt Ürünleri", "1"));
    remote.seed_category(Category::root("3", "Elektronik"));
    let (repo, _) = repository_with_ids(remote, 10);
    let mut screen = CategoryConsumer::new(repo);

    let tree = screen.open().await.tree().unwrap().clone();
    let options: Vec<&str> = tree.parent_options().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(options, vec!["3", "1"]);
}

#[test]
fn draft_wire_shape() {
    let draft: CategoryDraft =
        serde_json::from_str(r#"{"name":"Süt","kind":"sub","parentId":"1"}"#).unwrap();
    assert_eq!(draft, CategoryDraft::sub("Süt", Some("1".into())));
    let main: CategoryDraft = serde_json::from_str(r#"{"name":"Gıda","kind":"main"}"#).unwrap();
    assert_eq!(main, CategoryDraft::main("Gıda"));
}
