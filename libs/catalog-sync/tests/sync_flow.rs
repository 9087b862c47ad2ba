//! End-to-end sync behaviour against a temporary SQLite store

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

mod support;

use catalog_model::{FilterType, Identity};
use catalog_sync::validator::Rejection;
use common::CancellationToken;
use support::{Fixture, CANON_600D, NIKON_D7000};

#[tokio::test]
async fn first_sync_creates_then_price_change_updates() {
    let fx = Fixture::new().await;
    fx.write("Cameras/Canon/600D.yml", CANON_600D);
    let cancel = CancellationToken::new();

    let summary = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.products.created, 1);

    let identity = Identity::new("Canon", "600D");
    let row = fx.store.find_product(&identity).await.unwrap().unwrap();
    assert_eq!(
        (row.brand.as_str(), row.model.as_str(), row.full_name.as_str()),
        ("Canon", "600D", "Canon EOS 600D")
    );
    assert_eq!(
        (
            row.buy_price_min.as_str(),
            row.buy_price_max.as_str(),
            row.sell_target.as_str()
        ),
        ("70.00", "100.00", "150.00")
    );
    assert!(row.active);
    assert_eq!(
        fx.store.aliases_of(row.id).await.unwrap(),
        vec!["600d", "eos 600d"]
    );

    // updated_at has millisecond resolution
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    fx.write(
        "Cameras/Canon/600D.yml",
        &CANON_600D.replace("sell_target: 150", "sell_target: 160"),
    );
    let summary = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert_eq!(summary.products.updated, 1);
    assert_eq!(summary.products.created, 0);

    let updated = fx.store.find_product(&identity).await.unwrap().unwrap();
    assert_eq!(updated.id, row.id);
    assert_eq!(updated.sell_target, "160.00");
    assert!(updated.updated_at > row.updated_at);
    assert_eq!(updated.created_at, row.created_at);
}

#[tokio::test]
async fn second_sync_is_all_unchanged() {
    let fx = Fixture::new().await;
    fx.write("Cameras/Canon/600D.yml", CANON_600D);
    fx.write("Cameras/Nikon/D7000.yml", NIKON_D7000);
    fx.write("Cameras/Matching/filters_reject.yml", "- broken\n- for parts\n");
    let cancel = CancellationToken::new();

    let first = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert_eq!(first.products.created, 2);
    assert_eq!(first.filters.created, 2);

    let second = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert!(second.is_success());
    assert_eq!(second.products.unchanged, 2);
    assert_eq!(second.filters.unchanged, 2);
    assert_eq!(second.products.created + second.products.updated, 0);
    assert_eq!(second.filters.created + second.filters.updated, 0);

    // unchanged units are not written to the change log
    let run_id = second.run_id.unwrap();
    assert!(fx.store.changes_for_run(&run_id).await.unwrap().is_empty());
    let runs = fx.store.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].status, "completed");
    assert_eq!(runs[0].unchanged, 4);
}

#[tokio::test]
async fn alias_set_is_replaced_not_merged() {
    let fx = Fixture::new().await;
    let cancel = CancellationToken::new();
    let with_aliases = |aliases: &str| {
        CANON_600D.replace("  - 600d\n  - eos 600d\n", aliases)
    };

    fx.write("Cameras/Canon/600D.yml", &with_aliases("  - a\n  - b\n"));
    fx.engine().run(fx.root(), &cancel).await.unwrap();

    fx.write("Cameras/Canon/600D.yml", &with_aliases("  - a\n  - c\n"));
    let summary = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert_eq!(summary.products.updated, 1);

    let row = fx
        .store
        .find_product(&Identity::new("canon", "600d"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fx.store.aliases_of(row.id).await.unwrap(), vec!["a", "c"]);
    assert_eq!(fx.store.counts().await.unwrap().aliases, 2);
}

#[tokio::test]
async fn removed_file_is_reported_orphaned_and_kept() {
    let fx = Fixture::new().await;
    let cancel = CancellationToken::new();
    fx.write("Cameras/Canon/600D.yml", CANON_600D);
    fx.write("Cameras/Nikon/D7000.yml", NIKON_D7000);
    fx.engine().run(fx.root(), &cancel).await.unwrap();

    fx.remove("Cameras/Nikon/D7000.yml");
    let summary = fx.engine().run(fx.root(), &cancel).await.unwrap();

    assert_eq!(summary.orphaned_products, vec!["Nikon D7000"]);
    assert!(summary.is_success());
    assert!(fx
        .store
        .find_product(&Identity::new("Nikon", "D7000"))
        .await
        .unwrap()
        .is_some());

    let changes = fx
        .store
        .changes_for_run(summary.run_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(
        (changes[0].operation.as_str(), changes[0].outcome.as_str()),
        ("orphaned", "reported")
    );
}

#[tokio::test]
async fn unparseable_file_is_not_an_orphan() {
    let fx = Fixture::new().await;
    let cancel = CancellationToken::new();
    fx.write("Cameras/Nikon/D7000.yml", NIKON_D7000);
    fx.engine().run(fx.root(), &cancel).await.unwrap();

    fx.write("Cameras/Nikon/D7000.yml", "brand: [Nikon\n");
    let summary = fx.engine().run(fx.root(), &cancel).await.unwrap();

    assert!(summary.orphaned_products.is_empty());
    assert!(matches!(summary.rejections[0], Rejection::Parse(_)));
    assert!(!summary.is_success());
}

#[tokio::test]
async fn invalid_pricing_never_reaches_the_store() {
    let fx = Fixture::new().await;
    fx.write(
        "Cameras/Canon/600D.yml",
        &CANON_600D.replace("buy_max: 100", "buy_max: 150"),
    );
    fx.write("Cameras/Nikon/D7000.yml", NIKON_D7000);

    let summary = fx
        .engine()
        .run(fx.root(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.products.created, 1);
    assert_eq!(summary.rejected(), 1);
    match &summary.rejections[0] {
        Rejection::Invalid(e) => {
            assert!(e.to_string().contains("must be below sell_target"));
        },
        other => panic!("unexpected rejection: {other}"),
    }
    assert!(fx
        .store
        .find_product(&Identity::new("Canon", "600D"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn case_insensitive_duplicates_both_rejected() {
    let fx = Fixture::new().await;
    fx.write("Cameras/Canon/600D.yml", CANON_600D);
    fx.write(
        "Cameras/Canon/600d-old.yml",
        &CANON_600D.replace("brand: Canon", "brand: CANON"),
    );

    let summary = fx
        .engine()
        .run(fx.root(), &CancellationToken::new())
        .await
        .unwrap();

    let duplicates: Vec<_> = summary
        .rejections
        .iter()
        .filter(|r| matches!(r, Rejection::Duplicate(_)))
        .collect();
    assert_eq!(duplicates.len(), 2);
    assert_eq!(summary.products.total(), 0);
    assert_eq!(fx.store.counts().await.unwrap().products, 0);
}

#[tokio::test]
async fn filter_keyword_synced_twice_is_one_row() {
    let fx = Fixture::new().await;
    let cancel = CancellationToken::new();
    fx.write(
        "Cameras/Matching/filters_reject.yml",
        "description: Skip damaged listings\nkeywords:\n  - broken\n",
    );

    fx.engine().run(fx.root(), &cancel).await.unwrap();
    let second = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert_eq!(second.filters.unchanged, 1);

    let stored = fx.store.list_filters(FilterType::Reject).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].keyword, "broken");
    assert_eq!(stored[0].description.as_deref(), Some("Skip damaged listings"));

    fx.write(
        "Cameras/Matching/filters_reject.yml",
        "description: Damaged\nkeywords:\n  - broken\n",
    );
    let third = fx.engine().run(fx.root(), &cancel).await.unwrap();
    assert_eq!(third.filters.updated, 1);
    let stored = fx.store.list_filters(FilterType::Reject).await.unwrap();
    assert_eq!(stored[0].description.as_deref(), Some("Damaged"));
}
