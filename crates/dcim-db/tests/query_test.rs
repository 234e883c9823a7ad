//! Integration tests for the shared query engine: pagination envelope,
//! default fallbacks, sort whitelisting and deterministic ordering.

use dcim_core::models::region::{CreateRegion, RegionFilter};
use dcim_core::query::{ListOptions, SortOrder};
use dcim_core::repository::RegionRepository;
use dcim_db::repository::SurrealRegionRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

type TestDb = Surreal<surrealdb::engine::local::Db>;

async fn setup() -> TestDb {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dcim_db::run_migrations(&db).await.unwrap();
    db
}

async fn seed_regions(db: &TestDb, count: usize) {
    let repo = SurrealRegionRepository::new(db.clone());
    for i in 0..count {
        repo.create(CreateRegion {
            name: format!("region-{i:02}"),
            description: Some(format!("number {i}")),
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn pagination_envelope_is_consistent() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());
    seed_regions(&db, 23).await;

    let page1 = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                page: Some(1),
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page1.results.len(), 10);
    assert_eq!(page1.page, 1);
    assert_eq!(page1.limit, 10);
    assert_eq!(page1.total_results, 23);
    assert_eq!(page1.total_pages, 3);

    let page3 = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                page: Some(3),
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page3.results.len(), 3);
}

#[tokio::test]
async fn page_beyond_the_last_is_empty_with_accurate_totals() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());
    seed_regions(&db, 5).await;

    let page = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                page: Some(4),
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(page.results.is_empty());
    assert_eq!(page.page, 4);
    assert_eq!(page.total_results, 5);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn zero_page_and_limit_fall_back_to_defaults() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());
    seed_regions(&db, 12).await;

    let page = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                page: Some(0),
                limit: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 10);
    assert_eq!(page.results.len(), 10);
}

#[tokio::test]
async fn unknown_sort_column_falls_back_to_created_at() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());
    seed_regions(&db, 3).await;

    // A hostile sort column never reaches the query; the listing still
    // succeeds on the default ordering.
    let page = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                sort_by: Some("no_such_column; DROP TABLE region".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total_results, 3);
}

#[tokio::test]
async fn explicit_sort_orders_results() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());
    seed_regions(&db, 4).await;

    let page = repo
        .list(
            RegionFilter::default(),
            ListOptions {
                sort_by: Some("name".into()),
                sort_order: Some(SortOrder::Asc),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let names: Vec<&str> = page.results.iter().map(|r| r.region.name.as_str()).collect();
    assert_eq!(names, ["region-00", "region-01", "region-02", "region-03"]);
}

#[tokio::test]
async fn identical_inputs_return_identical_pages() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());

    // All rows share one description so a description sort has nothing
    // to distinguish rows by; the id tie-break keeps pages stable.
    for i in 0..15 {
        repo.create(CreateRegion {
            name: format!("r{i}"),
            description: Some("same".into()),
        })
        .await
        .unwrap();
    }

    let options = || ListOptions {
        page: Some(2),
        limit: Some(5),
        sort_by: Some("created_at".into()),
        sort_order: Some(SortOrder::Asc),
    };

    let first = repo
        .list(RegionFilter::default(), options())
        .await
        .unwrap();
    let second = repo
        .list(RegionFilter::default(), options())
        .await
        .unwrap();

    let ids_a: Vec<_> = first.results.iter().map(|r| r.region.id).collect();
    let ids_b: Vec<_> = second.results.iter().map(|r| r.region.id).collect();
    assert_eq!(ids_a, ids_b);
    assert_eq!(ids_a.len(), 5);
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());

    repo.create(CreateRegion {
        name: "Asia Pacific".into(),
        description: None,
    })
    .await
    .unwrap();
    repo.create(CreateRegion {
        name: "Europe".into(),
        description: Some("pacific-adjacent it is not".into()),
    })
    .await
    .unwrap();
    repo.create(CreateRegion {
        name: "Americas".into(),
        description: None,
    })
    .await
    .unwrap();

    let page = repo
        .list(
            RegionFilter {
                search: Some("PACIFIC".into()),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

    // Name match and description match, no duplicates.
    assert_eq!(page.total_results, 2);
}

#[tokio::test]
async fn exact_name_filter_does_not_substring_match() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db.clone());

    repo.create(CreateRegion {
        name: "APAC".into(),
        description: None,
    })
    .await
    .unwrap();
    repo.create(CreateRegion {
        name: "APAC-2".into(),
        description: None,
    })
    .await
    .unwrap();

    let page = repo
        .list(
            RegionFilter {
                name: Some("APAC".into()),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_results, 1);
    assert_eq!(page.results[0].region.name, "APAC");
}
