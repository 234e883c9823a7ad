//! Integration tests for the containment hierarchy (region → zone →
//! site → room → rack) using in-memory SurrealDB: scoped uniqueness,
//! cascade deletes and the derived child counts.

use dcim_core::error::DcimError;
use dcim_core::models::hardware::CreateHardware;
use dcim_core::models::hardware_info::CreateHardwareInfo;
use dcim_core::models::hardware_type::CreateHardwareType;
use dcim_core::models::interface::CreateInterfaceConnection;
use dcim_core::models::rack::CreateRack;
use dcim_core::models::region::{CreateRegion, RegionFilter, UpdateRegion};
use dcim_core::models::room::CreateRoom;
use dcim_core::models::site::CreateSite;
use dcim_core::models::zone::{CreateZone, UpdateZone, ZoneFilter};
use dcim_core::query::ListOptions;
use dcim_core::repository::{
    HardwareInfoRepository, HardwareRepository, HardwareTypeRepository, InterfaceRepository,
    RackRepository, RegionRepository, RoomRepository, SiteRepository, ZoneRepository,
};
use dcim_db::repository::{
    SurrealHardwareInfoRepository, SurrealHardwareRepository, SurrealHardwareTypeRepository,
    SurrealInterfaceRepository, SurrealRackRepository, SurrealRegionRepository,
    SurrealRoomRepository, SurrealSiteRepository, SurrealZoneRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type TestDb = Surreal<surrealdb::engine::local::Db>;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> TestDb {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dcim_db::run_migrations(&db).await.unwrap();
    db
}

async fn seed_region(db: &TestDb, name: &str) -> Uuid {
    SurrealRegionRepository::new(db.clone())
        .create(CreateRegion {
            name: name.into(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

async fn seed_zone(db: &TestDb, region_id: Uuid, name: &str) -> Uuid {
    SurrealZoneRepository::new(db.clone())
        .create(CreateZone {
            region_id,
            name: name.into(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

async fn seed_site(db: &TestDb, zone_id: Uuid, name: &str) -> Uuid {
    SurrealSiteRepository::new(db.clone())
        .create(CreateSite {
            zone_id,
            name: name.into(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

async fn seed_room(db: &TestDb, site_id: Uuid, name: &str) -> Uuid {
    SurrealRoomRepository::new(db.clone())
        .create(CreateRoom {
            site_id,
            name: name.into(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

async fn seed_rack(db: &TestDb, room_id: Uuid, name: &str) -> Uuid {
    SurrealRackRepository::new(db.clone())
        .create(CreateRack {
            room_id,
            name: name.into(),
            description: None,
            unit: None,
        })
        .await
        .unwrap()
        .id
}

// -----------------------------------------------------------------------
// Region tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_region() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db);

    let region = repo
        .create(CreateRegion {
            name: "APAC".into(),
            description: Some("Asia Pacific".into()),
        })
        .await
        .unwrap();

    assert_eq!(region.name, "APAC");
    assert_eq!(region.description.as_deref(), Some("Asia Pacific"));

    let fetched = repo.get_by_id(region.id).await.unwrap();
    assert_eq!(fetched.id, region.id);
    assert_eq!(fetched.name, "APAC");
}

#[tokio::test]
async fn duplicate_region_name_rejected() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db);

    repo.create(CreateRegion {
        name: "EMEA".into(),
        description: None,
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateRegion {
            name: "EMEA".into(),
            description: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DcimError::Conflict { .. }));
}

#[tokio::test]
async fn rename_region_to_its_own_name_succeeds() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db);

    let region = repo
        .create(CreateRegion {
            name: "APAC".into(),
            description: None,
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            region.id,
            UpdateRegion {
                name: Some("APAC".into()),
                description: Some("same name, new description".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "APAC");
    assert_eq!(
        updated.description.as_deref(),
        Some("same name, new description")
    );
}

#[tokio::test]
async fn get_missing_region_is_not_found() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DcimError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Scoped uniqueness across the hierarchy
// -----------------------------------------------------------------------

#[tokio::test]
async fn zone_names_are_scoped_to_their_region() {
    let db = setup().await;
    let zone_repo = SurrealZoneRepository::new(db.clone());

    let apac = seed_region(&db, "APAC").await;
    let emea = seed_region(&db, "EMEA").await;

    seed_zone(&db, apac, "TH").await;

    // Same name under the same region conflicts.
    let err = zone_repo
        .create(CreateZone {
            region_id: apac,
            name: "TH".into(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));

    // Same name under a different region is fine.
    let th_emea = zone_repo
        .create(CreateZone {
            region_id: emea,
            name: "TH".into(),
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(th_emea.name, "TH");
    assert_eq!(th_emea.region_id, emea);
}

#[tokio::test]
async fn zone_create_requires_existing_region() {
    let db = setup().await;
    let repo = SurrealZoneRepository::new(db);

    let err = repo
        .create(CreateZone {
            region_id: Uuid::new_v4(),
            name: "orphan".into(),
            description: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DcimError::NotFound { .. }));
}

#[tokio::test]
async fn moving_zone_into_occupied_name_conflicts() {
    let db = setup().await;
    let zone_repo = SurrealZoneRepository::new(db.clone());

    let apac = seed_region(&db, "APAC").await;
    let emea = seed_region(&db, "EMEA").await;
    seed_zone(&db, apac, "TH").await;
    let th_emea = seed_zone(&db, emea, "TH").await;

    // Re-homing EMEA's "TH" into APAC collides with APAC's "TH".
    let err = zone_repo
        .update(
            th_emea,
            UpdateZone {
                region_id: Some(apac),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));

    // Renaming it within EMEA works.
    let renamed = zone_repo
        .update(
            th_emea,
            UpdateZone {
                name: Some("TH-2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "TH-2");
}

#[tokio::test]
async fn rack_names_are_scoped_to_their_room() {
    let db = setup().await;
    let rack_repo = SurrealRackRepository::new(db.clone());

    let region = seed_region(&db, "APAC").await;
    let zone = seed_zone(&db, region, "TH").await;
    let site = seed_site(&db, zone, "BKK-1").await;
    let room_a = seed_room(&db, site, "Room A").await;
    let room_b = seed_room(&db, site, "Room B").await;

    seed_rack(&db, room_a, "R01").await;

    let err = rack_repo
        .create(CreateRack {
            room_id: room_a,
            name: "R01".into(),
            description: None,
            unit: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));

    // Same rack name in a sibling room is fine.
    rack_repo
        .create(CreateRack {
            room_id: room_b,
            name: "R01".into(),
            description: None,
            unit: Some(48),
        })
        .await
        .unwrap();
}

// -----------------------------------------------------------------------
// Cascade deletes
// -----------------------------------------------------------------------

#[tokio::test]
async fn region_delete_cascades_through_the_whole_subtree() {
    let db = setup().await;
    let region_repo = SurrealRegionRepository::new(db.clone());
    let zone_repo = SurrealZoneRepository::new(db.clone());
    let site_repo = SurrealSiteRepository::new(db.clone());
    let room_repo = SurrealRoomRepository::new(db.clone());
    let rack_repo = SurrealRackRepository::new(db.clone());
    let hardware_repo = SurrealHardwareRepository::new(db.clone());
    let interface_repo = SurrealInterfaceRepository::new(db.clone());

    let region = seed_region(&db, "APAC").await;
    let zone_a = seed_zone(&db, region, "TH").await;
    let zone_b = seed_zone(&db, region, "SG").await;
    let site = seed_site(&db, zone_a, "BKK-1").await;
    let room = seed_room(&db, site, "Room A").await;
    let rack = seed_rack(&db, room, "R01").await;

    // A mounted hardware item with one interface, to prove the cascade
    // runs all the way down.
    let hardware_type = SurrealHardwareTypeRepository::new(db.clone())
        .create(CreateHardwareType {
            name: "Server".into(),
            category: None,
            description: None,
        })
        .await
        .unwrap();
    let info = SurrealHardwareInfoRepository::new(db.clone())
        .create(CreateHardwareInfo {
            hardware_type_id: hardware_type.id,
            manufacturer: "Dell".into(),
            model: "R740".into(),
            height: Some(2),
        })
        .await
        .unwrap();
    let hardware = hardware_repo
        .create(CreateHardware {
            rack_id: rack,
            hardware_info_id: info.id,
            tenant_id: None,
            name: "SVR-01".into(),
            status: None,
            serial_number: None,
            oob_ip: None,
            specifications: None,
            note: None,
            u_position: None,
            warranty_start: None,
            warranty_end: None,
        })
        .await
        .unwrap();
    let interface = interface_repo
        .create(CreateInterfaceConnection {
            hardware_id: hardware.id,
            connected_switch_id: None,
            name: "eth0".into(),
            mac_address: None,
            ip_address: None,
            speed: None,
            interface_type: None,
            connected_port: None,
        })
        .await
        .unwrap();

    // Unrelated region survives.
    let other_region = seed_region(&db, "EMEA").await;
    let other_zone = seed_zone(&db, other_region, "DE").await;

    region_repo.delete(region).await.unwrap();

    assert!(matches!(
        region_repo.get_by_id(region).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    for zone in [zone_a, zone_b] {
        assert!(matches!(
            zone_repo.get_by_id(zone).await.unwrap_err(),
            DcimError::NotFound { .. }
        ));
    }
    assert!(matches!(
        site_repo.get_by_id(site).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    assert!(matches!(
        room_repo.get_by_id(room).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    assert!(matches!(
        rack_repo.get_by_id(rack).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    assert!(matches!(
        hardware_repo.get_by_id(hardware.id).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));
    assert!(matches!(
        interface_repo.get_by_id(interface.id).await.unwrap_err(),
        DcimError::NotFound { .. }
    ));

    // The catalog is not part of the containment tree and survives.
    SurrealHardwareInfoRepository::new(db.clone())
        .get_by_id(info.id)
        .await
        .unwrap();

    // The sibling tree is untouched.
    assert!(zone_repo.get_by_id(other_zone).await.is_ok());
}

#[tokio::test]
async fn deleting_missing_region_is_not_found() {
    let db = setup().await;
    let repo = SurrealRegionRepository::new(db);

    let err = repo.delete(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DcimError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Derived counts and projections
// -----------------------------------------------------------------------

#[tokio::test]
async fn region_list_carries_zone_counts() {
    let db = setup().await;
    let region_repo = SurrealRegionRepository::new(db.clone());

    let apac = seed_region(&db, "APAC").await;
    let emea = seed_region(&db, "EMEA").await;
    for name in ["TH", "SG", "JP"] {
        seed_zone(&db, apac, name).await;
    }
    seed_zone(&db, emea, "DE").await;

    let page = region_repo
        .list(RegionFilter::default(), ListOptions::default())
        .await
        .unwrap();

    assert_eq!(page.total_results, 2);
    let apac_row = page
        .results
        .iter()
        .find(|r| r.region.id == apac)
        .expect("APAC in listing");
    let emea_row = page
        .results
        .iter()
        .find(|r| r.region.id == emea)
        .expect("EMEA in listing");
    assert_eq!(apac_row.zone_count, 3);
    assert_eq!(emea_row.zone_count, 1);
}

#[tokio::test]
async fn zone_list_filters_by_region() {
    let db = setup().await;
    let zone_repo = SurrealZoneRepository::new(db.clone());

    let apac = seed_region(&db, "APAC").await;
    let emea = seed_region(&db, "EMEA").await;
    seed_zone(&db, apac, "TH").await;
    seed_zone(&db, apac, "SG").await;
    seed_zone(&db, emea, "DE").await;

    let page = zone_repo
        .list(
            ZoneFilter {
                region_id: Some(apac),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_results, 2);
    assert!(page.results.iter().all(|z| z.zone.region_id == apac));
}

#[tokio::test]
async fn rack_detail_resolves_the_ancestor_chain() {
    let db = setup().await;
    let rack_repo = SurrealRackRepository::new(db.clone());

    let region = seed_region(&db, "APAC").await;
    let zone = seed_zone(&db, region, "TH").await;
    let site = seed_site(&db, zone, "BKK-1").await;
    let room = seed_room(&db, site, "Room A").await;
    let rack = seed_rack(&db, room, "R01").await;

    let detail = rack_repo.get_with_location(rack).await.unwrap();
    assert_eq!(detail.rack.id, rack);
    assert_eq!(detail.room.id, room);
    assert_eq!(detail.site.id, site);
    assert_eq!(detail.zone.id, zone);
    assert_eq!(detail.region.id, region);
    assert_eq!(detail.region.name, "APAC");
    assert_eq!(detail.rack.unit, 42); // default capacity
}
