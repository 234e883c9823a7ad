//! Integration tests for physical hardware: reference validation,
//! serial uniqueness, mounting bounds, overlap discovery, the
//! cross-entity search and the detail projection.

use dcim_core::error::DcimError;
use dcim_core::models::hardware::{
    CreateHardware, HardwareFilter, HardwareStatus, UpdateHardware,
};
use dcim_core::models::hardware_info::CreateHardwareInfo;
use dcim_core::models::hardware_type::CreateHardwareType;
use dcim_core::models::rack::CreateRack;
use dcim_core::models::region::CreateRegion;
use dcim_core::models::room::CreateRoom;
use dcim_core::models::site::CreateSite;
use dcim_core::models::tenant::CreateTenant;
use dcim_core::models::tenant_group::CreateTenantGroup;
use dcim_core::models::zone::CreateZone;
use dcim_core::query::ListOptions;
use dcim_core::repository::{
    HardwareInfoRepository, HardwareRepository, HardwareTypeRepository, RackRepository,
    RegionRepository, RoomRepository, SiteRepository, TenantGroupRepository, TenantRepository,
    ZoneRepository,
};
use dcim_db::repository::{
    SurrealHardwareInfoRepository, SurrealHardwareRepository, SurrealHardwareTypeRepository,
    SurrealRackRepository, SurrealRegionRepository, SurrealRoomRepository, SurrealSiteRepository,
    SurrealTenantGroupRepository, SurrealTenantRepository, SurrealZoneRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type TestDb = Surreal<surrealdb::engine::local::Db>;

async fn setup() -> TestDb {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dcim_db::run_migrations(&db).await.unwrap();
    db
}

/// Rack id plus two catalog models: a 1U Cisco 2960 switch and a 2U
/// Dell R740 server.
async fn seed_fixtures(db: &TestDb) -> (Uuid, Uuid, Uuid) {
    let region = SurrealRegionRepository::new(db.clone())
        .create(CreateRegion {
            name: "APAC".into(),
            description: None,
        })
        .await
        .unwrap();
    let zone = SurrealZoneRepository::new(db.clone())
        .create(CreateZone {
            region_id: region.id,
            name: "TH".into(),
            description: None,
        })
        .await
        .unwrap();
    let site = SurrealSiteRepository::new(db.clone())
        .create(CreateSite {
            zone_id: zone.id,
            name: "BKK-1".into(),
            description: None,
        })
        .await
        .unwrap();
    let room = SurrealRoomRepository::new(db.clone())
        .create(CreateRoom {
            site_id: site.id,
            name: "Room A".into(),
            description: None,
        })
        .await
        .unwrap();
    let rack = SurrealRackRepository::new(db.clone())
        .create(CreateRack {
            room_id: room.id,
            name: "R01".into(),
            description: None,
            unit: Some(10),
        })
        .await
        .unwrap();

    let switch_type = SurrealHardwareTypeRepository::new(db.clone())
        .create(CreateHardwareType {
            name: "Switch".into(),
            category: Some("network".into()),
            description: None,
        })
        .await
        .unwrap();
    let server_type = SurrealHardwareTypeRepository::new(db.clone())
        .create(CreateHardwareType {
            name: "Server".into(),
            category: Some("compute".into()),
            description: None,
        })
        .await
        .unwrap();
    let info_repo = SurrealHardwareInfoRepository::new(db.clone());
    let switch_info = info_repo
        .create(CreateHardwareInfo {
            hardware_type_id: switch_type.id,
            manufacturer: "Cisco".into(),
            model: "2960".into(),
            height: Some(1),
        })
        .await
        .unwrap();
    let server_info = info_repo
        .create(CreateHardwareInfo {
            hardware_type_id: server_type.id,
            manufacturer: "Dell".into(),
            model: "R740".into(),
            height: Some(2),
        })
        .await
        .unwrap();

    (rack.id, switch_info.id, server_info.id)
}

fn input(rack_id: Uuid, info_id: Uuid, name: &str) -> CreateHardware {
    CreateHardware {
        rack_id,
        hardware_info_id: info_id,
        tenant_id: None,
        name: name.into(),
        status: None,
        serial_number: None,
        oob_ip: None,
        specifications: None,
        note: None,
        u_position: None,
        warranty_start: None,
        warranty_end: None,
    }
}

// -----------------------------------------------------------------------
// Reference validation and serial uniqueness
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_validates_rack_model_and_tenant() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, _) = seed_fixtures(&db).await;

    let err = repo
        .create(input(Uuid::new_v4(), switch_info, "SW-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::NotFound { .. }));

    let err = repo
        .create(input(rack, Uuid::new_v4(), "SW-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::NotFound { .. }));

    let mut with_tenant = input(rack, switch_info, "SW-01");
    with_tenant.tenant_id = Some(Uuid::new_v4());
    let err = repo.create(with_tenant).await.unwrap_err();
    assert!(matches!(err, DcimError::NotFound { .. }));
}

#[tokio::test]
async fn serial_number_is_unique_when_present() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, server_info) = seed_fixtures(&db).await;

    let mut first = input(rack, switch_info, "SW-01");
    first.serial_number = Some("FCW1932D0LB".into());
    let first = repo.create(first).await.unwrap();

    let mut clash = input(rack, server_info, "SVR-01");
    clash.serial_number = Some("FCW1932D0LB".into());
    let err = repo.create(clash).await.unwrap_err();
    assert!(matches!(err, DcimError::Conflict { .. }));

    // Serial-less items never clash with each other.
    repo.create(input(rack, server_info, "SVR-01")).await.unwrap();
    repo.create(input(rack, server_info, "SVR-02")).await.unwrap();

    // Re-writing the same serial on the same item is not a conflict.
    let updated = repo
        .update(
            first.id,
            UpdateHardware {
                serial_number: Some("FCW1932D0LB".into()),
                note: Some("re-labelled".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.serial_number.as_deref(), Some("FCW1932D0LB"));
}

// -----------------------------------------------------------------------
// Mounting bounds and overlap discovery
// -----------------------------------------------------------------------

#[tokio::test]
async fn u_position_must_fit_the_rack() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, _, server_info) = seed_fixtures(&db).await;

    // The fixture rack is 10U and the server model is 2U: position 10
    // would occupy 10..=11.
    let mut too_high = input(rack, server_info, "SVR-01");
    too_high.u_position = Some(10);
    let err = repo.create(too_high).await.unwrap_err();
    assert!(matches!(err, DcimError::Validation { .. }));

    let mut fits = input(rack, server_info, "SVR-01");
    fits.u_position = Some(9);
    let mounted = repo.create(fits).await.unwrap();
    assert_eq!(mounted.u_position, Some(9));

    // Moving it out of bounds is rejected too.
    let err = repo
        .update(
            mounted.id,
            UpdateHardware {
                u_position: Some(Some(10)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DcimError::Validation { .. }));
}

#[tokio::test]
async fn overlap_check_reports_conflicting_items_but_does_not_block() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, server_info) = seed_fixtures(&db).await;

    // 2U server at 4..=5.
    let mut server = input(rack, server_info, "SVR-01");
    server.u_position = Some(4);
    let server = repo.create(server).await.unwrap();

    // Candidate 1U at 5 overlaps the server.
    let overlaps = repo.find_overlaps(rack, 5, 1, None).await.unwrap();
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].id, server.id);

    // Candidate 1U at 6 is clear.
    let clear = repo.find_overlaps(rack, 6, 1, None).await.unwrap();
    assert!(clear.is_empty());

    // Placement stays permissive: the overlapping mount is accepted.
    let mut colliding = input(rack, switch_info, "SW-01");
    colliding.u_position = Some(5);
    repo.create(colliding).await.unwrap();

    // The check excludes the item itself when re-validating a move.
    let self_check = repo
        .find_overlaps(rack, 4, 2, Some(server.id))
        .await
        .unwrap();
    assert_eq!(self_check.len(), 1); // only the switch at 5
}

// -----------------------------------------------------------------------
// Search and filters
// -----------------------------------------------------------------------

#[tokio::test]
async fn search_reaches_through_the_catalog_without_duplicating_rows() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, server_info) = seed_fixtures(&db).await;

    // Name mentions cisco AND the model is Cisco: still one row.
    let mut both = input(rack, switch_info, "cisco-edge");
    both.serial_number = Some("SN-1".into());
    let both = repo.create(both).await.unwrap();

    // Only the related model matches.
    let mut by_model = input(rack, switch_info, "SW-02");
    by_model.serial_number = Some("SN-2".into());
    let by_model = repo.create(by_model).await.unwrap();

    // Matches by serial only.
    let mut by_serial = input(rack, server_info, "SVR-01");
    by_serial.serial_number = Some("CISCO-LEGACY".into());
    let by_serial = repo.create(by_serial).await.unwrap();

    // No match.
    repo.create(input(rack, server_info, "SVR-02")).await.unwrap();

    let page = repo
        .list(
            HardwareFilter {
                search: Some("CiScO".into()),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_results, 3);
    assert_eq!(page.results.len(), 3);
    let mut found: Vec<Uuid> = page.results.iter().map(|h| h.id).collect();
    found.sort();
    let mut expected = vec![both.id, by_model.id, by_serial.id];
    expected.sort();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn status_and_type_filters_are_exact() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, server_info) = seed_fixtures(&db).await;

    let mut failed = input(rack, switch_info, "SW-01");
    failed.status = Some(HardwareStatus::Failed);
    let failed = repo.create(failed).await.unwrap();
    repo.create(input(rack, server_info, "SVR-01")).await.unwrap();

    let page = repo
        .list(
            HardwareFilter {
                status: Some(HardwareStatus::Failed),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_results, 1);
    assert_eq!(page.results[0].id, failed.id);

    // Filtering by type resolves through the catalog models.
    let switch_type = SurrealHardwareInfoRepository::new(db.clone())
        .get_by_id(switch_info)
        .await
        .unwrap()
        .hardware_type_id;
    let page = repo
        .list(
            HardwareFilter {
                hardware_type_id: Some(switch_type),
                ..Default::default()
            },
            ListOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_results, 1);
    assert_eq!(page.results[0].id, failed.id);
}

// -----------------------------------------------------------------------
// Detail projection
// -----------------------------------------------------------------------

#[tokio::test]
async fn detail_carries_catalog_chain_owner_and_interfaces() {
    let db = setup().await;
    let repo = SurrealHardwareRepository::new(db.clone());
    let (rack, switch_info, _) = seed_fixtures(&db).await;

    let group = SurrealTenantGroupRepository::new(db.clone())
        .create(CreateTenantGroup {
            name: "Platform".into(),
            description: None,
        })
        .await
        .unwrap();
    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            tenant_group_id: group.id,
            name: "Payments".into(),
            description: None,
        })
        .await
        .unwrap();

    let mut owned = input(rack, switch_info, "SW-01");
    owned.tenant_id = Some(tenant.id);
    let hw = repo.create(owned).await.unwrap();

    let detail = repo.get_detail(hw.id).await.unwrap();
    assert_eq!(detail.hardware.id, hw.id);
    assert_eq!(detail.info.id, switch_info);
    assert_eq!(detail.info.manufacturer, "Cisco");
    assert_eq!(detail.hardware_type.name, "Switch");
    assert_eq!(detail.tenant.as_ref().map(|t| t.id), Some(tenant.id));
    assert!(detail.interfaces.is_empty());
}
