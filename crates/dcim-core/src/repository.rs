//! Repository trait definitions for data access abstraction.
//!
//! All operations are async and return typed, recoverable errors: a
//! missing entity or parent is `NotFound`, a scoped-uniqueness or
//! restrict-policy violation is `Conflict`, a malformed reference is
//! `Validation`. Each resource follows the same contract:
//! create / get_by_id / update / delete / list, with list returning the
//! uniform paginated envelope.

use uuid::Uuid;

use crate::error::DcimResult;
use crate::models::{
    hardware::{CreateHardware, Hardware, HardwareDetail, HardwareFilter, UpdateHardware},
    hardware_info::{
        CreateHardwareInfo, HardwareInfo, HardwareInfoFilter, HardwareInfoSummary,
        UpdateHardwareInfo,
    },
    hardware_type::{
        CreateHardwareType, HardwareType, HardwareTypeFilter, HardwareTypeSummary,
        UpdateHardwareType,
    },
    interface::{
        CreateInterfaceConnection, InterfaceConnection, InterfaceFilter,
        UpdateInterfaceConnection,
    },
    rack::{CreateRack, Rack, RackDetail, RackFilter, RackSummary, UpdateRack},
    region::{CreateRegion, Region, RegionFilter, RegionSummary, UpdateRegion},
    room::{CreateRoom, Room, RoomFilter, RoomSummary, UpdateRoom},
    site::{CreateSite, Site, SiteFilter, SiteSummary, UpdateSite},
    tenant::{CreateTenant, Tenant, TenantFilter, UpdateTenant},
    tenant_group::{
        CreateTenantGroup, TenantGroup, TenantGroupFilter, TenantGroupSummary, UpdateTenantGroup,
    },
    user::{CreateUser, UpdateUser, User, UserFilter, UserView},
    zone::{CreateZone, UpdateZone, Zone, ZoneFilter, ZoneSummary},
};
use crate::query::{ListOptions, Page};

// ---------------------------------------------------------------------------
// Containment hierarchy
// ---------------------------------------------------------------------------

pub trait RegionRepository: Send + Sync {
    fn create(&self, input: CreateRegion) -> impl Future<Output = DcimResult<Region>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Region>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRegion,
    ) -> impl Future<Output = DcimResult<Region>> + Send;
    /// Cascades to the full containment subtree.
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: RegionFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<RegionSummary>>> + Send;
}

pub trait ZoneRepository: Send + Sync {
    fn create(&self, input: CreateZone) -> impl Future<Output = DcimResult<Zone>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Zone>> + Send;
    fn update(&self, id: Uuid, input: UpdateZone) -> impl Future<Output = DcimResult<Zone>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: ZoneFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<ZoneSummary>>> + Send;
}

pub trait SiteRepository: Send + Sync {
    fn create(&self, input: CreateSite) -> impl Future<Output = DcimResult<Site>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Site>> + Send;
    fn update(&self, id: Uuid, input: UpdateSite) -> impl Future<Output = DcimResult<Site>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: SiteFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<SiteSummary>>> + Send;
}

pub trait RoomRepository: Send + Sync {
    fn create(&self, input: CreateRoom) -> impl Future<Output = DcimResult<Room>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Room>> + Send;
    fn update(&self, id: Uuid, input: UpdateRoom) -> impl Future<Output = DcimResult<Room>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: RoomFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<RoomSummary>>> + Send;
}

pub trait RackRepository: Send + Sync {
    fn create(&self, input: CreateRack) -> impl Future<Output = DcimResult<Rack>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Rack>> + Send;
    /// The rack with its ancestor chain room → site → zone → region.
    fn get_with_location(&self, id: Uuid) -> impl Future<Output = DcimResult<RackDetail>> + Send;
    fn update(&self, id: Uuid, input: UpdateRack) -> impl Future<Output = DcimResult<Rack>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: RackFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<RackSummary>>> + Send;
}

// ---------------------------------------------------------------------------
// Ownership hierarchy
// ---------------------------------------------------------------------------

pub trait TenantGroupRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTenantGroup,
    ) -> impl Future<Output = DcimResult<TenantGroup>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<TenantGroup>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenantGroup,
    ) -> impl Future<Output = DcimResult<TenantGroup>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: TenantGroupFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<TenantGroupSummary>>> + Send;
}

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = DcimResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = DcimResult<Tenant>> + Send;
    /// Owned hardware survives with its tenant reference cleared.
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: TenantFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Hardware catalog
// ---------------------------------------------------------------------------

pub trait HardwareTypeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateHardwareType,
    ) -> impl Future<Output = DcimResult<HardwareType>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<HardwareType>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateHardwareType,
    ) -> impl Future<Output = DcimResult<HardwareType>> + Send;
    /// Refused while any hardware model references the type.
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: HardwareTypeFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<HardwareTypeSummary>>> + Send;
}

pub trait HardwareInfoRepository: Send + Sync {
    fn create(
        &self,
        input: CreateHardwareInfo,
    ) -> impl Future<Output = DcimResult<HardwareInfo>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<HardwareInfo>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateHardwareInfo,
    ) -> impl Future<Output = DcimResult<HardwareInfo>> + Send;
    /// Refused while any physical item references the model; the
    /// conflict message reports the dependent count.
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: HardwareInfoFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<HardwareInfoSummary>>> + Send;
}

pub trait HardwareRepository: Send + Sync {
    fn create(&self, input: CreateHardware) -> impl Future<Output = DcimResult<Hardware>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<Hardware>> + Send;
    /// The item with its catalog chain, owner and owned interfaces.
    fn get_detail(&self, id: Uuid) -> impl Future<Output = DcimResult<HardwareDetail>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateHardware,
    ) -> impl Future<Output = DcimResult<Hardware>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: HardwareFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<Hardware>>> + Send;
    /// Hardware whose occupied U-range in `rack_id` intersects
    /// `u_position ..= u_position + height - 1`. Advisory only; writes
    /// do not call it.
    fn find_overlaps(
        &self,
        rack_id: Uuid,
        u_position: u32,
        height: u32,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = DcimResult<Vec<Hardware>>> + Send;
}

// ---------------------------------------------------------------------------
// Interface topology
// ---------------------------------------------------------------------------

pub trait InterfaceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateInterfaceConnection,
    ) -> impl Future<Output = DcimResult<InterfaceConnection>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<InterfaceConnection>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateInterfaceConnection,
    ) -> impl Future<Output = DcimResult<InterfaceConnection>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: InterfaceFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<InterfaceConnection>>> + Send;
    /// Interfaces owned by the hardware item.
    fn list_for_hardware(
        &self,
        hardware_id: Uuid,
    ) -> impl Future<Output = DcimResult<Vec<InterfaceConnection>>> + Send;
    /// Interfaces elsewhere that uplink into the given switch.
    fn list_uplinked_to(
        &self,
        switch_id: Uuid,
    ) -> impl Future<Output = DcimResult<Vec<InterfaceConnection>>> + Send;
}

// ---------------------------------------------------------------------------
// Users (auxiliary, soft-deleted)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = DcimResult<UserView>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DcimResult<UserView>> + Send;
    /// Full row including the password hash, for the login path only.
    fn get_with_password(&self, email: &str) -> impl Future<Output = DcimResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = DcimResult<UserView>> + Send;
    /// Soft delete: the row survives but disappears from reads.
    fn delete(&self, id: Uuid) -> impl Future<Output = DcimResult<()>> + Send;
    fn list(
        &self,
        filter: UserFilter,
        options: ListOptions,
    ) -> impl Future<Output = DcimResult<Page<UserView>>> + Send;
}
