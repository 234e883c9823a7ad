//! SurrealDB repository implementations.

mod hardware;
mod hardware_info;
mod hardware_type;
mod interface;
mod rack;
mod region;
mod room;
mod site;
mod tenant;
mod tenant_group;
mod user;
mod zone;

pub use hardware::SurrealHardwareRepository;
pub use hardware_info::SurrealHardwareInfoRepository;
pub use hardware_type::SurrealHardwareTypeRepository;
pub use interface::SurrealInterfaceRepository;
pub use rack::SurrealRackRepository;
pub use region::SurrealRegionRepository;
pub use room::SurrealRoomRepository;
pub use site::SurrealSiteRepository;
pub use tenant::SurrealTenantRepository;
pub use tenant_group::SurrealTenantGroupRepository;
pub use user::{SurrealUserRepository, verify_password};
pub use zone::SurrealZoneRepository;
