pub mod gateways;
pub use gateways::{IdentityGateway, InventoryGateway, MaterialRequestStore};
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod material_request_repo;
pub use material_request_repo::MaterialRequestRepository;
pub mod memory;
pub use memory::InMemoryStore;
