pub mod job_repo;
pub mod system_repo;

pub use job_repo::JobRepo;
pub use system_repo::SystemRepo;
