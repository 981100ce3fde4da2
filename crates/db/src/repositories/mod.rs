pub mod job_repo;
pub mod queue_repo;
pub mod request_repo;
pub mod worker_repo;

pub use job_repo::JobRepo;
pub use queue_repo::QueueRepo;
pub use request_repo::RequestRepo;
pub use worker_repo::WorkerRepo;
