pub mod dto;
pub mod handlers;
pub mod pagination;
pub mod repo;
pub mod repo_memory;
pub mod repo_pg;
pub mod repo_types;
pub mod services;

pub use repo::{RepoError, UserRepository};
pub use repo_memory::InMemoryUserRepository;
pub use repo_pg::PgUserRepository;
pub use services::UserService;
