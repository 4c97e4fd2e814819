pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod service;

pub use config::AppConfig;
pub use error::TaskError;
pub use repository::{SqlTaskRepository, TaskRepository};
pub use service::{TaskManager, TaskService};
