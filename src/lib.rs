pub mod api_router;
pub mod auth;
pub mod catalog;
pub mod feedback;
pub mod lecture;
pub mod paths;
pub mod progress;
pub mod quiz;
pub mod shared;
