// Core services
pub mod inventory;
pub mod orders;

// Remote collaborators
pub mod user_directory;
