pub mod auth;
pub mod billing;
pub mod character;
pub mod notification;
pub mod project;
pub mod render;
pub mod scene;
pub mod voice;
