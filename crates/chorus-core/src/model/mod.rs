//! Entity data model: users, workspaces, and the objects feeds refer to.

pub mod entity;
pub mod user;
pub mod workspace;

pub use entity::{Dataset, Entity, EntityRef, EntityType, Instance, InstanceFlavor, Workfile};
pub use user::User;
pub use workspace::Workspace;
