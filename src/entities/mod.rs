//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod activity_log;
pub mod chat_room;
pub mod home;
pub mod message;
pub mod need;
pub mod profile;

// Re-export specific types to avoid conflicts
pub use activity_log::{
    ActivityAction, Column as ActivityLogColumn, Entity as ActivityLog, Model as ActivityLogModel,
};
pub use chat_room::{Column as ChatRoomColumn, Entity as ChatRoom, Model as ChatRoomModel};
pub use home::{
    AccountStatus, Column as HomeColumn, Entity as Home, Model as HomeModel, VerificationStatus,
};
pub use message::{Column as MessageColumn, Entity as Message, Model as MessageModel};
pub use need::{
    Column as NeedColumn, Entity as Need, Model as NeedModel, NeedCategory, NeedStatus, Urgency,
};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel, Role};
