pub mod role;
pub mod user;
pub mod user_group;
pub mod user_group_member;
