pub mod activity;
pub mod attendance;
pub mod mess_plan;
pub mod notification;
pub mod staff;
pub mod student;
pub mod user;
