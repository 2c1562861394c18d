pub mod broadcast;
pub mod handler;
pub mod msg_chat_handler;
pub mod msg_drawing_handler;
pub mod msg_erase_handler;
pub mod msg_join_handler;
pub mod msg_leave_handler;
pub mod registry;
pub mod rooms;
