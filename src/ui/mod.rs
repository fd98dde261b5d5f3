pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod new_chat;
pub mod sidebar;
