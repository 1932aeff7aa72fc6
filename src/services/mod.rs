pub mod init;
pub mod turn_order;
