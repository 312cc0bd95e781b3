pub mod ask;
pub mod check;
pub mod doctor;
pub mod init;
pub mod render;
pub mod serve;
