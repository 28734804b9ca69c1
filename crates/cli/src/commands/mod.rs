pub mod check;
pub mod doctor;
pub mod hash_password;
pub mod init;
pub mod preview;
pub mod serve;
