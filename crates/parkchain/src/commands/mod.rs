//! Command implementations that touch the filesystem outside of storage.

pub mod init;
