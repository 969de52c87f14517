mod lock_file;

pub use self::lock_file::LockFile;
