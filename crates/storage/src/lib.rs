#![forbid(unsafe_code)]

mod blocking;
mod db;
mod entry;
mod kv;
mod list;

pub use db::Db;
pub use kv::KvStore;
pub use list::ListStore;
