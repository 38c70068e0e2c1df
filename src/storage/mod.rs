pub mod backend;
pub mod db;
mod files;
mod galleries;
pub mod models;
pub mod table;
mod tables;
mod users;

pub use backend::{JsonFileStorage, ObjectTableStorage, TableDocument, TableStorage};
pub use db::{Database, StorageError};
pub use files::FileRemoval;
pub use galleries::CascadeReport;
pub use table::{Document, Eid, Row, Table};
pub use tables::*;
