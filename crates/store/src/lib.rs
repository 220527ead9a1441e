// Durable sheet storage

pub mod persistent;
pub mod sqlite;
