pub mod auto_delete;
pub mod config;
pub mod grouped;
pub mod item;
pub mod mass_delete;
pub mod row;
pub mod settings;
pub mod storage;
#[cfg(test)]
pub(crate) mod test_support;
pub mod time;
