/// ETL Pipeline Module
///
/// One indexing cycle is Extract, Transform, Load:
/// - Extract: pick bootstrap or incremental mode from stored data and fetch a page from TzKT
/// - Transform: filter operations and derive delegation semantics
/// - Load: upsert bakers and insert delegations in one database transaction
pub mod extract;
pub mod load;
pub mod transform;
