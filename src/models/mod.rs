pub mod loaders;
pub mod record;

pub use loaders::{load_records, parse_records, RecordFormat};
pub use record::{FormField, Record, RecordFields};
