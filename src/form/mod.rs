pub mod conversion;
pub mod definition;
pub mod value;
pub mod workspace;

pub use conversion::*;
pub use definition::*;
pub use value::*;
pub use workspace::*;
