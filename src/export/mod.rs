//! Scene export: settings, the export session and the OBJ fallback store.

mod obj;
mod session;
mod settings;

pub use obj::ObjStore;
pub use session::{ExportReport, Exporter};
pub use settings::{parse_resolution, ExportSettings, Integrator};
