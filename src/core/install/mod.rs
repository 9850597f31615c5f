mod layout;
mod orchestrator;
mod side;

pub use layout::InstallLayout;
pub use orchestrator::{InstallReport, Installer};
pub use side::Side;
