pub mod locked_app;
pub mod trigger_exclusion;
pub mod setting;

pub use locked_app::LockedApp;
pub use trigger_exclusion::TriggerExclusion;
pub use setting::Setting;
