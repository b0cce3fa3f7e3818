mod settings;

pub use settings::{Command, Config, DashboardSettings, FetchSettings, Settings};
