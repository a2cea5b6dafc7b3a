pub mod settings;
pub mod persistence;
pub mod preferences;

pub use settings::{
    DeviceConfig, GatewayConfig, PlaybackSettings, PlayerConfig, ResumeSettings, SyncSettings,
};
pub use persistence::{
    get_config_path, get_preferences_path, load_config, load_config_from, save_config,
    save_config_to,
};
pub use preferences::{
    JsonFilePreferenceStore, MemoryPreferenceStore, PlaybackPreferences, PreferenceStore,
};
