pub mod analyze_cmd;
pub mod settings_cmd;
