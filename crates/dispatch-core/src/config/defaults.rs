pub(super) fn default_name() -> String {
    "dispatch".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.dispatch".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_db_path() -> String {
    "~/.dispatch/data/dispatch.db".to_string()
}
