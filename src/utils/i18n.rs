use tracing::warn;

/// Locales shipped in `locales/`
pub const AVAILABLE_LOCALES: [&str; 2] = ["en", "fi"];

/// Switch the UI language, falling back to English for unknown locales
pub fn set_locale(locale: &str) {
    if AVAILABLE_LOCALES.contains(&locale) {
        rust_i18n::set_locale(locale);
    } else {
        warn!("Unknown locale {}, using en", locale);
        rust_i18n::set_locale("en");
    }
}
