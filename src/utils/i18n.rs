use tracing::warn;

/// Locale used when the configured one has no translations
pub const FALLBACK_LOCALE: &str = "en";

/// Pick a locale we have translations for; `fi-FI` falls back to `fi`
pub fn resolve_locale<'a>(requested: &str, available: &[&'a str]) -> Option<&'a str> {
    let language = requested.split(['-', '_']).next().unwrap_or(requested);
    [requested, language].into_iter().find_map(|candidate| {
        available
            .iter()
            .copied()
            .find(|locale| locale.eq_ignore_ascii_case(candidate))
    })
}

/// Set the locale used for chat replies
pub fn set_locale(requested: &str) {
    let available = rust_i18n::available_locales!();
    match resolve_locale(requested, &available) {
        Some(locale) => rust_i18n::set_locale(locale),
        None => {
            warn!(
                "No translations for locale '{}', using '{}'",
                requested, FALLBACK_LOCALE
            );
            rust_i18n::set_locale(FALLBACK_LOCALE);
        }
    }
}
