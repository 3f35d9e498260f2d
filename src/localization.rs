use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Fluent sources compiled into the binary, keyed by language
const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager with every embedded language loaded
    pub fn new() -> Self {
        let bundles = RESOURCES
            .iter()
            .map(|(lang, source)| (lang.to_string(), Self::create_bundle(lang, source)))
            .collect();
        Self { bundles }
    }

    fn create_bundle(lang: &str, source: &str) -> FluentBundle<FluentResource> {
        let locale: LanguageIdentifier = lang.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Plain-text replies: no Unicode isolation marks around arguments
        bundle.set_use_isolating(false);

        let resource = match FluentResource::try_new(source.to_string()) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                warn!(language = lang, errors = ?errors, "Fluent resource parsed with errors");
                resource
            }
        };
        if let Err(errors) = bundle.add_resource(resource) {
            warn!(language = lang, errors = ?errors, "Fluent resource has conflicting messages");
        }
        bundle
    }

    /// Get a localized message in a specific language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match bundle.get_message(key).and_then(|msg| msg.value()) {
            Some(pattern) => pattern,
            None => return format!("Missing translation: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, *value);
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, language, errors = ?errors, "Fluent formatting errors");
        }
        value.into_owned()
    }

    /// Get an English message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(LocalizationManager::new);

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Map a Telegram language code (`fr-CA`, `en`, ...) to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(|code| code.to_ascii_lowercase());

    match primary {
        Some(code) => RESOURCES
            .iter()
            .map(|(lang, _)| *lang)
            .find(|lang| *lang == code)
            .unwrap_or(DEFAULT_LANGUAGE),
        None => DEFAULT_LANGUAGE,
    }
}

/// Convenience function to get a localized message for a user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(key, detect_language(language_code), None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(
        key,
        detect_language(language_code),
        Some(&args_map),
    )
}
