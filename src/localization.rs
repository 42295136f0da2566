use anyhow::{bail, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Language used when the user's language is unknown or unsupported
pub const DEFAULT_LANGUAGE: &str = "ru";

const RESOURCES: [(&str, &str); 2] = [
    ("ru", include_str!("../locales/ru/main.ftl")),
    ("en", include_str!("../locales/en/main.ftl")),
];

/// Localization manager for the fitness bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    errors: Vec<String>,
}

impl LocalizationManager {
    /// Build bundles for every embedded locale
    pub fn new() -> Self {
        let mut bundles = HashMap::new();
        let mut errors = Vec::new();

        for (code, source) in RESOURCES {
            let locale: LanguageIdentifier = match code.parse() {
                Ok(locale) => locale,
                Err(e) => {
                    errors.push(format!("{code}: invalid language identifier: {e}"));
                    continue;
                }
            };

            let mut bundle = FluentBundle::new_concurrent(vec![locale]);
            // Telegram renders the bidi isolation marks as garbage
            bundle.set_use_isolating(false);

            let resource = match FluentResource::try_new(source.to_string()) {
                Ok(resource) => resource,
                Err((resource, parse_errors)) => {
                    errors.push(format!("{code}: {} parse errors", parse_errors.len()));
                    resource
                }
            };
            if let Err(add_errors) = bundle.add_resource(resource) {
                errors.push(format!("{code}: {} duplicate messages", add_errors.len()));
            }

            bundles.insert(code.to_string(), bundle);
        }

        for error in &errors {
            warn!(error = %error, "Localization resource problem");
        }

        Self { bundles, errors }
    }

    /// Bundle for a Telegram language code such as "en-US", falling back to Russian
    fn bundle_for(&self, language: Option<&str>) -> Option<&FluentBundle<FluentResource>> {
        let primary = language
            .and_then(|code| code.split(['-', '_']).next())
            .map(str::to_lowercase);

        primary
            .and_then(|code| self.bundles.get(&code))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
    }

    /// Whether a language has its own bundle
    pub fn is_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Get a localized message in the given language
    pub fn get_message(&self, key: &str, language: Option<&str>, args: &[(&str, &str)]) -> String {
        let Some(bundle) = self.bundle_for(language) else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = (!args.is_empty()).then(|| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(value.to_string()));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, errors = ?errors, "Failed to format message");
        }
        value.into_owned()
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager and report broken resources
pub fn init_localization() -> Result<()> {
    let manager = get_localization_manager();
    if !manager.errors.is_empty() {
        bail!("Broken localization resources: {}", manager.errors.join("; "));
    }
    Ok(())
}

/// Get the global localization manager, building it on first use
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(LocalizationManager::new)
}

/// Localized message in the given language
pub fn t_lang(key: &str, language: Option<&str>) -> String {
    get_localization_manager().get_message(key, language, &[])
}

/// Localized message with arguments in the given language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: Option<&str>) -> String {
    get_localization_manager().get_message(key, language, args)
}

/// Lookup with a mandatory language code
pub fn get_message_in_language(key: &str, language: &str, args: &[(&str, &str)]) -> String {
    get_localization_manager().get_message(key, Some(language), args)
}
