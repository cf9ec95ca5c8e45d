//! # Localization Module
//!
//! Console messages are Fluent resources embedded at compile time, one
//! bundle per supported language. Indonesian is the default.

use anyhow::Result;
use fluent_bundle::{FluentArgs, FluentBundle, FluentResource, FluentValue};
use std::collections::HashMap;
use unic_langid::LanguageIdentifier;

use crate::ocr_config::DEFAULT_LOCALE;

/// Embedded resources, keyed by language code
const RESOURCES: &[(&str, &str)] = &[
    ("id", include_str!("../locales/id/main.ftl")),
    ("en", include_str!("../locales/en/main.ftl")),
];

/// Localization manager for console output
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    language: String,
}

impl std::fmt::Debug for LocalizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizationManager")
            .field("languages", &self.bundles.keys().collect::<Vec<_>>())
            .field("language", &self.language)
            .finish()
    }
}

impl LocalizationManager {
    /// Create a manager whose default language is picked from `language_code`.
    pub fn new(language_code: Option<&str>) -> Result<Self> {
        let mut bundles = HashMap::new();

        for (locale_str, source) in RESOURCES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            bundles.insert(locale_str.to_string(), Self::create_bundle(&locale, source)?);
        }

        let mut manager = Self {
            bundles,
            language: DEFAULT_LOCALE.to_string(),
        };
        manager.language = manager.detect_language(language_code);
        Ok(manager)
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(
        locale: &LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new(vec![locale.clone()]);
        // Plain terminal output: no bidi isolation marks around arguments
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("invalid {} resource: {:?}", locale, errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("duplicate messages in {}: {:?}", locale, errors))?;

        Ok(bundle)
    }

    /// Language used by [`LocalizationManager::t`]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Reduce a code like `en-US` to a supported language, else the default
    pub fn detect_language(&self, language_code: Option<&str>) -> String {
        if let Some(code) = language_code {
            let lang = code
                .split(['-', '_'])
                .next()
                .unwrap_or(code)
                .trim()
                .to_lowercase();
            if self.is_language_supported(&lang) {
                return lang;
            }
        }
        DEFAULT_LOCALE.to_string()
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&[(&str, &str)]>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LOCALE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            tracing::debug!(key = %key, errors = ?errors, "Message formatted with errors");
        }
        value.into_owned()
    }

    /// Message in the manager's language
    pub fn t(&self, key: &str) -> String {
        self.get_message_in_language(key, &self.language, None)
    }

    /// Message with arguments in the manager's language
    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.get_message_in_language(key, &self.language, Some(args))
    }
}
