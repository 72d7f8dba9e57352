//! Engine configuration.
//!
//! An [`EngineConfig`] is built once, before scanning, and shared read-only
//! between worker threads. It holds one compiled [`RuleSet`] and one
//! [`TypeHierarchy`] per language together with the translator and the
//! reorganizer. The built-in presets are compiled into the binary; rule files
//! given by the user are merged into the same catalogues, so they can add
//! rules to built-in groups.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::engine::DetectionExecutive;
use crate::error::{CatalogueError, Result};
use crate::reorganizer::Reorganizer;
use crate::rules::catalogue::load_catalogue_file;
use crate::rules::{parse_catalogue, CatalogueFile, RuleCatalogue, RuleSet};
use crate::syntax::{Language, TypeHierarchy};
use crate::translation::Translator;

const DEFAULT_MAX_DEPTH: usize = 50;

/// A catalogue or hierarchy file shipped with the crate.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinPreset {
    pub language: Language,
    pub path: &'static str,
    pub content: &'static str,
}

pub const BUILTIN_CATALOGUES: &[BuiltinPreset] = &[
    BuiltinPreset {
        language: Language::Java,
        path: "presets/java/jca.yaml",
        content: include_str!("../presets/java/jca.yaml"),
    },
    BuiltinPreset {
        language: Language::Java,
        path: "presets/java/bc.yaml",
        content: include_str!("../presets/java/bc.yaml"),
    },
    BuiltinPreset {
        language: Language::Python,
        path: "presets/python/pyca.yaml",
        content: include_str!("../presets/python/pyca.yaml"),
    },
];

pub const BUILTIN_TYPES: &[BuiltinPreset] = &[
    BuiltinPreset {
        language: Language::Java,
        path: "presets/java/types.yaml",
        content: include_str!("../presets/java/types.yaml"),
    },
    BuiltinPreset {
        language: Language::Python,
        path: "presets/python/types.yaml",
        content: include_str!("../presets/python/types.yaml"),
    },
];

/// Compiled rules and library types for one language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    rules: Arc<RuleSet>,
    types: TypeHierarchy,
}

impl LanguageConfig {
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }
}

pub struct EngineConfig {
    languages: BTreeMap<Language, LanguageConfig>,
    translator: Translator,
    reorganizer: Reorganizer,
    max_depth: usize,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Built-in presets only.
    pub fn standard() -> Result<Self> {
        Self::builder().build()
    }

    pub fn language(&self, language: Language) -> Option<&LanguageConfig> {
        self.languages.get(&language)
    }

    /// Languages that have at least one rule.
    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.languages
            .iter()
            .filter(|(_, config)| !config.rules.is_empty())
            .map(|(language, _)| *language)
    }

    pub fn rules(&self, language: Language) -> Option<&Arc<RuleSet>> {
        self.language(language).map(LanguageConfig::rules)
    }

    pub fn types(&self, language: Language) -> Option<&TypeHierarchy> {
        self.language(language).map(LanguageConfig::types)
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn reorganizer(&self) -> &Reorganizer {
        &self.reorganizer
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// An executive for `language`, or `None` when no rules are configured
    /// for it.
    pub fn executive(&self, language: Language) -> Option<DetectionExecutive> {
        let rules = self.rules(language)?;
        if rules.is_empty() {
            return None;
        }
        Some(
            DetectionExecutive::builder(Arc::clone(rules))
                .with_max_depth(self.max_depth)
                .build(),
        )
    }

    /// Total number of compiled rules across all languages.
    pub fn rule_count(&self) -> usize {
        self.languages.values().map(|c| c.rules.len()).sum()
    }
}

enum CatalogueSource {
    File(PathBuf),
    Inline { language: Language, content: String },
}

enum TypeSource {
    File { language: Language, path: PathBuf },
    Inline { language: Language, content: String },
}

pub struct EngineConfigBuilder {
    builtin: bool,
    languages: Option<Vec<Language>>,
    catalogues: Vec<CatalogueSource>,
    types: Vec<TypeSource>,
    translator: Option<Translator>,
    reorganizer: Option<Reorganizer>,
    max_depth: usize,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            builtin: true,
            languages: None,
            catalogues: Vec::new(),
            types: Vec::new(),
            translator: None,
            reorganizer: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_builtin_presets(mut self, enabled: bool) -> Self {
        self.builtin = enabled;
        self
    }

    /// Restricts the configuration to the given languages.
    pub fn with_languages(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.languages = Some(languages.into_iter().collect());
        self
    }

    /// A YAML or JSON catalogue on disk. Its language is read from the file.
    pub fn with_rule_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalogues.push(CatalogueSource::File(path.into()));
        self
    }

    /// An in-memory YAML catalogue for `language`.
    pub fn with_catalogue_str(mut self, language: Language, yaml: impl Into<String>) -> Self {
        self.catalogues.push(CatalogueSource::Inline {
            language,
            content: yaml.into(),
        });
        self
    }

    pub fn with_type_file(mut self, language: Language, path: impl Into<PathBuf>) -> Self {
        self.types.push(TypeSource::File {
            language,
            path: path.into(),
        });
        self
    }

    pub fn with_type_hierarchy_str(mut self, language: Language, yaml: impl Into<String>) -> Self {
        self.types.push(TypeSource::Inline {
            language,
            content: yaml.into(),
        });
        self
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_reorganizer(mut self, reorganizer: Reorganizer) -> Self {
        self.reorganizer = Some(reorganizer);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn wants(&self, language: Language) -> bool {
        self.languages
            .as_ref()
            .map_or(true, |languages| languages.contains(&language))
    }

    pub fn build(self) -> Result<EngineConfig> {
        let mut catalogues: BTreeMap<Language, RuleCatalogue> = BTreeMap::new();
        let mut hierarchies: BTreeMap<Language, TypeHierarchy> = BTreeMap::new();

        if self.builtin {
            for preset in BUILTIN_CATALOGUES.iter().filter(|p| self.wants(p.language)) {
                trace!(path = preset.path, "loading built-in catalogue");
                let file = parse_catalogue(Path::new(preset.path), preset.content)?;
                add_catalogue(&mut catalogues, preset.language, file)?;
            }
            for preset in BUILTIN_TYPES.iter().filter(|p| self.wants(p.language)) {
                let types = parse_types(Path::new(preset.path), preset.content)?;
                hierarchies.entry(preset.language).or_default().merge(types);
            }
        }

        for source in &self.catalogues {
            let (language, file) = match source {
                CatalogueSource::File(path) => {
                    let file = load_catalogue_file(path)?;
                    (file.language, file)
                }
                CatalogueSource::Inline { language, content } => {
                    let file = parse_catalogue(Path::new("inline.yaml"), content)?;
                    (*language, file)
                }
            };
            if !self.wants(language) {
                debug!(%language, "ignoring catalogue for unselected language");
                continue;
            }
            add_catalogue(&mut catalogues, language, file)?;
        }

        for source in &self.types {
            let (language, types) = match source {
                TypeSource::File { language, path } => {
                    let content = fs::read_to_string(path).map_err(|e| {
                        CatalogueError::rules_file_read_error(path, e.to_string())
                    })?;
                    (*language, parse_types(path, &content)?)
                }
                TypeSource::Inline { language, content } => {
                    (*language, parse_types(Path::new("inline.yaml"), content)?)
                }
            };
            if self.wants(language) {
                hierarchies.entry(language).or_default().merge(types);
            }
        }

        let mut languages = BTreeMap::new();
        for (language, catalogue) in catalogues {
            let rules = catalogue.compile()?;
            let types = hierarchies.remove(&language).unwrap_or_default();
            languages.insert(
                language,
                LanguageConfig {
                    rules: Arc::new(rules),
                    types,
                },
            );
        }

        let config = EngineConfig {
            languages,
            translator: self.translator.unwrap_or_default(),
            reorganizer: self.reorganizer.unwrap_or_default(),
            max_depth: self.max_depth,
        };
        debug!(
            languages = config.languages.len(),
            rules = config.rule_count(),
            "engine configuration ready"
        );
        Ok(config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn add_catalogue(
    catalogues: &mut BTreeMap<Language, RuleCatalogue>,
    language: Language,
    file: CatalogueFile,
) -> std::result::Result<(), CatalogueError> {
    catalogues
        .entry(language)
        .or_insert_with(|| RuleCatalogue::new(language))
        .add_file(file)
}

fn parse_types(origin: &Path, content: &str) -> std::result::Result<TypeHierarchy, CatalogueError> {
    TypeHierarchy::from_yaml_str(content)
        .map_err(|e| CatalogueError::rules_parse_error(origin, e.to_string()))
}
