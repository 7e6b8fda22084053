//! Filesystem-based mapping rule loader.
//!
//! Reads TOML mapping files, either one file or every `*.toml` below a
//! directory (sorted by path), and turns them into a [`RuleSet`] plus the
//! [`TypeDescriptor`]s the files declare.
//!
//! # Mapping file format
//!
//! ```toml
//! [configuration]                  # optional, at most one across all files
//! null-policy = "map-null"         # skip-if-null | map-null | map-empty-string-as-null
//! date-format = "%Y-%m-%d"
//! strict      = false
//! wildcard    = true
//!
//! [[types]]
//! name   = "Person"
//! extends = ["Named"]              # optional
//! fields = [
//!     { name = "name", type = "string" },
//!     { name = "tags", type = "list<string>" },
//! ]
//!
//! [[types]]
//! name    = "email"
//! scalar  = "string"               # user scalar stored as a string
//! extends = ["string"]
//!
//! [[mappings]]
//! a        = "Person"
//! b        = "PersonDto"
//! map-id   = "brief"               # optional
//! one-way  = false
//! wildcard = true
//! exclude  = ["age"]               # same name on both sides
//!
//! [[mappings.fields]]
//! a         = "name"
//! b         = "fullName"
//! converter = "upper"              # optional, registered by id
//! one-way   = true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use graft_core::{
    application::{ApplicationError, ports::RuleSource},
    domain::{
        ClassRule, DomainError, FieldExclude, FieldRule, FieldShape, GlobalConfiguration, NullPolicy,
        RuleSet, ScalarKind, TypeCatalog, TypeDescriptor,
    },
    error::{GraftError, GraftResult},
};

// ── File types ────────────────────────────────────────────────────────────────

/// Deserialised representation of one mapping file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    pub configuration: Option<GlobalConfiguration>,
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
}

/// One `[[types]]` entry.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    pub name: String,
    /// Scalar kind for user scalars; omitted for beans.
    pub scalar: Option<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,
    /// Shape string: `T`, `list<T>`, `set<T>`, `array<T>`, `map<K,V>`.
    #[serde(rename = "type")]
    pub shape: String,
}

/// One `[[mappings]]` entry.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MappingEntry {
    pub a: String,
    pub b: String,
    pub map_id: Option<String>,
    #[serde(default)]
    pub one_way: bool,
    pub wildcard: Option<bool>,
    pub null_policy: Option<String>,
    pub date_format: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub exclude_pairs: Vec<ExcludeEntry>,
    #[serde(default)]
    pub fields: Vec<FieldRuleEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExcludeEntry {
    pub a: String,
    pub b: String,
}

/// One `[[mappings.fields]]` entry.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FieldRuleEntry {
    pub a: String,
    pub b: String,
    pub converter: Option<String>,
    pub null_policy: Option<String>,
    pub date_format: Option<String>,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default)]
    pub map_keys: bool,
}

/// Everything read from the mapping files.
#[derive(Debug, Clone, Default)]
pub struct LoadedRules {
    pub types: Vec<TypeDescriptor>,
    pub rules: RuleSet,
    /// Files read, in load order.
    pub files: Vec<PathBuf>,
}

impl LoadedRules {
    /// Build a catalog from the declared types (plus the built-in scalars).
    pub fn catalog(&self) -> GraftResult<TypeCatalog> {
        Ok(TypeCatalog::builder()
            .register_all(self.types.iter().cloned())
            .build()?)
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads mapping rules from a TOML file or a directory of TOML files.
///
/// Unlike a lenient loader, one invalid file fails the whole load: a mapper
/// must never run with half of its rules.
///
/// # Example
///
/// ```no_run
/// use graft_adapters::TomlRuleLoader;
/// use graft_core::application::Mapper;
///
/// let loader = TomlRuleLoader::new("./mappings");
/// let catalog = loader.load_catalog()?;
/// let mapper = Mapper::builder(catalog).rule_source(loader).build();
/// # Ok::<(), graft_core::error::GraftError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TomlRuleLoader {
    path: PathBuf,
}

impl TomlRuleLoader {
    /// Create a loader pointed at a file or directory.
    ///
    /// The path does not need to exist yet; loading fails if it is missing
    /// when called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every mapping file.
    ///
    /// # Errors
    ///
    /// `RuleLoading` naming the offending file when the path is missing, a
    /// file cannot be read or parsed, or two files carry different
    /// `[configuration]` sections.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load_all(&self) -> GraftResult<LoadedRules> {
        let files = self.discover()?;
        let mut loaded = LoadedRules::default();

        for file in files {
            let raw = fs::read_to_string(&file)
                .map_err(|e| loading_error(&file, format!("failed to read file: {e}")))?;
            let parsed = parse_str(&raw).map_err(|e| loading_error(&file, e.to_string()))?;

            debug!(
                file = %file.display(),
                types = parsed.types.len(),
                mappings = parsed.rules.len(),
                "loaded mapping file"
            );

            loaded.types.extend(parsed.types);
            loaded
                .rules
                .merge(parsed.rules)
                .map_err(|e| loading_error(&file, e.to_string()))?;
            loaded.files.push(file);
        }

        debug!(
            files = loaded.files.len(),
            mappings = loaded.rules.len(),
            "finished loading mapping files"
        );
        Ok(loaded)
    }

    /// Catalog of the types declared in the mapping files.
    pub fn load_catalog(&self) -> GraftResult<TypeCatalog> {
        self.load_all()?.catalog()
    }

    fn discover(&self) -> GraftResult<Vec<PathBuf>> {
        if !self.path.exists() {
            return Err(loading_error(&self.path, "path not found"));
        }
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).follow_links(true) {
            let entry = entry.map_err(|e| loading_error(&self.path, format!("failed to walk directory: {e}")))?;
            let is_toml = entry.path().extension().is_some_and(|ext| ext == "toml");
            if entry.file_type().is_file() && is_toml {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

impl RuleSource for TomlRuleLoader {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> GraftResult<RuleSet> {
        Ok(self.load_all()?.rules)
    }
}

fn loading_error(path: &Path, reason: impl Into<String>) -> GraftError {
    ApplicationError::RuleLoading {
        source_name: path.display().to_string(),
        reason: reason.into(),
    }
    .into()
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse one mapping file's content.
///
/// # Errors
///
/// Any TOML syntax error, unknown key, or invalid shape, kind or policy.
pub fn parse_str(raw: &str) -> GraftResult<LoadedRules> {
    let file: MappingFile = toml::from_str(raw)
        .map_err(|e| DomainError::InvalidRule(format!("invalid TOML: {e}")))?;

    let types = file
        .types
        .iter()
        .map(type_descriptor)
        .collect::<GraftResult<Vec<_>>>()?;

    let mut rules = RuleSet::new();
    if let Some(configuration) = file.configuration {
        rules = rules.with_configuration(configuration);
    }
    for entry in &file.mappings {
        rules = rules.with_rule(class_rule(entry)?);
    }
    rules.validate()?;

    Ok(LoadedRules {
        types,
        rules,
        files: Vec::new(),
    })
}

fn type_descriptor(entry: &TypeEntry) -> GraftResult<TypeDescriptor> {
    let mut descriptor = match &entry.scalar {
        Some(kind) => {
            if !entry.fields.is_empty() {
                return Err(DomainError::InvalidRule(format!(
                    "scalar type '{}' cannot declare fields",
                    entry.name
                ))
                .into());
            }
            TypeDescriptor::scalar(entry.name.as_str(), ScalarKind::from_str(kind)?)
        }
        None => TypeDescriptor::bean(entry.name.as_str()),
    };

    for parent in &entry.extends {
        descriptor = descriptor.extends(parent.as_str());
    }
    for field in &entry.fields {
        descriptor = descriptor.with_field(field.name.as_str(), FieldShape::from_str(&field.shape)?);
    }
    Ok(descriptor)
}

fn class_rule(entry: &MappingEntry) -> GraftResult<ClassRule> {
    let mut rule = ClassRule::new(entry.a.as_str(), entry.b.as_str());
    rule.map_id = entry.map_id.as_deref().map(Into::into);
    rule.one_way = entry.one_way;
    rule.wildcard = entry.wildcard;
    rule.null_policy = policy(entry.null_policy.as_deref())?;
    rule.date_format = entry.date_format.clone();
    rule.excludes = entry
        .exclude
        .iter()
        .map(|name| FieldExclude {
            a: name.clone(),
            b: name.clone(),
        })
        .chain(entry.exclude_pairs.iter().map(|e| FieldExclude {
            a: e.a.clone(),
            b: e.b.clone(),
        }))
        .collect();

    for field in &entry.fields {
        let mut field_rule = FieldRule::new(field.a.as_str(), field.b.as_str());
        field_rule.converter_id = field.converter.clone();
        field_rule.null_policy = policy(field.null_policy.as_deref())?;
        field_rule.date_format = field.date_format.clone();
        field_rule.one_way = field.one_way;
        field_rule.map_keys = field.map_keys;
        rule = rule.field_rule(field_rule);
    }
    Ok(rule)
}

fn policy(raw: Option<&str>) -> GraftResult<Option<NullPolicy>> {
    raw.map(NullPolicy::from_str).transpose().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::domain::TypeName;
    use tempfile::TempDir;

    const PEOPLE: &str = r#"
[configuration]
null-policy = "skip-if-null"
date-format = "%Y-%m-%d"

[[types]]
name = "Person"
fields = [
    { name = "name", type = "string" },
    { name = "tags", type = "list<string>" },
]

[[types]]
name = "PersonDto"
fields = [{ name = "fullName", type = "string" }]

[[mappings]]
a = "Person"
b = "PersonDto"
map-id = "brief"
exclude = ["tags"]

[[mappings.fields]]
a = "name"
b = "fullName"
converter = "upper"
one-way = true
"#;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn parses_types_configuration_and_mappings() {
        let loaded = parse_str(PEOPLE).unwrap();

        assert_eq!(loaded.types.len(), 2);
        assert_eq!(loaded.types[0].fields()[1].shape, FieldShape::List("string".into()));

        let config = loaded.rules.configuration();
        assert_eq!(config.null_policy, NullPolicy::SkipIfNull);
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert!(config.wildcard);

        let rule = &loaded.rules.mappings[0];
        assert_eq!(rule.map_id.as_ref().map(|m| m.as_str()), Some("brief"));
        assert_eq!(rule.excludes[0].b, "tags");
        assert_eq!(rule.fields[0].converter_id.as_deref(), Some("upper"));
        assert!(rule.fields[0].one_way);
    }

    #[test]
    fn builds_a_catalog_from_declared_types() {
        let catalog = parse_str(PEOPLE).unwrap().catalog().unwrap();
        assert!(catalog.contains(&TypeName::new("Person")));
        assert!(catalog.contains(&TypeName::new("string")));
    }

    #[test]
    fn user_scalars_are_supported() {
        let loaded = parse_str(
            r#"
[[types]]
name = "email"
scalar = "string"
extends = ["string"]
"#,
        )
        .unwrap();
        assert_eq!(loaded.types[0].scalar_kind(), Some(ScalarKind::String));
        assert_eq!(loaded.types[0].supertypes(), [TypeName::new("string")]);
    }

    #[test]
    fn invalid_content_is_rejected() {
        assert!(parse_str("[[mappings]]\na = \"A\"").is_err());
        assert!(parse_str("[[types]]\nname = \"A\"\nfields = [{ name = \"x\", type = \"list<\" }]").is_err());
        assert!(parse_str("[[mappings]]\na = \"A\"\nb = \"B\"\nnull-policy = \"sometimes\"").is_err());
        assert!(parse_str("[unknown]\nx = 1").is_err());
        assert!(matches!(
            parse_str("[[types]]\nname = \"e\"\nscalar = \"text\""),
            Err(GraftError::Domain(DomainError::InvalidRule(_)))
        ));
    }

    #[test]
    fn loads_directory_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.toml", "[[mappings]]\na = \"C\"\nb = \"D\"");
        write(temp.path(), "a.toml", "[[mappings]]\na = \"A\"\nb = \"B\"");
        write(temp.path(), "nested/c.toml", "[[mappings]]\na = \"E\"\nb = \"F\"");
        write(temp.path(), "notes.txt", "not a mapping");

        let loaded = TomlRuleLoader::new(temp.path()).load_all().unwrap();
        let pairs: Vec<_> = loaded
            .rules
            .mappings
            .iter()
            .map(|r| r.type_a.as_str().to_owned())
            .collect();
        assert_eq!(pairs, ["A", "C", "E"]);
        assert_eq!(loaded.files.len(), 3);
    }

    #[test]
    fn invalid_file_fails_the_load_with_its_path() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "good.toml", "[[mappings]]\na = \"A\"\nb = \"B\"");
        write(temp.path(), "bad.toml", "[[mappings]\n");

        let err = TomlRuleLoader::new(temp.path()).load().unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
        assert!(err.is_retryable());
    }

    #[test]
    fn conflicting_configuration_across_files_fails() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.toml", "[configuration]\nstrict = true");
        write(temp.path(), "b.toml", "[configuration]\nstrict = false");

        assert!(TomlRuleLoader::new(temp.path()).load().is_err());
    }

    #[test]
    fn missing_path_is_an_error() {
        let loader = TomlRuleLoader::new("/definitely/not/here");
        assert!(loader.load().is_err());
        assert_eq!(loader.name(), "/definitely/not/here");
    }

    #[test]
    fn single_file_source() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "people.toml", PEOPLE);

        let loader = TomlRuleLoader::new(temp.path().join("people.toml"));
        assert_eq!(loader.load().unwrap().len(), 1);
        assert_eq!(loader.load_catalog().unwrap().len(), 7);
    }
}
