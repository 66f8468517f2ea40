// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for testlink-sync.
//!
//! The config names one seeker per report format and include pattern. Each seeker decides how
//! events are built from a report ([`IdentityStrategy`]) and how they are compared to the key
//! fields of tracked test cases.

use crate::errors::{
    ConfigParseError, ConfigParseErrorKind, ConfigValidationError, ConfigValidationReason,
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall configuration for a reconciliation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileConfig {
    settings: ReconcileSettings,
    seekers: Vec<SeekerConfig>,
}

impl ReconcileConfig {
    /// The default location of the config within the base directory: `.config/testlink.toml`.
    pub const CONFIG_PATH: &'static str = ".config/testlink.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Creates a config from its parts, validating every seeker.
    pub fn new(
        settings: ReconcileSettings,
        seekers: Vec<SeekerConfig>,
    ) -> Result<Self, ConfigValidationError> {
        for (index, seeker) in seekers.iter().enumerate() {
            seeker.validate(index)?;
        }
        Ok(Self { settings, seekers })
    }

    /// Reads the config from the given file, or if not specified from `.config/testlink.toml`
    /// in the base directory.
    ///
    /// If no config file is specified and the base directory doesn't have
    /// `.config/testlink.toml`, uses the default config options.
    pub fn from_sources(
        base_dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = base_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Self::new(inner.reconcile, inner.seekers).map_err(|err| {
            ConfigParseError::new(config_file, ConfigParseErrorKind::ValidationError(err))
        })
    }

    /// Returns the default config: no seekers, and default settings.
    #[cfg(test)]
    pub(crate) fn default_config() -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");

        let inner: ReconcileConfigImpl = config
            .try_deserialize()
            .expect("default config is always valid");
        Self {
            settings: inner.reconcile,
            seekers: inner.seekers,
        }
    }

    /// Returns the run-wide settings.
    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Returns the seekers, in config order.
    pub fn seekers(&self) -> &[SeekerConfig] {
        &self.seekers
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<ReconcileConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }
}

/// Settings that apply to the whole run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReconcileSettings {
    /// Mark the build as failed if any verdict is `Failed`.
    #[serde(default)]
    pub failed_tests_mark_build_as_failure: bool,

    /// Mark the build as failed if no verdict was produced.
    #[serde(default)]
    pub fail_if_no_results: bool,
}

/// A report format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// JUnit-style XML.
    Junit,

    /// TestNG `testng-results.xml`.
    Testng,

    /// The Test Anything Protocol.
    Tap,
}

impl ReportFormat {
    /// Returns the identity strategies this format can produce.
    pub fn supported_identities(self) -> &'static [IdentityStrategy] {
        use IdentityStrategy::*;

        match self {
            Self::Junit => &[SuiteName, ClassName, CaseName, MethodName],
            Self::Testng => &[SuiteName, ClassName, MethodName, MethodNameDataProvider],
            Self::Tap => &[FileName],
        }
    }

    /// Returns true if this format can produce identities with the given strategy.
    pub fn supports(self, identity: IdentityStrategy) -> bool {
        self.supported_identities().contains(&identity)
    }

    /// Returns the name used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Junit => "junit",
            Self::Testng => "testng",
            Self::Tap => "tap",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the identity of an event is built from a report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityStrategy {
    /// One event per suite, identified by the suite name.
    SuiteName,

    /// One event per class, identified by the fully qualified class name.
    ClassName,

    /// One event per test case, identified by the test case name.
    CaseName,

    /// One event per method, identified as `<class>#<method>`.
    MethodName,

    /// As `MethodName`, additionally requiring the data provider to match.
    MethodNameDataProvider,

    /// One event per TAP file, identified by the file name.
    FileName,
}

impl IdentityStrategy {
    /// Returns the name used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuiteName => "suite-name",
            Self::ClassName => "class-name",
            Self::CaseName => "case-name",
            Self::MethodName => "method-name",
            Self::MethodNameDataProvider => "method-name-data-provider",
            Self::FileName => "file-name",
        }
    }
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one seeker: a report format, an include pattern, and how events are
/// matched.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SeekerConfig {
    /// The format of the reports.
    pub format: ReportFormat,

    /// How event identities are built.
    pub identity: IdentityStrategy,

    /// Ant-style include patterns, relative to the base directory, separated by commas.
    pub include: String,

    /// The custom field on tracked test cases that identities are compared to.
    pub key_field: String,

    /// The custom field holding the expected data provider.
    #[serde(default)]
    pub data_provider_field: Option<String>,

    /// Whether report details are added to the notes of each result.
    #[serde(default = "default_true")]
    pub include_notes: bool,

    /// Whether report files, and files they reference, are uploaded as attachments.
    #[serde(default)]
    pub include_attachments: bool,

    /// Whether `<key value>-<platform>` also matches a test case with that platform.
    #[serde(default)]
    pub platform_suffix: bool,

    /// For TAP, compare the path relative to the base directory rather than the file name.
    #[serde(default)]
    pub compare_full_path: bool,

    /// For TAP, report each test point as a separate execution.
    #[serde(default)]
    pub test_points_as_executions: bool,
}

fn default_true() -> bool {
    true
}

impl SeekerConfig {
    /// Creates a seeker config with default options.
    pub fn new(
        format: ReportFormat,
        identity: IdentityStrategy,
        include: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            format,
            identity,
            include: include.into(),
            key_field: key_field.into(),
            data_provider_field: None,
            include_notes: true,
            include_attachments: false,
            platform_suffix: false,
            compare_full_path: false,
            test_points_as_executions: false,
        }
    }

    /// Checks that this seeker can work. `index` is its position in the config.
    pub fn validate(&self, index: usize) -> Result<(), ConfigValidationError> {
        let fail =
            |reason| Err(ConfigValidationError::new(index, self.format, self.identity, reason));

        if !self.format.supports(self.identity) {
            return fail(ConfigValidationReason::UnsupportedIdentity);
        }
        if self.include.trim().is_empty() {
            return fail(ConfigValidationReason::EmptyInclude);
        }
        if self.key_field.trim().is_empty() {
            return fail(ConfigValidationReason::EmptyKeyField);
        }
        if self.identity == IdentityStrategy::MethodNameDataProvider
            && self
                .data_provider_field
                .as_deref()
                .is_none_or(|field| field.trim().is_empty())
        {
            return fail(ConfigValidationReason::MissingDataProviderField);
        }
        if self.format != ReportFormat::Tap {
            if self.compare_full_path {
                return fail(ConfigValidationReason::TapOnlyOption("compare-full-path"));
            }
            if self.test_points_as_executions {
                return fail(ConfigValidationReason::TapOnlyOption(
                    "test-points-as-executions",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReconcileConfigImpl {
    #[serde(default)]
    reconcile: ReconcileSettings,

    #[serde(default, rename = "seeker")]
    seekers: Vec<SeekerConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn write_config(contents: &str) -> Utf8TempDir {
        let dir = Utf8TempDir::new().expect("created temp dir");
        std::fs::create_dir_all(dir.path().join(".config")).expect("created .config");
        std::fs::write(dir.path().join(ReconcileConfig::CONFIG_PATH), contents)
            .expect("wrote config file");
        dir
    }

    #[test]
    fn default_config_is_valid() {
        let config = ReconcileConfig::default_config();
        assert_eq!(config.settings(), &ReconcileSettings::default());
        assert!(config.seekers().is_empty());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let config = ReconcileConfig::from_sources(dir.path(), None).expect("config is valid");
        assert_eq!(config, ReconcileConfig::default_config());
    }

    #[test]
    fn parses_seekers_in_order() {
        let dir = write_config(indoc! {r#"
            [reconcile]
            failed-tests-mark-build-as-failure = true

            [[seeker]]
            format = "junit"
            identity = "class-name"
            include = "**/TEST-*.xml"
            key-field = "Java Class"
            include-attachments = true

            [[seeker]]
            format = "testng"
            identity = "method-name-data-provider"
            include = "**/testng-results.xml"
            key-field = "Java Method"
            data-provider-field = "Data Provider"

            [[seeker]]
            format = "tap"
            identity = "file-name"
            include = "tap/**/*.tap"
            key-field = "TAP File"
            platform-suffix = true
            test-points-as-executions = true
        "#});

        let config = ReconcileConfig::from_sources(dir.path(), None).expect("config is valid");
        assert!(config.settings().failed_tests_mark_build_as_failure);
        assert!(!config.settings().fail_if_no_results);

        let mut junit = SeekerConfig::new(
            ReportFormat::Junit,
            IdentityStrategy::ClassName,
            "**/TEST-*.xml",
            "Java Class",
        );
        junit.include_attachments = true;
        let mut testng = SeekerConfig::new(
            ReportFormat::Testng,
            IdentityStrategy::MethodNameDataProvider,
            "**/testng-results.xml",
            "Java Method",
        );
        testng.data_provider_field = Some("Data Provider".to_owned());
        let mut tap = SeekerConfig::new(
            ReportFormat::Tap,
            IdentityStrategy::FileName,
            "tap/**/*.tap",
            "TAP File",
        );
        tap.platform_suffix = true;
        tap.test_points_as_executions = true;

        assert_eq!(config.seekers(), [junit, testng, tap]);
    }

    #[test_case(
        indoc! {r#"
            [[seeker]]
            format = "tap"
            identity = "class-name"
            include = "*.tap"
            key-field = "TAP File"
        "#},
        ConfigValidationReason::UnsupportedIdentity
        ; "tap only supports file names"
    )]
    #[test_case(
        indoc! {r#"
            [[seeker]]
            format = "testng"
            identity = "method-name-data-provider"
            include = "*.xml"
            key-field = "Java Method"
        "#},
        ConfigValidationReason::MissingDataProviderField
        ; "data provider strategy needs a field"
    )]
    #[test_case(
        indoc! {r#"
            [[seeker]]
            format = "junit"
            identity = "case-name"
            include = "*.xml"
            key-field = "Name"
            compare-full-path = true
        "#},
        ConfigValidationReason::TapOnlyOption("compare-full-path")
        ; "full path is tap only"
    )]
    #[test_case(
        indoc! {r#"
            [[seeker]]
            format = "junit"
            identity = "suite-name"
            include = " "
            key-field = "Suite"
        "#},
        ConfigValidationReason::EmptyInclude
        ; "include must not be blank"
    )]
    fn invalid_seekers(config_contents: &str, expected: ConfigValidationReason) {
        let dir = write_config(config_contents);
        let err = ReconcileConfig::from_sources(dir.path(), None).expect_err("config is invalid");
        let ConfigParseErrorKind::ValidationError(err) = err.kind() else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(err.index(), 0);
        assert_eq!(err.reason(), &expected);
    }

    #[test]
    fn unknown_format_names_the_key() {
        let dir = write_config(indoc! {r#"
            [[seeker]]
            format = "nunit"
            identity = "class-name"
            include = "*.xml"
            key-field = "Class"
        "#});
        let err = ReconcileConfig::from_sources(dir.path(), None).expect_err("config is invalid");
        let ConfigParseErrorKind::DeserializeError(err) = err.kind() else {
            panic!("expected a deserialize error, got {err:?}");
        };
        assert!(
            err.path().to_string().starts_with("seeker"),
            "path {} names the seeker",
            err.path()
        );
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let missing = dir.path().join("nope.toml");
        let err = ReconcileConfig::from_sources(dir.path(), Some(&missing))
            .expect_err("missing file is an error");
        assert_eq!(err.config_file(), &missing);
        assert!(matches!(err.kind(), ConfigParseErrorKind::BuildError(_)));
    }
}
