use clap::{clap_app, App, ArgMatches};
use figment::{Figment, providers::{Env, Format, Toml}};
use serde::Deserialize;
use std::{env, fmt, path::{Path, PathBuf}, process::exit, str::FromStr};
use super::error::IngestError;

pub const DEFAULT_CONFIG_FILE: &str = "_app.toml";
pub const ENV_PREFIX: &str = "PIMS_";
pub const LOG_FILE_NAME: &str = "ingest_log.txt";
pub const FAILED_CSV_FILE_NAME: &str = "failed_rows.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl FromStr for Environment {
    type Err = IngestError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" => Ok(Environment::Prod),
            _ => Err(IngestError::Usage(format!("{} is not an environment (dev, test, prod)", text))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Test => write!(f, "test"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Replace,
}

impl FromStr for Action {
    type Err = IngestError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "replace" => Ok(Action::Replace),
            _ => Err(IngestError::Usage(format!("{} is not an action (create, replace)", text))),
        }
    }
}

pub struct Arguments {
    pub environment: Environment,
    pub action: Action,
    pub csv_path: PathBuf,
    pub config_path: PathBuf,
    pub should_preview_record: bool,
    pub enable_log: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub parent_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    pub chapter: i64,
    pub app_dir: PathBuf,
}

// raw layout of the config file: one table per environment plus [common]
#[derive(Debug, Deserialize)]
struct ConfigFile {
    common: CommonConfig,
    dev: Option<DatabaseConfig>,
    test: Option<DatabaseConfig>,
    prod: Option<DatabaseConfig>,
}

/// Settings for one run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub chapter: i64,
    pub app_dir: PathBuf,
}

impl Config {

    /// Reads `path` and selects the section for `environment`.
    /// `PIMS_<SECTION>__<KEY>` variables override file values.
    pub fn load(path: &Path, environment: Environment) -> Result<Config, IngestError> {
        let file: ConfigFile = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        let database = match environment {
            Environment::Dev => file.dev,
            Environment::Test => file.test,
            Environment::Prod => file.prod,
        }
        .ok_or_else(|| IngestError::MissingEnvironment(environment.to_string()))?;

        Ok(Config {
            environment: environment,
            database: database,
            chapter: file.common.chapter,
            app_dir: file.common.app_dir,
        })
    }

    // where the run log and failed rows are saved
    pub fn app_path(&self) -> PathBuf {
        self.database.parent_dir.join(&self.app_dir)
    }
}

pub fn get_arguments() -> Arguments {
    let args: Vec<String> = env::args().collect();

    if wants_usage(&args) {
        let _ = build_app().print_help();
        println!();
        exit(0);
    }

    let matches = build_app().get_matches_from_safe(&args).unwrap_or_else(|error| error.exit());

    match arguments_from_matches(&matches) {
        Ok(arguments) => arguments,
        Err(error) => {
            println!("{}", error);
            exit(-1);
        }
    }
}

// `help` in place of the environment, or fewer than three positionals
pub fn wants_usage(args: &[String]) -> bool {
    let mut positionals = Vec::new();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        if arg == "-c" || arg == "--config" {
            iter.next();
        } else if !arg.starts_with('-') {
            positionals.push(arg);
        }
    }

    positionals.len() < 3 || positionals[0].eq_ignore_ascii_case("help")
}

fn build_app<'a, 'b>() -> App<'a, 'b> {
    clap_app!(x =>
        (name: "PIMs_Ingest")
        (version: "0.1.0")
        (about: "Parses a PIMs CSV file and creates a database table from it")
        (@arg ENVIRONMENT: +required +case_insensitive possible_value[dev test prod] "Environment whose database settings are used")
        (@arg ACTION: +required +case_insensitive possible_value[create replace] "create stops if the table exists, replace drops and recreates it")
        (@arg CSV: +required "CSV file with a header row and Unix line endings")
        (@arg CONFIG: -c --config +takes_value "Configuration file. Default _app.toml")
        (@arg PREVIEW: -p --preview "Preview the first row before loading")
        (@arg NO_LOG: -n --nolog "Do not save the run log and failed rows. NOT RECOMMENDED")
    )
}

fn arguments_from_matches(matches: &ArgMatches) -> Result<Arguments, IngestError> {
    Ok(Arguments {
        environment: required(matches, "ENVIRONMENT")?.parse()?,
        action: required(matches, "ACTION")?.parse()?,
        csv_path: PathBuf::from(required(matches, "CSV")?),
        config_path: PathBuf::from(matches.value_of("CONFIG").unwrap_or(DEFAULT_CONFIG_FILE)),
        should_preview_record: matches.is_present("PREVIEW"),
        enable_log: !matches.is_present("NO_LOG"),
    })
}

fn required<'m>(matches: &'m ArgMatches, name: &str) -> Result<&'m str, IngestError> {
    matches
        .value_of(name)
        .ok_or_else(|| IngestError::Usage(format!("missing {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const CONFIG_TOML: &str = r#"
        [common]
        chapter = 305
        app_dir = "pims"

        [dev]
        host = "localhost"
        port = 3306
        user = "dev_user"
        password = "dev_pass"
        database = "union_dev"
        parent_dir = "/var/www"
    "#;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn usage_when_help_or_missing() {
        assert!(wants_usage(&args(&["pims_ingest"])));
        assert!(wants_usage(&args(&["pims_ingest", "help", "create", "a.csv"])));
        assert!(wants_usage(&args(&["pims_ingest", "HELP"])));
        assert!(wants_usage(&args(&["pims_ingest", "dev", "create"])));
        assert!(wants_usage(&args(&["pims_ingest", "-c", "app.toml", "dev", "create"])));
        assert!(!wants_usage(&args(&["pims_ingest", "dev", "create", "a.csv"])));
        assert!(!wants_usage(&args(&["pims_ingest", "-p", "prod", "replace", "a.csv"])));
    }

    #[test]
    fn parses_positionals_and_flags() {
        let matches = build_app()
            .get_matches_from_safe(args(&["pims_ingest", "PROD", "replace", "2016-11_CSUEU_PIMS.csv", "-n", "-c", "other.toml"]))
            .unwrap();
        let arguments = arguments_from_matches(&matches).unwrap();

        assert_eq!(arguments.environment, Environment::Prod);
        assert_eq!(arguments.action, Action::Replace);
        assert_eq!(arguments.csv_path, PathBuf::from("2016-11_CSUEU_PIMS.csv"));
        assert_eq!(arguments.config_path, PathBuf::from("other.toml"));
        assert!(!arguments.enable_log);
        assert!(!arguments.should_preview_record);
    }

    #[test]
    fn rejects_unknown_action() {
        let result = build_app().get_matches_from_safe(args(&["pims_ingest", "dev", "append", "a.csv"]));
        assert!(result.is_err());
        assert!("append".parse::<Action>().is_err());
        assert_eq!("Create".parse::<Action>().unwrap(), Action::Create);
    }

    #[test]
    fn loads_environment_section() {
        Jail::expect_with(|jail| {
            jail.create_file("_app.toml", CONFIG_TOML)?;

            let config = Config::load(Path::new("_app.toml"), Environment::Dev).unwrap();
            assert_eq!(config.chapter, 305);
            assert_eq!(config.database.user, "dev_user");
            assert_eq!(config.database.port, 3306);
            assert_eq!(config.app_path(), PathBuf::from("/var/www/pims"));
            Ok(())
        });
    }

    #[test]
    fn environment_variables_override_file() {
        Jail::expect_with(|jail| {
            jail.create_file("_app.toml", CONFIG_TOML)?;
            jail.set_env("PIMS_DEV__PASSWORD", "from_env");
            jail.set_env("PIMS_COMMON__CHAPTER", "12");

            let config = Config::load(Path::new("_app.toml"), Environment::Dev).unwrap();
            assert_eq!(config.database.password, "from_env");
            assert_eq!(config.chapter, 12);
            Ok(())
        });
    }

    #[test]
    fn missing_environment_section() {
        Jail::expect_with(|jail| {
            jail.create_file("_app.toml", CONFIG_TOML)?;

            match Config::load(Path::new("_app.toml"), Environment::Prod) {
                Err(IngestError::MissingEnvironment(name)) => assert_eq!(name, "prod"),
                other => panic!("expected missing section, got {:?}", other),
            }
            Ok(())
        });
    }
}
