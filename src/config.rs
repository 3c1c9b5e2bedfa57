use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs};

/// Merged run configuration. Constructed once at startup from environment,
/// optional config file and CLI flags; immutable afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub output: Option<String>,
    pub config: Option<String>,
    pub dry: Option<bool>,
    pub with_time: Option<bool>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub paths: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

/// Reads environment variables prefixed with DIRBAK_
pub fn read_env() -> Config {
    let vars: HashMap<String, String> = env::vars().collect();
    read_env_from(&vars)
}

fn read_env_from(vars: &HashMap<String, String>) -> Config {
    let mut cfg = Config::default();

    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("DIRBAK_{}", $key)).cloned()
        };
    }

    fn parse_bool(v: String) -> bool {
        v == "true" || v == "1" || v.eq_ignore_ascii_case("yes")
    }

    fn split_list(v: String) -> Vec<String> {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    cfg.output = get_env!("OUTPUT");
    cfg.config = get_env!("CONFIG");
    cfg.dry = get_env!("DRY").map(parse_bool);
    cfg.with_time = get_env!("WITH_TIME").map(parse_bool);
    cfg.before = get_env!("BEFORE");
    cfg.after = get_env!("AFTER");
    cfg.paths = get_env!("PATHS").map(split_list);
    cfg.exclude = get_env!("EXCLUDE").map(split_list);
    cfg
}

/// Reads YAML or JSON config from file
pub fn read_config_file(path: &str) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
    let lower = path.to_lowercase();
    let cfg = if lower.ends_with(".json") {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

/// Merge configs by priority: env < file < cli
pub fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T: Clone>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        output: pick(env.output, file.output, cli.output),
        config: pick(env.config, file.config, cli.config),
        dry: pick(env.dry, file.dry, cli.dry),
        with_time: pick(env.with_time, file.with_time, cli.with_time),
        before: pick(env.before, file.before, cli.before),
        after: pick(env.after, file.after, cli.after),
        paths: pick(env.paths, file.paths, cli.paths),
        exclude: pick(env.exclude, file.exclude, cli.exclude),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merge_prefers_cli_over_file_over_env() {
        let env = Config {
            output: Some("/env/out".into()),
            before: Some("env-hook".into()),
            exclude: Some(vec!["env".into()]),
            ..Default::default()
        };
        let file = Config {
            output: Some("/file/out".into()),
            paths: Some(vec!["/file/src".into()]),
            ..Default::default()
        };
        let cli = Config {
            output: Some("/cli/out".into()),
            ..Default::default()
        };

        let merged = merge_configs(env, file, cli);
        assert_eq!(merged.output.as_deref(), Some("/cli/out"));
        assert_eq!(merged.paths, Some(vec!["/file/src".to_string()]));
        assert_eq!(merged.before.as_deref(), Some("env-hook"));
        assert_eq!(merged.exclude, Some(vec!["env".to_string()]));
    }

    #[test]
    fn env_vars_are_parsed_and_split() {
        let mut vars = HashMap::new();
        vars.insert("DIRBAK_OUTPUT".to_string(), "/backups".to_string());
        vars.insert("DIRBAK_DRY".to_string(), "yes".to_string());
        vars.insert("DIRBAK_WITH_TIME".to_string(), "0".to_string());
        vars.insert(
            "DIRBAK_PATHS".to_string(),
            "/srv/app, /home/me/project".to_string(),
        );
        vars.insert(
            "DIRBAK_EXCLUDE".to_string(),
            "node_modules,.git, target,".to_string(),
        );

        let cfg = read_env_from(&vars);
        assert_eq!(cfg.output.as_deref(), Some("/backups"));
        assert_eq!(cfg.dry, Some(true));
        assert_eq!(cfg.with_time, Some(false));
        assert_eq!(
            cfg.paths,
            Some(vec!["/srv/app".to_string(), "/home/me/project".to_string()])
        );
        assert_eq!(
            cfg.exclude,
            Some(vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "target".to_string()
            ])
        );
    }

    #[test]
    fn reads_yaml_config_file() {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(f, "output: /backups\npaths:\n  - /srv/app\nexclude:\n  - node_modules").unwrap();

        let cfg = read_config_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("/backups"));
        assert_eq!(cfg.paths, Some(vec!["/srv/app".to_string()]));
        assert_eq!(cfg.exclude, Some(vec!["node_modules".to_string()]));
    }

    #[test]
    fn reads_json_config_file() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(f, r#"{{"output": "/backups", "with_time": true}}"#).unwrap();

        let cfg = read_config_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("/backups"));
        assert_eq!(cfg.with_time, Some(true));
    }
}
