//! Integration tests for layered configuration loading

use crate::integration::test_utils::{postgen_vars, with_isolated_env};
use postgen::config::{global_config_path, ConfigLoader};
use postgen::error::ConfigError;
use postgen::pipeline::{StagedGenerator, Stage};
use postgen::provider::ProviderType;

fn write_global_config(contents: &str) {
    let path = global_config_path().unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_global_config_is_loaded() {
    with_isolated_env(|temp_dir| {
        write_global_config(
            r#"
[generation]
model = "gpt-4o"
temperature = 0.2
"#,
        );
        let workspace = temp_dir.path().join("site");
        std::fs::create_dir_all(&workspace).unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.generation.model, "gpt-4o");
        assert!((config.generation.temperature - 0.2).abs() < f64::EPSILON);
    });
}

#[test]
fn test_workspace_config_overrides_global_config() {
    with_isolated_env(|temp_dir| {
        write_global_config(
            r#"
[generation]
model = "gpt-4o"

[news]
max_headlines = 2
"#,
        );
        let workspace = temp_dir.path().join("site");
        std::fs::create_dir_all(&workspace).unwrap();
        std::fs::write(
            workspace.join("postgen.toml"),
            r#"
[generation]
model = "gpt-4-turbo"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.generation.model, "gpt-4-turbo");
        assert_eq!(config.news.max_headlines, 2);
    });
}

#[test]
fn test_environment_specific_file_and_variables() {
    with_isolated_env(|temp_dir| {
        let workspace = temp_dir.path().join("site");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("production.toml"),
            r#"
[budget]
total_ceiling = 16000
"#,
        )
        .unwrap();
        std::env::set_var("POSTGEN_ENV", "production");
        std::env::set_var("POSTGEN_GENERATION__MODEL", "claude-3-5-sonnet");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.budget.total_ceiling, 16000);
        assert_eq!(config.generation.model, "claude-3-5-sonnet");
    });
}

#[test]
fn test_budget_override_from_environment() {
    with_isolated_env(|temp_dir| {
        std::env::set_var("POSTGEN_BUDGET__TOTAL_CEILING", "4096");
        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.budget.total_ceiling, 4096);
        assert_eq!(config.budget().unwrap().remaining_input(), 4096 - 300);
    });
}

#[test]
fn test_credentials_fall_back_to_conventional_variables() {
    with_isolated_env(|temp_dir| {
        std::fs::write(
            temp_dir.path().join("postgen.toml"),
            r#"
[generation]
provider = "anthropic"
model = "claude-3-opus"
"#,
        )
        .unwrap();
        std::env::set_var("OPENAI_API_KEY", "sk-openai");
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ant");
        std::env::set_var("NEWSAPI_KEY", "news-key");

        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.generation.provider, ProviderType::Anthropic);
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.news.api_key.as_deref(), Some("news-key"));
        assert!(StagedGenerator::from_config(&config).is_ok());
    });
}

#[test]
fn test_missing_news_key_refuses_to_start() {
    with_isolated_env(|temp_dir| {
        std::env::set_var("OPENAI_API_KEY", "sk-openai");
        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        match StagedGenerator::from_config(&config) {
            Err(ConfigError::MissingCredential { service, env_var }) => {
                assert_eq!(service, "news");
                assert_eq!(env_var, "NEWSAPI_KEY");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("generator built without a news credential"),
        }
    });
}

#[test]
fn test_unknown_model_refuses_to_start() {
    with_isolated_env(|temp_dir| {
        std::fs::write(
            temp_dir.path().join("postgen.toml"),
            r#"
[generation]
provider = "local"
model = "house-model-v2"
endpoint = "http://localhost:8080/v1"
"#,
        )
        .unwrap();
        std::env::set_var("NEWSAPI_KEY", "news-key");

        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(problems)) if problems.iter().any(|p| p.contains("house-model-v2"))
        ));
    });
}

#[test]
fn test_custom_prompt_missing_placeholder_is_rejected() {
    with_isolated_env(|temp_dir| {
        std::fs::write(
            temp_dir.path().join("postgen.toml"),
            r#"
[stages.body]
prompt = "Write a post about {topic}."
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.stages.get(Stage::Body).max_output_tokens, 300);
        match config.validate() {
            Err(ConfigError::Invalid(problems)) => {
                assert!(problems.iter().any(|p| p.contains("{context}")));
            }
            other => panic!("expected invalid config, got {:?}", other.err()),
        }
    });
}

#[test]
fn test_isolation_clears_every_postgen_variable() {
    with_isolated_env(|_| {
        assert!(postgen_vars().is_empty(), "{:?}", postgen_vars());
        std::env::set_var("POSTGEN_BUDGET__BYTES_PER_TOKEN", "0.5");
        std::env::set_var("POSTGEN_NEWS__MAX_HEADLINES", "7");
    });

    with_isolated_env(|temp_dir| {
        assert!(postgen_vars().is_empty(), "{:?}", postgen_vars());
        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.budget.bytes_per_token, None);
        assert_eq!(config.news.max_headlines, 1);
    });
}
