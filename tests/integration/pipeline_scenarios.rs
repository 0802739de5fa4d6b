//! End-to-end pipeline runs against scripted service doubles

use crate::integration::test_utils::{
    generator, test_config, EchoClient, FixedHeadlines, ScriptedClient,
};
use postgen::error::{ConfigError, ContextError, FailureKind, PipelineError, ProviderError};
use postgen::pipeline::StagedGenerator;
use postgen::pipeline::{PromptTemplate, PromptVars, Stage};
use proptest::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn test_full_run_grounds_body_in_headline() {
    let client = ScriptedClient::new(vec![
        Ok("Solar Gets Cheaper"),
        Ok("Why Solar Gets Cheaper matters for your energy bill."),
        Ok("Solar prices fall 12% this quarter, and here is what it means."),
    ]);
    let source = FixedHeadlines::new(&["Solar prices fall 12%"]);
    let config = test_config();
    let generator = generator(&config, client.clone(), source.clone());

    let result = generator.generate("renewable energy").await.unwrap();

    assert_eq!(result.title, "Solar Gets Cheaper");
    assert!(result.meta_description.contains("Solar Gets Cheaper"));
    assert!(result.post_content.contains("Solar prices fall 12%"));

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].prompt.contains("renewable energy"));
    assert!(requests[1].prompt.contains("Solar Gets Cheaper"));
    assert!(requests[2].prompt.contains("renewable energy"));
    assert!(requests[2].prompt.contains("Solar prices fall 12%"));
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_no_headlines_uses_placeholder_and_succeeds() {
    let client = ScriptedClient::new(vec![Ok("Title"), Ok("Meta"), Ok("Body")]);
    let source = FixedHeadlines::new(&[]);
    let config = test_config();
    let generator = generator(&config, client.clone(), source);

    let result = generator.generate("renewable energy").await.unwrap();
    assert_eq!(result.post_content, "Body");

    let body_prompt = &client.requests()[2].prompt;
    assert!(body_prompt.contains("No recent news found."));
    assert!(
        generator.allocator().estimator().estimate(body_prompt)
            <= generator.allocator().budget().remaining_input()
    );
}

#[tokio::test]
async fn test_oversized_title_prompt_makes_no_generation_calls() {
    let client = ScriptedClient::new(vec![Ok("Title"), Ok("Meta"), Ok("Body")]);
    let config = test_config();
    let generator = generator(&config, client.clone(), FixedHeadlines::new(&["headline"]));

    let topic = "a".repeat(8_000);
    let err = generator.generate(&topic).await.unwrap_err();

    match err {
        PipelineError::BudgetExceeded { stage, cost, limit } => {
            assert_eq!(stage, Stage::Title);
            assert!(cost > limit);
            assert_eq!(limit, 8192 - 300);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_body_auth_failure_discards_earlier_stages() {
    let client = ScriptedClient::new(vec![
        Ok("Title"),
        Ok("Meta"),
        Err(ProviderError::AuthFailed("invalid api key".to_string())),
    ]);
    let config = test_config();
    let generator = generator(&config, client.clone(), FixedHeadlines::new(&["headline"]));

    let err = generator.generate("renewable energy").await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Body));
    assert_eq!(err.kind(), FailureKind::Service);
    assert!(matches!(
        err,
        PipelineError::GenerationService {
            stage: Stage::Body,
            source: ProviderError::AuthFailed(_)
        }
    ));
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn test_context_failure_stops_before_generation() {
    let client = ScriptedClient::new(vec![Ok("Title")]);
    let source = FixedHeadlines::failing(ContextError::Status {
        status: 401,
        message: "apiKeyInvalid".to_string(),
    });
    let config = test_config();
    let generator = generator(&config, client.clone(), source.clone());

    let err = generator.generate("renewable energy").await.unwrap_err();

    assert!(matches!(err, PipelineError::ContextFetch(_)));
    assert_eq!(err.stage(), None);
    assert_eq!(client.call_count(), 0);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_rate_limit_on_title_names_title() {
    let client = ScriptedClient::new(vec![Err(ProviderError::RateLimit("slow down".to_string()))]);
    let config = test_config();
    let generator = generator(&config, client.clone(), FixedHeadlines::new(&["headline"]));

    let err = generator.generate("topic").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Title));
    assert_eq!(err.status_code(), 502);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() {
    let config = test_config();
    let generator = generator(&config, Arc::new(EchoClient), FixedHeadlines::new(&["headline"]));

    let (first, second) = tokio::join!(generator.generate("rust"), generator.generate("gardening"));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert!(first.title.contains("rust"));
    assert!(!first.title.contains("gardening"));
    assert!(first.meta_description.contains("rust"));
    assert!(first.post_content.contains("rust"));

    assert!(second.title.contains("gardening"));
    assert!(second.meta_description.contains("gardening"));
    assert!(!second.post_content.contains("rust"));
}

#[test]
fn test_body_prompt_repeating_context_is_refused_at_startup() {
    let mut config = test_config();
    config.budget.total_ceiling = 1000;
    config.stages.body.prompt = "About {topic}: {context}\nAgain: {context}".to_string();

    let result = StagedGenerator::with_services(
        &config,
        ScriptedClient::new(vec![]),
        FixedHeadlines::new(&["x"]),
    );
    match result {
        Err(ConfigError::Invalid(problems)) => {
            assert!(problems.iter().any(|p| p.contains("stages.body.prompt")));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("generator built with a repeated context slot"),
    }
}

#[tokio::test]
async fn test_truncated_context_always_fits_body_budget() {
    let mut config = test_config();
    config.budget.total_ceiling = 1000;
    let client = ScriptedClient::new(vec![Ok("Title"), Ok("Meta"), Ok("Body")]);
    let headline = "n".repeat(5_000);
    let generator = generator(&config, client.clone(), FixedHeadlines::new(&[headline.as_str()]));

    generator.generate("renewable energy").await.unwrap();

    let body_prompt = &client.requests()[2].prompt;
    assert!(
        generator.allocator().estimator().estimate(body_prompt)
            <= generator.allocator().budget().remaining_input()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A title prompt over the input allowance is never sent; one within it always is.
    #[test]
    fn prop_title_prompt_is_sent_only_within_budget(len in 1usize..9_000) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let topic = "t".repeat(len);
        let config = test_config();
        let client = ScriptedClient::new(vec![Ok("Title"), Ok("Meta"), Ok("Body")]);
        let generator = generator(&config, client.clone(), FixedHeadlines::new(&["headline"]));

        let title_prompt = PromptTemplate::new(Stage::Title.default_prompt()).render(&PromptVars {
            topic: &topic,
            ..Default::default()
        });
        let cost = generator.allocator().estimator().estimate(&title_prompt);
        let limit = generator.allocator().budget().remaining_input();

        let outcome = runtime.block_on(generator.generate(&topic));
        let requests = client.requests();

        if cost > limit {
            let is_title_rejection = matches!(
                outcome,
                Err(PipelineError::BudgetExceeded { stage: Stage::Title, .. })
            );
            prop_assert!(is_title_rejection);
            prop_assert!(requests.is_empty());
        } else {
            prop_assert!(!requests.is_empty());
            prop_assert_eq!(&requests[0].prompt, &title_prompt);
            for request in &requests {
                prop_assert!(generator.allocator().estimator().estimate(&request.prompt) <= limit);
            }
        }
    }
}
