use pretty_assertions::assert_eq;
use spark_host::{
    llm_prompt, prompt, Host, HostError, HttpLlm, IdentityService, LlmConfig, LlmService,
    StaticIdentity, DEFAULT_MODEL,
};
use spark_kv::MemoryStore;
use spark_test_utils::{sample_user, session_over, test_host, ScriptedLlm};
use std::sync::Arc;

#[tokio::test]
async fn template_prompt_reaches_service_unchanged() {
    let llm = Arc::new(ScriptedLlm::new().reply("3 haikus"));
    let host = test_host(Arc::clone(&llm), Arc::new(MemoryStore::new()));

    let count = 3;
    let topic = "coding";
    let prompt = llm_prompt(&["Write ", " haikus about ", ""], &[&count, &topic]).unwrap();
    let answer = host.complete(&prompt, DEFAULT_MODEL, false).await.unwrap();

    assert_eq!(answer, "3 haikus");
    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "Write 3 haikus about coding");
    assert_eq!(calls[0].model, "gpt-4o-mini");
}

#[tokio::test]
async fn macro_prompt_matches_template_prompt() {
    let topic = "ownership";
    let from_macro = prompt!("Explain {topic} briefly");
    let from_template = llm_prompt(&["Explain ", " briefly"], &[&topic]).unwrap();

    assert_eq!(from_macro, from_template);
}

#[tokio::test]
async fn identity_is_reported_per_call() {
    let host = test_host(Arc::new(ScriptedLlm::new()), Arc::new(MemoryStore::new()));

    assert_eq!(host.user().await.unwrap(), sample_user());
    assert_eq!(host.identity().user().await.unwrap().login, "octocat");
}

#[tokio::test]
async fn anonymous_host_rejects_lookup() {
    let host = Host::new(
        Arc::new(ScriptedLlm::new()),
        Arc::new(StaticIdentity::anonymous()),
        session_over(Arc::new(MemoryStore::new())),
    );

    let err = host.user().await.unwrap_err();
    assert!(matches!(err, HostError::Unauthenticated));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn cloned_hosts_share_kv_slots() {
    let host = test_host(Arc::new(ScriptedLlm::new()), Arc::new(MemoryStore::new()));
    let other = host.clone();

    let counter = host.use_kv("counter", 0u32).unwrap();
    counter.hydrated().await;
    counter.update(|n| n + 1).unwrap();

    let seen = other.use_kv("counter", 0u32).unwrap();
    assert_eq!(*seen.get(), 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_retryable() {
    let config = LlmConfig::new().with_endpoint("http://127.0.0.1:9/v1/chat/completions");
    let llm = HttpLlm::new(&config).unwrap().with_api_key("test-token");

    let err = llm
        .complete(&prompt!("hello"), DEFAULT_MODEL, false)
        .await
        .unwrap_err();

    assert!(matches!(err, HostError::Request(_)));
    assert!(err.is_retryable());
}
