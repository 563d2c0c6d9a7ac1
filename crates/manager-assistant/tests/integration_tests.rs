//! Integration tests for the manager assistant.
//!
//! These tests exercise the summarizer, the churn model and the router end to
//! end against CSV fixtures, with a scripted LLM provider standing in for the
//! remote API.

use manager_assistant::llm::ChatProvider;
use manager_assistant::router::SUMMARY_PREFIX;
use manager_assistant::{
    AssistantConfig, ChatMessage, ChatRouter, ChurnModel, ChurnRequest, Conversation,
    FixedInput, LlmContext, ModelError, PredictionError, PredictionOutcome, PromptedInput, Role,
    SummaryReport, get_summary, summarize,
};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::{NamedTempFile, TempDir};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn customers_csv() -> PathBuf {
    fixtures_path().join("customers.csv")
}

fn trained_model() -> Arc<ChurnModel> {
    static MODEL: OnceLock<Arc<ChurnModel>> = OnceLock::new();
    MODEL
        .get_or_init(|| {
            Arc::new(ChurnModel::train(&customers_csv()).expect("fixture should train"))
        })
        .clone()
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn approx(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("statistic should be present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Provider double that records every request and answers from a script.
struct ScriptedProvider {
    reply: Result<String, String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatProvider for ScriptedProvider {
    fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

fn router_with(
    provider: Arc<ScriptedProvider>,
    dataset: &Path,
    context: LlmContext,
) -> ChatRouter {
    let config = AssistantConfig::builder()
        .dataset_path(dataset)
        .llm_context(context)
        .build()
        .unwrap();
    ChatRouter::new(trained_model(), provider, &config)
}

fn form_input() -> FixedInput {
    FixedInput(ChurnRequest::new(2.0, "Month-to-month", "Fiber optic", 85.5))
}

// ============================================================================
// Dataset Summary
// ============================================================================

#[test]
fn test_summary_matches_descriptive_statistics() {
    let summary = summarize(&customers_csv()).unwrap();

    let names: Vec<&str> = summary.columns().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["tenure", "MonthlyCharges"]);

    let tenure = summary.get("tenure").unwrap();
    assert_eq!(tenure.count, 24);
    approx(tenure.mean, 26.5);
    approx(tenure.std, 23.189202884851014);
    approx(tenure.min, 1.0);
    approx(tenure.q25, 5.75);
    approx(tenure.median, 19.0);
    approx(tenure.q75, 45.75);
    approx(tenure.max, 72.0);

    let monthly = summary.get("MonthlyCharges").unwrap();
    assert_eq!(monthly.count, 24);
    approx(monthly.mean, 72.50833333333334);
    approx(monthly.std, 24.35413395256974);
    approx(monthly.min, 24.05);
    approx(monthly.q25, 52.875);
    approx(monthly.median, 74.475);
    approx(monthly.q75, 93.1);
    approx(monthly.max, 110.15);
}

#[test]
fn test_summary_json_keys() {
    let report = get_summary(&customers_csv());
    let json = serde_json::to_value(&report).unwrap();

    let tenure = json["tenure"].as_object().unwrap();
    for key in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
        assert!(tenure.contains_key(key), "missing {key}");
    }
    assert!(json.get("customerID").is_none());
    assert!(json.get("Churn").is_none());
}

#[test]
fn test_summary_missing_file() {
    let dir = TempDir::new().unwrap();
    let report = get_summary(&dir.path().join("dataset.csv"));
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        serde_json::json!({"error": "File dataset.csv not found."})
    );
}

#[test]
fn test_summary_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.csv");
    std::fs::write(&path, "").unwrap();

    let report = get_summary(&path);
    assert_eq!(
        report,
        SummaryReport::Error {
            error: "File dataset.csv is empty.".to_string()
        }
    );
}

#[test]
fn test_summary_rereads_file_each_call() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.csv");

    std::fs::write(&path, "tenure\n1\n2\n").unwrap();
    assert_eq!(summarize(&path).unwrap().get("tenure").unwrap().count, 2);

    std::fs::write(&path, "tenure\n1\n2\n3\n").unwrap();
    assert_eq!(summarize(&path).unwrap().get("tenure").unwrap().count, 3);
}

// ============================================================================
// Churn Model
// ============================================================================

#[test]
fn test_model_learns_categories() {
    let model = trained_model();
    assert_eq!(model.training_rows(), 24);
    assert_eq!(
        model.categories("Contract").unwrap(),
        &["Month-to-month", "One year", "Two year"]
    );
    assert_eq!(
        model.categories("InternetService").unwrap(),
        &["DSL", "Fiber optic"]
    );
    assert!(model.categories("tenure").is_none());
    assert_eq!(model.feature_names().len(), 7);
}

#[test]
fn test_predict_returns_probability() {
    let model = trained_model();
    let p = model
        .predict_churn(&ChurnRequest::new(12.0, "Two year", "Fiber optic", 90.0))
        .unwrap();
    assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
}

#[test]
fn test_predict_orders_risk() {
    let model = trained_model();
    let risky = model
        .predict_churn(&ChurnRequest::new(2.0, "Month-to-month", "Fiber optic", 95.0))
        .unwrap();
    let loyal = model
        .predict_churn(&ChurnRequest::new(65.0, "Two year", "DSL", 40.0))
        .unwrap();
    assert!(
        risky > loyal,
        "expected new month-to-month customer ({risky}) above long two-year customer ({loyal})"
    );
}

#[test]
fn test_predict_matches_known_labels() {
    let model = trained_model();
    // C001 churned, C019 stayed.
    let churner = model
        .predict_churn(&ChurnRequest::new(1.0, "Month-to-month", "Fiber optic", 95.5))
        .unwrap();
    let stayer = model
        .predict_churn(&ChurnRequest::new(72.0, "Two year", "DSL", 65.5))
        .unwrap();

    assert!(churner > 0.5, "churned customer scored {churner}");
    assert!(stayer < 0.5, "retained customer scored {stayer}");
}

#[test]
fn test_predict_rejects_negative_tenure() {
    let model = trained_model();
    let result = model.predict_churn(&ChurnRequest::new(-1.0, "Month-to-month", "DSL", 50.0));
    assert_eq!(result, Err(PredictionError::InvalidTenure));

    let outcome = PredictionOutcome::from(result);
    assert_eq!(
        outcome,
        PredictionOutcome::Error {
            error: "Tenure must be a non-negative number.".to_string()
        }
    );
}

#[test]
fn test_predict_rejects_negative_monthly_charges() {
    let model = trained_model();
    let result = model.predict_churn(&ChurnRequest::new(3.0, "One year", "DSL", -10.0));
    assert_eq!(result, Err(PredictionError::InvalidMonthlyCharges));
}

#[test]
fn test_predict_unknown_category_is_error() {
    let model = trained_model();
    let result = model.predict_churn(&ChurnRequest::new(3.0, "One year", "Satellite", 40.0));
    assert!(matches!(
        result,
        Err(PredictionError::UnknownCategory { ref column, ref value })
            if column == "InternetService" && value == "Satellite"
    ));
}

#[test]
fn test_train_missing_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = ChurnModel::train(&dir.path().join("dataset.csv")).unwrap_err();
    assert!(matches!(err, ModelError::DatasetNotFound(_)));
    assert_eq!(err.to_string(), "The dataset.csv file was not found.");
}

#[test]
fn test_train_empty_file_is_fatal() {
    let file = csv_file("");
    let err = ChurnModel::train(file.path()).unwrap_err();
    assert!(matches!(err, ModelError::DatasetEmpty(_)));
}

#[test]
fn test_train_missing_column_is_fatal() {
    let file = csv_file("tenure,Contract,MonthlyCharges,Churn\n1,One year,20.0,No\n");
    let err = ChurnModel::train(file.path()).unwrap_err();
    assert!(
        err.to_string()
            .contains("Column 'InternetService' not found"),
        "{err}"
    );
}

#[test]
fn test_train_rejects_unmapped_churn_value() {
    let file = csv_file(
        "tenure,Contract,InternetService,MonthlyCharges,Churn\n\
         1,One year,DSL,20.0,No\n\
         2,One year,DSL,30.0,Maybe\n",
    );
    let err = ChurnModel::train(file.path()).unwrap_err();
    assert!(matches!(err, ModelError::Load(_)));
    assert!(err.to_string().contains("Maybe"), "{err}");
    assert!(err.to_string().contains("on line 3"), "{err}");
}

#[test]
fn test_train_reports_csv_line_of_missing_value() {
    let file = csv_file(
        "tenure,Contract,InternetService,MonthlyCharges,Churn\n\
         1,One year,DSL,20.0,No\n\
         2,One year,DSL,30.0,Yes\n\
         4,,DSL,35.0,No\n",
    );
    let err = ChurnModel::train(file.path()).unwrap_err();
    assert!(
        err.to_string()
            .contains("column 'Contract' has a missing value on line 4"),
        "{err}"
    );
}

#[test]
fn test_train_requires_both_classes() {
    let file = csv_file(
        "tenure,Contract,InternetService,MonthlyCharges,Churn\n\
         1,One year,DSL,20.0,No\n\
         2,Two year,Fiber optic,30.0,No\n",
    );
    let err = ChurnModel::train(file.path()).unwrap_err();
    assert!(err.to_string().contains("both"), "{err}");
}

// ============================================================================
// Router
// ============================================================================

#[test]
fn test_route_summary_reply_is_prefixed_json() {
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(provider.clone(), &customers_csv(), LlmContext::FullHistory);

    let reply = router.route(
        "Please give me the summary of the dataset",
        &[],
        &mut form_input(),
    );

    let body = reply
        .strip_prefix(SUMMARY_PREFIX)
        .expect("reply should start with the summary prefix");
    let json: serde_json::Value = serde_json::from_str(body.trim_start()).unwrap();
    assert_eq!(json["tenure"]["count"], 24);
    assert!(provider.requests().is_empty());
}

#[test]
fn test_route_summary_error_is_reported() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(
        provider,
        &dir.path().join("dataset.csv"),
        LlmContext::FullHistory,
    );

    let reply = router.route("summarize", &[], &mut form_input());
    assert_eq!(
        reply,
        "Sorry, an error occurred while summarizing the dataset: File dataset.csv not found."
    );
}

#[test]
fn test_route_predict_never_calls_llm() {
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(provider.clone(), &customers_csv(), LlmContext::FullHistory);

    let reply = router.route(
        "Can you predict churn for this customer?",
        &[],
        &mut form_input(),
    );

    assert!(
        reply.starts_with("Based on the model, the churn probability is about "),
        "{reply}"
    );
    assert!(reply.ends_with("%."));
    assert!(provider.requests().is_empty());
}

#[test]
fn test_route_predict_churner_above_half() {
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(provider, &customers_csv(), LlmContext::FullHistory);

    let mut churner = FixedInput(ChurnRequest::new(1.0, "Month-to-month", "Fiber optic", 95.5));
    let reply = router.route("predict churn", &[], &mut churner);

    let percent: f64 = reply
        .strip_prefix("Based on the model, the churn probability is about ")
        .and_then(|rest| rest.strip_suffix("%."))
        .expect("reply should carry a percentage")
        .parse()
        .unwrap();
    assert!(percent > 50.0, "{reply}");
}

#[test]
fn test_route_predict_with_prompted_input() {
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(provider, &customers_csv(), LlmContext::CurrentMessage);

    let mut output = Vec::new();
    let mut prompts = PromptedInput::new(Cursor::new("-1\nMonth-to-month\nDSL\n50\n"), &mut output);
    let reply = router.route("churn prediction please", &[], &mut prompts);

    assert_eq!(
        reply,
        "Sorry, an error occurred while predicting churn: Tenure must be a non-negative number."
    );
}

#[test]
fn test_route_predict_bad_number_is_reported() {
    let provider = ScriptedProvider::replying("unused");
    let router = router_with(provider, &customers_csv(), LlmContext::CurrentMessage);

    let mut prompts = PromptedInput::new(Cursor::new("soon\n"), Vec::new());
    let reply = router.route("predict churn", &[], &mut prompts);

    assert!(
        reply.starts_with("Sorry, an error occurred while predicting churn: could not convert"),
        "{reply}"
    );
}

#[test]
fn test_route_fallback_forwards_message_verbatim() {
    let provider = ScriptedProvider::replying("Track 90-day retention.");
    let router = router_with(provider.clone(), &customers_csv(), LlmContext::CurrentMessage);

    let message = "What is a good KPI for retention?";
    let reply = router.route(message, &[ChatMessage::assistant("earlier")], &mut form_input());

    assert_eq!(reply, "Track 90-day retention.");
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 2);
    assert_eq!(requests[0][0].role, Role::System);
    assert!(requests[0][0].content.starts_with("You are an AI assistant for a manager."));
    assert_eq!(requests[0][1], ChatMessage::user(message));
}

#[test]
fn test_route_llm_failure_is_reported() {
    let provider = ScriptedProvider::failing("401 Unauthorized");
    let router = router_with(provider, &customers_csv(), LlmContext::FullHistory);

    let reply = router.route("hello", &[], &mut form_input());
    assert_eq!(
        reply,
        "Sorry, an error occurred while calling Scripted API: 401 Unauthorized"
    );
}

#[test]
fn test_full_history_context_sends_whole_conversation() {
    let provider = ScriptedProvider::replying("ok");
    let router = router_with(provider.clone(), &customers_csv(), LlmContext::FullHistory);

    let mut conversation = Conversation::with_greeting();
    router.respond(&mut conversation, "hi there", &mut form_input());
    router.respond(&mut conversation, "how do I cut costs?", &mut form_input());

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);

    let last = &requests[1];
    let roles: Vec<Role> = last.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User
        ]
    );
    assert_eq!(last.last().unwrap().content, "how do I cut costs?");
}

// ============================================================================
// Conversation History
// ============================================================================

#[test]
fn test_history_alternates_after_turns() {
    let provider = ScriptedProvider::replying("noted");
    let router = router_with(provider, &customers_csv(), LlmContext::FullHistory);

    let mut conversation = Conversation::with_greeting();
    let turns = [
        "hello",
        "give me a summary",
        "predict churn for the form values",
        "thanks",
    ];
    for turn in turns {
        router.respond(&mut conversation, turn, &mut form_input());
    }

    let messages = conversation.messages();
    assert_eq!(messages.len(), 1 + 2 * turns.len());
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(conversation.user_turns(), turns.len());

    for (i, turn) in turns.iter().enumerate() {
        let user = &messages[1 + 2 * i];
        let assistant = &messages[2 + 2 * i];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, *turn);
        assert_eq!(assistant.role, Role::Assistant);
    }
    assert!(messages[4].content.starts_with(SUMMARY_PREFIX));
    assert!(messages[6].content.starts_with("Based on the model"));
}
