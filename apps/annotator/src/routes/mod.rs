pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{augment, codec, evaluation, llm_client, output_formats, prompt};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Output formats
        .route(
            "/api/v1/output-formats",
            get(output_formats::handlers::handle_list).post(output_formats::handlers::handle_create),
        )
        .route(
            "/api/v1/output-formats/:id",
            get(output_formats::handlers::handle_get)
                .put(output_formats::handlers::handle_update)
                .delete(output_formats::handlers::handle_delete),
        )
        // Codecs
        .route(
            "/api/v1/annotations/serialize",
            post(codec::handlers::handle_serialize),
        )
        .route("/api/v1/annotations/parse", post(codec::handlers::handle_parse))
        // Evaluation
        .route(
            "/api/v1/evaluation/score",
            post(evaluation::handlers::handle_score),
        )
        // Prompts and LLM
        .route("/api/v1/prompts/render", post(prompt::handlers::handle_render))
        .route("/api/v1/llm/call", post(llm_client::handlers::handle_call))
        .route("/api/v1/augment", post(augment::handlers::handle_augment))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::MockCompletion;
    use crate::output_formats::InMemoryOutputFormatStore;

    const COT_REPLY: &str = "Analysis:\n\
        Sentence: The bread smelled great.\n\
        Annotation: [<sense: Smell><stimulus: bread><perception: warm scent><sentiment: Positive>] Reason: yum\n\
        Empty: It was quiet.";

    fn app() -> Router {
        build_router(AppState::new(
            Arc::new(MockCompletion::replying(COT_REPLY)),
            Arc::new(InMemoryOutputFormatStore::new()),
        ))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn scenario_format_body(name: &str) -> Value {
        json!({
            "name": name,
            "CoTStartTemplate": "Analysis:",
            "CoTSentenceExistTemplate": "Sentence: {{ SENTENCE }}",
            "CoTSentenceNotExistTemplate": "Empty: {{ SENTENCE }}",
            "CoTSentenceAnnotationTemplate": "Annotation: {{ ANNOTATION }} Reason: {{ COT }}"
        })
    }

    fn bread_document() -> Value {
        json!({
            "text": "The bread smelled great. It was quiet.",
            "segments": [
                {"indexStart": 0, "indexEnd": 24, "annotations": [
                    {"sense": "Smell", "stimulus": "bread", "perception": "warm scent",
                     "sentiment": "Positive", "CoT": "comforting"}
                ]},
                {"indexStart": 25, "indexEnd": 38, "annotations": []}
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_output_format_crud() {
        let app = app();
        let (status, created) =
            send(&app, "POST", "/api/v1/output-formats", Some(scenario_format_body("cot"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["CoTStartTemplate"], "Analysis:");

        let (status, _) =
            send(&app, "POST", "/api/v1/output-formats", Some(scenario_format_body("cot"))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/v1/output-formats/{id}");
        let (status, updated) =
            send(&app, "PUT", &uri, Some(json!({"smellName": "Olfactory"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["smellName"], "Olfactory");
        assert_eq!(updated["CoTStartTemplate"], "Analysis:");
        assert_eq!(updated["id"], id.as_str());

        let (_, list) = send(&app, "GET", "/api/v1/output-formats", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, deleted) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted"], true);

        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_output_format_rejects_display_name_collision() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/output-formats",
            Some(json!({"name": "clash", "tasteName": "Mouth", "touchName": "Mouth"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_output_format_requires_annotation_placeholder() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/output-formats",
            Some(json!({"name": "broken", "CoTSentenceAnnotationTemplate": "Found: {{ COT }}"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "CoTSentenceAnnotationTemplate must contain {{ ANNOTATION }}"
        );
    }

    #[tokio::test]
    async fn test_serialize_then_parse_through_stored_format() {
        let app = app();
        let (_, created) =
            send(&app, "POST", "/api/v1/output-formats", Some(scenario_format_body("cot"))).await;
        let id = created["id"].clone();

        let (status, serialized) = send(
            &app,
            "POST",
            "/api/v1/annotations/serialize",
            Some(json!({"document": bread_document(), "outputFormatId": id, "formatType": "cot"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let output = serialized["output"].as_str().unwrap().to_string();
        assert!(output.starts_with("Analysis:\nSentence: The bread smelled great."));

        let (status, parsed) = send(
            &app,
            "POST",
            "/api/v1/annotations/parse",
            Some(json!({
                "raw": output,
                "text": "The bread smelled great. It was quiet.",
                "outputFormatId": id,
                "formatType": "cot",
                "strict": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parsed["segments"], bread_document()["segments"]);
        assert_eq!(parsed["warnings"], json!([]));
    }

    #[tokio::test]
    async fn test_strict_parse_failure_is_422() {
        let app = app();
        let (_, created) =
            send(&app, "POST", "/api/v1/output-formats", Some(scenario_format_body("cot"))).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/annotations/parse",
            Some(json!({
                "raw": "Empty: Not in the text.",
                "text": "The bread smelled great.",
                "outputFormatId": created["id"],
                "formatType": "cot",
                "strict": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PARSE_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_output_format_is_404() {
        let (status, _) = send(
            &app(),
            "POST",
            "/api/v1/annotations/serialize",
            Some(json!({
                "document": bread_document(),
                "outputFormatId": "00000000-0000-4000-8000-000000000000",
                "formatType": "order-preserving"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sense_separated_is_400() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/annotations/serialize",
            Some(json!({"document": bread_document(), "formatType": "sense-separated"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn test_score_endpoint() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/evaluation/score",
            Some(json!({"items": [
                {"groundTruth": bread_document(), "predicted": bread_document()["segments"]},
                {"groundTruth": bread_document(), "predicted": []}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalTruePositives"], 1);
        assert_eq!(body["totalFalseNegatives"], 1);
        assert_eq!(body["individualScores"][1]["dataIndex"], 1);
    }

    #[tokio::test]
    async fn test_prompt_render() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/prompts/render",
            Some(json!({"template": "Hello {{ NAME }} {{ X }}", "context": {"NAME": "Ada"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompt"], "Hello Ada {{ X }}");
    }

    #[tokio::test]
    async fn test_llm_call_reports_backend_and_tokens() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/llm/call",
            Some(json!({"messages": [{"role": "user", "content": "hi"}], "model": "gemini-2.5-flash"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "google");
        assert_eq!(body["inputToken"], 12);
        assert_eq!(body["outputToken"], 34);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/llm/call",
            Some(json!({"messages": [{"role": "user", "content": "hi"}], "model": "mystery"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_MODEL");
    }

    #[tokio::test]
    async fn test_augment_in_validation_mode() {
        let app = app();
        let (_, created) =
            send(&app, "POST", "/api/v1/output-formats", Some(scenario_format_body("cot"))).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/augment",
            Some(json!({
                "prompt": "Annotate:\n{{ INPUT }}",
                "outputFormatId": created["id"],
                "formatType": "cot",
                "model": "deepseek-chat",
                "strict": true,
                "groundTruth": bread_document()
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompt"], "Annotate:\nThe bread smelled great. It was quiet.");
        assert_eq!(body["metrics"]["f1"], 1.0);
        assert_eq!(body["segments"].as_array().unwrap().len(), 2);
    }
}
