//! HTTP surface for the calculation services.

use crate::factorization::factorize;
use crate::math::solve;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use strictqa_core::{AppError, AppResult};
use tokio::net::TcpListener;

/// Request body shared by both services.
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
struct FactorResponse {
    question: String,
    answer: String,
    number: u64,
    factors: Vec<u64>,
    success: bool,
}

#[derive(Debug, Serialize)]
struct MathResponse {
    question: String,
    answer: String,
    calculation_type: String,
    result: Value,
    success: bool,
}

fn empty_question() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": "Question cannot be empty" })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn factorization_banner() -> impl IntoResponse {
    Json(json!({
        "message": "Factorization API",
        "status": "running",
        "examples": ["9", "factors of 46", "find factors of 64", "factorize 25"],
    }))
}

async fn factors(Json(request): Json<QuestionRequest>) -> Response {
    if request.question.trim().is_empty() {
        return empty_question();
    }

    let question = request.question.clone();
    let result = match tokio::task::spawn_blocking(move || factorize(&question)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Factorization task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Factorization failed" })),
            )
                .into_response();
        }
    };
    tracing::debug!(question = %request.question, success = result.success, "factorization request");

    Json(FactorResponse {
        question: request.question,
        answer: result.answer,
        number: result.number,
        factors: result.factors,
        success: result.success,
    })
    .into_response()
}

async fn factorization_test() -> impl IntoResponse {
    let questions = [
        "9",
        "factors of 46",
        "find factors of 64",
        "factorize 25",
        "what are the factors of 36",
    ];
    let results: Vec<Value> = questions
        .iter()
        .map(|q| {
            let r = factorize(q);
            json!({ "question": q, "answer": r.answer, "success": r.success })
        })
        .collect();
    Json(json!({ "test_results": results }))
}

async fn math_banner() -> impl IntoResponse {
    Json(json!({
        "message": "Math Calculation API",
        "status": "running",
        "available_operations": [
            "Fibonacci numbers and sequences",
            "Basic arithmetic (+, -, *, /)",
            "Mathematical constants (Pi, e)",
            "Expression evaluation",
        ],
    }))
}

async fn calculate(Json(request): Json<QuestionRequest>) -> Response {
    if request.question.trim().is_empty() {
        return empty_question();
    }

    let result = solve(&request.question);
    tracing::debug!(
        question = %request.question,
        calculation_type = %result.calculation_type,
        success = result.success,
        "math request"
    );

    Json(MathResponse {
        question: request.question,
        answer: result.answer,
        calculation_type: result.calculation_type,
        result: result.result,
        success: result.success,
    })
    .into_response()
}

async fn math_examples() -> impl IntoResponse {
    Json(json!({
        "fibonacci_examples": ["fibonacci 10", "fibonacci sequence 8", "fib 15"],
        "arithmetic_examples": [
            "5 + 7",
            "12 * 3",
            "what is 15 - 8",
            "calculate 25 / 5",
            "solve 2 + 3 * 4",
        ],
        "constant_examples": ["value of euler number", "pi value"],
    }))
}

async fn math_test() -> impl IntoResponse {
    let questions = [
        "fibonacci 5",
        "5 + 7",
        "what is 12 * 3",
        "fibonacci sequence 6",
        "calculate 100 / 4",
        "pi value",
    ];
    let results: Vec<Value> = questions
        .iter()
        .map(|q| {
            let r = solve(q);
            json!({ "question": q, "answer": r.answer, "success": r.success })
        })
        .collect();
    Json(json!({ "test_results": results }))
}

/// Routes for the factorization service.
pub fn factorization_router() -> Router {
    Router::new()
        .route("/", get(factorization_banner))
        .route("/factors", post(factors))
        .route("/test", get(factorization_test))
        .route("/health", get(health))
}

/// Routes for the math service.
pub fn math_router() -> Router {
    Router::new()
        .route("/", get(math_banner))
        .route("/calculate", post(calculate))
        .route("/examples", get(math_examples))
        .route("/test", get(math_test))
        .route("/health", get(health))
}

/// Bind `addr` and serve `router` until the task is cancelled.
pub async fn serve(addr: SocketAddr, router: Router, name: &str) -> AppResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {} on {}: {}", name, addr, e)))?;

    tracing::info!("{} listening on http://{}", name, addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Other(format!("{} stopped: {}", name, e)))
}
