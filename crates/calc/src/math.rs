//! General math service logic: Fibonacci, arithmetic and constants.

use crate::expr::evaluate;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// Largest Fibonacci index the service computes.
pub const FIBONACCI_LIMIT: u64 = 50;

const FIBONACCI_PATTERNS: &[&str] = &[
    r"fibonacci\s*(\d+)",
    r"fib\s*(\d+)",
    r"fibonacci\s*sequence\s*(\d+)",
    r"(\d+)\s*fibonacci",
    r"fibonacci\s*of\s*(\d+)",
];

const ARITHMETIC_PATTERNS: &[&str] = &[
    r"(\d+\s*[+\-*/]\s*\d+(?:\s*[+\-*/]\s*\d+)*)",
    r"calculate\s*(.+)",
    r"what\s*is\s*(.+)",
    r"solve\s*(.+)",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

static FIBONACCI_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(FIBONACCI_PATTERNS));
static ARITHMETIC_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(ARITHMETIC_PATTERNS));
static DIRECT_ARITHMETIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\d+\-*/().\s]+$").ok());

/// Outcome of a math request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathAnswer {
    pub answer: String,
    pub calculation_type: String,
    pub result: Value,
    pub success: bool,
}

impl MathAnswer {
    fn ok(answer: String, calculation_type: &str, result: Value) -> Self {
        Self {
            answer,
            calculation_type: calculation_type.to_string(),
            result,
            success: true,
        }
    }

    fn failed(answer: String, calculation_type: &str, result: &str) -> Self {
        Self {
            answer,
            calculation_type: calculation_type.to_string(),
            result: json!(result),
            success: false,
        }
    }
}

/// First `n` Fibonacci numbers, starting 0, 1.
pub fn fibonacci_sequence(n: u64) -> Vec<u64> {
    let mut seq = Vec::with_capacity(n as usize);
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        seq.push(a);
        (a, b) = (b, a.saturating_add(b));
    }
    seq
}

/// The nth Fibonacci number, 1-indexed: F(1) = 0, F(2) = 1. F(0) = 0.
pub fn fibonacci_nth(n: u64) -> u64 {
    if n <= 1 {
        return 0;
    }
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 2..n {
        (a, b) = (b, a.saturating_add(b));
    }
    b
}

/// Interpret `question` as a math request.
pub fn solve(question: &str) -> MathAnswer {
    let lower = question.trim().to_lowercase();

    for re in FIBONACCI_REGEXES.iter() {
        let Some(n) = re
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            continue;
        };

        if n > FIBONACCI_LIMIT {
            return MathAnswer::failed(
                format!(
                    "Fibonacci calculation limited to {} terms. Requested: {}",
                    FIBONACCI_LIMIT, n
                ),
                "fibonacci_limit",
                "limit_exceeded",
            );
        }

        if lower.contains("sequence") {
            let seq = fibonacci_sequence(n);
            let list = seq.iter().map(u64::to_string).collect::<Vec<_>>().join(", ");
            return MathAnswer::ok(
                format!("Fibonacci sequence of {} terms: [{}]", n, list),
                "fibonacci_sequence",
                json!(seq),
            );
        }

        let value = fibonacci_nth(n);
        return MathAnswer::ok(
            format!("The {}th Fibonacci number is {}", n, value),
            "fibonacci_nth",
            json!(value),
        );
    }

    // The first arithmetic shape that matches decides, even when its
    // capture does not evaluate.
    if let Some(expression) = ARITHMETIC_REGEXES
        .iter()
        .find_map(|re| re.captures(&lower).and_then(|c| c.get(1)))
        .map(|m| m.as_str().trim().to_string())
    {
        return match evaluate(&expression) {
            Ok(value) => MathAnswer::ok(
                format!("{} = {}", expression, value),
                "arithmetic",
                value.to_json(),
            ),
            Err(e) => MathAnswer::failed(
                format!("Cannot calculate '{}': {}", expression, e),
                "arithmetic_error",
                "error",
            ),
        };
    }

    let without_equals = lower.replace('=', "");
    if DIRECT_ARITHMETIC
        .as_ref()
        .is_some_and(|re| re.is_match(&without_equals))
    {
        let expression = lower.split('=').next().unwrap_or_default().trim();
        if let Ok(value) = evaluate(expression) {
            return MathAnswer::ok(
                format!("{} = {}", expression, value),
                "direct_arithmetic",
                value.to_json(),
            );
        }
    }

    if lower.contains("pi") {
        return MathAnswer::ok(
            format!("π (Pi) = {}", std::f64::consts::PI),
            "constant",
            json!(std::f64::consts::PI),
        );
    }

    if lower.contains("euler") || lower.contains(" e ") {
        return MathAnswer::ok(
            format!("e (Euler's number) = {}", std::f64::consts::E),
            "constant",
            json!(std::f64::consts::E),
        );
    }

    MathAnswer::failed(
        "No mathematical calculation found in the question".to_string(),
        "no_math",
        "not_found",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_values() {
        assert_eq!(fibonacci_nth(1), 0);
        assert_eq!(fibonacci_nth(2), 1);
        assert_eq!(fibonacci_nth(5), 3);
        assert_eq!(fibonacci_nth(50), 7_778_742_049);
        assert_eq!(fibonacci_sequence(6), vec![0, 1, 1, 2, 3, 5]);
        assert!(fibonacci_sequence(0).is_empty());
    }

    #[test]
    fn test_fibonacci_questions() {
        let nth = solve("fibonacci 5");
        assert!(nth.success);
        assert_eq!(nth.answer, "The 5th Fibonacci number is 3");
        assert_eq!(nth.calculation_type, "fibonacci_nth");

        let seq = solve("Fibonacci sequence 6");
        assert_eq!(seq.answer, "Fibonacci sequence of 6 terms: [0, 1, 1, 2, 3, 5]");
        assert_eq!(seq.result, json!([0, 1, 1, 2, 3, 5]));

        let limited = solve("fib 51");
        assert!(!limited.success);
        assert_eq!(limited.calculation_type, "fibonacci_limit");
    }

    #[test]
    fn test_arithmetic_questions() {
        let sum = solve("5 + 7");
        assert_eq!(sum.answer, "5 + 7 = 12");
        assert_eq!(sum.calculation_type, "arithmetic");

        assert_eq!(solve("what is 12 * 3").answer, "12 * 3 = 36");
        assert_eq!(solve("calculate 100 / 4").answer, "100 / 4 = 25.0");
        assert_eq!(solve("solve 2 + 3 * 4").result, json!(14));
    }

    #[test]
    fn test_arithmetic_shape_without_expression() {
        let result = solve("what is diabetes");
        assert!(!result.success);
        assert_eq!(result.calculation_type, "arithmetic_error");

        // "what is" claims the question before the constant lookup.
        assert_eq!(solve("what is pi").calculation_type, "arithmetic_error");
    }

    #[test]
    fn test_direct_arithmetic() {
        let result = solve("42");
        assert!(result.success);
        assert_eq!(result.answer, "42 = 42");
        assert_eq!(result.calculation_type, "direct_arithmetic");

        assert_eq!(solve("(3) =").answer, "(3) = 3");
    }

    #[test]
    fn test_constants() {
        let pi = solve("pi value");
        assert!(pi.success);
        assert_eq!(pi.calculation_type, "constant");
        assert!(pi.answer.starts_with("π (Pi) = 3.14159"));

        let e = solve("value of euler number");
        assert!(e.answer.starts_with("e (Euler's number) = 2.718"));
    }

    #[test]
    fn test_no_math() {
        let result = solve("tell me a story");
        assert!(!result.success);
        assert_eq!(result.calculation_type, "no_math");
    }
}
